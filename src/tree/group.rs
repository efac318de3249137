//! High-level group operations

use tracing::info;

use super::util::{patch_keyvalue_slice, PatchMode};
use super::Manager;
use crate::db::Driver;
use crate::models::{Capability, Group};
use crate::types::{GatehouseError, Result};

impl Manager {
    /// Create a new group. `number` may be -1 to request automatic
    /// allocation; `managed_by` names a group whose members may manage
    /// this one.
    pub async fn create_group(
        &self,
        name: &str,
        display_name: &str,
        managed_by: &str,
        number: i32,
    ) -> Result<()> {
        let dg = Group {
            name: name.to_string(),
            display_name: if display_name.is_empty() {
                None
            } else {
                Some(display_name.to_string())
            },
            managed_by: if managed_by.is_empty() {
                None
            } else {
                Some(managed_by.to_string())
            },
            number,
            ..Default::default()
        };
        self.run_group_chain("CREATE", &dg).await?;
        info!(group = name, "Group created");
        Ok(())
    }

    /// Fetch a group by name.
    pub async fn fetch_group(&self, name: &str) -> Result<Group> {
        let dg = Group {
            name: name.to_string(),
            ..Default::default()
        };
        self.run_group_chain("FETCH", &dg).await
    }

    /// Hard-delete a group.
    pub async fn destroy_group(&self, name: &str) -> Result<()> {
        let dg = Group {
            name: name.to_string(),
            ..Default::default()
        };
        self.run_group_chain("DESTROY", &dg).await?;
        info!(group = name, "Group destroyed");
        Ok(())
    }

    /// Merge scalar group metadata.
    pub async fn update_group_meta(&self, name: &str, delta: Group) -> Result<()> {
        let dg = Group {
            name: name.to_string(),
            ..delta
        };
        self.run_group_chain("UPDATE", &dg).await?;
        Ok(())
    }

    /// Grant a capability to a group. Idempotent.
    pub async fn set_group_capability(&self, name: &str, cap: Capability) -> Result<()> {
        let mut dg = Group {
            name: name.to_string(),
            ..Default::default()
        };
        dg.capabilities = vec![cap];
        self.run_group_chain("ADD-CAPABILITY", &dg).await?;
        info!(group = name, capability = %cap, "Capability granted");
        Ok(())
    }

    /// Remove a capability from a group.
    pub async fn drop_group_capability(&self, name: &str, cap: Capability) -> Result<()> {
        let mut dg = Group {
            name: name.to_string(),
            ..Default::default()
        };
        dg.capabilities = vec![cap];
        self.run_group_chain("DEL-CAPABILITY", &dg).await?;
        info!(group = name, capability = %cap, "Capability dropped");
        Ok(())
    }

    /// Patch the group's untyped metadata store; same modes as the entity
    /// side.
    pub async fn manage_untyped_group_meta(
        &self,
        name: &str,
        mode: &str,
        key: &str,
        value: &str,
    ) -> Result<Vec<String>> {
        let mode = PatchMode::parse(mode).ok_or_else(|| {
            GatehouseError::MalformedRequest(format!("bad metadata mode: {mode}"))
        })?;

        if mode == PatchMode::Read {
            let g = self.fetch_group(name).await?;
            return Ok(patch_keyvalue_slice(
                g.untyped_meta,
                PatchMode::Read,
                key,
                "",
            ));
        }

        let chain = match mode {
            PatchMode::Upsert => "UGM-UPSERT",
            PatchMode::ClearFuzzy => "UGM-CLEARFUZZY",
            PatchMode::ClearExact => "UGM-CLEAREXACT",
            PatchMode::Read => unreachable!(),
        };
        let mut dg = Group {
            name: name.to_string(),
            ..Default::default()
        };
        dg.untyped_meta = vec![format!("{key}:{value}")];
        let g = self.run_group_chain(chain, &dg).await?;
        Ok(g.untyped_meta)
    }

    /// Apply expansion directives (`INCLUDE:`/`EXCLUDE:`/`DROP:`) to a
    /// group. INCLUDE additions are cycle-checked before anything is
    /// written.
    pub async fn modify_group_expansions(&self, name: &str, directives: Vec<String>) -> Result<()> {
        let dg = Group {
            name: name.to_string(),
            expansions: directives,
            ..Default::default()
        };
        self.run_group_chain("MODIFY-EXPANSIONS", &dg).await?;
        info!(group = name, "Expansions updated");
        Ok(())
    }

    /// Every group in storage.
    pub async fn list_groups(&self) -> Result<Vec<Group>> {
        let names = self.refctx.db.discover_group_names().await?;
        let mut groups = Vec::with_capacity(names.len());
        for name in names {
            groups.push(self.refctx.db.load_group(&name).await?);
        }
        groups.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(groups)
    }
}

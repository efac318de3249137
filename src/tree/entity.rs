//! High-level entity operations
//!
//! Each operation builds a delta and dispatches the matching chain. The
//! chains own all validation, transformation, and persistence; nothing here
//! touches storage directly except the read-side listing helpers.

use tracing::info;

use super::util::{patch_keyvalue_slice, PatchMode};
use super::Manager;
use crate::db::Driver;
use crate::models::{Capability, Entity, EntityMeta};
use crate::types::{GatehouseError, Result};

impl Manager {
    /// Create a new entity. `number` may be -1 to request automatic
    /// allocation. The secret may be empty at creation and set later, but
    /// the entity is unusable until it is.
    pub async fn create_entity(&self, id: &str, number: i32, secret: &str) -> Result<()> {
        let de = Entity {
            id: id.to_string(),
            number,
            secret: Some(secret.to_string()),
            ..Default::default()
        };
        self.run_entity_chain("CREATE", &de).await?;
        info!(entity = id, "Entity created");
        Ok(())
    }

    /// Fetch an entity with secure fields stripped.
    pub async fn fetch_entity(&self, id: &str) -> Result<Entity> {
        let de = Entity {
            id: id.to_string(),
            ..Default::default()
        };
        let e = self.run_entity_chain("FETCH", &de).await?;
        Ok(e.safe_copy())
    }

    /// Hard-delete an entity. No tombstones.
    pub async fn destroy_entity(&self, id: &str) -> Result<()> {
        let de = Entity {
            id: id.to_string(),
            ..Default::default()
        };
        self.run_entity_chain("DESTROY", &de).await?;
        info!(entity = id, "Entity destroyed");
        Ok(())
    }

    /// Re-secure the entity's secret to a new value.
    pub async fn set_entity_secret(&self, id: &str, secret: &str) -> Result<()> {
        let de = Entity {
            id: id.to_string(),
            secret: Some(secret.to_string()),
            ..Default::default()
        };
        self.run_entity_chain("SET-SECRET", &de).await?;
        info!(entity = id, "Secret set");
        Ok(())
    }

    /// Validate an entity's identity by its plaintext secret.
    pub async fn validate_secret(&self, id: &str, secret: &str) -> Result<()> {
        let de = Entity {
            id: id.to_string(),
            secret: Some(secret.to_string()),
            ..Default::default()
        };
        match self.run_entity_chain("VALIDATE-IDENTITY", &de).await {
            Ok(_) => {
                info!(entity = id, "Authentication succeeded");
                Ok(())
            }
            Err(err) => {
                info!(entity = id, error = %err, "Authentication failed");
                Err(err)
            }
        }
    }

    /// Merge typed metadata fields. Capabilities, groups, keys, and the
    /// untyped stores are not reachable through this call.
    pub async fn update_entity_meta(&self, id: &str, meta: EntityMeta) -> Result<()> {
        let de = Entity {
            id: id.to_string(),
            meta,
            ..Default::default()
        };
        self.run_entity_chain("UPDATE", &de).await?;
        Ok(())
    }

    /// Read or edit the public key set. `mode` is "READ", "ADD", or "DEL";
    /// READ returns the keys held without mutating, the others return the
    /// keys held after the change.
    pub async fn update_entity_keys(&self, id: &str, mode: &str, key: &str) -> Result<Vec<String>> {
        let chain = match mode {
            "READ" => return Ok(self.fetch_entity(id).await?.meta.keys),
            "ADD" => "ADD-KEY",
            "DEL" => "DEL-KEY",
            _ => {
                return Err(GatehouseError::MalformedRequest(format!(
                    "bad key mode: {mode}"
                )))
            }
        };
        let mut de = Entity {
            id: id.to_string(),
            ..Default::default()
        };
        de.meta.keys = vec![key.to_string()];
        let e = self.run_entity_chain(chain, &de).await?;
        Ok(e.meta.keys)
    }

    /// Patch the untyped metadata store. READ returns without mutating;
    /// the other modes dispatch their chain and return the store after the
    /// change.
    pub async fn manage_untyped_entity_meta(
        &self,
        id: &str,
        mode: &str,
        key: &str,
        value: &str,
    ) -> Result<Vec<String>> {
        let mode = PatchMode::parse(mode).ok_or_else(|| {
            GatehouseError::MalformedRequest(format!("bad metadata mode: {mode}"))
        })?;

        if mode == PatchMode::Read {
            let e = self.fetch_entity(id).await?;
            return Ok(patch_keyvalue_slice(
                e.meta.untyped_meta,
                PatchMode::Read,
                key,
                "",
            ));
        }

        let chain = match mode {
            PatchMode::Upsert => "UEM-UPSERT",
            PatchMode::ClearFuzzy => "UEM-CLEARFUZZY",
            PatchMode::ClearExact => "UEM-CLEAREXACT",
            PatchMode::Read => unreachable!(),
        };
        let mut de = Entity {
            id: id.to_string(),
            ..Default::default()
        };
        de.meta.untyped_meta = vec![format!("{key}:{value}")];
        let e = self.run_entity_chain(chain, &de).await?;
        Ok(e.meta.untyped_meta)
    }

    /// Add a structured KV key with its ordered values. Fails if the key
    /// exists.
    pub async fn entity_kv_add(&self, id: &str, key: &str, values: Vec<String>) -> Result<()> {
        let mut de = Entity {
            id: id.to_string(),
            ..Default::default()
        };
        de.meta.kv.insert(key.to_string(), values);
        self.run_entity_chain("KV-ADD", &de).await?;
        Ok(())
    }

    /// Fetch the ordered values of one KV key.
    pub async fn entity_kv_get(&self, id: &str, key: &str) -> Result<Vec<String>> {
        let e = self.fetch_entity(id).await?;
        e.meta
            .kv
            .get(key)
            .cloned()
            .ok_or(GatehouseError::NoSuchKey)
    }

    /// Remove a structured KV key. Fails if the key is absent.
    pub async fn entity_kv_del(&self, id: &str, key: &str) -> Result<()> {
        let mut de = Entity {
            id: id.to_string(),
            ..Default::default()
        };
        de.meta.kv.insert(key.to_string(), Vec::new());
        self.run_entity_chain("KV-DEL", &de).await?;
        Ok(())
    }

    /// Replace the values of an existing KV key.
    pub async fn entity_kv_replace(&self, id: &str, key: &str, values: Vec<String>) -> Result<()> {
        let mut de = Entity {
            id: id.to_string(),
            ..Default::default()
        };
        de.meta.kv.insert(key.to_string(), values);
        self.run_entity_chain("KV-REPLACE", &de).await?;
        Ok(())
    }

    /// Add the entity to a group's direct membership.
    pub async fn add_entity_to_group(&self, id: &str, group: &str) -> Result<()> {
        // The group must exist before anyone can join it.
        self.refctx.db.load_group(group).await?;
        let mut de = Entity {
            id: id.to_string(),
            ..Default::default()
        };
        de.meta.groups = vec![group.to_string()];
        self.run_entity_chain("ADD-DIRECT-GROUP", &de).await?;
        Ok(())
    }

    /// Remove the entity from a group's direct membership.
    pub async fn remove_entity_from_group(&self, id: &str, group: &str) -> Result<()> {
        let mut de = Entity {
            id: id.to_string(),
            ..Default::default()
        };
        de.meta.groups = vec![group.to_string()];
        self.run_entity_chain("DEL-DIRECT-GROUP", &de).await?;
        Ok(())
    }

    /// Grant a capability directly to an entity. Idempotent.
    pub async fn set_entity_capability(&self, id: &str, cap: Capability) -> Result<()> {
        let mut de = Entity {
            id: id.to_string(),
            ..Default::default()
        };
        de.meta.capabilities = vec![cap];
        self.run_entity_chain("ADD-CAPABILITY", &de).await?;
        info!(entity = id, capability = %cap, "Capability granted");
        Ok(())
    }

    /// Remove a directly held capability.
    pub async fn drop_entity_capability(&self, id: &str, cap: Capability) -> Result<()> {
        let mut de = Entity {
            id: id.to_string(),
            ..Default::default()
        };
        de.meta.capabilities = vec![cap];
        self.run_entity_chain("DEL-CAPABILITY", &de).await?;
        info!(entity = id, capability = %cap, "Capability dropped");
        Ok(())
    }

    /// Lock the entity, preventing authentication.
    pub async fn lock_entity(&self, id: &str) -> Result<()> {
        let de = Entity {
            id: id.to_string(),
            ..Default::default()
        };
        self.run_entity_chain("LOCK", &de).await?;
        info!(entity = id, "Entity locked");
        Ok(())
    }

    /// Unlock the entity.
    pub async fn unlock_entity(&self, id: &str) -> Result<()> {
        let de = Entity {
            id: id.to_string(),
            ..Default::default()
        };
        self.run_entity_chain("UNLOCK", &de).await?;
        info!(entity = id, "Entity unlocked");
        Ok(())
    }

    /// IDs of every entity in storage.
    pub async fn list_entity_ids(&self) -> Result<Vec<String>> {
        self.refctx.db.discover_entity_ids().await
    }
}

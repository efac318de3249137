//! Merge typed metadata fields onto the working entity.

use async_trait::async_trait;
use std::sync::Arc;

use crate::models::Entity;
use crate::startup;
use crate::tree::{register_entity_hook_constructor, EntityHook};
use crate::types::Result;

/// SetEntityMeta merges the delta's scalar metadata fields into the working
/// entity. Capabilities, groups, keys, untyped metadata, and KV records
/// must not change through this hook; they have their own chains.
pub struct SetEntityMeta;

#[async_trait]
impl EntityHook for SetEntityMeta {
    fn name(&self) -> &'static str {
        "set-entity-meta"
    }

    fn priority(&self) -> i32 {
        50
    }

    async fn run(&self, e: &mut Entity, de: &Entity) -> Result<()> {
        let dm = &de.meta;
        if dm.gecos.is_some() {
            e.meta.gecos = dm.gecos.clone();
        }
        if dm.display_name.is_some() {
            e.meta.display_name = dm.display_name.clone();
        }
        if dm.legal_name.is_some() {
            e.meta.legal_name = dm.legal_name.clone();
        }
        if dm.home.is_some() {
            e.meta.home = dm.home.clone();
        }
        if dm.shell.is_some() {
            e.meta.shell = dm.shell.clone();
        }
        if dm.badge_number.is_some() {
            e.meta.badge_number = dm.badge_number.clone();
        }
        Ok(())
    }
}

pub(super) fn register_callbacks() {
    startup::register_callback(cb);
}

fn cb() {
    register_entity_hook_constructor("set-entity-meta", |_| Ok(Arc::new(SetEntityMeta)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Capability;

    #[tokio::test]
    async fn merges_scalars_only() {
        let hook = SetEntityMeta;
        let mut e = Entity::default();
        e.meta.shell = Some("/bin/sh".into());
        e.meta.capabilities = vec![Capability::GlobalRoot];
        e.meta.groups = vec!["ops".into()];

        let mut de = Entity::default();
        de.meta.gecos = Some("A Test Entity".into());
        de.meta.capabilities = vec![Capability::CreateEntity];
        de.meta.groups = vec!["intruders".into()];

        hook.run(&mut e, &de).await.unwrap();
        assert_eq!(e.meta.gecos.as_deref(), Some("A Test Entity"));
        // Unset delta fields leave existing values alone.
        assert_eq!(e.meta.shell.as_deref(), Some("/bin/sh"));
        // Privileged collections are untouched.
        assert_eq!(e.meta.capabilities, vec![Capability::GlobalRoot]);
        assert_eq!(e.meta.groups, vec!["ops".to_string()]);
    }
}

//! Untyped metadata management for entities
//!
//! A single configurable hook body registered three times, once per patch
//! mode.

use async_trait::async_trait;
use std::sync::Arc;

use crate::models::Entity;
use crate::startup;
use crate::tree::util::{patch_keyvalue_slice, split_key_value, PatchMode};
use crate::tree::{register_entity_hook_constructor, EntityHook};
use crate::types::Result;

/// ManageEntityUM applies each `"key:value"` pair in the delta's untyped
/// metadata to the working entity according to the configured mode.
/// UPSERT adds or updates fields, CLEARFUZZY ignores Z-index annotations,
/// CLEAREXACT requires exact key specifications.
pub struct ManageEntityUM {
    name: &'static str,
    mode: PatchMode,
}

#[async_trait]
impl EntityHook for ManageEntityUM {
    fn name(&self) -> &'static str {
        self.name
    }

    fn priority(&self) -> i32 {
        50
    }

    async fn run(&self, e: &mut Entity, de: &Entity) -> Result<()> {
        for entry in &de.meta.untyped_meta {
            let (key, value) = split_key_value(entry);
            e.meta.untyped_meta = patch_keyvalue_slice(
                std::mem::take(&mut e.meta.untyped_meta),
                self.mode,
                key,
                value,
            );
        }
        Ok(())
    }
}

pub(super) fn register_callbacks() {
    startup::register_callback(cb);
}

fn cb() {
    register_entity_hook_constructor("add-untyped-metadata", |_| {
        Ok(Arc::new(ManageEntityUM {
            name: "add-untyped-metadata",
            mode: PatchMode::Upsert,
        }))
    });
    register_entity_hook_constructor("del-untyped-metadata-fuzzy", |_| {
        Ok(Arc::new(ManageEntityUM {
            name: "del-untyped-metadata-fuzzy",
            mode: PatchMode::ClearFuzzy,
        }))
    });
    register_entity_hook_constructor("del-untyped-metadata-exact", |_| {
        Ok(Arc::new(ManageEntityUM {
            name: "del-untyped-metadata-exact",
            mode: PatchMode::ClearExact,
        }))
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn delta(entries: &[&str]) -> Entity {
        let mut de = Entity::default();
        de.meta.untyped_meta = entries.iter().map(|s| s.to_string()).collect();
        de
    }

    #[tokio::test]
    async fn upsert_then_clearfuzzy() {
        let upsert = ManageEntityUM {
            name: "add-untyped-metadata",
            mode: PatchMode::Upsert,
        };
        let clear = ManageEntityUM {
            name: "del-untyped-metadata-fuzzy",
            mode: PatchMode::ClearFuzzy,
        };

        let mut e = Entity::default();
        upsert.run(&mut e, &delta(&["color:red"])).await.unwrap();
        assert_eq!(e.meta.untyped_meta, vec!["color:red"]);

        upsert.run(&mut e, &delta(&["color:blue"])).await.unwrap();
        assert_eq!(e.meta.untyped_meta, vec!["color:red", "color{0}:blue"]);

        clear.run(&mut e, &delta(&["color:"])).await.unwrap();
        assert!(e.meta.untyped_meta.is_empty());
    }

    #[tokio::test]
    async fn clearexact_leaves_siblings() {
        let upsert = ManageEntityUM {
            name: "add-untyped-metadata",
            mode: PatchMode::Upsert,
        };
        let clear = ManageEntityUM {
            name: "del-untyped-metadata-exact",
            mode: PatchMode::ClearExact,
        };

        let mut e = Entity::default();
        upsert
            .run(&mut e, &delta(&["color:red", "color:blue"]))
            .await
            .unwrap();
        clear.run(&mut e, &delta(&["color{0}:"])).await.unwrap();
        assert_eq!(e.meta.untyped_meta, vec!["color:red"]);
    }
}

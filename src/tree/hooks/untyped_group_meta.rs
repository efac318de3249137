//! Untyped metadata management for groups
//!
//! Same patch semantics as the entity side, registered into the group hook
//! registry under the same names.

use async_trait::async_trait;
use std::sync::Arc;

use crate::models::Group;
use crate::startup;
use crate::tree::util::{patch_keyvalue_slice, split_key_value, PatchMode};
use crate::tree::{register_group_hook_constructor, GroupHook};
use crate::types::Result;

pub struct ManageGroupUM {
    name: &'static str,
    mode: PatchMode,
}

#[async_trait]
impl GroupHook for ManageGroupUM {
    fn name(&self) -> &'static str {
        self.name
    }

    fn priority(&self) -> i32 {
        50
    }

    async fn run(&self, g: &mut Group, dg: &Group) -> Result<()> {
        for entry in &dg.untyped_meta {
            let (key, value) = split_key_value(entry);
            g.untyped_meta = patch_keyvalue_slice(
                std::mem::take(&mut g.untyped_meta),
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
    register_group_hook_constructor("add-untyped-metadata", |_| {
        Ok(Arc::new(ManageGroupUM {
            name: "add-untyped-metadata",
            mode: PatchMode::Upsert,
        }))
    });
    register_group_hook_constructor("del-untyped-metadata-fuzzy", |_| {
        Ok(Arc::new(ManageGroupUM {
            name: "del-untyped-metadata-fuzzy",
            mode: PatchMode::ClearFuzzy,
        }))
    });
    register_group_hook_constructor("del-untyped-metadata-exact", |_| {
        Ok(Arc::new(ManageGroupUM {
            name: "del-untyped-metadata-exact",
            mode: PatchMode::ClearExact,
        }))
    });
}

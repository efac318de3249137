//! Remove a group from the system.

use async_trait::async_trait;
use std::sync::Arc;

use crate::db::Driver;
use crate::models::Group;
use crate::startup;
use crate::tree::{register_group_hook_constructor, GroupHook, RefContext};
use crate::types::Result;

/// DestroyGroup asks the datastore to remove the group, falling back to the
/// delta's name if the working record carries none.
pub struct DestroyGroup {
    db: Arc<dyn Driver>,
}

#[async_trait]
impl GroupHook for DestroyGroup {
    fn name(&self) -> &'static str {
        "destroy-group"
    }

    fn priority(&self) -> i32 {
        99
    }

    async fn run(&self, g: &mut Group, dg: &Group) -> Result<()> {
        if g.name.is_empty() {
            g.name = dg.name.clone();
        }
        self.db.delete_group(&g.name).await
    }
}

pub(super) fn register_callbacks() {
    startup::register_callback(cb);
}

fn cb() {
    register_group_hook_constructor("destroy-group", new_destroy_group);
}

fn new_destroy_group(c: &RefContext) -> Result<Arc<dyn GroupHook>> {
    Ok(Arc::new(DestroyGroup { db: c.db.clone() }))
}

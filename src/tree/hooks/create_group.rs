//! Terminate the group CREATE chain with an atomic insert.

use async_trait::async_trait;
use std::sync::Arc;

use crate::db::Driver;
use crate::models::Group;
use crate::startup;
use crate::tree::{register_group_hook_constructor, GroupHook, RefContext};
use crate::types::Result;

/// CreateGroup persists a brand-new group through the driver's atomic
/// create path; see `create-entity` for the race semantics.
pub struct CreateGroup {
    db: Arc<dyn Driver>,
}

#[async_trait]
impl GroupHook for CreateGroup {
    fn name(&self) -> &'static str {
        "create-group"
    }

    fn priority(&self) -> i32 {
        99
    }

    async fn run(&self, g: &mut Group, _dg: &Group) -> Result<()> {
        self.db.create_group(g).await
    }
}

pub(super) fn register_callbacks() {
    startup::register_callback(cb);
}

fn cb() {
    register_group_hook_constructor("create-group", new_create_group);
}

fn new_create_group(c: &RefContext) -> Result<Arc<dyn GroupHook>> {
    Ok(Arc::new(CreateGroup { db: c.db.clone() }))
}

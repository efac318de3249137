//! Terminate a chain by persisting the working group.

use async_trait::async_trait;
use std::sync::Arc;

use crate::db::Driver;
use crate::models::Group;
use crate::startup;
use crate::tree::{register_group_hook_constructor, GroupHook, RefContext};
use crate::types::Result;

/// SaveGroup hands the working group to the datastore.
pub struct SaveGroup {
    db: Arc<dyn Driver>,
}

#[async_trait]
impl GroupHook for SaveGroup {
    fn name(&self) -> &'static str {
        "save-group"
    }

    fn priority(&self) -> i32 {
        99
    }

    async fn run(&self, g: &mut Group, _dg: &Group) -> Result<()> {
        self.db.save_group(g).await
    }
}

pub(super) fn register_callbacks() {
    startup::register_callback(cb);
}

fn cb() {
    register_group_hook_constructor("save-group", new_save_group);
}

fn new_save_group(c: &RefContext) -> Result<Arc<dyn GroupHook>> {
    Ok(Arc::new(SaveGroup { db: c.db.clone() }))
}

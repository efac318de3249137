//! Assign the group number, statically or from the allocator.

use async_trait::async_trait;
use std::sync::Arc;

use crate::db::Driver;
use crate::models::Group;
use crate::startup;
use crate::tree::{register_group_hook_constructor, GroupHook, RefContext};
use crate::types::Result;

/// SetGroupNumber mirrors set-entity-number: -1 requests the next number
/// from storage, anything else is applied directly.
pub struct SetGroupNumber {
    db: Arc<dyn Driver>,
}

#[async_trait]
impl GroupHook for SetGroupNumber {
    fn name(&self) -> &'static str {
        "set-group-number"
    }

    fn priority(&self) -> i32 {
        50
    }

    async fn run(&self, g: &mut Group, dg: &Group) -> Result<()> {
        if dg.number == -1 {
            g.number = self.db.next_group_number().await?;
            return Ok(());
        }
        g.number = dg.number;
        Ok(())
    }
}

pub(super) fn register_callbacks() {
    startup::register_callback(cb);
}

fn cb() {
    register_group_hook_constructor("set-group-number", new_set_group_number);
}

fn new_set_group_number(c: &RefContext) -> Result<Arc<dyn GroupHook>> {
    Ok(Arc::new(SetGroupNumber { db: c.db.clone() }))
}

//! Refuse creation when the requested group identity is already taken.

use async_trait::async_trait;
use std::sync::Arc;

use crate::db::Driver;
use crate::models::Group;
use crate::startup;
use crate::tree::{register_group_hook_constructor, GroupHook, RefContext};
use crate::types::{GatehouseError, Result};

pub struct FailOnExistingGroup {
    db: Arc<dyn Driver>,
}

#[async_trait]
impl GroupHook for FailOnExistingGroup {
    fn name(&self) -> &'static str {
        "fail-on-existing-group"
    }

    fn priority(&self) -> i32 {
        0
    }

    async fn run(&self, _g: &mut Group, dg: &Group) -> Result<()> {
        match self.db.load_group(&dg.name).await {
            Ok(_) => return Err(GatehouseError::DuplicateGroupName),
            Err(GatehouseError::UnknownGroup) => {}
            Err(err) => return Err(err),
        }

        if dg.number != -1 {
            match self.db.load_group_by_number(dg.number).await {
                Ok(_) => return Err(GatehouseError::DuplicateNumber),
                Err(GatehouseError::UnknownGroup) => {}
                Err(err) => return Err(err),
            }
        }

        Ok(())
    }
}

pub(super) fn register_callbacks() {
    startup::register_callback(cb);
}

fn cb() {
    register_group_hook_constructor("fail-on-existing-group", new_fail_on_existing);
}

fn new_fail_on_existing(c: &RefContext) -> Result<Arc<dyn GroupHook>> {
    Ok(Arc::new(FailOnExistingGroup { db: c.db.clone() }))
}

//! Direct group membership edits

use async_trait::async_trait;
use std::sync::Arc;

use crate::models::Entity;
use crate::startup;
use crate::tree::util::{dedup_union, subtract};
use crate::tree::{register_entity_hook_constructor, EntityHook};
use crate::types::Result;

/// AddDirectGroup unions the delta's groups into the working entity's
/// direct membership, deduplicating along the way.
pub struct AddDirectGroup;

#[async_trait]
impl EntityHook for AddDirectGroup {
    fn name(&self) -> &'static str {
        "add-direct-group"
    }

    fn priority(&self) -> i32 {
        50
    }

    async fn run(&self, e: &mut Entity, de: &Entity) -> Result<()> {
        e.meta.groups = dedup_union(&e.meta.groups, &de.meta.groups);
        Ok(())
    }
}

/// DelDirectGroup removes the delta's groups from the direct membership.
pub struct DelDirectGroup;

#[async_trait]
impl EntityHook for DelDirectGroup {
    fn name(&self) -> &'static str {
        "del-direct-group"
    }

    fn priority(&self) -> i32 {
        50
    }

    async fn run(&self, e: &mut Entity, de: &Entity) -> Result<()> {
        e.meta.groups = subtract(&e.meta.groups, &de.meta.groups);
        Ok(())
    }
}

pub(super) fn register_callbacks() {
    startup::register_callback(cb);
}

fn cb() {
    register_entity_hook_constructor("add-direct-group", |_| Ok(Arc::new(AddDirectGroup)));
    register_entity_hook_constructor("del-direct-group", |_| Ok(Arc::new(DelDirectGroup)));
}

//! Assign the entity number, statically or from the allocator.

use async_trait::async_trait;
use std::sync::Arc;

use crate::db::Driver;
use crate::models::Entity;
use crate::startup;
use crate::tree::{register_entity_hook_constructor, EntityHook, RefContext};
use crate::types::Result;

/// SetEntityNumber provisions a number one of two ways. A delta number
/// other than -1 is applied directly. -1 asks the data storage system for
/// the next available number; those numbers are only guaranteed unique,
/// not ordered or contiguous.
pub struct SetEntityNumber {
    db: Arc<dyn Driver>,
}

#[async_trait]
impl EntityHook for SetEntityNumber {
    fn name(&self) -> &'static str {
        "set-entity-number"
    }

    fn priority(&self) -> i32 {
        50
    }

    async fn run(&self, e: &mut Entity, de: &Entity) -> Result<()> {
        if de.number == -1 {
            e.number = self.db.next_entity_number().await?;
            return Ok(());
        }
        e.number = de.number;
        Ok(())
    }
}

pub(super) fn register_callbacks() {
    startup::register_callback(cb);
}

fn cb() {
    register_entity_hook_constructor("set-entity-number", new_set_entity_number);
}

fn new_set_entity_number(c: &RefContext) -> Result<Arc<dyn EntityHook>> {
    Ok(Arc::new(SetEntityNumber { db: c.db.clone() }))
}

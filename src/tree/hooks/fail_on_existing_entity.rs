//! Refuse creation when the requested identity is already taken.

use async_trait::async_trait;
use std::sync::Arc;

use crate::db::Driver;
use crate::models::Entity;
use crate::startup;
use crate::tree::{register_entity_hook_constructor, EntityHook, RefContext};
use crate::types::{GatehouseError, Result};

/// FailOnExistingEntity guards the CREATE chain: the requested ID must be
/// free, and a statically requested number must be unassigned.
pub struct FailOnExistingEntity {
    db: Arc<dyn Driver>,
}

#[async_trait]
impl EntityHook for FailOnExistingEntity {
    fn name(&self) -> &'static str {
        "fail-on-existing-entity"
    }

    fn priority(&self) -> i32 {
        0
    }

    async fn run(&self, _e: &mut Entity, de: &Entity) -> Result<()> {
        match self.db.load_entity(&de.id).await {
            Ok(_) => return Err(GatehouseError::DuplicateEntityID),
            Err(GatehouseError::UnknownEntity) => {}
            Err(err) => return Err(err),
        }

        if de.number != -1 {
            match self.db.load_entity_by_number(de.number).await {
                Ok(_) => return Err(GatehouseError::DuplicateNumber),
                Err(GatehouseError::UnknownEntity) => {}
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
    register_entity_hook_constructor("fail-on-existing-entity", new_fail_on_existing);
}

fn new_fail_on_existing(c: &RefContext) -> Result<Arc<dyn EntityHook>> {
    Ok(Arc::new(FailOnExistingEntity { db: c.db.clone() }))
}

//! Copy the requested ID onto the working entity.

use async_trait::async_trait;
use std::sync::Arc;

use crate::models::Entity;
use crate::startup;
use crate::tree::{register_entity_hook_constructor, EntityHook, RefContext};
use crate::types::{GatehouseError, Result};

pub struct SetEntityID;

#[async_trait]
impl EntityHook for SetEntityID {
    fn name(&self) -> &'static str {
        "set-entity-id"
    }

    fn priority(&self) -> i32 {
        10
    }

    async fn run(&self, e: &mut Entity, de: &Entity) -> Result<()> {
        if de.id.is_empty() {
            return Err(GatehouseError::MalformedRequest(
                "entity ID is required".into(),
            ));
        }
        e.id = de.id.clone();
        Ok(())
    }
}

pub(super) fn register_callbacks() {
    startup::register_callback(cb);
}

fn cb() {
    register_entity_hook_constructor("set-entity-id", new_set_entity_id);
}

fn new_set_entity_id(_c: &RefContext) -> Result<Arc<dyn EntityHook>> {
    Ok(Arc::new(SetEntityID))
}

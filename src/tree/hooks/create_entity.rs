//! Terminate the CREATE chain with an atomic insert.

use async_trait::async_trait;
use std::sync::Arc;

use crate::db::Driver;
use crate::models::Entity;
use crate::startup;
use crate::tree::{register_entity_hook_constructor, EntityHook, RefContext};
use crate::types::Result;

/// CreateEntity persists a brand-new entity through the driver's atomic
/// create path. Two racing creates for the same ID resolve to one winner
/// and one `ErrDuplicateEntityID` instead of a silent overwrite; a taken
/// number surfaces as `ErrDuplicateNumber`.
pub struct CreateEntity {
    db: Arc<dyn Driver>,
}

#[async_trait]
impl EntityHook for CreateEntity {
    fn name(&self) -> &'static str {
        "create-entity"
    }

    fn priority(&self) -> i32 {
        99
    }

    async fn run(&self, e: &mut Entity, _de: &Entity) -> Result<()> {
        self.db.create_entity(e).await
    }
}

pub(super) fn register_callbacks() {
    startup::register_callback(cb);
}

fn cb() {
    register_entity_hook_constructor("create-entity", new_create_entity);
}

fn new_create_entity(c: &RefContext) -> Result<Arc<dyn EntityHook>> {
    Ok(Arc::new(CreateEntity { db: c.db.clone() }))
}

//! Remove an entity from the system.

use async_trait::async_trait;
use std::sync::Arc;

use crate::db::Driver;
use crate::models::Entity;
use crate::startup;
use crate::tree::{register_entity_hook_constructor, EntityHook, RefContext};
use crate::types::Result;

/// DestroyEntity asks the datastore to remove the entity. It may run after
/// a processing pipeline or on its own, so if the working record carries no
/// ID the delta's ID is used instead.
pub struct DestroyEntity {
    db: Arc<dyn Driver>,
}

#[async_trait]
impl EntityHook for DestroyEntity {
    fn name(&self) -> &'static str {
        "destroy-entity"
    }

    fn priority(&self) -> i32 {
        99
    }

    async fn run(&self, e: &mut Entity, de: &Entity) -> Result<()> {
        if e.id.is_empty() {
            e.id = de.id.clone();
        }
        self.db.delete_entity(&e.id).await
    }
}

pub(super) fn register_callbacks() {
    startup::register_callback(cb);
}

fn cb() {
    register_entity_hook_constructor("destroy-entity", new_destroy_entity);
}

fn new_destroy_entity(c: &RefContext) -> Result<Arc<dyn EntityHook>> {
    Ok(Arc::new(DestroyEntity { db: c.db.clone() }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::NoCrypto;
    use crate::db::MemoryDriver;
    use crate::types::GatehouseError;

    fn hook() -> (Arc<MemoryDriver>, Arc<dyn EntityHook>) {
        let db = Arc::new(MemoryDriver::new());
        let ctx = RefContext {
            db: db.clone(),
            crypto: Arc::new(NoCrypto::new()),
        };
        (db, new_destroy_entity(&ctx).unwrap())
    }

    #[tokio::test]
    async fn falls_back_to_delta_id() {
        let (db, hook) = hook();
        db.save_entity(&Entity {
            id: "probe".into(),
            number: 1,
            ..Default::default()
        })
        .await
        .unwrap();

        let mut e = Entity::default();
        let de = Entity {
            id: "probe".into(),
            ..Default::default()
        };
        hook.run(&mut e, &de).await.unwrap();
        assert_eq!(
            db.load_entity("probe").await.err(),
            Some(GatehouseError::UnknownEntity)
        );
    }
}

//! Load an entity from storage into the working record.

use async_trait::async_trait;
use std::sync::Arc;

use crate::db::Driver;
use crate::models::Entity;
use crate::startup;
use crate::tree::{register_entity_hook_constructor, EntityHook, RefContext};
use crate::types::Result;

/// LoadEntity reads the entity named by the delta into the working record.
/// Any errors returned are from the storage layer.
pub struct LoadEntity {
    db: Arc<dyn Driver>,
}

#[async_trait]
impl EntityHook for LoadEntity {
    fn name(&self) -> &'static str {
        "load-entity"
    }

    fn priority(&self) -> i32 {
        0
    }

    async fn run(&self, e: &mut Entity, de: &Entity) -> Result<()> {
        *e = self.db.load_entity(&de.id).await?;
        Ok(())
    }
}

pub(super) fn register_callbacks() {
    startup::register_callback(cb);
}

fn cb() {
    register_entity_hook_constructor("load-entity", new_load_entity);
}

fn new_load_entity(c: &RefContext) -> Result<Arc<dyn EntityHook>> {
    Ok(Arc::new(LoadEntity { db: c.db.clone() }))
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
        (db, new_load_entity(&ctx).unwrap())
    }

    #[tokio::test]
    async fn loads_by_delta_id() {
        let (db, hook) = hook();
        db.save_entity(&Entity {
            id: "probe".into(),
            number: 3,
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
        assert_eq!(e.id, "probe");
        assert_eq!(e.number, 3);
    }

    #[tokio::test]
    async fn missing_entity_propagates() {
        let (_db, hook) = hook();
        let mut e = Entity::default();
        let de = Entity {
            id: "nope".into(),
            ..Default::default()
        };
        assert_eq!(
            hook.run(&mut e, &de).await.err(),
            Some(GatehouseError::UnknownEntity)
        );
    }
}

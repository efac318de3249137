//! Terminate a chain by persisting the working entity.

use async_trait::async_trait;
use std::sync::Arc;

use crate::db::Driver;
use crate::models::Entity;
use crate::startup;
use crate::tree::{register_entity_hook_constructor, EntityHook, RefContext};
use crate::types::Result;

/// SaveEntity hands the working entity to the datastore. By convention it
/// runs at priority 99 so every transformation has already happened.
pub struct SaveEntity {
    db: Arc<dyn Driver>,
}

#[async_trait]
impl EntityHook for SaveEntity {
    fn name(&self) -> &'static str {
        "save-entity"
    }

    fn priority(&self) -> i32 {
        99
    }

    async fn run(&self, e: &mut Entity, _de: &Entity) -> Result<()> {
        self.db.save_entity(e).await
    }
}

pub(super) fn register_callbacks() {
    startup::register_callback(cb);
}

fn cb() {
    register_entity_hook_constructor("save-entity", new_save_entity);
}

fn new_save_entity(c: &RefContext) -> Result<Arc<dyn EntityHook>> {
    Ok(Arc::new(SaveEntity { db: c.db.clone() }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::NoCrypto;
    use crate::db::MemoryDriver;

    #[tokio::test]
    async fn persists_working_record() {
        let db = Arc::new(MemoryDriver::new());
        let ctx = RefContext {
            db: db.clone(),
            crypto: Arc::new(NoCrypto::new()),
        };
        let hook = new_save_entity(&ctx).unwrap();

        let mut e = Entity {
            id: "probe".into(),
            number: 9,
            ..Default::default()
        };
        hook.run(&mut e, &Entity::default()).await.unwrap();
        assert_eq!(db.load_entity("probe").await.unwrap().number, 9);
    }
}

//! Lock and unlock entities
//!
//! A locked entity cannot authenticate; see `validate-entity-unlocked`.

use async_trait::async_trait;
use std::sync::Arc;

use crate::models::Entity;
use crate::startup;
use crate::tree::{register_entity_hook_constructor, EntityHook};
use crate::types::Result;

/// ManageEntityLock sets or clears the lock flag depending on how it was
/// constructed.
pub struct ManageEntityLock {
    name: &'static str,
    locked: bool,
}

#[async_trait]
impl EntityHook for ManageEntityLock {
    fn name(&self) -> &'static str {
        self.name
    }

    fn priority(&self) -> i32 {
        50
    }

    async fn run(&self, e: &mut Entity, _de: &Entity) -> Result<()> {
        e.meta.locked = self.locked;
        Ok(())
    }
}

pub(super) fn register_callbacks() {
    startup::register_callback(cb);
}

fn cb() {
    register_entity_hook_constructor("lock-entity", |_| {
        Ok(Arc::new(ManageEntityLock {
            name: "lock-entity",
            locked: true,
        }))
    });
    register_entity_hook_constructor("unlock-entity", |_| {
        Ok(Arc::new(ManageEntityLock {
            name: "unlock-entity",
            locked: false,
        }))
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn lock_then_unlock() {
        let lock = ManageEntityLock {
            name: "lock-entity",
            locked: true,
        };
        let unlock = ManageEntityLock {
            name: "unlock-entity",
            locked: false,
        };

        let mut e = Entity::default();
        lock.run(&mut e, &Entity::default()).await.unwrap();
        assert!(e.meta.locked);

        unlock.run(&mut e, &Entity::default()).await.unwrap();
        assert!(!e.meta.locked);
    }
}

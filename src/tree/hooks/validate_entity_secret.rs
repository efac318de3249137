//! Identity validation hooks
//!
//! `validate-entity-unlocked` runs before the secret check so a locked
//! entity fails authentication without the crypto engine ever being
//! consulted.

use async_trait::async_trait;
use std::sync::Arc;

use crate::crypto::SecretCrypto;
use crate::models::Entity;
use crate::startup;
use crate::tree::{register_entity_hook_constructor, EntityHook, RefContext};
use crate::types::{GatehouseError, Result};

/// ValidateEntityUnlocked fails the chain when the loaded entity is locked.
pub struct ValidateEntityUnlocked;

#[async_trait]
impl EntityHook for ValidateEntityUnlocked {
    fn name(&self) -> &'static str {
        "validate-entity-unlocked"
    }

    fn priority(&self) -> i32 {
        40
    }

    async fn run(&self, e: &mut Entity, _de: &Entity) -> Result<()> {
        if e.meta.locked {
            return Err(GatehouseError::BadAuth);
        }
        Ok(())
    }
}

/// ValidateEntitySecret compares the delta's plaintext against the secured
/// secret on the working entity.
pub struct ValidateEntitySecret {
    crypto: Arc<dyn SecretCrypto>,
}

#[async_trait]
impl EntityHook for ValidateEntitySecret {
    fn name(&self) -> &'static str {
        "validate-identity"
    }

    fn priority(&self) -> i32 {
        50
    }

    async fn run(&self, e: &mut Entity, de: &Entity) -> Result<()> {
        let secured = e.secret.as_deref().ok_or(GatehouseError::BadAuth)?;
        let plain = de.secret.as_deref().unwrap_or_default();
        self.crypto.verify_secret(plain, secured)
    }
}

pub(super) fn register_callbacks() {
    startup::register_callback(cb);
}

fn cb() {
    register_entity_hook_constructor("validate-entity-unlocked", |_| {
        Ok(Arc::new(ValidateEntityUnlocked))
    });
    register_entity_hook_constructor("validate-identity", new_validate_entity_secret);
}

fn new_validate_entity_secret(c: &RefContext) -> Result<Arc<dyn EntityHook>> {
    Ok(Arc::new(ValidateEntitySecret {
        crypto: c.crypto.clone(),
    }))
}

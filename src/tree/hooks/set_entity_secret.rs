//! Secure the plaintext secret for storage.

use async_trait::async_trait;
use std::sync::Arc;

use crate::crypto::SecretCrypto;
use crate::models::Entity;
use crate::startup;
use crate::tree::{register_entity_hook_constructor, EntityHook, RefContext};
use crate::types::Result;

/// SetEntitySecret takes the plaintext secret from the delta and writes the
/// secured form onto the working entity. The plaintext never reaches
/// storage.
pub struct SetEntitySecret {
    crypto: Arc<dyn SecretCrypto>,
}

#[async_trait]
impl EntityHook for SetEntitySecret {
    fn name(&self) -> &'static str {
        "set-entity-secret"
    }

    fn priority(&self) -> i32 {
        50
    }

    async fn run(&self, e: &mut Entity, de: &Entity) -> Result<()> {
        let plain = de.secret.as_deref().unwrap_or_default();
        let secured = self.crypto.secure_secret(plain)?;
        e.secret = Some(secured);
        Ok(())
    }
}

pub(super) fn register_callbacks() {
    startup::register_callback(cb);
}

fn cb() {
    register_entity_hook_constructor("set-entity-secret", new_set_entity_secret);
}

fn new_set_entity_secret(c: &RefContext) -> Result<Arc<dyn EntityHook>> {
    Ok(Arc::new(SetEntitySecret {
        crypto: c.crypto.clone(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::ArgonEngine;
    use crate::db::MemoryDriver;

    #[tokio::test]
    async fn secret_is_secured_before_storage() {
        let crypto: Arc<dyn SecretCrypto> = Arc::new(ArgonEngine::new());
        let ctx = RefContext {
            db: Arc::new(MemoryDriver::new()),
            crypto: crypto.clone(),
        };
        let hook = new_set_entity_secret(&ctx).unwrap();

        let mut e = Entity::default();
        let de = Entity {
            secret: Some("hunter2".into()),
            ..Default::default()
        };
        hook.run(&mut e, &de).await.unwrap();

        let stored = e.secret.unwrap();
        assert_ne!(stored, "hunter2");
        assert!(crypto.verify_secret("hunter2", &stored).is_ok());
    }
}

//! Secret hashing engines
//!
//! The tree only ever sees the secured form of a secret. Engines are
//! registered by name so deployments can select one with `CRYPTO_BACKEND`;
//! the default is argon2id.

mod argon;
mod nocrypto;

pub use argon::ArgonEngine;
pub use nocrypto::NoCrypto;

use std::collections::HashMap;
use std::sync::{Arc, LazyLock, RwLock};

use crate::types::{GatehouseError, Result};

/// One-way secret hashing and constant-time verification.
pub trait SecretCrypto: Send + Sync {
    /// Transform a plaintext secret into its secured storage form.
    fn secure_secret(&self, plain: &str) -> Result<String>;

    /// Verify a plaintext secret against a secured form. Mismatch returns
    /// `GatehouseError::BadAuth`.
    fn verify_secret(&self, plain: &str, secured: &str) -> Result<()>;
}

/// Constructor signature for crypto engines.
pub type Factory = fn() -> Result<Arc<dyn SecretCrypto>>;

static ENGINES: LazyLock<RwLock<HashMap<&'static str, Factory>>> =
    LazyLock::new(|| RwLock::new(HashMap::new()));

/// Register an engine factory under a name. First registration wins.
pub fn register(name: &'static str, factory: Factory) {
    let mut engines = ENGINES.write().expect("crypto registry lock poisoned");
    engines.entry(name).or_insert(factory);
}

/// Construct the named engine.
pub fn new(name: &str) -> Result<Arc<dyn SecretCrypto>> {
    let factory = {
        let engines = ENGINES.read().expect("crypto registry lock poisoned");
        engines.get(name).copied()
    };
    match factory {
        Some(f) => f(),
        None => Err(GatehouseError::Config(format!(
            "unknown crypto engine: {}",
            name
        ))),
    }
}

/// Register the built-in engines.
pub fn register_default_engines() {
    register("argon2", || Ok(Arc::new(ArgonEngine::new())));
    register("nocrypto", || Ok(Arc::new(NoCrypto::new())));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_resolves_builtins() {
        register_default_engines();
        assert!(new("argon2").is_ok());
        assert!(new("nocrypto").is_ok());
        assert!(matches!(
            new("rot13"),
            Err(GatehouseError::Config(_))
        ));
    }
}

//! Bearer token services
//!
//! Tokens carry the identity and the capability set that was in effect at
//! mint time; revocation is implicit on expiry. Backends are registered by
//! name and selected with `TOKEN_BACKEND`.

pub mod cache;
pub mod jwt;

pub use cache::{MemoryTokenCache, TokenCache};
pub use jwt::JwtService;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, LazyLock, RwLock};

use crate::models::Capability;
use crate::types::{GatehouseError, Result};

/// Claims embedded in a signed token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Entity the token was minted for.
    pub entity_id: String,

    /// Effective capabilities at mint time.
    #[serde(default)]
    pub capabilities: Vec<Capability>,

    /// Issued at (Unix timestamp)
    pub iat: u64,

    /// Expiration time (Unix timestamp)
    pub exp: u64,
}

impl Claims {
    /// Whether the claim set grants `cap`, either directly or through
    /// `GLOBAL_ROOT`.
    pub fn has_capability(&self, cap: Capability) -> bool {
        self.capabilities.contains(&cap) || self.capabilities.contains(&Capability::GlobalRoot)
    }
}

/// Settings handed to token backend factories.
#[derive(Debug, Clone)]
pub struct TokenConfig {
    pub secret: String,
    pub lifetime_secs: u64,
}

/// Mint and verify signed bearer tokens.
pub trait TokenService: Send + Sync {
    fn generate(&self, entity_id: &str, capabilities: Vec<Capability>) -> Result<(String, Claims)>;
    fn validate(&self, token: &str) -> Result<Claims>;
}

/// Constructor signature for token backends.
pub type Factory = fn(&TokenConfig) -> Result<Arc<dyn TokenService>>;

static BACKENDS: LazyLock<RwLock<HashMap<&'static str, Factory>>> =
    LazyLock::new(|| RwLock::new(HashMap::new()));

/// Register a backend factory under a name. First registration wins.
pub fn register(name: &'static str, factory: Factory) {
    let mut backends = BACKENDS.write().expect("token registry lock poisoned");
    backends.entry(name).or_insert(factory);
}

/// Construct the named backend.
pub fn new(name: &str, config: &TokenConfig) -> Result<Arc<dyn TokenService>> {
    let factory = {
        let backends = BACKENDS.read().expect("token registry lock poisoned");
        backends.get(name).copied()
    };
    match factory {
        Some(f) => f(config),
        None => Err(GatehouseError::Config(format!(
            "unknown token backend: {}",
            name
        ))),
    }
}

/// Register the built-in backends.
pub fn register_default_backends() {
    register("jwt-hs256", |cfg| Ok(Arc::new(JwtService::new(cfg)?)));
}

/// Construct the named claim cache. Only an in-memory cache ships today.
pub fn new_cache(name: &str) -> Result<Arc<dyn TokenCache>> {
    match name {
        "memory" => Ok(Arc::new(MemoryTokenCache::new())),
        _ => Err(GatehouseError::Config(format!(
            "unknown token cache: {}",
            name
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn claims_capability_check() {
        let claims = Claims {
            entity_id: "probe".into(),
            capabilities: vec![Capability::CreateEntity],
            iat: 0,
            exp: 0,
        };
        assert!(claims.has_capability(Capability::CreateEntity));
        assert!(!claims.has_capability(Capability::CreateGroup));

        let root = Claims {
            entity_id: "admin".into(),
            capabilities: vec![Capability::GlobalRoot],
            iat: 0,
            exp: 0,
        };
        assert!(root.has_capability(Capability::CreateGroup));
        assert!(root.has_capability(Capability::DestroyEntity));
    }

    #[test]
    fn registry_resolves_jwt() {
        register_default_backends();
        let cfg = TokenConfig {
            secret: "test-secret-that-is-at-least-32-characters".into(),
            lifetime_secs: 3600,
        };
        assert!(new("jwt-hs256", &cfg).is_ok());
        assert!(matches!(
            new("paseto", &cfg),
            Err(GatehouseError::Config(_))
        ));
    }
}

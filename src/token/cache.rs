//! Validated-claim cache
//!
//! Signature verification is cheap but not free, and busy automation clients
//! replay the same bearer token for its whole lifetime. The facade consults
//! this cache before re-validating. Entries carry their own expiry so a
//! cached claim can never outlive its token.

use dashmap::DashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use super::Claims;

/// Cache of already-validated claims, keyed by the raw token string.
pub trait TokenCache: Send + Sync {
    fn get(&self, token: &str) -> Option<Claims>;
    fn put(&self, token: &str, claims: Claims);
}

/// In-memory cache with lazy expiry.
pub struct MemoryTokenCache {
    entries: DashMap<String, Claims>,
}

impl MemoryTokenCache {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    fn now() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }
}

impl Default for MemoryTokenCache {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenCache for MemoryTokenCache {
    fn get(&self, token: &str) -> Option<Claims> {
        let claims = self.entries.get(token)?.clone();
        if claims.exp <= Self::now() {
            self.entries.remove(token);
            return None;
        }
        Some(claims)
    }

    fn put(&self, token: &str, claims: Claims) {
        self.entries.insert(token.to_string(), claims);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims_expiring_at(exp: u64) -> Claims {
        Claims {
            entity_id: "probe".into(),
            capabilities: vec![],
            iat: 0,
            exp,
        }
    }

    #[test]
    fn live_entry_round_trips() {
        let cache = MemoryTokenCache::new();
        let claims = claims_expiring_at(MemoryTokenCache::now() + 600);
        cache.put("tok", claims.clone());
        assert_eq!(cache.get("tok"), Some(claims));
    }

    #[test]
    fn expired_entry_evicted_on_read() {
        let cache = MemoryTokenCache::new();
        cache.put("tok", claims_expiring_at(1));
        assert_eq!(cache.get("tok"), None);
        assert!(cache.entries.is_empty());
    }

    #[test]
    fn miss_on_unknown_token() {
        let cache = MemoryTokenCache::new();
        assert_eq!(cache.get("absent"), None);
    }
}

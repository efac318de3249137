//! Plaintext pass-through engine
//!
//! Stores secrets verbatim. Exists for tests and throwaway development
//! instances only; never select this in a real deployment.

use super::SecretCrypto;
use crate::types::{GatehouseError, Result};

pub struct NoCrypto;

impl NoCrypto {
    pub fn new() -> Self {
        Self
    }
}

impl Default for NoCrypto {
    fn default() -> Self {
        Self::new()
    }
}

impl SecretCrypto for NoCrypto {
    fn secure_secret(&self, plain: &str) -> Result<String> {
        Ok(plain.to_string())
    }

    fn verify_secret(&self, plain: &str, secured: &str) -> Result<()> {
        if plain == secured {
            Ok(())
        } else {
            Err(GatehouseError::BadAuth)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passthrough_compare() {
        let engine = NoCrypto::new();
        let secured = engine.secure_secret("secret").unwrap();
        assert_eq!(secured, "secret");
        assert!(engine.verify_secret("secret", &secured).is_ok());
        assert_eq!(
            engine.verify_secret("other", &secured),
            Err(GatehouseError::BadAuth)
        );
    }
}

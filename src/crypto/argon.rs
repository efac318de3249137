//! Secret hashing and verification using Argon2
//!
//! Uses the argon2id variant with recommended parameters. The secured form
//! is a PHC-formatted string that embeds the salt and parameters.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use super::SecretCrypto;
use crate::types::{GatehouseError, Result};

/// Argon2id secret engine.
#[derive(Default)]
pub struct ArgonEngine;

impl ArgonEngine {
    pub fn new() -> Self {
        Self
    }
}

impl SecretCrypto for ArgonEngine {
    fn secure_secret(&self, plain: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let argon2 = Argon2::default();

        argon2
            .hash_password(plain.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| GatehouseError::Crypto(format!("failed to secure secret: {e}")))
    }

    fn verify_secret(&self, plain: &str, secured: &str) -> Result<()> {
        let parsed = PasswordHash::new(secured)
            .map_err(|e| GatehouseError::Crypto(format!("invalid secured secret: {e}")))?;

        Argon2::default()
            .verify_password(plain.as_bytes(), &parsed)
            .map_err(|_| GatehouseError::BadAuth)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secure_and_verify() {
        let engine = ArgonEngine::new();
        let secured = engine.secure_secret("correct-horse-battery-staple").unwrap();

        // Secured form is PHC-formatted
        assert!(secured.starts_with("$argon2"));

        assert!(engine
            .verify_secret("correct-horse-battery-staple", &secured)
            .is_ok());
        assert_eq!(
            engine.verify_secret("wrong-secret", &secured),
            Err(GatehouseError::BadAuth)
        );
    }

    #[test]
    fn different_salts() {
        let engine = ArgonEngine::new();
        let h1 = engine.secure_secret("same-secret").unwrap();
        let h2 = engine.secure_secret("same-secret").unwrap();

        assert_ne!(h1, h2);
        assert!(engine.verify_secret("same-secret", &h1).is_ok());
        assert!(engine.verify_secret("same-secret", &h2).is_ok());
    }

    #[test]
    fn garbage_secured_form_is_crypto_error() {
        let engine = ArgonEngine::new();
        assert!(matches!(
            engine.verify_secret("secret", "not-a-valid-hash"),
            Err(GatehouseError::Crypto(_))
        ));
    }
}

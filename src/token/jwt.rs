//! JWT token backend
//!
//! Tokens are signed with HS256 (HMAC-SHA256). The signing secret must be a
//! strong random value in production; a short secret is refused outright.

use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use std::time::{SystemTime, UNIX_EPOCH};

use super::{Claims, TokenConfig, TokenService};
use crate::models::Capability;
use crate::types::{GatehouseError, Result};

/// HS256 token service.
pub struct JwtService {
    secret: String,
    lifetime_secs: u64,
}

impl JwtService {
    pub fn new(config: &TokenConfig) -> Result<Self> {
        if config.secret.is_empty() {
            return Err(GatehouseError::Config(
                "JWT_SECRET is required for the jwt-hs256 token backend".into(),
            ));
        }
        if config.secret.len() < 32 {
            return Err(GatehouseError::Config(
                "JWT_SECRET must be at least 32 characters".into(),
            ));
        }

        Ok(Self {
            secret: config.secret.clone(),
            lifetime_secs: config.lifetime_secs,
        })
    }

    fn now() -> Result<u64> {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .map_err(|e| GatehouseError::Internal(format!("system time error: {e}")))
    }
}

impl TokenService for JwtService {
    fn generate(&self, entity_id: &str, capabilities: Vec<Capability>) -> Result<(String, Claims)> {
        let now = Self::now()?;
        let claims = Claims {
            entity_id: entity_id.to_string(),
            capabilities,
            iat: now,
            exp: now + self.lifetime_secs,
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| GatehouseError::Internal(format!("failed to generate token: {e}")))?;

        Ok((token, claims))
    }

    fn validate(&self, token: &str) -> Result<Claims> {
        let validation = Validation::default();

        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        )
        .map(|data| data.claims)
        .map_err(|err| {
            use jsonwebtoken::errors::ErrorKind;
            let msg = match err.kind() {
                ErrorKind::ExpiredSignature => "token expired",
                ErrorKind::InvalidToken => "invalid token",
                ErrorKind::InvalidSignature => "invalid signature",
                _ => "token validation failed",
            };
            GatehouseError::TokenInvalid(msg.into())
        })
    }
}

/// Extract token from Authorization header.
/// Supports "Bearer <token>" format and raw tokens.
pub fn extract_token_from_header(auth_header: Option<&str>) -> Option<&str> {
    let header = auth_header?;

    if let Some(token) = header.strip_prefix("Bearer ") {
        let token = token.trim();
        if !token.is_empty() {
            return Some(token);
        }
    }

    if !header.contains(' ') {
        let token = header.trim();
        if !token.is_empty() {
            return Some(token);
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_service() -> JwtService {
        JwtService::new(&TokenConfig {
            secret: "test-secret-that-is-at-least-32-characters-long".into(),
            lifetime_secs: 3600,
        })
        .unwrap()
    }

    #[test]
    fn generate_and_validate_round_trip() {
        let svc = test_service();
        let (token, minted) = svc
            .generate("probe", vec![Capability::CreateEntity])
            .unwrap();
        assert!(!token.is_empty());

        let claims = svc.validate(&token).unwrap();
        assert_eq!(claims, minted);
        assert_eq!(claims.entity_id, "probe");
        assert!(claims.has_capability(Capability::CreateEntity));
        assert_eq!(claims.exp, claims.iat + 3600);
    }

    #[test]
    fn invalid_token_rejected() {
        let svc = test_service();
        assert!(matches!(
            svc.validate("not-a-token"),
            Err(GatehouseError::TokenInvalid(_))
        ));
    }

    #[test]
    fn wrong_secret_rejected() {
        let svc1 = test_service();
        let svc2 = JwtService::new(&TokenConfig {
            secret: "different-secret-that-is-at-least-32-chars".into(),
            lifetime_secs: 3600,
        })
        .unwrap();

        let (token, _) = svc1.generate("probe", vec![]).unwrap();
        assert!(svc2.validate(&token).is_err());
    }

    #[test]
    fn weak_secret_refused() {
        assert!(JwtService::new(&TokenConfig {
            secret: "short".into(),
            lifetime_secs: 3600,
        })
        .is_err());
        assert!(JwtService::new(&TokenConfig {
            secret: String::new(),
            lifetime_secs: 3600,
        })
        .is_err());
    }

    #[test]
    fn header_extraction() {
        assert_eq!(
            extract_token_from_header(Some("Bearer abc123")),
            Some("abc123")
        );
        assert_eq!(extract_token_from_header(Some("abc123")), Some("abc123"));
        assert_eq!(extract_token_from_header(None), None);
        assert_eq!(extract_token_from_header(Some("")), None);
        assert_eq!(extract_token_from_header(Some("Bearer ")), None);
        assert_eq!(extract_token_from_header(Some("Basic abc123")), None);
    }
}

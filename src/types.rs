//! Error types for Gatehouse
//!
//! Hooks and the processing engine return the most specific variant they can;
//! the RPC facade coarsens to a stable wire code and status before anything
//! leaves the process.

use hyper::StatusCode;

/// Main error type for Gatehouse operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatehouseError {
    // Not-found
    #[error("entity does not exist")]
    UnknownEntity,

    #[error("group does not exist")]
    UnknownGroup,

    #[error("no such key")]
    NoSuchKey,

    // Conflict
    #[error("an entity with that ID already exists")]
    DuplicateEntityID,

    #[error("a group with that name already exists")]
    DuplicateGroupName,

    #[error("that number is already assigned")]
    DuplicateNumber,

    #[error("key already exists")]
    KeyExists,

    #[error("expansion exists or would create a cycle")]
    ExistingExpansion,

    // Authorization
    #[error("authentication failed")]
    BadAuth,

    #[error("token is invalid: {0}")]
    TokenInvalid(String),

    #[error("token does not confer the required capability")]
    Unqualified,

    #[error("server is in read-only mode")]
    ReadOnly,

    // Configuration
    #[error("unknown hook")]
    UnknownHook,

    #[error("unknown hook chain")]
    UnknownHookChain,

    #[error("hook chain is empty")]
    EmptyHookChain,

    #[error("unknown capability")]
    UnknownCapability,

    #[error("unknown storage driver")]
    UnknownDatabase,

    #[error("configuration error: {0}")]
    Config(String),

    // Validation
    #[error("malformed request: {0}")]
    MalformedRequest(String),

    #[error("bad search expression")]
    BadSearch,

    // Internal
    #[error("crypto error: {0}")]
    Crypto(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl GatehouseError {
    /// Stable coarse error code exposed on the wire.
    pub fn wire_code(&self) -> &'static str {
        match self {
            Self::UnknownEntity | Self::UnknownGroup | Self::NoSuchKey => "DOES_NOT_EXIST",
            Self::DuplicateEntityID
            | Self::DuplicateGroupName
            | Self::DuplicateNumber
            | Self::KeyExists
            | Self::ExistingExpansion => "EXISTS",
            Self::BadAuth | Self::TokenInvalid(_) | Self::Unqualified => "UNAUTHORIZED",
            Self::ReadOnly => "READ_ONLY",
            Self::MalformedRequest(_) | Self::BadSearch | Self::UnknownCapability => "MALFORMED",
            _ => "INTERNAL",
        }
    }

    /// Convert error to HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self.wire_code() {
            "DOES_NOT_EXIST" => StatusCode::NOT_FOUND,
            "EXISTS" => StatusCode::CONFLICT,
            "UNAUTHORIZED" => StatusCode::UNAUTHORIZED,
            "READ_ONLY" => StatusCode::SERVICE_UNAVAILABLE,
            "MALFORMED" => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<std::io::Error> for GatehouseError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for GatehouseError {
    fn from(err: serde_json::Error) -> Self {
        Self::MalformedRequest(format!("JSON error: {}", err))
    }
}

/// Result type alias for Gatehouse operations
pub type Result<T> = std::result::Result<T, GatehouseError>;

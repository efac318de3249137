//! Configuration for Gatehouse
//!
//! CLI arguments and environment variable handling using clap. Unknown
//! environment variables are simply never read, so stray keys can't fail
//! startup.

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Gatehouse - network identity and access-control service
#[derive(Parser, Debug, Clone)]
#[command(name = "gatehouse")]
#[command(about = "Identity and access-control service")]
pub struct Args {
    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:1729")]
    pub listen: SocketAddr,

    /// TLS certificate path, handed to the fronting terminator
    #[arg(long, env = "TLS_CERTIFICATE")]
    pub tls_certificate: Option<PathBuf>,

    /// Serve without TLS. Only ever set this on a loopback deployment.
    #[arg(long, env = "INSECURE", default_value = "false")]
    pub insecure: bool,

    /// Storage driver name (memory, file)
    #[arg(long, env = "DB_BACKEND", default_value = "memory")]
    pub db_backend: String,

    /// Data directory for file-backed drivers
    #[arg(long, env = "DATA_DIR", default_value = "./data")]
    pub data_dir: PathBuf,

    /// Secret hashing engine name
    #[arg(long, env = "CRYPTO_BACKEND", default_value = "argon2")]
    pub crypto_backend: String,

    /// Token backend name
    #[arg(long, env = "TOKEN_BACKEND", default_value = "jwt-hs256")]
    pub token_backend: String,

    /// Validated-claim cache backend name
    #[arg(long, env = "TOKEN_CACHE", default_value = "memory")]
    pub token_cache: String,

    /// JWT signing secret (required outside insecure mode)
    #[arg(long, env = "JWT_SECRET")]
    pub jwt_secret: Option<String>,

    /// Token lifetime in seconds
    #[arg(long, env = "TOKEN_LIFETIME_SECS", default_value = "3600")]
    pub token_lifetime_secs: u64,

    /// Address clients should use for reads (informational, returned by
    /// /status deployments that front replicas)
    #[arg(long, env = "SERVER_ADDRESS")]
    pub server_address: Option<String>,

    /// Address of the writable master. Defaults to the server address.
    #[arg(long, env = "MASTER_ADDRESS")]
    pub master_address: Option<String>,

    /// Refuse all mutations; serve reads only
    #[arg(long, env = "READ_ONLY", default_value = "false")]
    pub read_only: bool,

    /// Bootstrap the first super-user as "entity:secret" on first start
    #[arg(long, env = "BOOTSTRAP")]
    pub bootstrap: Option<String>,

    /// Per-request deadline in milliseconds
    #[arg(long, env = "REQUEST_TIMEOUT_MS", default_value = "30000")]
    pub request_timeout_ms: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Args {
    /// Effective master address, falling back to the server address.
    pub fn master_address(&self) -> Option<&str> {
        self.master_address
            .as_deref()
            .or(self.server_address.as_deref())
    }

    /// Effective JWT secret (fixed value in insecure mode).
    pub fn jwt_secret(&self) -> Option<String> {
        if self.insecure && self.jwt_secret.is_none() {
            return Some("insecure-mode-secret-not-for-production-use".to_string());
        }
        self.jwt_secret.clone()
    }

    /// Split the bootstrap directive into (entity, secret).
    pub fn bootstrap_parts(&self) -> Option<(String, String)> {
        let raw = self.bootstrap.as_deref()?;
        let (id, secret) = raw.split_once(':')?;
        if id.is_empty() {
            return None;
        }
        Some((id.to_string(), secret.to_string()))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if !self.insecure && self.tls_certificate.is_none() {
            return Err(
                "refusing to serve without TLS_CERTIFICATE; set INSECURE=true to override".into(),
            );
        }

        if !self.insecure && self.jwt_secret.is_none() {
            return Err("JWT_SECRET is required outside insecure mode".into());
        }

        if let Some(raw) = &self.bootstrap {
            if !raw.contains(':') {
                return Err("BOOTSTRAP must be in entity:secret form".into());
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_args() -> Args {
        Args::parse_from(["gatehouse", "--insecure"])
    }

    #[test]
    fn insecure_defaults_pass_validation() {
        let args = base_args();
        assert!(args.validate().is_ok());
        assert!(args.jwt_secret().is_some());
    }

    #[test]
    fn production_requires_tls_and_secret() {
        let args = Args::parse_from(["gatehouse"]);
        assert!(args.validate().is_err());

        let args = Args::parse_from([
            "gatehouse",
            "--tls-certificate",
            "/etc/gatehouse/tls.pem",
            "--jwt-secret",
            "a-secret-that-is-at-least-32-characters!",
        ]);
        assert!(args.validate().is_ok());
    }

    #[test]
    fn bootstrap_parsing() {
        let args = Args::parse_from(["gatehouse", "--insecure", "--bootstrap", "admin:hunter2"]);
        assert!(args.validate().is_ok());
        assert_eq!(
            args.bootstrap_parts(),
            Some(("admin".to_string(), "hunter2".to_string()))
        );

        let args = Args::parse_from(["gatehouse", "--insecure", "--bootstrap", "nocolon"]);
        assert!(args.validate().is_err());
    }

    #[test]
    fn master_falls_back_to_server() {
        let mut args = base_args();
        args.server_address = Some("ro.example.com".into());
        assert_eq!(args.master_address(), Some("ro.example.com"));

        args.master_address = Some("rw.example.com".into());
        assert_eq!(args.master_address(), Some("rw.example.com"));
    }
}

//! Gatehouse - network identity and access-control service
//!
//! Gatehouse manages entities (principals) and groups, persists them
//! through a pluggable storage driver, authenticates clients against
//! argon2-secured secrets, and authorizes administrative changes with
//! signed bearer tokens carrying capability claims.
//!
//! Every mutation runs through a named hook chain owned by the
//! [`tree::Manager`]; the chains are assembled once at startup and are the
//! single extension point for new behavior.

pub mod config;
pub mod crypto;
pub mod db;
pub mod index;
pub mod models;
pub mod resolver;
pub mod rpc;
pub mod server;
pub mod startup;
pub mod token;
pub mod tree;
pub mod types;

pub use config::Args;
pub use server::{run, AppState};
pub use types::{GatehouseError, Result};

/// Register every built-in backend (storage drivers, crypto engines, token
/// backends). Idempotent; call before constructing any of them by name.
pub fn register_builtins() {
    db::register_default_drivers();
    crypto::register_default_engines();
    token::register_default_backends();
}

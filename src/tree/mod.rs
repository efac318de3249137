//! The processing engine
//!
//! Every mutation to an entity or group flows through a named chain of
//! hooks. Chains are assembled once at startup from the hook registry and
//! are immutable for the life of the process; `Manager::new` refuses to
//! serve unless every required chain exists and is non-empty.

mod bootstrap;
mod entity;
mod entity_chains;
mod group;
mod group_chains;
pub mod hooks;
pub mod util;

pub use entity_chains::{
    register_entity_hook_constructor, EntityHook, EntityHookConstructor,
};
#[cfg(debug_assertions)]
pub use entity_chains::reset_entity_constructors_for_tests;
pub use group_chains::{register_group_hook_constructor, GroupHook, GroupHookConstructor};
#[cfg(debug_assertions)]
pub use group_chains::reset_group_constructors_for_tests;

use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Once};

use crate::crypto::SecretCrypto;
use crate::db::Driver;
use crate::startup;
use crate::types::Result;

/// Collaborator handles passed to hook constructors.
#[derive(Clone)]
pub struct RefContext {
    pub db: Arc<dyn Driver>,
    pub crypto: Arc<dyn SecretCrypto>,
}

/// Chain name → ordered hook names, as loaded from configuration.
pub type ChainConfig = HashMap<&'static str, Vec<&'static str>>;

/// Owns the materialized hooks and chains and executes them per request.
pub struct Manager {
    pub(crate) entity_hooks: HashMap<String, Arc<dyn EntityHook>>,
    pub(crate) group_hooks: HashMap<String, Arc<dyn GroupHook>>,
    pub(crate) entity_processes: HashMap<String, Vec<Arc<dyn EntityHook>>>,
    pub(crate) group_processes: HashMap<String, Vec<Arc<dyn GroupHook>>>,
    pub(crate) refctx: RefContext,
    pub(crate) bootstrap_done: AtomicBool,
}

impl Manager {
    /// Build a manager with the default chain tables.
    pub fn new(db: Arc<dyn Driver>, crypto: Arc<dyn SecretCrypto>) -> Result<Self> {
        Self::with_config(db, crypto, default_entity_chains(), default_group_chains())
    }

    /// Build a manager with explicit chain tables. The required-chain check
    /// still runs against the default tables.
    pub fn with_config(
        db: Arc<dyn Driver>,
        crypto: Arc<dyn SecretCrypto>,
        entity_chains: ChainConfig,
        group_chains: ChainConfig,
    ) -> Result<Self> {
        // Registration runs once per process; call_once blocks concurrent
        // constructors until the registry is fully populated.
        static HOOK_INIT: Once = Once::new();
        HOOK_INIT.call_once(|| {
            hooks::register_all();
            startup::do_callbacks();
        });

        let mut m = Self::empty(RefContext { db, crypto });
        m.initialize_entity_hooks();
        m.initialize_group_hooks();
        m.initialize_entity_chains(&entity_chains)?;
        m.initialize_group_chains(&group_chains)?;
        m.check_required_entity_chains()?;
        m.check_required_group_chains()?;
        Ok(m)
    }

    /// A bare manager with nothing registered. Chain-machinery tests build
    /// on this; everything else goes through `new`.
    pub(crate) fn empty(refctx: RefContext) -> Self {
        Self {
            entity_hooks: HashMap::new(),
            group_hooks: HashMap::new(),
            entity_processes: HashMap::new(),
            group_processes: HashMap::new(),
            refctx,
            bootstrap_done: AtomicBool::new(false),
        }
    }
}

/// Default entity chain table. Doubles as the required-chain list.
pub fn default_entity_chains() -> ChainConfig {
    HashMap::from([
        (
            "CREATE",
            vec![
                "fail-on-existing-entity",
                "set-entity-id",
                "set-entity-number",
                "set-entity-secret",
                "create-entity",
            ],
        ),
        ("FETCH", vec!["load-entity"]),
        ("UPDATE", vec!["load-entity", "set-entity-meta", "save-entity"]),
        ("DESTROY", vec!["destroy-entity"]),
        (
            "SET-SECRET",
            vec!["load-entity", "set-entity-secret", "save-entity"],
        ),
        (
            "VALIDATE-IDENTITY",
            vec![
                "load-entity",
                "validate-entity-unlocked",
                "validate-identity",
            ],
        ),
        ("ADD-KEY", vec!["load-entity", "add-entity-key", "save-entity"]),
        ("DEL-KEY", vec!["load-entity", "del-entity-key", "save-entity"]),
        (
            "UEM-UPSERT",
            vec!["load-entity", "add-untyped-metadata", "save-entity"],
        ),
        (
            "UEM-CLEARFUZZY",
            vec!["load-entity", "del-untyped-metadata-fuzzy", "save-entity"],
        ),
        (
            "UEM-CLEAREXACT",
            vec!["load-entity", "del-untyped-metadata-exact", "save-entity"],
        ),
        ("KV-ADD", vec!["load-entity", "add-kv", "save-entity"]),
        ("KV-DEL", vec!["load-entity", "del-kv", "save-entity"]),
        ("KV-REPLACE", vec!["load-entity", "replace-kv", "save-entity"]),
        (
            "ADD-CAPABILITY",
            vec!["load-entity", "set-entity-capability", "save-entity"],
        ),
        (
            "DEL-CAPABILITY",
            vec!["load-entity", "remove-entity-capability", "save-entity"],
        ),
        (
            "ADD-DIRECT-GROUP",
            vec!["load-entity", "add-direct-group", "save-entity"],
        ),
        (
            "DEL-DIRECT-GROUP",
            vec!["load-entity", "del-direct-group", "save-entity"],
        ),
        ("LOCK", vec!["load-entity", "lock-entity", "save-entity"]),
        ("UNLOCK", vec!["load-entity", "unlock-entity", "save-entity"]),
    ])
}

/// Default group chain table. Doubles as the required-chain list.
pub fn default_group_chains() -> ChainConfig {
    HashMap::from([
        (
            "CREATE",
            vec![
                "fail-on-existing-group",
                "set-group-name",
                "set-group-displayname",
                "set-group-number",
                "set-managing-group",
                "create-group",
            ],
        ),
        ("FETCH", vec!["load-group"]),
        ("UPDATE", vec!["load-group", "set-group-meta", "save-group"]),
        ("DESTROY", vec!["destroy-group"]),
        (
            "ADD-CAPABILITY",
            vec!["load-group", "set-group-capability", "save-group"],
        ),
        (
            "DEL-CAPABILITY",
            vec!["load-group", "remove-group-capability", "save-group"],
        ),
        (
            "UGM-UPSERT",
            vec!["load-group", "add-untyped-metadata", "save-group"],
        ),
        (
            "UGM-CLEARFUZZY",
            vec!["load-group", "del-untyped-metadata-fuzzy", "save-group"],
        ),
        (
            "UGM-CLEAREXACT",
            vec!["load-group", "del-untyped-metadata-exact", "save-group"],
        ),
        (
            "MODIFY-EXPANSIONS",
            vec![
                "load-group",
                "check-expansion-cycles",
                "manage-expansions",
                "save-group",
            ],
        ),
    ])
}

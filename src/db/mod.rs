//! Storage drivers
//!
//! Durable key-addressed CRUD for entities and groups. Drivers are registered
//! by name and selected with `DB_BACKEND`. Every mutation emits an event on
//! the driver's broadcast stream; the search index consumes it.

mod file;
mod memory;

pub use file::FileDriver;
pub use memory::MemoryDriver;

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, LazyLock, RwLock};
use tokio::sync::broadcast;

use crate::models::{Entity, Group};
use crate::types::{GatehouseError, Result};

/// What changed in storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    EntityCreate,
    EntityUpdate,
    EntityDestroy,
    GroupCreate,
    GroupUpdate,
    GroupDestroy,
}

/// A single storage mutation notification. `pk` is the entity ID or group
/// name the event refers to.
#[derive(Debug, Clone)]
pub struct Event {
    pub kind: EventKind,
    pub pk: String,
}

/// A free-text query against one record kind.
#[derive(Debug, Clone, Default)]
pub struct SearchRequest {
    pub expression: String,
}

/// Storage driver contract.
///
/// The driver is the sole authority on serialization of conflicting writes;
/// nothing above it layers locks. `create_*` is the atomic insert path: it
/// fails on an existing key or a taken number instead of overwriting, so
/// uniqueness holds even when two creates race. `save_*` overwrites and is
/// reserved for read-modify-write chains that already loaded the record.
/// Number allocation guarantees uniqueness only, not ordering.
#[async_trait]
pub trait Driver: Send + Sync {
    async fn load_entity(&self, id: &str) -> Result<Entity>;
    async fn load_entity_by_number(&self, number: i32) -> Result<Entity>;
    async fn create_entity(&self, e: &Entity) -> Result<()>;
    async fn save_entity(&self, e: &Entity) -> Result<()>;
    async fn delete_entity(&self, id: &str) -> Result<()>;
    async fn discover_entity_ids(&self) -> Result<Vec<String>>;
    async fn next_entity_number(&self) -> Result<i32>;

    async fn load_group(&self, name: &str) -> Result<Group>;
    async fn load_group_by_number(&self, number: i32) -> Result<Group>;
    async fn create_group(&self, g: &Group) -> Result<()>;
    async fn save_group(&self, g: &Group) -> Result<()>;
    async fn delete_group(&self, name: &str) -> Result<()>;
    async fn discover_group_names(&self) -> Result<Vec<String>>;
    async fn next_group_number(&self) -> Result<i32>;

    /// Subscribe to the mutation event stream.
    fn subscribe_events(&self) -> broadcast::Receiver<Event>;
}

/// Options handed to driver factories.
#[derive(Debug, Clone)]
pub struct DriverOptions {
    pub data_dir: PathBuf,
}

impl Default for DriverOptions {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
        }
    }
}

/// Constructor signature for storage drivers.
pub type Factory = fn(&DriverOptions) -> Result<Arc<dyn Driver>>;

static BACKENDS: LazyLock<RwLock<HashMap<&'static str, Factory>>> =
    LazyLock::new(|| RwLock::new(HashMap::new()));

/// Register a driver factory under a name. First registration wins.
pub fn register(name: &'static str, factory: Factory) {
    let mut backends = BACKENDS.write().expect("db registry lock poisoned");
    backends.entry(name).or_insert(factory);
}

/// Construct the named driver.
pub fn new(name: &str, opts: &DriverOptions) -> Result<Arc<dyn Driver>> {
    let factory = {
        let backends = BACKENDS.read().expect("db registry lock poisoned");
        backends.get(name).copied()
    };
    match factory {
        Some(f) => f(opts),
        None => Err(GatehouseError::UnknownDatabase),
    }
}

/// Names of all registered drivers.
pub fn backend_list() -> Vec<&'static str> {
    let backends = BACKENDS.read().expect("db registry lock poisoned");
    backends.keys().copied().collect()
}

/// Register the built-in drivers.
pub fn register_default_drivers() {
    register("memory", |_| Ok(Arc::new(MemoryDriver::new())));
    register("file", |opts| Ok(Arc::new(FileDriver::new(&opts.data_dir))));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_resolves_builtins() {
        register_default_drivers();
        let opts = DriverOptions::default();
        assert!(new("memory", &opts).is_ok());
        assert_eq!(
            new("cuneiform", &opts).err(),
            Some(GatehouseError::UnknownDatabase)
        );
        assert!(backend_list().contains(&"memory"));
        assert!(backend_list().contains(&"file"));
    }
}

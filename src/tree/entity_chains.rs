//! Entity hook registry and chain machinery

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, LazyLock, RwLock};
use tracing::{debug, trace, warn};

use super::{default_entity_chains, ChainConfig, Manager, RefContext};
use crate::models::Entity;
use crate::types::{GatehouseError, Result};

/// A named, priority-ordered transformation over a working entity.
///
/// Hooks communicate solely through the working record: `e` is the record
/// being assembled, `de` is the caller's requested change.
#[async_trait]
pub trait EntityHook: Send + Sync {
    fn name(&self) -> &'static str;
    fn priority(&self) -> i32;
    async fn run(&self, e: &mut Entity, de: &Entity) -> Result<()>;
}

/// Constructs an `EntityHook` from a reference context. Construction is
/// deferred so hooks can announce themselves before collaborators exist.
pub type EntityHookConstructor = fn(&RefContext) -> Result<Arc<dyn EntityHook>>;

static CONSTRUCTORS: LazyLock<RwLock<HashMap<&'static str, EntityHookConstructor>>> =
    LazyLock::new(|| RwLock::new(HashMap::new()));

/// Register an entity hook constructor by name. Duplicate registrations are
/// silently ignored so module wiring order is non-fatal.
pub fn register_entity_hook_constructor(name: &'static str, ctor: EntityHookConstructor) {
    let mut ctors = CONSTRUCTORS.write().expect("entity ctor lock poisoned");
    if ctors.contains_key(name) {
        trace!(hook = name, "Duplicate entity hook constructor registration");
        return;
    }
    ctors.insert(name, ctor);
    trace!(hook = name, "Entity hook constructor registered");
}

/// Test-only registry reset; compiled out of release builds.
#[cfg(debug_assertions)]
pub fn reset_entity_constructors_for_tests() {
    CONSTRUCTORS
        .write()
        .expect("entity ctor lock poisoned")
        .clear();
}

impl Manager {
    /// Run every registered constructor and keep the hooks that built.
    /// Constructor failures are logged and skipped; a chain that needs a
    /// missing hook fails later in `initialize_entity_chains`.
    pub(crate) fn initialize_entity_hooks(&mut self) {
        debug!("Materializing entity hooks");
        let ctors = CONSTRUCTORS.read().expect("entity ctor lock poisoned");
        for (name, ctor) in ctors.iter() {
            match ctor(&self.refctx) {
                Ok(hook) => {
                    trace!(hook = hook.name(), "Entity hook registered");
                    self.entity_hooks.insert(hook.name().to_string(), hook);
                }
                Err(err) => {
                    warn!(hook = name, error = %err, "Error initializing entity hook");
                }
            }
        }
    }

    /// Register each configured chain in declaration order.
    pub(crate) fn initialize_entity_chains(&mut self, config: &ChainConfig) -> Result<()> {
        for (chain, hooks) in config {
            debug!(chain, "Initializing entity chain");
            for hook in hooks {
                self.register_entity_hook_to_chain(hook, chain)?;
            }
        }
        Ok(())
    }

    /// Append a hook to a chain, keeping the chain sorted ascending by
    /// priority. The sort is stable so ties preserve registration order.
    pub(crate) fn register_entity_hook_to_chain(&mut self, hook: &str, chain: &str) -> Result<()> {
        let Some(eph) = self.entity_hooks.get(hook) else {
            warn!(chain, hook, "Missing hook during chain initialization");
            return Err(GatehouseError::UnknownHook);
        };
        let list = self.entity_processes.entry(chain.to_string()).or_default();
        list.push(eph.clone());
        list.sort_by_key(|h| h.priority());
        trace!(chain, hook, "Registered hook to chain");
        Ok(())
    }

    /// Assert that every default chain exists and is non-empty. After this
    /// passes, chain presence can be assumed without checking because the
    /// chain map is never modified again.
    pub(crate) fn check_required_entity_chains(&self) -> Result<()> {
        for chain in default_entity_chains().keys() {
            match self.entity_processes.get(*chain) {
                None => {
                    warn!(chain, "Missing required entity chain");
                    return Err(GatehouseError::UnknownHookChain);
                }
                Some(hooks) if hooks.is_empty() => {
                    warn!(chain, "A required entity chain is empty");
                    return Err(GatehouseError::EmptyHookChain);
                }
                Some(_) => {}
            }
        }
        Ok(())
    }

    /// Run the named chain over a fresh working entity, feeding each hook
    /// the caller's delta. The first error aborts the chain and discards
    /// the working record.
    pub async fn run_entity_chain(&self, chain: &str, de: &Entity) -> Result<Entity> {
        let hooks = self
            .entity_processes
            .get(chain)
            .ok_or(GatehouseError::UnknownHookChain)?;

        let mut e = Entity::default();
        for hook in hooks {
            trace!(chain, hook = hook.name(), "Executing entity hook");
            if let Err(err) = hook.run(&mut e, de).await {
                trace!(chain, hook = hook.name(), error = %err, "Error during chain execution");
                return Err(err);
            }
        }
        Ok(e)
    }
}

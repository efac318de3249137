//! Group hook registry and chain machinery
//!
//! Mirrors the entity side; see `entity_chains` for the contract.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, LazyLock, RwLock};
use tracing::{debug, trace, warn};

use super::{default_group_chains, ChainConfig, Manager, RefContext};
use crate::models::Group;
use crate::types::{GatehouseError, Result};

/// A named, priority-ordered transformation over a working group.
#[async_trait]
pub trait GroupHook: Send + Sync {
    fn name(&self) -> &'static str;
    fn priority(&self) -> i32;
    async fn run(&self, g: &mut Group, dg: &Group) -> Result<()>;
}

/// Constructs a `GroupHook` from a reference context.
pub type GroupHookConstructor = fn(&RefContext) -> Result<Arc<dyn GroupHook>>;

static CONSTRUCTORS: LazyLock<RwLock<HashMap<&'static str, GroupHookConstructor>>> =
    LazyLock::new(|| RwLock::new(HashMap::new()));

/// Register a group hook constructor by name. Duplicates are silently
/// ignored.
pub fn register_group_hook_constructor(name: &'static str, ctor: GroupHookConstructor) {
    let mut ctors = CONSTRUCTORS.write().expect("group ctor lock poisoned");
    if ctors.contains_key(name) {
        trace!(hook = name, "Duplicate group hook constructor registration");
        return;
    }
    ctors.insert(name, ctor);
    trace!(hook = name, "Group hook constructor registered");
}

/// Test-only registry reset; compiled out of release builds.
#[cfg(debug_assertions)]
pub fn reset_group_constructors_for_tests() {
    CONSTRUCTORS
        .write()
        .expect("group ctor lock poisoned")
        .clear();
}

impl Manager {
    pub(crate) fn initialize_group_hooks(&mut self) {
        debug!("Materializing group hooks");
        let ctors = CONSTRUCTORS.read().expect("group ctor lock poisoned");
        for (name, ctor) in ctors.iter() {
            match ctor(&self.refctx) {
                Ok(hook) => {
                    trace!(hook = hook.name(), "Group hook registered");
                    self.group_hooks.insert(hook.name().to_string(), hook);
                }
                Err(err) => {
                    warn!(hook = name, error = %err, "Error initializing group hook");
                }
            }
        }
    }

    pub(crate) fn initialize_group_chains(&mut self, config: &ChainConfig) -> Result<()> {
        for (chain, hooks) in config {
            debug!(chain, "Initializing group chain");
            for hook in hooks {
                self.register_group_hook_to_chain(hook, chain)?;
            }
        }
        Ok(())
    }

    pub(crate) fn register_group_hook_to_chain(&mut self, hook: &str, chain: &str) -> Result<()> {
        let Some(gph) = self.group_hooks.get(hook) else {
            warn!(chain, hook, "Missing hook during chain initialization");
            return Err(GatehouseError::UnknownHook);
        };
        let list = self.group_processes.entry(chain.to_string()).or_default();
        list.push(gph.clone());
        list.sort_by_key(|h| h.priority());
        trace!(chain, hook, "Registered hook to chain");
        Ok(())
    }

    pub(crate) fn check_required_group_chains(&self) -> Result<()> {
        for chain in default_group_chains().keys() {
            match self.group_processes.get(*chain) {
                None => {
                    warn!(chain, "Missing required group chain");
                    return Err(GatehouseError::UnknownHookChain);
                }
                Some(hooks) if hooks.is_empty() => {
                    warn!(chain, "A required group chain is empty");
                    return Err(GatehouseError::EmptyHookChain);
                }
                Some(_) => {}
            }
        }
        Ok(())
    }

    /// Run the named chain over a fresh working group.
    pub async fn run_group_chain(&self, chain: &str, dg: &Group) -> Result<Group> {
        let hooks = self
            .group_processes
            .get(chain)
            .ok_or(GatehouseError::UnknownHookChain)?;

        let mut g = Group::default();
        for hook in hooks {
            trace!(chain, hook = hook.name(), "Executing group hook");
            if let Err(err) = hook.run(&mut g, dg).await {
                trace!(chain, hook = hook.name(), error = %err, "Error during chain execution");
                return Err(err);
            }
        }
        Ok(g)
    }
}

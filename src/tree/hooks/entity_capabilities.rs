//! Capability edits on entities

use async_trait::async_trait;
use std::sync::Arc;

use crate::models::Entity;
use crate::startup;
use crate::tree::{register_entity_hook_constructor, EntityHook};
use crate::types::{GatehouseError, Result};

/// SetEntityCapability adds the delta's capabilities idempotently; a value
/// already held is not added again.
pub struct SetEntityCapability;

#[async_trait]
impl EntityHook for SetEntityCapability {
    fn name(&self) -> &'static str {
        "set-entity-capability"
    }

    fn priority(&self) -> i32 {
        50
    }

    async fn run(&self, e: &mut Entity, de: &Entity) -> Result<()> {
        if de.meta.capabilities.is_empty() {
            return Err(GatehouseError::UnknownCapability);
        }
        for cap in &de.meta.capabilities {
            if !e.meta.capabilities.contains(cap) {
                e.meta.capabilities.push(*cap);
            }
        }
        Ok(())
    }
}

/// RemoveEntityCapability removes the delta's capabilities by value.
pub struct RemoveEntityCapability;

#[async_trait]
impl EntityHook for RemoveEntityCapability {
    fn name(&self) -> &'static str {
        "remove-entity-capability"
    }

    fn priority(&self) -> i32 {
        50
    }

    async fn run(&self, e: &mut Entity, de: &Entity) -> Result<()> {
        if de.meta.capabilities.is_empty() {
            return Err(GatehouseError::UnknownCapability);
        }
        e.meta
            .capabilities
            .retain(|c| !de.meta.capabilities.contains(c));
        Ok(())
    }
}

pub(super) fn register_callbacks() {
    startup::register_callback(cb);
}

fn cb() {
    register_entity_hook_constructor("set-entity-capability", |_| Ok(Arc::new(SetEntityCapability)));
    register_entity_hook_constructor("remove-entity-capability", |_| {
        Ok(Arc::new(RemoveEntityCapability))
    });
}

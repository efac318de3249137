//! Structured KV edits
//!
//! KV records map a key to an ordered list of values. Unlike untyped
//! metadata there is no Z-indexing; the key either exists or it doesn't.

use async_trait::async_trait;
use std::sync::Arc;

use crate::models::Entity;
use crate::startup;
use crate::tree::{register_entity_hook_constructor, EntityHook};
use crate::types::{GatehouseError, Result};

/// AddEntityKV inserts new keys; a key that is already present fails the
/// whole delta with `ErrKeyExists` before anything is written.
pub struct AddEntityKV;

#[async_trait]
impl EntityHook for AddEntityKV {
    fn name(&self) -> &'static str {
        "add-kv"
    }

    fn priority(&self) -> i32 {
        50
    }

    async fn run(&self, e: &mut Entity, de: &Entity) -> Result<()> {
        for key in de.meta.kv.keys() {
            if e.meta.kv.contains_key(key) {
                return Err(GatehouseError::KeyExists);
            }
        }
        for (key, values) in &de.meta.kv {
            e.meta.kv.insert(key.clone(), values.clone());
        }
        Ok(())
    }
}

/// DelEntityKV removes keys; an absent key fails with `ErrNoSuchKey`.
pub struct DelEntityKV;

#[async_trait]
impl EntityHook for DelEntityKV {
    fn name(&self) -> &'static str {
        "del-kv"
    }

    fn priority(&self) -> i32 {
        50
    }

    async fn run(&self, e: &mut Entity, de: &Entity) -> Result<()> {
        for key in de.meta.kv.keys() {
            if !e.meta.kv.contains_key(key) {
                return Err(GatehouseError::NoSuchKey);
            }
        }
        for key in de.meta.kv.keys() {
            e.meta.kv.remove(key);
        }
        Ok(())
    }
}

/// ReplaceEntityKV overwrites the value lists of existing keys; an absent
/// key fails with `ErrNoSuchKey`.
pub struct ReplaceEntityKV;

#[async_trait]
impl EntityHook for ReplaceEntityKV {
    fn name(&self) -> &'static str {
        "replace-kv"
    }

    fn priority(&self) -> i32 {
        50
    }

    async fn run(&self, e: &mut Entity, de: &Entity) -> Result<()> {
        for key in de.meta.kv.keys() {
            if !e.meta.kv.contains_key(key) {
                return Err(GatehouseError::NoSuchKey);
            }
        }
        for (key, values) in &de.meta.kv {
            e.meta.kv.insert(key.clone(), values.clone());
        }
        Ok(())
    }
}

pub(super) fn register_callbacks() {
    startup::register_callback(cb);
}

fn cb() {
    register_entity_hook_constructor("add-kv", |_| Ok(Arc::new(AddEntityKV)));
    register_entity_hook_constructor("del-kv", |_| Ok(Arc::new(DelEntityKV)));
    register_entity_hook_constructor("replace-kv", |_| Ok(Arc::new(ReplaceEntityKV)));
}

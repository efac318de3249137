//! Public key edits
//!
//! Keys are opaque strings as far as the tree is concerned.

use async_trait::async_trait;
use std::sync::Arc;

use crate::models::Entity;
use crate::startup;
use crate::tree::util::{dedup_union, subtract};
use crate::tree::{register_entity_hook_constructor, EntityHook};
use crate::types::Result;

pub struct AddEntityKey;

#[async_trait]
impl EntityHook for AddEntityKey {
    fn name(&self) -> &'static str {
        "add-entity-key"
    }

    fn priority(&self) -> i32 {
        50
    }

    async fn run(&self, e: &mut Entity, de: &Entity) -> Result<()> {
        e.meta.keys = dedup_union(&e.meta.keys, &de.meta.keys);
        Ok(())
    }
}

pub struct DelEntityKey;

#[async_trait]
impl EntityHook for DelEntityKey {
    fn name(&self) -> &'static str {
        "del-entity-key"
    }

    fn priority(&self) -> i32 {
        50
    }

    async fn run(&self, e: &mut Entity, de: &Entity) -> Result<()> {
        e.meta.keys = subtract(&e.meta.keys, &de.meta.keys);
        Ok(())
    }
}

pub(super) fn register_callbacks() {
    startup::register_callback(cb);
}

fn cb() {
    register_entity_hook_constructor("add-entity-key", |_| Ok(Arc::new(AddEntityKey)));
    register_entity_hook_constructor("del-entity-key", |_| Ok(Arc::new(DelEntityKey)));
}

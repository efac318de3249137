//! Group metadata hooks
//!
//! CREATE uses the field-specific hooks; UPDATE uses the merging hook so
//! unset delta fields leave existing values alone.

use async_trait::async_trait;
use std::sync::Arc;

use crate::models::Group;
use crate::startup;
use crate::tree::{register_group_hook_constructor, GroupHook};
use crate::types::Result;

/// SetGroupDisplayName copies the display name, defaulting to the group
/// name when the delta carries none.
pub struct SetGroupDisplayName;

#[async_trait]
impl GroupHook for SetGroupDisplayName {
    fn name(&self) -> &'static str {
        "set-group-displayname"
    }

    fn priority(&self) -> i32 {
        50
    }

    async fn run(&self, g: &mut Group, dg: &Group) -> Result<()> {
        g.display_name = dg
            .display_name
            .clone()
            .or_else(|| Some(dg.name.clone()));
        Ok(())
    }
}

/// SetManagingGroup copies the managing-group reference.
pub struct SetManagingGroup;

#[async_trait]
impl GroupHook for SetManagingGroup {
    fn name(&self) -> &'static str {
        "set-managing-group"
    }

    fn priority(&self) -> i32 {
        50
    }

    async fn run(&self, g: &mut Group, dg: &Group) -> Result<()> {
        g.managed_by = dg.managed_by.clone();
        Ok(())
    }
}

/// SetGroupMeta merges the delta's scalar fields for the UPDATE chain.
/// Expansions and capabilities never change through this hook.
pub struct SetGroupMeta;

#[async_trait]
impl GroupHook for SetGroupMeta {
    fn name(&self) -> &'static str {
        "set-group-meta"
    }

    fn priority(&self) -> i32 {
        50
    }

    async fn run(&self, g: &mut Group, dg: &Group) -> Result<()> {
        if dg.display_name.is_some() {
            g.display_name = dg.display_name.clone();
        }
        if dg.managed_by.is_some() {
            g.managed_by = dg.managed_by.clone();
        }
        Ok(())
    }
}

pub(super) fn register_callbacks() {
    startup::register_callback(cb);
}

fn cb() {
    register_group_hook_constructor("set-group-displayname", |_| Ok(Arc::new(SetGroupDisplayName)));
    register_group_hook_constructor("set-managing-group", |_| Ok(Arc::new(SetManagingGroup)));
    register_group_hook_constructor("set-group-meta", |_| Ok(Arc::new(SetGroupMeta)));
}

//! Capability edits on groups

use async_trait::async_trait;
use std::sync::Arc;

use crate::models::Group;
use crate::startup;
use crate::tree::{register_group_hook_constructor, GroupHook};
use crate::types::{GatehouseError, Result};

pub struct SetGroupCapability;

#[async_trait]
impl GroupHook for SetGroupCapability {
    fn name(&self) -> &'static str {
        "set-group-capability"
    }

    fn priority(&self) -> i32 {
        50
    }

    async fn run(&self, g: &mut Group, dg: &Group) -> Result<()> {
        if dg.capabilities.is_empty() {
            return Err(GatehouseError::UnknownCapability);
        }
        for cap in &dg.capabilities {
            if !g.capabilities.contains(cap) {
                g.capabilities.push(*cap);
            }
        }
        Ok(())
    }
}

pub struct RemoveGroupCapability;

#[async_trait]
impl GroupHook for RemoveGroupCapability {
    fn name(&self) -> &'static str {
        "remove-group-capability"
    }

    fn priority(&self) -> i32 {
        50
    }

    async fn run(&self, g: &mut Group, dg: &Group) -> Result<()> {
        if dg.capabilities.is_empty() {
            return Err(GatehouseError::UnknownCapability);
        }
        g.capabilities.retain(|c| !dg.capabilities.contains(c));
        Ok(())
    }
}

pub(super) fn register_callbacks() {
    startup::register_callback(cb);
}

fn cb() {
    register_group_hook_constructor("set-group-capability", |_| Ok(Arc::new(SetGroupCapability)));
    register_group_hook_constructor("remove-group-capability", |_| {
        Ok(Arc::new(RemoveGroupCapability))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Capability;

    #[tokio::test]
    async fn add_and_remove() {
        let add = SetGroupCapability;
        let del = RemoveGroupCapability;

        let mut g = Group::default();
        let mut dg = Group::default();
        dg.capabilities = vec![Capability::CreateEntity, Capability::CreateEntity];

        add.run(&mut g, &dg).await.unwrap();
        assert_eq!(g.capabilities, vec![Capability::CreateEntity]);

        del.run(&mut g, &dg).await.unwrap();
        assert!(g.capabilities.is_empty());

        dg.capabilities.clear();
        assert_eq!(
            add.run(&mut g, &dg).await.err(),
            Some(GatehouseError::UnknownCapability)
        );
    }
}

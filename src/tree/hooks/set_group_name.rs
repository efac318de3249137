//! Copy the requested name onto the working group.

use async_trait::async_trait;
use std::sync::Arc;

use crate::models::Group;
use crate::startup;
use crate::tree::{register_group_hook_constructor, GroupHook};
use crate::types::{GatehouseError, Result};

pub struct SetGroupName;

#[async_trait]
impl GroupHook for SetGroupName {
    fn name(&self) -> &'static str {
        "set-group-name"
    }

    fn priority(&self) -> i32 {
        10
    }

    async fn run(&self, g: &mut Group, dg: &Group) -> Result<()> {
        if dg.name.is_empty() {
            return Err(GatehouseError::MalformedRequest(
                "group name is required".into(),
            ));
        }
        g.name = dg.name.clone();
        Ok(())
    }
}

pub(super) fn register_callbacks() {
    startup::register_callback(cb);
}

fn cb() {
    register_group_hook_constructor("set-group-name", |_| Ok(Arc::new(SetGroupName)));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn name_required() {
        let hook = SetGroupName;
        assert!(hook
            .run(&mut Group::default(), &Group::default())
            .await
            .is_err());

        let mut g = Group::default();
        let dg = Group {
            name: "ops".into(),
            ..Default::default()
        };
        hook.run(&mut g, &dg).await.unwrap();
        assert_eq!(g.name, "ops");
    }
}

//! Load a group from storage into the working record.

use async_trait::async_trait;
use std::sync::Arc;

use crate::db::Driver;
use crate::models::Group;
use crate::startup;
use crate::tree::{register_group_hook_constructor, GroupHook, RefContext};
use crate::types::Result;

/// LoadGroup reads the group named by the delta into the working record.
/// Any errors returned are from the storage layer.
pub struct LoadGroup {
    db: Arc<dyn Driver>,
}

#[async_trait]
impl GroupHook for LoadGroup {
    fn name(&self) -> &'static str {
        "load-group"
    }

    fn priority(&self) -> i32 {
        0
    }

    async fn run(&self, g: &mut Group, dg: &Group) -> Result<()> {
        *g = self.db.load_group(&dg.name).await?;
        Ok(())
    }
}

pub(super) fn register_callbacks() {
    startup::register_callback(cb);
}

fn cb() {
    register_group_hook_constructor("load-group", new_load_group);
}

fn new_load_group(c: &RefContext) -> Result<Arc<dyn GroupHook>> {
    Ok(Arc::new(LoadGroup { db: c.db.clone() }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::NoCrypto;
    use crate::db::MemoryDriver;
    use crate::types::GatehouseError;

    #[tokio::test]
    async fn loads_by_delta_name() {
        let db = Arc::new(MemoryDriver::new());
        db.save_group(&Group {
            name: "ops".into(),
            number: 2,
            ..Default::default()
        })
        .await
        .unwrap();

        let hook = new_load_group(&RefContext {
            db: db.clone(),
            crypto: Arc::new(NoCrypto::new()),
        })
        .unwrap();

        let mut g = Group::default();
        let dg = Group {
            name: "ops".into(),
            ..Default::default()
        };
        hook.run(&mut g, &dg).await.unwrap();
        assert_eq!(g.number, 2);

        let dg = Group {
            name: "nope".into(),
            ..Default::default()
        };
        assert_eq!(
            hook.run(&mut g, &dg).await.err(),
            Some(GatehouseError::UnknownGroup)
        );
    }
}

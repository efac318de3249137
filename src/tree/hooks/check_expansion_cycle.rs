//! Reject expansions that would create an INCLUDE cycle
//!
//! For a proposed `INCLUDE:child` on a group, walk INCLUDE edges from the
//! child; if any path reaches the group being modified, the expansion is
//! refused. The walk carries a visited set and a depth guard of the total
//! group count, so even a corrupted graph terminates.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;

use crate::db::Driver;
use crate::models::{Expansion, ExpansionMode, Group};
use crate::startup;
use crate::tree::{register_group_hook_constructor, GroupHook, RefContext};
use crate::types::{GatehouseError, Result};

pub struct CheckExpansionCycles {
    db: Arc<dyn Driver>,
}

#[async_trait]
impl GroupHook for CheckExpansionCycles {
    fn name(&self) -> &'static str {
        "check-expansion-cycles"
    }

    fn priority(&self) -> i32 {
        40
    }

    async fn run(&self, g: &mut Group, dg: &Group) -> Result<()> {
        for directive in &dg.expansions {
            let exp: Expansion = directive.parse()?;
            match exp.mode {
                // DROP removes an edge and EXCLUDE never adds one; neither
                // can introduce a cycle.
                ExpansionMode::Drop | ExpansionMode::Exclude => continue,
                ExpansionMode::Include => {}
            }

            if exp.target == g.name {
                return Err(GatehouseError::ExistingExpansion);
            }

            // Re-adding a target the group already expands is refused in
            // any mode.
            for existing in &g.expansions {
                let have: Expansion = existing.parse()?;
                if have.target == exp.target {
                    return Err(GatehouseError::ExistingExpansion);
                }
            }

            if self.include_path_reaches(&exp.target, &g.name).await? {
                return Err(GatehouseError::ExistingExpansion);
            }
        }
        Ok(())
    }
}

impl CheckExpansionCycles {
    /// DFS over INCLUDE edges starting at `from`, looking for `needle`.
    /// An unresolvable group along the way propagates `ErrUnknownGroup`.
    async fn include_path_reaches(&self, from: &str, needle: &str) -> Result<bool> {
        let depth_guard = self.db.discover_group_names().await?.len() + 1;
        let mut visited: HashSet<String> = HashSet::new();
        let mut stack = vec![from.to_string()];

        while let Some(name) = stack.pop() {
            if name == needle {
                return Ok(true);
            }
            if !visited.insert(name.clone()) {
                continue;
            }
            if visited.len() > depth_guard {
                // More nodes than groups means the graph is already
                // corrupt; refuse the expansion rather than loop.
                return Ok(true);
            }

            let group = self.db.load_group(&name).await?;
            for directive in &group.expansions {
                let exp: Expansion = directive.parse()?;
                if exp.mode == ExpansionMode::Include {
                    stack.push(exp.target);
                }
            }
        }
        Ok(false)
    }
}

pub(super) fn register_callbacks() {
    startup::register_callback(cb);
}

fn cb() {
    register_group_hook_constructor("check-expansion-cycles", new_check_expansion_cycles);
}

fn new_check_expansion_cycles(c: &RefContext) -> Result<Arc<dyn GroupHook>> {
    Ok(Arc::new(CheckExpansionCycles { db: c.db.clone() }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::NoCrypto;
    use crate::db::MemoryDriver;

    fn hook_with_db() -> (Arc<MemoryDriver>, Arc<dyn GroupHook>) {
        let db = Arc::new(MemoryDriver::new());
        let ctx = RefContext {
            db: db.clone(),
            crypto: Arc::new(NoCrypto::new()),
        };
        (db, new_check_expansion_cycles(&ctx).unwrap())
    }

    fn group(name: &str, expansions: &[&str]) -> Group {
        Group {
            name: name.into(),
            expansions: expansions.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn drop_passes_through() {
        let (_db, hook) = hook_with_db();
        let mut g = Group::default();
        let dg = group("", &["DROP:somegroup"]);
        assert!(hook.run(&mut g, &dg).await.is_ok());
    }

    #[tokio::test]
    async fn unknown_child_propagates() {
        let (_db, hook) = hook_with_db();
        let mut g = Group::default();
        let dg = group("", &["INCLUDE:somegroup"]);
        assert_eq!(
            hook.run(&mut g, &dg).await.err(),
            Some(GatehouseError::UnknownGroup)
        );
    }

    #[tokio::test]
    async fn direct_cycle_found() {
        let (db, hook) = hook_with_db();
        db.save_group(&group("group2", &["INCLUDE:group1"]))
            .await
            .unwrap();

        let mut g = group("group1", &[]);
        let dg = group("", &["INCLUDE:group2"]);
        assert_eq!(
            hook.run(&mut g, &dg).await.err(),
            Some(GatehouseError::ExistingExpansion)
        );
    }

    #[tokio::test]
    async fn transitive_cycle_found() {
        let (db, hook) = hook_with_db();
        db.save_group(&group("group2", &["INCLUDE:group3"]))
            .await
            .unwrap();
        db.save_group(&group("group3", &["INCLUDE:group1"]))
            .await
            .unwrap();

        let mut g = group("group1", &[]);
        let dg = group("", &["INCLUDE:group2"]);
        assert_eq!(
            hook.run(&mut g, &dg).await.err(),
            Some(GatehouseError::ExistingExpansion)
        );
    }

    #[tokio::test]
    async fn acceptable_expansion_passes() {
        let (db, hook) = hook_with_db();
        db.save_group(&group("group2", &["INCLUDE:group3"]))
            .await
            .unwrap();
        db.save_group(&group("group3", &[])).await.unwrap();

        let mut g = group("group1", &[]);
        let dg = group("", &["INCLUDE:group2"]);
        assert!(hook.run(&mut g, &dg).await.is_ok());
    }

    #[tokio::test]
    async fn self_include_refused() {
        let (_db, hook) = hook_with_db();
        let mut g = group("group1", &[]);
        let dg = group("", &["INCLUDE:group1"]);
        assert_eq!(
            hook.run(&mut g, &dg).await.err(),
            Some(GatehouseError::ExistingExpansion)
        );
    }

    #[tokio::test]
    async fn duplicate_target_refused() {
        let (db, hook) = hook_with_db();
        db.save_group(&group("group2", &[])).await.unwrap();

        let mut g = group("group1", &["EXCLUDE:group2"]);
        let dg = group("", &["INCLUDE:group2"]);
        assert_eq!(
            hook.run(&mut g, &dg).await.err(),
            Some(GatehouseError::ExistingExpansion)
        );
    }
}

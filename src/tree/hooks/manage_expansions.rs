//! Apply expansion directives to the working group
//!
//! Runs after `check-expansion-cycles`, so anything INCLUDE-shaped that
//! reaches this hook is already known to be acyclic.

use async_trait::async_trait;
use std::sync::Arc;

use crate::models::{Expansion, ExpansionMode, Group};
use crate::startup;
use crate::tree::{register_group_hook_constructor, GroupHook};
use crate::types::Result;

/// ManageExpansions adds INCLUDE/EXCLUDE directives and processes DROP
/// tombstones. DROP removes every directive for its target regardless of
/// mode.
pub struct ManageExpansions;

#[async_trait]
impl GroupHook for ManageExpansions {
    fn name(&self) -> &'static str {
        "manage-expansions"
    }

    fn priority(&self) -> i32 {
        50
    }

    async fn run(&self, g: &mut Group, dg: &Group) -> Result<()> {
        for directive in &dg.expansions {
            let exp: Expansion = directive.parse()?;
            match exp.mode {
                ExpansionMode::Drop => {
                    g.expansions.retain(|existing| {
                        existing
                            .parse::<Expansion>()
                            .map(|have| have.target != exp.target)
                            .unwrap_or(true)
                    });
                }
                ExpansionMode::Include | ExpansionMode::Exclude => {
                    let rendered = exp.to_string();
                    if !g.expansions.contains(&rendered) {
                        g.expansions.push(rendered);
                    }
                }
            }
        }
        Ok(())
    }
}

pub(super) fn register_callbacks() {
    startup::register_callback(cb);
}

fn cb() {
    register_group_hook_constructor("manage-expansions", |_| Ok(Arc::new(ManageExpansions)));
}

//! Membership and capability resolution
//!
//! An entity's transitive membership starts from its direct groups and
//! follows each group's expansion list in order. INCLUDE pulls in the named
//! group and recurses; EXCLUDE bars the named group (and only the named
//! group) for the remainder of the resolution, beating any prior INCLUDE
//! and suppressing any later one.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::warn;

use crate::db::Driver;
use crate::models::{Capability, Entity, Expansion, ExpansionMode};
use crate::types::Result;

pub struct Resolver {
    db: Arc<dyn Driver>,
}

impl Resolver {
    pub fn new(db: Arc<dyn Driver>) -> Self {
        Self { db }
    }

    /// The full set of groups the entity belongs to, direct and expanded.
    /// Order is not significant; the result is sorted for stable output.
    pub async fn transitive_membership(&self, e: &Entity) -> Result<Vec<String>> {
        let mut member: Vec<String> = Vec::new();
        let mut excluded: HashSet<String> = HashSet::new();
        let mut visited: HashSet<String> = HashSet::new();
        // Depth guard against a corrupted graph that escaped the cycle
        // check.
        let guard = self.db.discover_group_names().await?.len() + 1;

        let mut queue: Vec<String> = e.meta.groups.clone();
        while let Some(name) = queue.pop() {
            if excluded.contains(&name) || !visited.insert(name.clone()) {
                continue;
            }
            if visited.len() > guard {
                warn!("Membership resolution exceeded group count, graph may be corrupt");
                break;
            }

            let group = match self.db.load_group(&name).await {
                Ok(g) => g,
                Err(err) => {
                    // A dangling direct-group reference shouldn't make the
                    // entity unresolvable.
                    warn!(group = %name, error = %err, "Skipping unresolvable group");
                    continue;
                }
            };
            member.push(name);

            for directive in &group.expansions {
                let Ok(exp) = directive.parse::<Expansion>() else {
                    warn!(group = %group.name, directive, "Skipping malformed expansion");
                    continue;
                };
                match exp.mode {
                    ExpansionMode::Include => {
                        if !excluded.contains(&exp.target) {
                            queue.push(exp.target);
                        }
                    }
                    ExpansionMode::Exclude => {
                        excluded.insert(exp.target.clone());
                        member.retain(|m| *m != exp.target);
                    }
                    ExpansionMode::Drop => {}
                }
            }
        }

        member.sort();
        Ok(member)
    }

    /// Union of the entity's own capabilities and those of every group in
    /// its transitive closure. This is the set a token embeds at mint time.
    pub async fn effective_capabilities(&self, e: &Entity) -> Result<Vec<Capability>> {
        let mut caps: Vec<Capability> = Vec::new();
        for cap in &e.meta.capabilities {
            if !caps.contains(cap) {
                caps.push(*cap);
            }
        }

        for name in self.transitive_membership(e).await? {
            let group = match self.db.load_group(&name).await {
                Ok(g) => g,
                Err(_) => continue,
            };
            for cap in &group.capabilities {
                if !caps.contains(cap) {
                    caps.push(*cap);
                }
            }
        }
        Ok(caps)
    }

    /// All entities whose transitive membership includes `group`.
    pub async fn members_of_group(&self, group: &str) -> Result<Vec<String>> {
        let mut members = Vec::new();
        for id in self.db.discover_entity_ids().await? {
            let e = self.db.load_entity(&id).await?;
            if self
                .transitive_membership(&e)
                .await?
                .iter()
                .any(|g| g == group)
            {
                members.push(id);
            }
        }
        members.sort();
        Ok(members)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryDriver;
    use crate::models::Group;

    async fn seed_group(db: &MemoryDriver, name: &str, expansions: &[&str], caps: &[Capability]) {
        db.save_group(&Group {
            name: name.into(),
            number: 1,
            expansions: expansions.iter().map(|s| s.to_string()).collect(),
            capabilities: caps.to_vec(),
            ..Default::default()
        })
        .await
        .unwrap();
    }

    fn entity_in(groups: &[&str]) -> Entity {
        let mut e = Entity {
            id: "probe".into(),
            number: 1,
            ..Default::default()
        };
        e.meta.groups = groups.iter().map(|s| s.to_string()).collect();
        e
    }

    #[tokio::test]
    async fn include_recurses() {
        let db = Arc::new(MemoryDriver::new());
        seed_group(&db, "alpha", &["INCLUDE:beta"], &[]).await;
        seed_group(&db, "beta", &["INCLUDE:gamma"], &[]).await;
        seed_group(&db, "gamma", &[], &[]).await;

        let r = Resolver::new(db);
        let got = r.transitive_membership(&entity_in(&["alpha"])).await.unwrap();
        assert_eq!(got, vec!["alpha", "beta", "gamma"]);
    }

    #[tokio::test]
    async fn exclude_beats_prior_include() {
        let db = Arc::new(MemoryDriver::new());
        // alpha includes beta, then excludes gamma; beta includes gamma.
        seed_group(&db, "alpha", &["INCLUDE:beta", "EXCLUDE:gamma"], &[]).await;
        seed_group(&db, "beta", &["INCLUDE:gamma"], &[]).await;
        seed_group(&db, "gamma", &[], &[]).await;

        let r = Resolver::new(db);
        let got = r.transitive_membership(&entity_in(&["alpha"])).await.unwrap();
        assert_eq!(got, vec!["alpha", "beta"]);
    }

    #[tokio::test]
    async fn exclude_prunes_named_group_only() {
        let db = Arc::new(MemoryDriver::new());
        // gamma is reachable both through beta and directly; barring beta
        // must not take gamma down with it.
        seed_group(
            &db,
            "alpha",
            &["INCLUDE:gamma", "INCLUDE:beta", "EXCLUDE:beta"],
            &[],
        )
        .await;
        seed_group(&db, "beta", &["INCLUDE:gamma"], &[]).await;
        seed_group(&db, "gamma", &[], &[]).await;

        let r = Resolver::new(db);
        let got = r.transitive_membership(&entity_in(&["alpha"])).await.unwrap();
        assert_eq!(got, vec!["alpha", "gamma"]);
    }

    #[tokio::test]
    async fn later_include_does_not_readd_excluded() {
        let db = Arc::new(MemoryDriver::new());
        seed_group(&db, "alpha", &["EXCLUDE:gamma", "INCLUDE:beta"], &[]).await;
        seed_group(&db, "beta", &["INCLUDE:gamma"], &[]).await;
        seed_group(&db, "gamma", &[], &[]).await;

        let r = Resolver::new(db);
        let got = r.transitive_membership(&entity_in(&["alpha"])).await.unwrap();
        assert_eq!(got, vec!["alpha", "beta"]);
    }

    #[tokio::test]
    async fn dangling_direct_group_skipped() {
        let db = Arc::new(MemoryDriver::new());
        seed_group(&db, "alpha", &[], &[]).await;

        let r = Resolver::new(db);
        let got = r
            .transitive_membership(&entity_in(&["alpha", "ghost"]))
            .await
            .unwrap();
        assert_eq!(got, vec!["alpha"]);
    }

    #[tokio::test]
    async fn capabilities_union_entity_and_groups() {
        let db = Arc::new(MemoryDriver::new());
        seed_group(&db, "alpha", &["INCLUDE:beta"], &[Capability::CreateEntity]).await;
        seed_group(&db, "beta", &[], &[Capability::CreateGroup]).await;

        let mut e = entity_in(&["alpha"]);
        e.meta.capabilities = vec![Capability::LockEntity];

        let r = Resolver::new(db);
        let caps = r.effective_capabilities(&e).await.unwrap();
        assert!(caps.contains(&Capability::LockEntity));
        assert!(caps.contains(&Capability::CreateEntity));
        assert!(caps.contains(&Capability::CreateGroup));
        assert_eq!(caps.len(), 3);
    }

    #[tokio::test]
    async fn members_inverse_lookup() {
        let db = Arc::new(MemoryDriver::new());
        seed_group(&db, "alpha", &["INCLUDE:beta"], &[]).await;
        seed_group(&db, "beta", &[], &[]).await;

        db.save_entity(&entity_in(&["alpha"])).await.unwrap();
        let mut other = entity_in(&[]);
        other.id = "loner".into();
        db.save_entity(&other).await.unwrap();

        let r = Resolver::new(db);
        assert_eq!(r.members_of_group("beta").await.unwrap(), vec!["probe"]);
        assert!(r.members_of_group("nosuch").await.unwrap().is_empty());
    }
}

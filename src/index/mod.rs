//! In-memory search index
//!
//! Holds a flattened document per entity and group and answers expression
//! queries over them. Secrets, key material, untyped metadata, and KV
//! records are never indexed. The index is maintained from the storage
//! event stream, so it is eventually consistent with storage: a query
//! immediately after a write may miss the change.
//!
//! Expression grammar: whitespace-separated terms, all of which must match.
//! A bare term matches any field; `field:term` restricts the match to that
//! field. Matching is a case-insensitive substring test.

use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::db::{Driver, Event, EventKind, SearchRequest};
use crate::models::{Entity, Group};
use crate::types::{GatehouseError, Result};

type Document = HashMap<&'static str, String>;

pub struct SearchIndex {
    entities: DashMap<String, Document>,
    groups: DashMap<String, Document>,
}

impl SearchIndex {
    pub fn new() -> Self {
        Self {
            entities: DashMap::new(),
            groups: DashMap::new(),
        }
    }

    /// Add or update an entity in the index.
    pub fn index_entity(&self, e: &Entity) {
        let mut doc: Document = HashMap::new();
        doc.insert("id", e.id.clone());
        doc.insert("number", e.number.to_string());
        if let Some(v) = &e.meta.gecos {
            doc.insert("gecos", v.clone());
        }
        if let Some(v) = &e.meta.display_name {
            doc.insert("displayname", v.clone());
        }
        if let Some(v) = &e.meta.legal_name {
            doc.insert("legalname", v.clone());
        }
        if let Some(v) = &e.meta.shell {
            doc.insert("shell", v.clone());
        }
        if let Some(v) = &e.meta.home {
            doc.insert("home", v.clone());
        }
        if !e.meta.groups.is_empty() {
            doc.insert("groups", e.meta.groups.join(" "));
        }
        self.entities.insert(e.id.clone(), doc);
    }

    /// Remove an entity from the index.
    pub fn delete_entity(&self, id: &str) {
        self.entities.remove(id);
    }

    /// Add or update a group in the index.
    pub fn index_group(&self, g: &Group) {
        let mut doc: Document = HashMap::new();
        doc.insert("name", g.name.clone());
        doc.insert("number", g.number.to_string());
        if let Some(v) = &g.display_name {
            doc.insert("displayname", v.clone());
        }
        if let Some(v) = &g.managed_by {
            doc.insert("managedby", v.clone());
        }
        self.groups.insert(g.name.clone(), doc);
    }

    /// Remove a group from the index.
    pub fn delete_group(&self, name: &str) {
        self.groups.remove(name);
    }

    /// Search entities; returns matching IDs.
    pub fn search_entities(&self, r: &SearchRequest) -> Result<Vec<String>> {
        Self::search(&self.entities, r)
    }

    /// Search groups; returns matching names.
    pub fn search_groups(&self, r: &SearchRequest) -> Result<Vec<String>> {
        Self::search(&self.groups, r)
    }

    fn search(docs: &DashMap<String, Document>, r: &SearchRequest) -> Result<Vec<String>> {
        let terms = parse_expression(&r.expression)?;
        let mut hits: Vec<String> = docs
            .iter()
            .filter(|entry| terms.iter().all(|t| t.matches(entry.value())))
            .map(|entry| entry.key().clone())
            .collect();
        hits.sort();
        Ok(hits)
    }
}

impl Default for SearchIndex {
    fn default() -> Self {
        Self::new()
    }
}

struct Term {
    field: Option<String>,
    needle: String,
}

impl Term {
    fn matches(&self, doc: &Document) -> bool {
        match &self.field {
            Some(field) => doc
                .get(field.as_str())
                .is_some_and(|v| v.to_lowercase().contains(&self.needle)),
            None => doc.values().any(|v| v.to_lowercase().contains(&self.needle)),
        }
    }
}

fn parse_expression(expression: &str) -> Result<Vec<Term>> {
    if expression.trim().is_empty() {
        return Err(GatehouseError::BadSearch);
    }
    Ok(expression
        .split_whitespace()
        .map(|tok| match tok.split_once(':') {
            Some((field, needle)) if !field.is_empty() && !needle.is_empty() => Term {
                field: Some(field.to_lowercase()),
                needle: needle.to_lowercase(),
            },
            _ => Term {
                field: None,
                needle: tok.to_lowercase(),
            },
        })
        .collect())
}

/// Keep an index current from a driver's event stream.
///
/// Runs until the event channel closes. Lagged receivers log and continue;
/// a missed event only means the affected record is stale until its next
/// mutation.
pub fn spawn_index_task(
    index: Arc<SearchIndex>,
    db: Arc<dyn Driver>,
    mut rx: broadcast::Receiver<Event>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let event = match rx.recv().await {
                Ok(ev) => ev,
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    warn!(missed, "Search index lagged behind storage events");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            };

            debug!(kind = ?event.kind, pk = %event.pk, "Index update");
            match event.kind {
                EventKind::EntityCreate | EventKind::EntityUpdate => {
                    match db.load_entity(&event.pk).await {
                        Ok(e) => index.index_entity(&e.safe_copy()),
                        Err(err) => warn!(pk = %event.pk, error = %err, "Could not reindex entity"),
                    }
                }
                EventKind::EntityDestroy => index.delete_entity(&event.pk),
                EventKind::GroupCreate | EventKind::GroupUpdate => {
                    match db.load_group(&event.pk).await {
                        Ok(g) => index.index_group(&g),
                        Err(err) => warn!(pk = %event.pk, error = %err, "Could not reindex group"),
                    }
                }
                EventKind::GroupDestroy => index.delete_group(&event.pk),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryDriver;
    use crate::models::EntityMeta;

    fn entity(id: &str, gecos: &str) -> Entity {
        Entity {
            id: id.into(),
            number: 1,
            meta: EntityMeta {
                gecos: Some(gecos.into()),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn empty_expression_is_bad_search() {
        let idx = SearchIndex::new();
        assert_eq!(
            idx.search_entities(&SearchRequest {
                expression: "".into()
            })
            .err(),
            Some(GatehouseError::BadSearch)
        );
        assert_eq!(
            idx.search_groups(&SearchRequest {
                expression: "   ".into()
            })
            .err(),
            Some(GatehouseError::BadSearch)
        );
    }

    #[test]
    fn bare_and_fielded_terms() {
        let idx = SearchIndex::new();
        idx.index_entity(&entity("maintenance", "Facilities Maintenance"));
        idx.index_entity(&entity("ops-bot", "Operations Robot"));

        let hits = idx
            .search_entities(&SearchRequest {
                expression: "maintenance".into(),
            })
            .unwrap();
        assert_eq!(hits, vec!["maintenance"]);

        let hits = idx
            .search_entities(&SearchRequest {
                expression: "gecos:robot".into(),
            })
            .unwrap();
        assert_eq!(hits, vec!["ops-bot"]);

        // All terms must match
        let hits = idx
            .search_entities(&SearchRequest {
                expression: "gecos:robot maintenance".into(),
            })
            .unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn secrets_are_not_searchable() {
        let idx = SearchIndex::new();
        let mut e = entity("probe", "Probe");
        e.secret = Some("$argon2id$supersecret".into());
        idx.index_entity(&e);

        let hits = idx
            .search_entities(&SearchRequest {
                expression: "supersecret".into(),
            })
            .unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn index_follows_events() {
        let db = Arc::new(MemoryDriver::new());
        let idx = Arc::new(SearchIndex::new());
        let handle = spawn_index_task(idx.clone(), db.clone(), db.subscribe_events());

        db.save_entity(&entity("probe", "A Probe")).await.unwrap();

        // Eventually consistent: poll until the task catches up.
        let mut hits = Vec::new();
        for _ in 0..50 {
            hits = idx
                .search_entities(&SearchRequest {
                    expression: "probe".into(),
                })
                .unwrap();
            if !hits.is_empty() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert_eq!(hits, vec!["probe"]);

        db.delete_entity("probe").await.unwrap();
        for _ in 0..50 {
            hits = idx
                .search_entities(&SearchRequest {
                    expression: "probe".into(),
                })
                .unwrap();
            if hits.is_empty() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert!(hits.is_empty());

        handle.abort();
    }
}

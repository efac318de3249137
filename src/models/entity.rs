//! Entity record schema

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::Capability;

/// A principal record.
///
/// `number` uses -1 as the "allocate for me" sentinel; it never reaches
/// storage because the CREATE chain resolves it before the save hook runs.
/// `secret` only ever holds the secured form at rest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    #[serde(default)]
    pub id: String,

    #[serde(default = "unassigned_number")]
    pub number: i32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,

    #[serde(default)]
    pub meta: EntityMeta,
}

fn unassigned_number() -> i32 {
    -1
}

impl Default for Entity {
    fn default() -> Self {
        Self {
            id: String::new(),
            number: -1,
            secret: None,
            meta: EntityMeta::default(),
        }
    }
}

impl Entity {
    /// Copy of this entity with secure fields stripped, safe to hand to
    /// clients and the search index.
    pub fn safe_copy(&self) -> Entity {
        let mut e = self.clone();
        e.secret = None;
        e
    }
}

/// Typed and untyped metadata attached to an entity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gecos: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub legal_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub home: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shell: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub badge_number: Option<String>,

    #[serde(default)]
    pub locked: bool,

    /// Capabilities held directly; at most one occurrence of each value.
    #[serde(default)]
    pub capabilities: Vec<Capability>,

    /// Names of groups this entity is a direct member of.
    #[serde(default)]
    pub groups: Vec<String>,

    /// Opaque public key strings.
    #[serde(default)]
    pub keys: Vec<String>,

    /// Untyped key/value pairs stored as `"key:value"` strings. Keys may
    /// carry a Z-index suffix `key{N}`.
    #[serde(default)]
    pub untyped_meta: Vec<String>,

    /// Structured KV records: each key maps to an ordered list of values.
    #[serde(default)]
    pub kv: BTreeMap<String, Vec<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_number_is_unassigned() {
        assert_eq!(Entity::default().number, -1);
    }

    #[test]
    fn omitted_number_deserializes_unassigned() {
        let e: Entity = serde_json::from_str(r#"{"id":"probe"}"#).unwrap();
        assert_eq!(e.number, -1);
    }

    #[test]
    fn safe_copy_strips_secret() {
        let e = Entity {
            id: "probe".into(),
            number: 7,
            secret: Some("$argon2id$...".into()),
            meta: EntityMeta::default(),
        };
        let safe = e.safe_copy();
        assert!(safe.secret.is_none());
        assert_eq!(safe.id, "probe");
        assert_eq!(safe.number, 7);
    }
}

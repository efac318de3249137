//! Core record types
//!
//! Entities are principals (users and service accounts), groups are named
//! collections that can themselves carry capabilities. Both are plain serde
//! values; the storage driver decides how they are persisted.

mod capability;
mod entity;
mod group;

pub use capability::Capability;
pub use entity::{Entity, EntityMeta};
pub use group::{Expansion, ExpansionMode, Group};

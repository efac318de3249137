//! In-memory storage driver
//!
//! The default driver for tests and single-process deployments that don't
//! need persistence. Concurrent access goes through DashMap; the driver is
//! the serialization point for conflicting writes.

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::{broadcast, Mutex};

use super::{Driver, Event, EventKind};
use crate::models::{Entity, Group};
use crate::types::{GatehouseError, Result};

const EVENT_CHANNEL_CAPACITY: usize = 256;

pub struct MemoryDriver {
    entities: DashMap<String, Entity>,
    groups: DashMap<String, Group>,
    // Serializes creates so the number-uniqueness scan and the insert are
    // one atomic step with respect to other creates.
    write_lock: Mutex<()>,
    events: broadcast::Sender<Event>,
}

impl MemoryDriver {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            entities: DashMap::new(),
            groups: DashMap::new(),
            write_lock: Mutex::new(()),
            events,
        }
    }

    fn emit(&self, kind: EventKind, pk: &str) {
        // Nobody listening is fine; the index may not be wired up.
        let _ = self.events.send(Event {
            kind,
            pk: pk.to_string(),
        });
    }
}

impl Default for MemoryDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Driver for MemoryDriver {
    async fn load_entity(&self, id: &str) -> Result<Entity> {
        self.entities
            .get(id)
            .map(|e| e.clone())
            .ok_or(GatehouseError::UnknownEntity)
    }

    async fn load_entity_by_number(&self, number: i32) -> Result<Entity> {
        self.entities
            .iter()
            .find(|e| e.number == number)
            .map(|e| e.clone())
            .ok_or(GatehouseError::UnknownEntity)
    }

    async fn create_entity(&self, e: &Entity) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        if self.entities.iter().any(|r| r.number == e.number) {
            return Err(GatehouseError::DuplicateNumber);
        }
        match self.entities.entry(e.id.clone()) {
            Entry::Occupied(_) => Err(GatehouseError::DuplicateEntityID),
            Entry::Vacant(v) => {
                v.insert(e.clone());
                self.emit(EventKind::EntityCreate, &e.id);
                Ok(())
            }
        }
    }

    async fn save_entity(&self, e: &Entity) -> Result<()> {
        let kind = match self.entities.entry(e.id.clone()) {
            Entry::Occupied(mut o) => {
                o.insert(e.clone());
                EventKind::EntityUpdate
            }
            Entry::Vacant(v) => {
                v.insert(e.clone());
                EventKind::EntityCreate
            }
        };
        self.emit(kind, &e.id);
        Ok(())
    }

    async fn delete_entity(&self, id: &str) -> Result<()> {
        match self.entities.remove(id) {
            Some(_) => {
                self.emit(EventKind::EntityDestroy, id);
                Ok(())
            }
            None => Err(GatehouseError::UnknownEntity),
        }
    }

    async fn discover_entity_ids(&self) -> Result<Vec<String>> {
        Ok(self.entities.iter().map(|e| e.key().clone()).collect())
    }

    async fn next_entity_number(&self) -> Result<i32> {
        let max = self.entities.iter().map(|e| e.number).max().unwrap_or(0);
        Ok(max + 1)
    }

    async fn load_group(&self, name: &str) -> Result<Group> {
        self.groups
            .get(name)
            .map(|g| g.clone())
            .ok_or(GatehouseError::UnknownGroup)
    }

    async fn load_group_by_number(&self, number: i32) -> Result<Group> {
        self.groups
            .iter()
            .find(|g| g.number == number)
            .map(|g| g.clone())
            .ok_or(GatehouseError::UnknownGroup)
    }

    async fn create_group(&self, g: &Group) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        if self.groups.iter().any(|r| r.number == g.number) {
            return Err(GatehouseError::DuplicateNumber);
        }
        match self.groups.entry(g.name.clone()) {
            Entry::Occupied(_) => Err(GatehouseError::DuplicateGroupName),
            Entry::Vacant(v) => {
                v.insert(g.clone());
                self.emit(EventKind::GroupCreate, &g.name);
                Ok(())
            }
        }
    }

    async fn save_group(&self, g: &Group) -> Result<()> {
        let kind = match self.groups.entry(g.name.clone()) {
            Entry::Occupied(mut o) => {
                o.insert(g.clone());
                EventKind::GroupUpdate
            }
            Entry::Vacant(v) => {
                v.insert(g.clone());
                EventKind::GroupCreate
            }
        };
        self.emit(kind, &g.name);
        Ok(())
    }

    async fn delete_group(&self, name: &str) -> Result<()> {
        match self.groups.remove(name) {
            Some(_) => {
                self.emit(EventKind::GroupDestroy, name);
                Ok(())
            }
            None => Err(GatehouseError::UnknownGroup),
        }
    }

    async fn discover_group_names(&self) -> Result<Vec<String>> {
        Ok(self.groups.iter().map(|g| g.key().clone()).collect())
    }

    async fn next_group_number(&self) -> Result<i32> {
        let max = self.groups.iter().map(|g| g.number).max().unwrap_or(0);
        Ok(max + 1)
    }

    fn subscribe_events(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity(id: &str, number: i32) -> Entity {
        Entity {
            id: id.into(),
            number,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn entity_crud() {
        let db = MemoryDriver::new();

        assert_eq!(
            db.load_entity("probe").await.err(),
            Some(GatehouseError::UnknownEntity)
        );

        db.save_entity(&entity("probe", 1)).await.unwrap();
        assert_eq!(db.load_entity("probe").await.unwrap().number, 1);
        assert_eq!(db.load_entity_by_number(1).await.unwrap().id, "probe");

        db.delete_entity("probe").await.unwrap();
        assert_eq!(
            db.delete_entity("probe").await.err(),
            Some(GatehouseError::UnknownEntity)
        );
    }

    #[tokio::test]
    async fn create_refuses_taken_id_and_number() {
        let db = MemoryDriver::new();

        db.create_entity(&entity("probe", 1)).await.unwrap();
        assert_eq!(
            db.create_entity(&entity("probe", 2)).await.err(),
            Some(GatehouseError::DuplicateEntityID)
        );
        assert_eq!(
            db.create_entity(&entity("other", 1)).await.err(),
            Some(GatehouseError::DuplicateNumber)
        );

        // The refused creates changed nothing.
        assert_eq!(db.load_entity("probe").await.unwrap().number, 1);
        assert_eq!(db.discover_entity_ids().await.unwrap(), vec!["probe"]);
    }

    #[tokio::test]
    async fn create_group_refuses_taken_name() {
        let db = MemoryDriver::new();
        let g = Group {
            name: "ops".into(),
            number: 1,
            ..Default::default()
        };
        db.create_group(&g).await.unwrap();
        assert_eq!(
            db.create_group(&g).await.err(),
            Some(GatehouseError::DuplicateGroupName)
        );
    }

    #[tokio::test]
    async fn next_number_skips_taken_values() {
        let db = MemoryDriver::new();
        for n in [1, 2, 65] {
            db.save_entity(&entity(&format!("e{n}"), n)).await.unwrap();
        }

        let next = db.next_entity_number().await.unwrap();
        assert!(![1, 2, 65].contains(&next));

        db.save_entity(&entity("e23", 23)).await.unwrap();
        let next = db.next_entity_number().await.unwrap();
        assert!(![1, 2, 23, 65].contains(&next));
    }

    #[tokio::test]
    async fn events_fire_on_mutation() {
        let db = MemoryDriver::new();
        let mut rx = db.subscribe_events();

        db.save_entity(&entity("probe", 1)).await.unwrap();
        let ev = rx.recv().await.unwrap();
        assert_eq!(ev.kind, EventKind::EntityCreate);
        assert_eq!(ev.pk, "probe");

        db.save_entity(&entity("probe", 1)).await.unwrap();
        assert_eq!(rx.recv().await.unwrap().kind, EventKind::EntityUpdate);

        db.delete_entity("probe").await.unwrap();
        assert_eq!(rx.recv().await.unwrap().kind, EventKind::EntityDestroy);
    }

    #[tokio::test]
    async fn group_crud_and_events() {
        let db = MemoryDriver::new();
        let mut rx = db.subscribe_events();

        let g = Group {
            name: "ops".into(),
            number: 1,
            ..Default::default()
        };
        db.save_group(&g).await.unwrap();
        assert_eq!(rx.recv().await.unwrap().kind, EventKind::GroupCreate);
        assert_eq!(db.load_group("ops").await.unwrap().number, 1);
        assert_eq!(db.load_group_by_number(1).await.unwrap().name, "ops");
        assert_eq!(db.discover_group_names().await.unwrap(), vec!["ops"]);

        db.delete_group("ops").await.unwrap();
        assert_eq!(rx.recv().await.unwrap().kind, EventKind::GroupDestroy);
        assert_eq!(
            db.load_group("ops").await.err(),
            Some(GatehouseError::UnknownGroup)
        );
    }
}

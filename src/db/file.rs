//! File-backed storage driver
//!
//! Persists each record as one JSON document under the data directory:
//! `<data_dir>/entities/<id>.json` and `<data_dir>/groups/<name>.json`.
//! Suitable for single-writer deployments; there is no cross-process
//! coordination beyond the filesystem itself.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::{broadcast, Mutex};

use super::{Driver, Event, EventKind};
use crate::models::{Entity, Group};
use crate::types::{GatehouseError, Result};

const EVENT_CHANNEL_CAPACITY: usize = 256;

pub struct FileDriver {
    entity_dir: PathBuf,
    group_dir: PathBuf,
    // Serializes creates so the number-uniqueness scan and the create_new
    // open are one atomic step with respect to other creates.
    write_lock: Mutex<()>,
    events: broadcast::Sender<Event>,
}

impl FileDriver {
    pub fn new(data_dir: &Path) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            entity_dir: data_dir.join("entities"),
            group_dir: data_dir.join("groups"),
            write_lock: Mutex::new(()),
            events,
        }
    }

    fn emit(&self, kind: EventKind, pk: &str) {
        let _ = self.events.send(Event {
            kind,
            pk: pk.to_string(),
        });
    }

    fn record_path(dir: &Path, key: &str) -> Result<PathBuf> {
        // Record keys become file names; refuse anything that could walk
        // out of the data directory.
        if key.is_empty() || key.contains(['/', '\\']) || key == "." || key == ".." {
            return Err(GatehouseError::MalformedRequest(format!(
                "invalid record key: {key}"
            )));
        }
        Ok(dir.join(format!("{key}.json")))
    }

    async fn read_record<T: serde::de::DeserializeOwned>(
        path: &Path,
        missing: GatehouseError,
    ) -> Result<T> {
        let bytes = match fs::read(path).await {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(missing),
            Err(e) => return Err(GatehouseError::Internal(e.to_string())),
        };
        serde_json::from_slice(&bytes)
            .map_err(|e| GatehouseError::Internal(format!("corrupt record {path:?}: {e}")))
    }

    async fn write_record<T: serde::Serialize>(dir: &Path, path: &Path, record: &T) -> Result<()> {
        fs::create_dir_all(dir).await?;
        let bytes = serde_json::to_vec_pretty(record)
            .map_err(|e| GatehouseError::Internal(e.to_string()))?;
        fs::write(path, bytes).await?;
        Ok(())
    }

    /// Write a brand-new record; `create_new` makes the existence check and
    /// the file creation a single atomic filesystem operation.
    async fn write_new_record<T: serde::Serialize>(
        dir: &Path,
        path: &Path,
        record: &T,
        taken: GatehouseError,
    ) -> Result<()> {
        fs::create_dir_all(dir).await?;
        let bytes = serde_json::to_vec_pretty(record)
            .map_err(|e| GatehouseError::Internal(e.to_string()))?;
        let mut file = match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .await
        {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => return Err(taken),
            Err(e) => return Err(GatehouseError::Internal(e.to_string())),
        };
        file.write_all(&bytes).await?;
        Ok(())
    }

    async fn list_keys(dir: &Path) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        let mut entries = match fs::read_dir(dir).await {
            Ok(e) => e,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(keys),
            Err(e) => return Err(GatehouseError::Internal(e.to_string())),
        };
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| GatehouseError::Internal(e.to_string()))?
        {
            let name = entry.file_name();
            if let Some(stem) = Path::new(&name).file_stem().and_then(|s| s.to_str()) {
                keys.push(stem.to_string());
            }
        }
        Ok(keys)
    }
}

#[async_trait]
impl Driver for FileDriver {
    async fn load_entity(&self, id: &str) -> Result<Entity> {
        let path = Self::record_path(&self.entity_dir, id)?;
        Self::read_record(&path, GatehouseError::UnknownEntity).await
    }

    async fn load_entity_by_number(&self, number: i32) -> Result<Entity> {
        for id in self.discover_entity_ids().await? {
            let e = self.load_entity(&id).await?;
            if e.number == number {
                return Ok(e);
            }
        }
        Err(GatehouseError::UnknownEntity)
    }

    async fn create_entity(&self, e: &Entity) -> Result<()> {
        let path = Self::record_path(&self.entity_dir, &e.id)?;
        let _guard = self.write_lock.lock().await;
        for id in self.discover_entity_ids().await? {
            if self.load_entity(&id).await?.number == e.number {
                return Err(GatehouseError::DuplicateNumber);
            }
        }
        Self::write_new_record(
            &self.entity_dir,
            &path,
            e,
            GatehouseError::DuplicateEntityID,
        )
        .await?;
        self.emit(EventKind::EntityCreate, &e.id);
        Ok(())
    }

    async fn save_entity(&self, e: &Entity) -> Result<()> {
        let path = Self::record_path(&self.entity_dir, &e.id)?;
        let kind = if path.exists() {
            EventKind::EntityUpdate
        } else {
            EventKind::EntityCreate
        };
        Self::write_record(&self.entity_dir, &path, e).await?;
        self.emit(kind, &e.id);
        Ok(())
    }

    async fn delete_entity(&self, id: &str) -> Result<()> {
        let path = Self::record_path(&self.entity_dir, id)?;
        match fs::remove_file(&path).await {
            Ok(()) => {
                self.emit(EventKind::EntityDestroy, id);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(GatehouseError::UnknownEntity)
            }
            Err(e) => Err(GatehouseError::Internal(e.to_string())),
        }
    }

    async fn discover_entity_ids(&self) -> Result<Vec<String>> {
        Self::list_keys(&self.entity_dir).await
    }

    async fn next_entity_number(&self) -> Result<i32> {
        let mut max = 0;
        for id in self.discover_entity_ids().await? {
            max = max.max(self.load_entity(&id).await?.number);
        }
        Ok(max + 1)
    }

    async fn load_group(&self, name: &str) -> Result<Group> {
        let path = Self::record_path(&self.group_dir, name)?;
        Self::read_record(&path, GatehouseError::UnknownGroup).await
    }

    async fn load_group_by_number(&self, number: i32) -> Result<Group> {
        for name in self.discover_group_names().await? {
            let g = self.load_group(&name).await?;
            if g.number == number {
                return Ok(g);
            }
        }
        Err(GatehouseError::UnknownGroup)
    }

    async fn create_group(&self, g: &Group) -> Result<()> {
        let path = Self::record_path(&self.group_dir, &g.name)?;
        let _guard = self.write_lock.lock().await;
        for name in self.discover_group_names().await? {
            if self.load_group(&name).await?.number == g.number {
                return Err(GatehouseError::DuplicateNumber);
            }
        }
        Self::write_new_record(
            &self.group_dir,
            &path,
            g,
            GatehouseError::DuplicateGroupName,
        )
        .await?;
        self.emit(EventKind::GroupCreate, &g.name);
        Ok(())
    }

    async fn save_group(&self, g: &Group) -> Result<()> {
        let path = Self::record_path(&self.group_dir, &g.name)?;
        let kind = if path.exists() {
            EventKind::GroupUpdate
        } else {
            EventKind::GroupCreate
        };
        Self::write_record(&self.group_dir, &path, g).await?;
        self.emit(kind, &g.name);
        Ok(())
    }

    async fn delete_group(&self, name: &str) -> Result<()> {
        let path = Self::record_path(&self.group_dir, name)?;
        match fs::remove_file(&path).await {
            Ok(()) => {
                self.emit(EventKind::GroupDestroy, name);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(GatehouseError::UnknownGroup)
            }
            Err(e) => Err(GatehouseError::Internal(e.to_string())),
        }
    }

    async fn discover_group_names(&self) -> Result<Vec<String>> {
        Self::list_keys(&self.group_dir).await
    }

    async fn next_group_number(&self) -> Result<i32> {
        let mut max = 0;
        for name in self.discover_group_names().await? {
            max = max.max(self.load_group(&name).await?.number);
        }
        Ok(max + 1)
    }

    fn subscribe_events(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_driver() -> (tempfile::TempDir, FileDriver) {
        let dir = tempfile::tempdir().unwrap();
        let driver = FileDriver::new(dir.path());
        (dir, driver)
    }

    #[tokio::test]
    async fn entity_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let db = FileDriver::new(dir.path());
            db.save_entity(&Entity {
                id: "probe".into(),
                number: 4,
                ..Default::default()
            })
            .await
            .unwrap();
        }

        let db = FileDriver::new(dir.path());
        let e = db.load_entity("probe").await.unwrap();
        assert_eq!(e.number, 4);
        assert_eq!(db.discover_entity_ids().await.unwrap(), vec!["probe"]);
    }

    #[tokio::test]
    async fn missing_records_map_to_not_found() {
        let (_dir, db) = temp_driver();
        assert_eq!(
            db.load_entity("nope").await.err(),
            Some(GatehouseError::UnknownEntity)
        );
        assert_eq!(
            db.load_group("nope").await.err(),
            Some(GatehouseError::UnknownGroup)
        );
        assert_eq!(
            db.delete_entity("nope").await.err(),
            Some(GatehouseError::UnknownEntity)
        );
    }

    #[tokio::test]
    async fn hostile_keys_rejected() {
        let (_dir, db) = temp_driver();
        assert!(matches!(
            db.load_entity("../escape").await.err(),
            Some(GatehouseError::MalformedRequest(_))
        ));
        assert!(matches!(
            db.load_entity("").await.err(),
            Some(GatehouseError::MalformedRequest(_))
        ));
    }

    #[tokio::test]
    async fn create_refuses_existing_record() {
        let (_dir, db) = temp_driver();
        db.create_entity(&Entity {
            id: "probe".into(),
            number: 1,
            ..Default::default()
        })
        .await
        .unwrap();

        assert_eq!(
            db.create_entity(&Entity {
                id: "probe".into(),
                number: 2,
                ..Default::default()
            })
            .await
            .err(),
            Some(GatehouseError::DuplicateEntityID)
        );
        assert_eq!(
            db.create_entity(&Entity {
                id: "other".into(),
                number: 1,
                ..Default::default()
            })
            .await
            .err(),
            Some(GatehouseError::DuplicateNumber)
        );

        // The winner's record is intact.
        assert_eq!(db.load_entity("probe").await.unwrap().number, 1);
    }

    #[tokio::test]
    async fn next_number_scans_existing() {
        let (_dir, db) = temp_driver();
        for n in [1, 2, 65] {
            db.save_entity(&Entity {
                id: format!("e{n}"),
                number: n,
                ..Default::default()
            })
            .await
            .unwrap();
        }
        let next = db.next_entity_number().await.unwrap();
        assert!(![1, 2, 65].contains(&next));
    }
}

//! Draft persistence: a repository over an injected storage backend.
//!
//! The persisted shape is one JSON object keyed by draft id. Writes are
//! whole-record replacements, so two sessions editing different drafts
//! never conflict and the same draft is last-writer-wins. Entries that
//! fail structural validation on read are skipped, never surfaced as
//! errors.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

use crate::record::DraftRecord;

#[derive(Debug, Error)]
pub enum DraftError {
    #[error("draft storage failed: {0}")]
    Storage(#[from] io::Error),
    #[error("draft index could not be serialized: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("no draft with id `{0}`")]
    NotFound(String),
}

/// Backend the repository persists through. In-memory for tests, a file
/// on disk in production.
pub trait DraftStorage: Send {
    fn read(&self) -> io::Result<Option<String>>;
    fn write(&mut self, contents: &str) -> io::Result<()>;
}

#[derive(Debug, Default)]
pub struct MemoryStorage {
    contents: Option<String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DraftStorage for MemoryStorage {
    fn read(&self) -> io::Result<Option<String>> {
        Ok(self.contents.clone())
    }

    fn write(&mut self, contents: &str) -> io::Result<()> {
        self.contents = Some(contents.to_string());
        Ok(())
    }
}

/// File-backed storage. Writes go to a sibling `.tmp` file first and are
/// renamed into place so a crash mid-write never truncates the index.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl DraftStorage for FileStorage {
    fn read(&self) -> io::Result<Option<String>> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err),
        }
    }

    fn write(&mut self, contents: &str) -> io::Result<()> {
        if let Some(dir) = self.path.parent() {
            if !dir.exists() {
                fs::create_dir_all(dir)?;
            }
        }
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, contents)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

pub struct DraftRepository {
    storage: Box<dyn DraftStorage>,
}

impl DraftRepository {
    pub fn new(storage: Box<dyn DraftStorage>) -> Self {
        Self { storage }
    }

    /// All readable drafts, most recently updated first.
    pub fn list(&self) -> Result<Vec<DraftRecord>, DraftError> {
        let mut records: Vec<DraftRecord> = self.load()?.into_values().collect();
        records.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(records)
    }

    pub fn get(&self, draft_id: &str) -> Result<Option<DraftRecord>, DraftError> {
        Ok(self.load()?.remove(draft_id))
    }

    /// Creates a new draft stamped at `created_at` and persists it.
    pub fn create(
        &mut self,
        name: &str,
        template_key: &str,
        version: &str,
        data: Value,
        created_at: DateTime<Utc>,
    ) -> Result<DraftRecord, DraftError> {
        let record = DraftRecord::new(name, template_key, version, data, created_at);
        let mut index = self.load()?;
        index.insert(record.draft_id.clone(), record.clone());
        self.persist(&index)?;
        Ok(record)
    }

    /// Replaces the draft's data wholesale and re-stamps `updated_at`.
    pub fn save(
        &mut self,
        draft_id: &str,
        data: Value,
        updated_at: DateTime<Utc>,
    ) -> Result<DraftRecord, DraftError> {
        let mut index = self.load()?;
        let record = index
            .get_mut(draft_id)
            .ok_or_else(|| DraftError::NotFound(draft_id.to_string()))?;
        record.data = data;
        record.updated_at = updated_at;
        let saved = record.clone();
        self.persist(&index)?;
        Ok(saved)
    }

    pub fn rename(&mut self, draft_id: &str, name: &str) -> Result<(), DraftError> {
        let mut index = self.load()?;
        let record = index
            .get_mut(draft_id)
            .ok_or_else(|| DraftError::NotFound(draft_id.to_string()))?;
        record.name = name.to_string();
        self.persist(&index)?;
        Ok(())
    }

    pub fn delete(&mut self, draft_id: &str) -> Result<(), DraftError> {
        let mut index = self.load()?;
        if index.remove(draft_id).is_none() {
            return Err(DraftError::NotFound(draft_id.to_string()));
        }
        self.persist(&index)
    }

    fn load(&self) -> Result<BTreeMap<String, DraftRecord>, DraftError> {
        let Some(raw) = self.storage.read()? else {
            return Ok(BTreeMap::new());
        };
        if raw.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        let parsed: Value = match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(err) => {
                warn!(%err, "draft index is not valid JSON, starting empty");
                return Ok(BTreeMap::new());
            }
        };
        let Value::Object(entries) = parsed else {
            warn!("draft index root is not an object, starting empty");
            return Ok(BTreeMap::new());
        };
        let mut index = BTreeMap::new();
        for (draft_id, entry) in entries {
            match decode_entry(&draft_id, &entry) {
                Some(record) => {
                    index.insert(draft_id, record);
                }
                None => warn!(%draft_id, "skipping corrupt draft entry"),
            }
        }
        Ok(index)
    }

    fn persist(&mut self, index: &BTreeMap<String, DraftRecord>) -> Result<(), DraftError> {
        let serialized = serde_json::to_string(index)?;
        self.storage.write(&serialized)?;
        Ok(())
    }
}

/// Structural validation on read. `name`, `templateKey` and `version`
/// must be strings and `data` an array or object; anything else makes
/// the entry unreadable. A missing or unparseable `updatedAt` falls back
/// to the epoch rather than dropping the entry.
fn decode_entry(draft_id: &str, entry: &Value) -> Option<DraftRecord> {
    let name = entry.get("name")?.as_str()?;
    let template_key = entry.get("templateKey")?.as_str()?;
    let version = entry.get("version")?.as_str()?;
    let data = entry.get("data")?;
    if !data.is_array() && !data.is_object() {
        return None;
    }
    let updated_at = entry
        .get("updatedAt")
        .and_then(Value::as_str)
        .and_then(|raw| raw.parse::<DateTime<Utc>>().ok())
        .unwrap_or(DateTime::UNIX_EPOCH);
    Some(DraftRecord {
        draft_id: draft_id.to_string(),
        name: name.to_string(),
        template_key: template_key.to_string(),
        version: version.to_string(),
        data: data.clone(),
        updated_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn at(millis: i64) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(millis).unwrap()
    }

    fn memory_repo() -> DraftRepository {
        DraftRepository::new(Box::new(MemoryStorage::new()))
    }

    #[test]
    fn round_trip_preserves_key_version_and_data() {
        let mut repo = memory_repo();
        let data = json!({"Nameplate": {"ManufacturerName": "ACME"}});
        let created = repo
            .create("First pass", "nameplate", "2.0", data.clone(), at(1_000))
            .unwrap();

        let loaded = repo.get(&created.draft_id).unwrap().unwrap();
        assert_eq!(loaded.template_key, "nameplate");
        assert_eq!(loaded.version, "2.0");
        assert_eq!(loaded.data, data);
        assert_eq!(loaded.name, "First pass");
    }

    #[test]
    fn save_replaces_data_and_restamps() {
        let mut repo = memory_repo();
        let created = repo
            .create("Draft", "pcf", "1.0", json!({"a": 1}), at(1_000))
            .unwrap();
        let saved = repo
            .save(&created.draft_id, json!({"a": 2}), at(2_000))
            .unwrap();
        assert_eq!(saved.data, json!({"a": 2}));
        assert_eq!(saved.updated_at, at(2_000));

        let listed = repo.list().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].data, json!({"a": 2}));
    }

    #[test]
    fn list_orders_by_most_recent_update() {
        let mut repo = memory_repo();
        repo.create("Old", "a", "1", json!({}), at(1_000)).unwrap();
        repo.create("New", "b", "1", json!({}), at(5_000)).unwrap();
        let names: Vec<_> = repo.list().unwrap().into_iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["New", "Old"]);
    }

    #[test]
    fn rename_and_delete() {
        let mut repo = memory_repo();
        let created = repo.create("Draft", "a", "1", json!({}), at(0)).unwrap();
        repo.rename(&created.draft_id, "Renamed").unwrap();
        assert_eq!(
            repo.get(&created.draft_id).unwrap().unwrap().name,
            "Renamed"
        );

        repo.delete(&created.draft_id).unwrap();
        assert!(repo.get(&created.draft_id).unwrap().is_none());
        assert!(matches!(
            repo.delete(&created.draft_id),
            Err(DraftError::NotFound(_))
        ));
    }

    #[test]
    fn corrupt_entries_are_skipped_not_surfaced() {
        let mut storage = MemoryStorage::new();
        let index = json!({
            "good:1:0": {
                "draftId": "good:1:0",
                "name": "Good",
                "templateKey": "good",
                "version": "1",
                "data": {},
                "updatedAt": "2026-01-01T00:00:00Z"
            },
            "no-name:1:0": {
                "templateKey": "no-name",
                "version": "1",
                "data": {}
            },
            "bad-data:1:0": {
                "name": "Bad",
                "templateKey": "bad-data",
                "version": "1",
                "data": "scalar"
            }
        });
        storage.write(&index.to_string()).unwrap();
        let repo = DraftRepository::new(Box::new(storage));

        let listed = repo.list().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].name, "Good");
    }

    #[test]
    fn missing_updated_at_falls_back_to_epoch() {
        let mut storage = MemoryStorage::new();
        let index = json!({
            "d:1:0": {
                "name": "D",
                "templateKey": "d",
                "version": "1",
                "data": []
            }
        });
        storage.write(&index.to_string()).unwrap();
        let repo = DraftRepository::new(Box::new(storage));
        let record = repo.get("d:1:0").unwrap().unwrap();
        assert_eq!(record.updated_at, DateTime::UNIX_EPOCH);
    }

    #[test]
    fn unreadable_index_starts_empty_instead_of_failing() {
        let mut storage = MemoryStorage::new();
        storage.write("{not json").unwrap();
        let repo = DraftRepository::new(Box::new(storage));
        assert!(repo.list().unwrap().is_empty());
    }

    #[test]
    fn file_storage_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("drafts").join("index.json");

        let mut repo = DraftRepository::new(Box::new(FileStorage::new(&path)));
        let created = repo
            .create("Disk draft", "nameplate", "2.0", json!({"x": 1}), at(42))
            .unwrap();

        let reopened = DraftRepository::new(Box::new(FileStorage::new(&path)));
        let loaded = reopened.get(&created.draft_id).unwrap().unwrap();
        assert_eq!(loaded.data, json!({"x": 1}));
        assert!(!path.with_extension("tmp").exists());
    }
}

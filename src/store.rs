//! Watched list persistence.
//!
//! The list lives under a single key in a small key-value store. Anything
//! unreadable under that key is treated as "no prior data".

use anyhow::{Context, Result};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info, warn};

use crate::models::{MovieId, WatchedRecord, WatchedSummary};

pub const WATCHED_KEY: &str = "watched";

pub trait KeyValueStorage: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
}

/// JSON object on disk, one string value per key.
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn read_entries(&self) -> Result<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let text = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read {}", self.path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse {}", self.path.display()))
    }
}

impl KeyValueStorage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.read_entries()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.read_entries().unwrap_or_else(|e| {
            warn!("Discarding unreadable storage file: {:#}", e);
            BTreeMap::new()
        });
        entries.insert(key.to_string(), value.to_string());

        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
        }
        let body = serde_json::to_string_pretty(&entries).context("Failed to encode storage")?;
        // Write then rename so readers never see half a file.
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, body).with_context(|| format!("Failed to write {}", tmp.display()))?;
        if let Err(e) = fs::rename(&tmp, &self.path) {
            if let Err(cleanup) = fs::remove_file(&tmp) {
                warn!("Failed to remove {}: {}", tmp.display(), cleanup);
            }
            return Err(e).with_context(|| format!("Failed to replace {}", self.path.display()));
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl KeyValueStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

pub fn load(storage: &dyn KeyValueStorage) -> Vec<WatchedRecord> {
    let raw = match storage.get(WATCHED_KEY) {
        Ok(Some(raw)) => raw,
        Ok(None) => return Vec::new(),
        Err(e) => {
            warn!("Failed to read watched list, starting empty: {:#}", e);
            return Vec::new();
        }
    };
    match serde_json::from_str(&raw) {
        Ok(records) => records,
        Err(e) => {
            warn!("Stored watched list is corrupt, starting empty: {}", e);
            Vec::new()
        }
    }
}

pub fn save(storage: &dyn KeyValueStorage, records: &[WatchedRecord]) -> Result<()> {
    let raw = serde_json::to_string(records).context("Failed to encode watched list")?;
    storage.set(WATCHED_KEY, &raw)
}

#[derive(Debug, thiserror::Error)]
pub enum WatchedError {
    #[error("'{0}' is already in the watched list")]
    AlreadyWatched(MovieId),
    #[error("'{0}' is not in the watched list")]
    NotFound(MovieId),
    #[error("Failed to persist watched list: {0:#}")]
    Persist(#[source] anyhow::Error),
}

/// In-memory mirror of the persisted list. Every mutation is written through
/// before it returns; a failed write leaves memory unchanged.
pub struct WatchedList {
    records: Vec<WatchedRecord>,
    storage: Arc<dyn KeyValueStorage>,
}

impl WatchedList {
    pub fn load(storage: Arc<dyn KeyValueStorage>) -> Self {
        let records = load(storage.as_ref());
        info!("Loaded {} watched movies", records.len());
        Self { records, storage }
    }

    pub fn records(&self) -> &[WatchedRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn contains(&self, id: &MovieId) -> bool {
        self.get(id).is_some()
    }

    pub fn get(&self, id: &MovieId) -> Option<&WatchedRecord> {
        self.records.iter().find(|r| &r.id == id)
    }

    pub fn summary(&self) -> WatchedSummary {
        WatchedSummary::from_records(&self.records)
    }

    pub fn insert(&mut self, record: WatchedRecord) -> Result<(), WatchedError> {
        if self.contains(&record.id) {
            return Err(WatchedError::AlreadyWatched(record.id));
        }
        let mut next = self.records.clone();
        next.push(record);
        self.commit(next)
    }

    pub fn remove(&mut self, id: &MovieId) -> Result<WatchedRecord, WatchedError> {
        let Some(pos) = self.records.iter().position(|r| &r.id == id) else {
            return Err(WatchedError::NotFound(id.clone()));
        };
        let mut next = self.records.clone();
        let removed = next.remove(pos);
        self.commit(next)?;
        Ok(removed)
    }

    fn commit(&mut self, next: Vec<WatchedRecord>) -> Result<(), WatchedError> {
        save(self.storage.as_ref(), &next).map_err(WatchedError::Persist)?;
        debug!(count = next.len(), "Watched list persisted");
        self.records = next;
        Ok(())
    }
}

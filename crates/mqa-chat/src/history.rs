//! Persisted conversation history.
//!
//! The whole conversation lives in one key-value slot as a JSON
//! [`PersistedSnapshot`]. Loading never fails: unreadable data is erased and
//! the empty state is returned. Saving is best-effort: failures are logged
//! and the conversation carries on.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use mqa_core::types::PersistedSnapshot;
use tracing::{debug, warn};

use crate::error::StoreError;

// =============================================================================
// SlotStore
// =============================================================================

/// Minimal key-value storage, the shape of browser `localStorage`.
pub trait SlotStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// In-process store, optionally bounded by a total byte quota.
#[derive(Debug, Default)]
pub struct MemoryStore {
    slots: Mutex<HashMap<String, String>>,
    quota: Option<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that rejects writes once the stored values would exceed
    /// `limit` bytes in total.
    pub fn with_quota(limit: usize) -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            quota: Some(limit),
        }
    }
}

impl SlotStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let slots = self.slots.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(slots.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut slots = self.slots.lock().map_err(|_| StoreError::Poisoned)?;
        if let Some(limit) = self.quota {
            let others: usize = slots
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(_, v)| v.len())
                .sum();
            let size = others + value.len();
            if size > limit {
                return Err(StoreError::QuotaExceeded { size, limit });
            }
        }
        slots.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut slots = self.slots.lock().map_err(|_| StoreError::Poisoned)?;
        slots.remove(key);
        Ok(())
    }
}

/// One `<key>.json` file per slot inside a directory.
///
/// Writes go through a temporary file and a rename so a crash never leaves
/// a half-written slot behind.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Create `dir` if needed and return a store rooted there.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let store = Self::new(dir);
        std::fs::create_dir_all(&store.dir)?;
        Ok(store)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn slot_path(&self, key: &str) -> Result<PathBuf, StoreError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl SlotStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let path = self.slot_path(key)?;
        match std::fs::read_to_string(&path) {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let path = self.slot_path(key)?;
        std::fs::create_dir_all(&self.dir)?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, value)?;
        std::fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let path = self.slot_path(key)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

// =============================================================================
// HistoryStore
// =============================================================================

/// Load/save/clear the conversation snapshot under one fixed key.
#[derive(Clone)]
pub struct HistoryStore {
    store: Arc<dyn SlotStore>,
    key: String,
}

impl HistoryStore {
    pub fn new(store: Arc<dyn SlotStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    /// History backed by a fresh in-memory store.
    pub fn in_memory(key: impl Into<String>) -> Self {
        Self::new(Arc::new(MemoryStore::new()), key)
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Read the stored snapshot.
    ///
    /// Missing data yields the empty state. Data that fails to parse is
    /// erased and also yields the empty state.
    pub fn load(&self) -> PersistedSnapshot {
        let raw = match self.store.get(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return PersistedSnapshot::default(),
            Err(e) => {
                warn!(key = %self.key, error = %e, "Failed to read chat history");
                return PersistedSnapshot::default();
            }
        };

        match serde_json::from_str::<PersistedSnapshot>(&raw) {
            Ok(snapshot) => {
                debug!(
                    key = %self.key,
                    messages = snapshot.messages.len(),
                    "Chat history loaded"
                );
                snapshot
            }
            Err(e) => {
                warn!(key = %self.key, error = %e, "Discarding corrupt chat history");
                self.clear();
                PersistedSnapshot::default()
            }
        }
    }

    /// Overwrite the slot with `snapshot`. Failures are logged, not returned.
    pub fn save(&self, snapshot: &PersistedSnapshot) {
        let raw = match serde_json::to_string(snapshot) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(key = %self.key, error = %e, "Failed to serialize chat history");
                return;
            }
        };
        if let Err(e) = self.store.set(&self.key, &raw) {
            warn!(key = %self.key, error = %e, "Failed to save chat history");
        }
    }

    /// Erase the slot unconditionally.
    pub fn clear(&self) {
        if let Err(e) = self.store.remove(&self.key) {
            warn!(key = %self.key, error = %e, "Failed to clear chat history");
        }
    }
}

impl std::fmt::Debug for HistoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistoryStore").field("key", &self.key).finish()
    }
}

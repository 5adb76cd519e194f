//! Persistent state store.
//!
//! A durable key/value store is the single source of truth for timer state.
//! Values are JSON so the owner and the controller mirror share one record
//! format and a partially written record can still be read field by field.
//!
//! - [`MemoryStore`]: in-process store for tests and ephemeral owners
//! - [`JsonFileStore`]: one JSON object per file with atomic replacement
//! - [`TimerRepository`]: maps a [`crate::types::TimerState`] onto a key set

mod error;
mod file;
mod keys;
mod repository;

use std::sync::Mutex;

use serde_json::{Map, Value};

pub use error::StoreError;
pub use file::JsonFileStore;
pub use keys::{StoreKeys, OWNER_KEYS, STANDALONE_KEYS};
pub use repository::TimerRepository;

/// Durable key/value storage.
///
/// Implementations must tolerate concurrent readers; writers are expected
/// to be a single authoritative owner per key set.
pub trait KeyValueStore: Send + Sync {
    /// Returns the entries present for `keys`. Missing keys are omitted.
    fn get_many(&self, keys: &[&str]) -> Result<Map<String, Value>, StoreError>;

    /// Inserts or replaces the given entries.
    fn set_many(&self, entries: Map<String, Value>) -> Result<(), StoreError>;

    /// Deletes the given keys. Missing keys are ignored.
    fn remove(&self, keys: &[&str]) -> Result<(), StoreError>;

    /// Returns a single entry.
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.get_many(&[key])?.remove(key))
    }
}

/// In-memory store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<Map<String, Value>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    /// Returns true if the store holds no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyValueStore for MemoryStore {
    fn get_many(&self, keys: &[&str]) -> Result<Map<String, Value>, StoreError> {
        let entries = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(keys
            .iter()
            .filter_map(|key| entries.get(*key).map(|v| ((*key).to_string(), v.clone())))
            .collect())
    }

    fn set_many(&self, updates: Map<String, Value>) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
        entries.extend(updates);
        Ok(())
    }

    fn remove(&self, keys: &[&str]) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
        for key in keys {
            entries.remove(*key);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_memory_store_set_get() {
        let store = MemoryStore::new();
        assert!(store.is_empty());

        let mut entries = Map::new();
        entries.insert("isRunning".to_string(), json!(true));
        entries.insert("timerEndTime".to_string(), json!(42));
        store.set_many(entries).unwrap();

        assert_eq!(store.len(), 2);
        assert_eq!(store.get("isRunning").unwrap(), Some(json!(true)));
        assert_eq!(store.get("missing").unwrap(), None);

        let many = store.get_many(&["timerEndTime", "missing"]).unwrap();
        assert_eq!(many.len(), 1);
        assert_eq!(many["timerEndTime"], json!(42));
    }

    #[test]
    fn test_memory_store_overwrite_and_remove() {
        let store = MemoryStore::new();
        let mut entries = Map::new();
        entries.insert("a".to_string(), json!(1));
        store.set_many(entries).unwrap();

        let mut entries = Map::new();
        entries.insert("a".to_string(), json!(2));
        store.set_many(entries).unwrap();
        assert_eq!(store.get("a").unwrap(), Some(json!(2)));

        store.remove(&["a", "never-set"]).unwrap();
        assert!(store.is_empty());
    }
}

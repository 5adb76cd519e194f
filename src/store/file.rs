//! File-backed key/value store.
//!
//! The whole store is one JSON object. Every read goes to disk so separate
//! controller processes observe each other's last write, and every write
//! replaces the file atomically (temp file + rename) so a crash mid-write
//! leaves the previous record intact.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde_json::{Map, Value};
use tempfile::NamedTempFile;
use tracing::warn;

use super::{KeyValueStore, StoreError};

/// JSON object file store.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    /// Serializes read-modify-write cycles within this process.
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    /// Creates a store backed by `path`.
    ///
    /// The file and its parent directory are created on first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Returns the backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the whole object.
    ///
    /// A missing, empty or corrupt file reads as an empty store.
    fn read_all(&self) -> Result<Map<String, Value>, StoreError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => return Err(e.into()),
        };

        if content.trim().is_empty() {
            return Ok(Map::new());
        }

        match serde_json::from_str::<Value>(&content) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => {
                warn!("Store file {:?} is not a JSON object, treating as empty", self.path);
                Ok(Map::new())
            }
            Err(e) => {
                warn!("Store file {:?} is corrupt ({}), treating as empty", self.path, e);
                Ok(Map::new())
            }
        }
    }

    /// Atomically replaces the file with `entries`.
    ///
    /// The contents reach the disk before the rename, so a crash leaves
    /// either the old file or the complete new one.
    fn write_all(&self, entries: &Map<String, Value>) -> Result<(), StoreError> {
        let parent = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&parent)?;

        let content = serde_json::to_string_pretty(entries)?;
        let mut temp_file = NamedTempFile::new_in(&parent)?;
        temp_file.write_all(content.as_bytes())?;
        temp_file.flush()?;
        temp_file.as_file().sync_all()?;
        temp_file.persist(&self.path).map_err(|e| e.error)?;

        Ok(())
    }
}

impl KeyValueStore for JsonFileStore {
    fn get_many(&self, keys: &[&str]) -> Result<Map<String, Value>, StoreError> {
        let mut all = self.read_all()?;
        Ok(keys
            .iter()
            .filter_map(|key| all.remove(*key).map(|v| ((*key).to_string(), v)))
            .collect())
    }

    fn set_many(&self, updates: Map<String, Value>) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().map_err(|_| StoreError::Poisoned)?;
        let mut all = self.read_all()?;
        all.extend(updates);
        self.write_all(&all)
    }

    fn remove(&self, keys: &[&str]) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().map_err(|_| StoreError::Poisoned)?;
        let mut all = self.read_all()?;
        let before = all.len();
        for key in keys {
            all.remove(*key);
        }
        if all.len() == before {
            return Ok(());
        }
        self.write_all(&all)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entries(pairs: &[(&str, Value)]) -> Map<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_missing_file_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("state.json"));
        assert!(store.get_many(&["isRunning"]).unwrap().is_empty());
    }

    #[test]
    fn test_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("state.json");

        let store = JsonFileStore::new(&path);
        store
            .set_many(entries(&[("isRunning", json!(true)), ("timerEndTime", json!(7))]))
            .unwrap();

        let reopened = JsonFileStore::new(&path);
        assert_eq!(reopened.get("timerEndTime").unwrap(), Some(json!(7)));
        assert_eq!(reopened.path(), path.as_path());
    }

    #[test]
    fn test_set_merges_with_existing_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("state.json"));

        store.set_many(entries(&[("a", json!(1))])).unwrap();
        store.set_many(entries(&[("b", json!(2))])).unwrap();

        let all = store.get_many(&["a", "b"]).unwrap();
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn test_corrupt_file_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, "{\"isRunning\": tr").unwrap();

        let store = JsonFileStore::new(&path);
        assert!(store.get_many(&["isRunning"]).unwrap().is_empty());

        store.set_many(entries(&[("isRunning", json!(false))])).unwrap();
        assert_eq!(store.get("isRunning").unwrap(), Some(json!(false)));
    }

    #[test]
    fn test_non_object_file_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, "[1, 2, 3]").unwrap();

        let store = JsonFileStore::new(&path);
        assert!(store.get_many(&["a"]).unwrap().is_empty());
    }

    #[test]
    fn test_remove() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("state.json"));
        store
            .set_many(entries(&[("a", json!(1)), ("b", json!(2))]))
            .unwrap();

        store.remove(&["a", "zzz"]).unwrap();

        assert_eq!(store.get("a").unwrap(), None);
        assert_eq!(store.get("b").unwrap(), Some(json!(2)));
    }

    #[test]
    fn test_save_leaves_complete_file_and_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        let store = JsonFileStore::new(&path);

        for end in [100, 200, 300] {
            store
                .set_many(entries(&[("isRunning", json!(true)), ("timerEndTime", json!(end))]))
                .unwrap();
        }

        let on_disk: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(on_disk["timerEndTime"], json!(300));
        let files: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(files.len(), 1);
    }
}

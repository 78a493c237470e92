use crate::core::StreamError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::PathBuf;

/// A JSON-file-backed key-value store with a get/set/delete contract.
///
/// Settings and thread records both live behind this contract; persistence
/// is a collaborator of the stream core, not part of it.
pub struct JsonStore {
    path: PathBuf,
    entries: Map<String, Value>,
}

impl JsonStore {
    /// Opens the store at `path`, loading existing entries if the file exists.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StreamError> {
        let path = path.into();
        let entries = if path.exists() {
            let contents = fs::read_to_string(&path)
                .map_err(|e| StreamError::Store(format!("Failed to read {path:?}: {e}")))?;
            serde_json::from_str(&contents)
                .map_err(|e| StreamError::Store(format!("Failed to parse {path:?}: {e}")))?
        } else {
            Map::new()
        };
        Ok(Self { path, entries })
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Returns the value at `key` as a string, or an empty string when absent.
    pub fn get_string(&self, key: &str) -> String {
        self.entries
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    }

    pub fn get_record<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.entries.get(key)?;
        serde_json::from_value(value.clone()).ok()
    }

    pub fn set(&mut self, key: impl Into<String>, value: Value) -> Result<(), StreamError> {
        self.entries.insert(key.into(), value);
        self.flush()
    }

    pub fn set_record<T: Serialize>(&mut self, key: &str, record: &T) -> Result<(), StreamError> {
        let value = serde_json::to_value(record)
            .map_err(|e| StreamError::Store(format!("Failed to serialize `{key}`: {e}")))?;
        self.set(key, value)
    }

    pub fn delete(&mut self, key: &str) -> Result<bool, StreamError> {
        let removed = self.entries.remove(key).is_some();
        if removed {
            self.flush()?;
        }
        Ok(removed)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    fn flush(&self) -> Result<(), StreamError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| StreamError::Store(format!("Failed to create {parent:?}: {e}")))?;
        }
        let contents = serde_json::to_string_pretty(&self.entries)
            .map_err(|e| StreamError::Store(format!("Failed to serialize store: {e}")))?;
        fs::write(&self.path, contents)
            .map_err(|e| StreamError::Store(format!("Failed to write {path:?}: {e}", path = self.path)))
    }
}

/// A locally-tracked conversation thread.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreadRecord {
    pub id: String,
    #[serde(default)]
    pub title: String,
    pub created_at: i64,
    #[serde(default)]
    pub file_ids: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");

        let mut store = JsonStore::open(&path).unwrap();
        store.set("api_key", json!("sk-test")).unwrap();
        store
            .set_record(
                "thread_abc",
                &ThreadRecord {
                    id: "thread_abc".to_string(),
                    title: "Test".to_string(),
                    created_at: 1_700_000_000,
                    file_ids: vec!["file-1".to_string()],
                },
            )
            .unwrap();

        let reloaded = JsonStore::open(&path).unwrap();
        assert_eq!(reloaded.get_string("api_key"), "sk-test");
        let record: ThreadRecord = reloaded.get_record("thread_abc").unwrap();
        assert_eq!(record.title, "Test");
        assert_eq!(record.file_ids, vec!["file-1".to_string()]);
    }

    #[test]
    fn test_store_delete() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("threads.json");

        let mut store = JsonStore::open(&path).unwrap();
        store.set("a", json!(1)).unwrap();
        assert!(store.delete("a").unwrap());
        assert!(!store.delete("a").unwrap());

        let reloaded = JsonStore::open(&path).unwrap();
        assert!(reloaded.get("a").is_none());
    }

    #[test]
    fn test_missing_key_is_empty_string() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::open(dir.path().join("none.json")).unwrap();
        assert_eq!(store.get_string("absent"), "");
    }
}

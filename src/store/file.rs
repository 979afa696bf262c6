//! Key-value persistence backends.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::error::StoreError;
use super::KeyValueStore;

/// Application directory name under the user config directory.
const APP_DIR_NAME: &str = "focusfield";

/// File name of the settings object.
const SETTINGS_FILE_NAME: &str = "settings.json";

// ============================================================================
// JsonFileStore
// ============================================================================

/// Stores string values in a single JSON object file.
///
/// The whole object is rewritten on every `set`; the file is small.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    values: Map<String, Value>,
}

impl JsonFileStore {
    /// Opens the store at `path`, starting empty if the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or is not a
    /// JSON object.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let values = match fs::read_to_string(&path) {
            Ok(contents) => parse_object(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("Settings file not found, starting empty: {}", path.display());
                Map::new()
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Self { path, values })
    }

    /// Opens the store at `path`, discarding unreadable contents.
    ///
    /// A corrupt settings file must not prevent the timer from starting.
    #[must_use]
    pub fn open_or_empty(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        match Self::open(&path) {
            Ok(store) => store,
            Err(e) => {
                if e.is_malformed() {
                    let backup = backup_path(&path);
                    match fs::rename(&path, &backup) {
                        Ok(()) => warn!(
                            "Malformed settings file {} moved to {}: {}",
                            path.display(),
                            backup.display(),
                            e
                        ),
                        Err(io) => warn!(
                            "Malformed settings file {} will be overwritten ({}; backup failed: {})",
                            path.display(),
                            e,
                            io
                        ),
                    }
                } else {
                    warn!("Cannot read settings file {}: {}", path.display(), e);
                }
                Self {
                    path,
                    values: Map::new(),
                }
            }
        }
    }

    /// Returns the default settings path under the user config directory.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::ConfigDirNotFound` if the platform has no config
    /// directory.
    pub fn default_path() -> Result<PathBuf, StoreError> {
        let dir = dirs::config_dir().ok_or(StoreError::ConfigDirNotFound)?;
        Ok(dir.join(APP_DIR_NAME).join(SETTINGS_FILE_NAME))
    }

    /// Returns the backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(&self.values)?;
        fs::write(&self.path, contents)?;
        debug!("Settings written to {}", self.path.display());
        Ok(())
    }
}

/// Returns `path` with `.bak` appended to the file name.
fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".bak");
    PathBuf::from(name)
}

fn parse_object(contents: &str) -> Result<Map<String, Value>, StoreError> {
    if contents.trim().is_empty() {
        return Ok(Map::new());
    }
    match serde_json::from_str::<Value>(contents)? {
        Value::Object(map) => Ok(map),
        other => Err(StoreError::Malformed(format!(
            "expected a JSON object, found {}",
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.values.get(key).map(|value| match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.values
            .insert(key.to_string(), Value::String(value.to_string()));
        self.flush()
    }
}

// ============================================================================
// MemoryStore
// ============================================================================

/// In-memory store, used when no file should be touched.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    values: HashMap<String, String>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with the given pairs.
    #[must_use]
    pub fn with_values<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        Self {
            values: pairs
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod json_file_store_tests {
        use super::*;

        #[test]
        fn test_open_missing_file_is_empty() {
            let dir = tempfile::tempdir().unwrap();
            let store = JsonFileStore::open(dir.path().join("settings.json")).unwrap();
            assert_eq!(store.get("focusMinutes").unwrap(), None);
        }

        #[test]
        fn test_set_persists_to_disk() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("nested").join("settings.json");

            let mut store = JsonFileStore::open(&path).unwrap();
            store.set("focusMinutes", "45").unwrap();

            let reopened = JsonFileStore::open(&path).unwrap();
            assert_eq!(reopened.get("focusMinutes").unwrap(), Some("45".to_string()));
        }

        #[test]
        fn test_numeric_values_are_read_as_strings() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("settings.json");
            fs::write(&path, r#"{"breakMinutes": 7}"#).unwrap();

            let store = JsonFileStore::open(&path).unwrap();
            assert_eq!(store.get("breakMinutes").unwrap(), Some("7".to_string()));
        }

        #[test]
        fn test_non_object_is_malformed() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("settings.json");
            fs::write(&path, "[1, 2, 3]").unwrap();

            let err = JsonFileStore::open(&path).unwrap_err();
            assert!(err.is_malformed());
        }

        #[test]
        fn test_open_or_empty_recovers_from_garbage() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("settings.json");
            fs::write(&path, "not json").unwrap();

            let store = JsonFileStore::open_or_empty(&path);
            assert_eq!(store.get("focusMinutes").unwrap(), None);
            assert_eq!(store.path(), path.as_path());
        }

        #[test]
        fn test_open_or_empty_keeps_garbage_as_backup() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("settings.json");
            fs::write(&path, "not json").unwrap();

            let mut store = JsonFileStore::open_or_empty(&path);
            store.set("focusMinutes", "40").unwrap();

            let backup = dir.path().join("settings.json.bak");
            assert_eq!(fs::read_to_string(backup).unwrap(), "not json");
            assert_eq!(
                JsonFileStore::open(&path).unwrap().get("focusMinutes").unwrap(),
                Some("40".to_string())
            );
        }

        #[test]
        fn test_empty_file_is_empty_object() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("settings.json");
            fs::write(&path, "  \n").unwrap();

            assert!(JsonFileStore::open(&path).is_ok());
        }
    }

    mod memory_store_tests {
        use super::*;

        #[test]
        fn test_round_trip() {
            let mut store = MemoryStore::new();
            store.set("breakMinutes", "10").unwrap();
            assert_eq!(store.get("breakMinutes").unwrap(), Some("10".to_string()));
        }

        #[test]
        fn test_with_values() {
            let store = MemoryStore::with_values([("focusMinutes", "25")]);
            assert_eq!(store.get("focusMinutes").unwrap(), Some("25".to_string()));
            assert_eq!(store.get("breakMinutes").unwrap(), None);
        }
    }
}

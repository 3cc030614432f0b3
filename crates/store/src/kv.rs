//! Key-value storage backends.
//!
//! Single-key reads and writes are atomic with respect to each other; there
//! is no cross-key transaction.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use tracing::debug;

use crate::StoreError;

/// Durable string key-value storage.
pub trait KeyValueStore: Send + Sync {
    /// Returns the value stored under `key`, if any.
    fn get(&self, key: &str) -> Option<String>;

    /// Stores `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

/// Key-value store cached in memory and persisted to a JSON file.
pub struct JsonFileStore {
    path: PathBuf,
    values: RwLock<HashMap<String, String>>,
}

impl JsonFileStore {
    /// Opens the store, loading existing values from disk.
    pub fn open(path: PathBuf) -> Result<Self, StoreError> {
        let values = load_values(&path)?;
        Ok(Self {
            path,
            values: RwLock::new(values),
        })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes `map` to disk.
    fn persist(&self, map: &HashMap<String, String>) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(map)?;
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, json)?;
        debug!("persisted {} key(s) to {:?}", map.len(), self.path);
        Ok(())
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        // Held across the write so concurrent setters land on disk in order.
        let mut map = self.values.write().unwrap_or_else(PoisonError::into_inner);
        // Readers only see the value once it is on disk.
        let mut staged = map.clone();
        staged.insert(key.to_string(), value.to_string());
        self.persist(&staged)?;
        *map = staged;
        Ok(())
    }
}

/// Loads values from a JSON file on disk.
fn load_values(path: &Path) -> Result<HashMap<String, String>, StoreError> {
    if !path.exists() {
        return Ok(HashMap::new());
    }
    let data = std::fs::read_to_string(path)?;
    let values: HashMap<String, String> = serde_json::from_str(&data)?;
    debug!("loaded {} key(s) from {:?}", values.len(), path);
    Ok(values)
}

/// Volatile store, mostly for tests and one-shot runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.values
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

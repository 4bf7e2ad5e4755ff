use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::sync::RwLock;

use super::{Storage, StorageError, StorageResult};

/// Non-durable storage, for tests and hosts without persistence.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    slots: RwLock<HashMap<String, JsonValue>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn keys(&self) -> Vec<String> {
        self.slots
            .read()
            .map(|slots| slots.keys().cloned().collect())
            .unwrap_or_default()
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> StorageResult<Option<JsonValue>> {
        let slots = self
            .slots
            .read()
            .map_err(|_| StorageError::backend("get", "lock poisoned"))?;
        Ok(slots.get(key).cloned())
    }

    fn put(&self, key: &str, value: &JsonValue) -> StorageResult<()> {
        let mut slots = self
            .slots
            .write()
            .map_err(|_| StorageError::backend("put", "lock poisoned"))?;
        slots.insert(key.to_string(), value.clone());
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        let mut slots = self
            .slots
            .write()
            .map_err(|_| StorageError::backend("remove", "lock poisoned"))?;
        slots.remove(key);
        Ok(())
    }
}

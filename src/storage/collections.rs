//! Named persisted collections on top of the storage port.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::sync::Arc;

use super::{Storage, StorageError, StorageResult};
use crate::constants::{
    DEFAULT_AUTOSAVE_KEY, DEFAULT_ENTRIES_KEY, DEFAULT_QUEUE_KEY, DEFAULT_SEQUENCE_KEY,
};
use crate::store::Snapshot;

/// Storage keys for each collection. Two engines sharing a storage must use
/// distinct keys unless they are meant to share entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageKeys {
    pub autosave: String,
    pub entries: String,
    pub queue: String,
    pub sequence: String,
}

impl Default for StorageKeys {
    fn default() -> Self {
        Self {
            autosave: DEFAULT_AUTOSAVE_KEY.to_string(),
            entries: DEFAULT_ENTRIES_KEY.to_string(),
            queue: DEFAULT_QUEUE_KEY.to_string(),
            sequence: DEFAULT_SEQUENCE_KEY.to_string(),
        }
    }
}

impl StorageKeys {
    /// Keys namespaced under `prefix`, e.g. `registration/submitted_entries`.
    pub fn namespaced(prefix: &str) -> Self {
        let defaults = Self::default();
        Self {
            autosave: format!("{}/{}", prefix, defaults.autosave),
            entries: format!("{}/{}", prefix, defaults.entries),
            queue: format!("{}/{}", prefix, defaults.queue),
            sequence: format!("{}/{}", prefix, defaults.sequence),
        }
    }
}

/// Typed access to the autosave slot, the submitted-entries collection,
/// the pending queue and the sequence counter.
#[derive(Clone)]
pub struct Collections {
    storage: Arc<dyn Storage>,
    keys: StorageKeys,
}

impl Collections {
    pub fn new(storage: Arc<dyn Storage>, keys: StorageKeys) -> Self {
        Self { storage, keys }
    }

    pub fn keys(&self) -> &StorageKeys {
        &self.keys
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    fn load<T: DeserializeOwned>(&self, key: &str) -> StorageResult<Option<T>> {
        match self.storage.get(key)? {
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|e| StorageError::serialization(key, e)),
            None => Ok(None),
        }
    }

    fn save<T: Serialize>(&self, key: &str, item: &T) -> StorageResult<()> {
        let value = serde_json::to_value(item).map_err(|e| StorageError::serialization(key, e))?;
        self.storage.put(key, &value)
    }

    pub fn load_list<T: DeserializeOwned>(&self, key: &str) -> StorageResult<Vec<T>> {
        Ok(self.load(key)?.unwrap_or_default())
    }

    pub fn save_list<T: Serialize>(&self, key: &str, items: &[T]) -> StorageResult<()> {
        self.save(key, &items)
    }

    // ========== AUTOSAVE SLOT ==========

    pub fn load_draft(&self) -> StorageResult<Option<Snapshot>> {
        self.load(&self.keys.autosave)
    }

    pub fn save_draft(&self, snapshot: &Snapshot) -> StorageResult<()> {
        self.save(&self.keys.autosave, snapshot)
    }

    pub fn clear_draft(&self) -> StorageResult<()> {
        self.storage.remove(&self.keys.autosave)
    }

    // ========== SUBMITTED ENTRIES ==========

    pub fn entries(&self) -> StorageResult<Vec<Snapshot>> {
        self.load_list(&self.keys.entries)
    }

    pub fn replace_entries(&self, entries: &[Snapshot]) -> StorageResult<()> {
        self.save_list(&self.keys.entries, entries)
    }

    pub fn append_entry(&self, entry: Snapshot) -> StorageResult<()> {
        let mut entries = self.entries()?;
        entries.push(entry);
        self.replace_entries(&entries)
    }

    /// Whether any stored entry has `value` under `key_field`.
    pub fn entry_exists(&self, key_field: &str, value: &JsonValue) -> StorageResult<bool> {
        Ok(self
            .entries()?
            .iter()
            .any(|entry| entry.get(key_field) == Some(value)))
    }

    // ========== SEQUENCE COUNTER ==========

    /// Reserve the next sequence number. Numbers start at 1 and never repeat
    /// for a given storage.
    pub fn next_sequence(&self) -> StorageResult<u64> {
        let current: u64 = self.load(&self.keys.sequence)?.unwrap_or(0);
        let next = current + 1;
        self.save(&self.keys.sequence, &next)?;
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use serde_json::json;

    fn collections() -> Collections {
        Collections::new(Arc::new(MemoryStorage::new()), StorageKeys::default())
    }

    fn entry(email: &str) -> Snapshot {
        let mut snapshot = Snapshot::new();
        snapshot.insert("email".to_string(), json!(email));
        snapshot
    }

    #[test]
    fn test_entries_append_and_lookup() {
        let collections = collections();
        collections.append_entry(entry("a@x.io")).unwrap();
        collections.append_entry(entry("b@x.io")).unwrap();

        assert_eq!(collections.entries().unwrap().len(), 2);
        assert!(collections.entry_exists("email", &json!("b@x.io")).unwrap());
        assert!(!collections.entry_exists("email", &json!("c@x.io")).unwrap());
    }

    #[test]
    fn test_sequence_is_monotonic() {
        let collections = collections();
        assert_eq!(collections.next_sequence().unwrap(), 1);
        assert_eq!(collections.next_sequence().unwrap(), 2);
    }

    #[test]
    fn test_namespaced_keys() {
        let keys = StorageKeys::namespaced("signup");
        assert_eq!(keys.entries, "signup/submitted_entries");
    }
}

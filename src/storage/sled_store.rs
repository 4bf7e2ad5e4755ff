use serde_json::Value as JsonValue;
use std::path::Path;

use super::{Storage, StorageError, StorageResult};

/// Durable storage backed by a sled tree. Every write is flushed.
#[derive(Clone)]
pub struct SledStorage {
    /// The underlying sled database instance
    db: sled::Db,
    /// Tree holding all form records
    tree: sled::Tree,
}

impl SledStorage {
    pub const TREE_NAME: &'static str = "smartform";

    pub fn new(db: sled::Db) -> Result<Self, sled::Error> {
        let tree = db.open_tree(Self::TREE_NAME)?;
        Ok(Self { db, tree })
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, sled::Error> {
        Self::new(sled::open(path)?)
    }

    /// Gets a reference to the underlying database
    pub fn db(&self) -> &sled::Db {
        &self.db
    }
}

impl Storage for SledStorage {
    fn get(&self, key: &str) -> StorageResult<Option<JsonValue>> {
        match self.tree.get(key.as_bytes()) {
            Ok(Some(bytes)) => {
                let value = serde_json::from_slice(&bytes)
                    .map_err(|e| StorageError::serialization(key, e))?;
                Ok(Some(value))
            }
            Ok(None) => Ok(None),
            Err(e) => Err(StorageError::backend("get", e)),
        }
    }

    fn put(&self, key: &str, value: &JsonValue) -> StorageResult<()> {
        let bytes = serde_json::to_vec(value).map_err(|e| StorageError::serialization(key, e))?;

        self.tree
            .insert(key.as_bytes(), bytes)
            .map_err(|e| StorageError::backend("insert", e))?;

        // Ensure the data is durably written to disk
        self.tree
            .flush()
            .map_err(|e| StorageError::backend("flush", e))?;
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        self.tree
            .remove(key.as_bytes())
            .map_err(|e| StorageError::backend("remove", e))?;
        self.tree
            .flush()
            .map_err(|e| StorageError::backend("flush", e))?;
        Ok(())
    }
}

//! Storage port
//!
//! The engine never touches a global store. Hosts inject a [`Storage`]
//! implementation and own its lifecycle; every persisted collection the
//! engine needs lives behind this small get/put interface.

pub mod collections;
pub mod memory;
pub mod sled_store;

use serde_json::Value as JsonValue;
use thiserror::Error;

pub use collections::{Collections, StorageKeys};
pub use memory::MemoryStorage;
pub use sled_store::SledStorage;

#[derive(Error, Debug)]
pub enum StorageError {
    /// The storage backend failed
    #[error("Storage backend failed during {operation}: {reason}")]
    Backend { operation: String, reason: String },

    /// A stored record could not be (de)serialized
    #[error("Serialization error for '{key}': {reason}")]
    Serialization { key: String, reason: String },
}

impl StorageError {
    pub fn backend(operation: &str, err: impl std::fmt::Display) -> Self {
        StorageError::Backend {
            operation: operation.to_string(),
            reason: err.to_string(),
        }
    }

    pub fn serialization(key: &str, err: impl std::fmt::Display) -> Self {
        StorageError::Serialization {
            key: key.to_string(),
            reason: err.to_string(),
        }
    }
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Durable key/value slots holding JSON records.
pub trait Storage: Send + Sync {
    fn get(&self, key: &str) -> StorageResult<Option<JsonValue>>;

    fn put(&self, key: &str, value: &JsonValue) -> StorageResult<()>;

    fn remove(&self, key: &str) -> StorageResult<()>;
}

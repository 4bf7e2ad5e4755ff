//! Capabilities the pipeline calls through: delivery, notification and the
//! existing-entries lookup used for duplicate detection.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt::Debug;
use thiserror::Error;

use crate::storage::{Collections, StorageResult};

/// What the transport is asked to deliver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionPayload {
    pub target: String,
    pub sequence: u64,
    pub body: JsonValue,
}

/// Acknowledgement returned by a successful delivery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerAck {
    pub status: u16,
    #[serde(default)]
    pub body: JsonValue,
}

impl ServerAck {
    pub fn ok(body: JsonValue) -> Self {
        Self { status: 200, body }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TransportError {
    /// No connectivity to the target
    #[error("Target unreachable: {0}")]
    Unreachable(String),

    /// The target answered with a failure status
    #[error("Submission rejected with status {status}: {message}")]
    Rejected { status: u16, message: String },

    /// The request did not complete in time
    #[error("Submission timed out")]
    Timeout,
}

#[async_trait]
pub trait Transport: Send + Sync + Debug {
    /// Deliver one submission. At most one call is in flight per record.
    async fn submit(&self, payload: &SubmissionPayload) -> Result<ServerAck, TransportError>;
}

/// A confirmation message composed from the submitted values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[derive(Error, Debug, Clone, PartialEq)]
#[error("Notification failed: {0}")]
pub struct NotificationError(pub String);

#[async_trait]
pub trait Notifier: Send + Sync + Debug {
    async fn send(&self, notification: &Notification) -> Result<(), NotificationError>;
}

/// Lookup of previously submitted entries by a key field.
pub trait ExistingEntries: Send + Sync {
    fn contains(&self, key_field: &str, value: &JsonValue) -> StorageResult<bool>;
}

impl ExistingEntries for Collections {
    fn contains(&self, key_field: &str, value: &JsonValue) -> StorageResult<bool> {
        self.entry_exists(key_field, value)
    }
}

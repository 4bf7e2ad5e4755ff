//! Persistent offline queue.
//!
//! Appended to by the pipeline when delivery fails, drained strictly FIFO.
//! Each delivered entry is removed before the next one is attempted.

use log::{info, warn};
use uuid::Uuid;

use super::record::SubmissionRecord;
use crate::storage::{Collections, StorageResult};

#[derive(Clone)]
pub struct OfflineQueue {
    collections: Collections,
}

impl OfflineQueue {
    pub fn new(collections: Collections) -> Self {
        Self { collections }
    }

    fn key(&self) -> &str {
        &self.collections.keys().queue
    }

    /// All pending records, oldest first.
    pub fn pending(&self) -> StorageResult<Vec<SubmissionRecord>> {
        self.collections.load_list(self.key())
    }

    pub fn len(&self) -> StorageResult<usize> {
        Ok(self.pending()?.len())
    }

    pub fn is_empty(&self) -> StorageResult<bool> {
        Ok(self.len()? == 0)
    }

    pub fn enqueue(&self, record: SubmissionRecord) -> StorageResult<()> {
        let mut pending = self.pending()?;
        info!(
            "Queued submission #{} for later delivery ({} pending)",
            record.sequence(),
            pending.len() + 1
        );
        pending.push(record);
        self.collections.save_list(self.key(), &pending)
    }

    pub fn front(&self) -> StorageResult<Option<SubmissionRecord>> {
        Ok(self.pending()?.into_iter().next())
    }

    /// Remove a record by id. Returns whether it was present.
    pub fn remove(&self, id: Uuid) -> StorageResult<bool> {
        let mut pending = self.pending()?;
        let before = pending.len();
        pending.retain(|record| record.id() != id);
        if pending.len() == before {
            warn!("Queued submission {} was not found", id);
            return Ok(false);
        }
        self.collections.save_list(self.key(), &pending)?;
        Ok(true)
    }
}

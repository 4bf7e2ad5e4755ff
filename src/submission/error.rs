use thiserror::Error;
use uuid::Uuid;

use super::transport::TransportError;
use crate::storage::StorageError;

/// Reasons a submission attempt (or a queue drain) stops.
///
/// Every variant leaves the value store untouched.
#[derive(Error, Debug)]
pub enum SubmissionError {
    /// Global validity gate failed; nothing was persisted
    #[error("Form is invalid: {}", invalid_fields.join(", "))]
    InvalidForm { invalid_fields: Vec<String> },

    /// An entry with the same key already exists; nothing was persisted
    #[error("Duplicate entry: {key_field} = {value}")]
    Duplicate { key_field: String, value: String },

    /// Delivery failed and offline queuing is disabled
    #[error("Submission failed: {0}")]
    TransportFailed(#[from] TransportError),

    /// Another submission is still in flight
    #[error("A submission is already in flight")]
    AlreadyInFlight,

    /// Another drain of the offline queue is still running
    #[error("The offline queue is already being drained")]
    DrainInProgress,

    /// A queued record no longer matches its digest
    #[error("Queued submission {id} is corrupt")]
    CorruptRecord { id: Uuid },

    /// Manual submission of a multi-step form before its final step
    #[error("Submission is only possible from the final step (at step {step})")]
    NotAtFinalStep { step: usize },

    /// The form has already been submitted
    #[error("The form has already been submitted")]
    AlreadySubmitted,

    #[error(transparent)]
    Storage(#[from] StorageError),
}

pub type SubmissionResult<T> = Result<T, SubmissionError>;

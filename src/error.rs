use thiserror::Error;

use crate::config::ConfigError;
use crate::interchange::InterchangeError;
use crate::schema::RegistrationError;
use crate::storage::StorageError;
use crate::submission::SubmissionError;

/// Crate-wide error type.
///
/// Each variant wraps the error of one concern; the engine surfaces the
/// specific error where a caller can act on it and this umbrella where
/// several concerns meet.
#[derive(Error, Debug)]
pub enum FormError {
    /// Setup-time schema, step or derivation errors
    #[error(transparent)]
    Registration(#[from] RegistrationError),

    #[error(transparent)]
    Submission(#[from] SubmissionError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Interchange(#[from] InterchangeError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Result type alias for engine operations
pub type FormResult<T> = Result<T, FormError>;

impl FormError {
    /// Whether the caller can retry or correct input and try again.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, FormError::Registration(_) | FormError::Config(_))
    }
}

//! Submission: records, delivery capabilities, the offline queue and the
//! staged pipeline that ties them together.

pub mod error;
pub mod identifier;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod pipeline;
pub mod queue;
pub mod record;
pub mod transport;

pub use error::{SubmissionError, SubmissionResult};
pub use identifier::{IdentifierFormat, IdentifierGenerator};
#[cfg(any(test, feature = "mock"))]
pub use mock::{MockNotifier, MockTransport};
pub use pipeline::{
    CompletionCallback, Confirmation, Delivery, DrainReport, NotificationStatus,
    PipelineSettings, SubmissionOutcome, SubmissionPipeline, SubmissionRequest,
};
pub use queue::OfflineQueue;
pub use record::SubmissionRecord;
pub use transport::{
    ExistingEntries, Notification, NotificationError, Notifier, ServerAck, SubmissionPayload,
    Transport, TransportError,
};

//! # SmartForm
//!
//! A reactive form state engine. It owns the canonical value store for a
//! form's fields, validates them, recomputes derived values (prices,
//! progress, visibility) when their inputs change, drives multi-step
//! navigation and runs submissions through a staged pipeline with a durable
//! offline queue.
//!
//! ## Core Components
//!
//! * `schema` - Field schema and the append-only schema registry
//! * `store` - Canonical value store and snapshots
//! * `validation` - Rule evaluation and messages by language
//! * `derivation` - Derived fields, cycle detection and pricing
//! * `navigation` - Step navigation state machine
//! * `submission` - Submission pipeline, transport capabilities and the offline queue
//! * `storage` - Storage port with sled and in-memory backends
//! * `features` - Optional behaviours: autosave, hints, shield, points, timers
//! * `engine` - The `FormEngine` facade tying it all together
//!
//! ## Architecture
//!
//! Input events mutate the value store; validation and derivation re-evaluate
//! synchronously before the event handler returns. Only the transport stage
//! of a submission suspends. Hosts inject storage, transport and
//! notification capabilities; the engine never constructs them itself.

pub mod config;
pub mod constants;
pub mod derivation;
pub mod engine;
pub mod error;
pub mod features;
pub mod interchange;
pub mod navigation;
pub mod schema;
pub mod storage;
pub mod store;
pub mod submission;
pub mod validation;

// Re-export main types for convenience
pub use config::{Capabilities, ConfirmationTemplate, DeliveryMode, DuplicateCheck, FormConfig};
pub use derivation::{DerivationGraph, DerivationSpec, DerivedField, PricingRules};
pub use engine::{Collaborators, EngineEvent, FieldInput, FormEngine, RawValue, StepOutcome};
pub use error::{FormError, FormResult};
pub use navigation::{NavState, Step, StepNavigator};
pub use schema::{
    BlobRef, FieldSchema, FieldType, FieldValue, RegistrationError, RegistrationResult,
    SchemaRegistry,
};
pub use storage::{MemoryStorage, SledStorage, Storage, StorageError, StorageKeys};
pub use store::{Snapshot, ValueStore};
pub use submission::{
    DrainReport, SubmissionError, SubmissionOutcome, SubmissionRecord, Transport, TransportError,
};
pub use validation::{ValidationEngine, ValidationResult};

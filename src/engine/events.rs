use serde::{Deserialize, Serialize};

use crate::schema::{BlobRef, FieldValue};
use crate::submission::SubmissionOutcome;
use crate::validation::ValidationResult;

/// Raw value carried by an input event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum RawValue {
    /// Text as typed; coerced according to the field type
    Text(String),
    File(BlobRef),
    /// Already typed; stored as is
    Typed(FieldValue),
}

/// A field-change event posted by the input surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldInput {
    pub field: String,
    pub value: RawValue,
}

impl FieldInput {
    pub fn text(field: impl Into<String>, raw: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            value: RawValue::Text(raw.into()),
        }
    }

    pub fn file(field: impl Into<String>, blob: BlobRef) -> Self {
        Self {
            field: field.into(),
            value: RawValue::File(blob),
        }
    }

    pub fn typed(field: impl Into<String>, value: FieldValue) -> Self {
        Self {
            field: field.into(),
            value: RawValue::Typed(value),
        }
    }
}

/// Updates emitted to the UI after an event is handled.
#[derive(Debug, Clone)]
pub enum EngineEvent {
    Validation {
        field: String,
        result: ValidationResult,
    },
    Derived {
        name: String,
        value: FieldValue,
    },
    Points {
        field: String,
        total: u32,
    },
    Suggestions {
        field: String,
        items: Vec<String>,
    },
    ShieldPreview {
        field: String,
        preview: String,
    },
    /// A hint timer fired while the field was still empty
    Hint {
        field: String,
        message: String,
    },
    /// The field's required rule was relaxed after repeated skipping
    Relaxed {
        field: String,
    },
    AutoSaved,
    /// The form timer expired and the pipeline was invoked
    AutoSubmitted(SubmissionOutcome),
    AutoSubmitFailed {
        reason: String,
    },
}

impl EngineEvent {
    /// Field or derived name the event is about, if any.
    pub fn subject(&self) -> Option<&str> {
        match self {
            EngineEvent::Validation { field, .. }
            | EngineEvent::Points { field, .. }
            | EngineEvent::Suggestions { field, .. }
            | EngineEvent::ShieldPreview { field, .. }
            | EngineEvent::Hint { field, .. }
            | EngineEvent::Relaxed { field } => Some(field),
            EngineEvent::Derived { name, .. } => Some(name),
            EngineEvent::AutoSaved
            | EngineEvent::AutoSubmitted(_)
            | EngineEvent::AutoSubmitFailed { .. } => None,
        }
    }
}

/// Result of a successful `advance` call.
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    Moved(usize),
    /// The current step has invalid fields; the index did not change
    Blocked { invalid_fields: Vec<String> },
    /// The last step was valid and the pipeline accepted the submission
    Submitted(SubmissionOutcome),
}

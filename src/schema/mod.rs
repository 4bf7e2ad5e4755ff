pub mod registry;
pub mod types;

pub use registry::SchemaRegistry;

// Re-export all types at the schema module level
pub use types::{
    BlobRef, FieldPattern, FieldSchema, FieldType, FieldValue, RegistrationError,
    RegistrationResult, ABSENT,
};

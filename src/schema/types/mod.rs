pub mod errors;
pub mod field;
pub mod value;

pub use errors::{RegistrationError, RegistrationResult};
pub use field::{FieldPattern, FieldSchema, FieldType};
pub use value::{BlobRef, FieldValue, ABSENT};

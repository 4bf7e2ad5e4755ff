/// Common constants used across the SmartForm engine.
///
/// These defaults are used when the host configuration does not provide
/// explicit values.
pub const DEFAULT_LANGUAGE: &str = "en";
pub const DEFAULT_AUTOSAVE_KEY: &str = "form_autosave";
pub const DEFAULT_ENTRIES_KEY: &str = "submitted_entries";
pub const DEFAULT_QUEUE_KEY: &str = "pending_submissions";
pub const DEFAULT_SEQUENCE_KEY: &str = "submission_sequence";
pub const DEFAULT_DUPLICATE_KEY_FIELD: &str = "email";
pub const DEFAULT_SUBMISSION_TARGET: &str = "https://example.com/api/students";
pub const DEFAULT_AUTOSAVE_INTERVAL_MS: u64 = 5000;
pub const DEFAULT_TYPING_THRESHOLD_MS: u64 = 3000;
pub const DEFAULT_SKIP_TOLERANCE: u32 = 2;
pub const DEFAULT_POINTS_PER_FIELD: u32 = 10;
pub const DEFAULT_TRUST_MESSAGE: &str = "Secure";

use smartform::config::{ConfirmationTemplate, DeliveryMode, DuplicateCheck};
use smartform::submission::IdentifierFormat;
use smartform::{FieldSchema, FieldType, FormConfig, Step};

pub const EMAIL_PATTERN: &str = r"^[^@\s]+@[^@\s]+\.[a-z]+$";

/// studentName (required, min 2), email (required, pattern), grade
/// (required select) and an optional phone number.
pub fn registration_fields() -> Vec<FieldSchema> {
    vec![
        FieldSchema::new("studentName")
            .required()
            .with_min_length(2)
            .with_label("Student name"),
        FieldSchema::new("email")
            .required()
            .with_type(FieldType::Email)
            .with_pattern(EMAIL_PATTERN)
            .expect("valid email pattern"),
        FieldSchema::new("grade")
            .required()
            .with_type(FieldType::Select),
        FieldSchema::new("phone")
            .with_type(FieldType::Tel)
            .with_pattern(r"^\+?[0-9 ]{6,}$")
            .expect("valid phone pattern"),
    ]
}

pub fn registration_config() -> FormConfig {
    FormConfig::new(registration_fields())
}

pub fn two_step_config() -> FormConfig {
    let mut config = registration_config();
    config.steps = vec![
        Step::new("identity", ["studentName", "email"]),
        Step::new("school", ["grade", "phone"]),
    ];
    config
}

/// Remote delivery with duplicate detection, identifiers and confirmations.
pub fn remote_config(offline_queue: bool) -> FormConfig {
    let mut config = registration_config();
    config.capabilities.delivery = DeliveryMode::Remote {
        target: "https://example.com/api/students".to_string(),
        offline_queue,
    };
    config.capabilities.duplicate_check = Some(DuplicateCheck::default());
    config.capabilities.identifier = Some(IdentifierFormat::default());
    config.capabilities.confirmation = Some(ConfirmationTemplate::default());
    config
}

//! Field and form validation
//!
//! Rules are applied in a fixed order and the first failing rule decides the
//! message:
//! 1. required-ness
//! 2. pattern match
//! 3. minimum length
//! 4. accepted media type (file fields)
//!
//! Validation never fails: an invalid field yields `valid = false` plus a
//! message. The engine records the last result per field so the UI can read
//! the message currently shown.

pub mod messages;

use indexmap::IndexMap;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::schema::{FieldSchema, FieldValue, SchemaRegistry};
use crate::store::ValueStore;
pub use messages::MessageCatalog;
use messages::{KEY_FILE_TYPE, KEY_MIN_LENGTH, KEY_PATTERN, KEY_REQUIRED};

/// Outcome of validating one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub message: Option<String>,
}

impl ValidationResult {
    pub fn ok() -> Self {
        Self {
            valid: true,
            message: None,
        }
    }

    pub fn invalid(message: String) -> Self {
        Self {
            valid: false,
            message: Some(message),
        }
    }
}

/// Which rule rejected a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailedRule {
    Required,
    Pattern,
    MinLength(usize),
    FileType,
}

impl FailedRule {
    fn message_key(&self) -> &'static str {
        match self {
            FailedRule::Required => KEY_REQUIRED,
            FailedRule::Pattern => KEY_PATTERN,
            FailedRule::MinLength(_) => KEY_MIN_LENGTH,
            FailedRule::FileType => KEY_FILE_TYPE,
        }
    }
}

/// Evaluate the rule chain without any side effects.
pub fn check_rules(schema: &FieldSchema, value: &FieldValue) -> Option<FailedRule> {
    if value.is_empty() {
        // An optional field is valid while empty, whatever its other rules say.
        return schema.required.then_some(FailedRule::Required);
    }

    let text = value.as_text();
    if let Some(pattern) = &schema.pattern {
        if !pattern.matches(&text) {
            return Some(FailedRule::Pattern);
        }
    }
    if let Some(min) = schema.min_length {
        if text.chars().count() < min {
            return Some(FailedRule::MinLength(min));
        }
    }
    if let FieldValue::Blob(blob) = value {
        if !schema.accepts_media_type(&blob.media_type) {
            return Some(FailedRule::FileType);
        }
    }
    None
}

#[derive(Debug, Clone, Default)]
pub struct ValidationEngine {
    catalog: MessageCatalog,
    shown: IndexMap<String, ValidationResult>,
}

impl ValidationEngine {
    pub fn new(catalog: MessageCatalog) -> Self {
        Self {
            catalog,
            shown: IndexMap::new(),
        }
    }

    pub fn catalog(&self) -> &MessageCatalog {
        &self.catalog
    }

    /// Validate one field against its current schema version.
    ///
    /// A field with no schema has no rules and is always valid.
    pub fn validate(
        &mut self,
        registry: &SchemaRegistry,
        store: &ValueStore,
        field: &str,
    ) -> ValidationResult {
        let result = match registry.get(field) {
            Some(schema) => self.evaluate(&schema, store.get(field)),
            None => ValidationResult::ok(),
        };
        debug!("Validated '{}': valid={}", field, result.valid);
        self.shown.insert(field.to_string(), result.clone());
        result
    }

    /// Validate every registered field, in registration order.
    pub fn validate_all(
        &mut self,
        registry: &SchemaRegistry,
        store: &ValueStore,
    ) -> IndexMap<String, ValidationResult> {
        let names: Vec<String> = registry.names().map(str::to_string).collect();
        names
            .into_iter()
            .map(|name| {
                let result = self.validate(registry, store, &name);
                (name, result)
            })
            .collect()
    }

    /// Pure evaluation of one schema/value pair.
    pub fn evaluate(&self, schema: &FieldSchema, value: &FieldValue) -> ValidationResult {
        match check_rules(schema, value) {
            None => ValidationResult::ok(),
            Some(rule) => {
                let min = match rule {
                    FailedRule::MinLength(min) => Some(min),
                    _ => None,
                };
                ValidationResult::invalid(self.catalog.render(
                    rule.message_key(),
                    schema.display_name(),
                    min,
                ))
            }
        }
    }

    /// Form-level validity over the fields for which `visible` holds.
    ///
    /// Does not touch the shown messages.
    pub fn is_form_valid<F>(&self, registry: &SchemaRegistry, store: &ValueStore, visible: F) -> bool
    where
        F: Fn(&str) -> bool,
    {
        self.invalid_fields(registry, store, visible).is_empty()
    }

    /// Visible fields that currently fail validation.
    pub fn invalid_fields<F>(
        &self,
        registry: &SchemaRegistry,
        store: &ValueStore,
        visible: F,
    ) -> Vec<String>
    where
        F: Fn(&str) -> bool,
    {
        registry
            .fields()
            .filter(|schema| visible(&schema.name))
            .filter(|schema| check_rules(schema, store.get(&schema.name)).is_some())
            .map(|schema| schema.name.clone())
            .collect()
    }

    /// Message currently shown for a field, if it was validated and failed.
    pub fn shown_message(&self, field: &str) -> Option<&str> {
        self.shown.get(field).and_then(|r| r.message.as_deref())
    }

    /// Replace the shown message for a field (used for hints).
    pub fn show_message(&mut self, field: &str, message: String) {
        let valid = self.shown.get(field).map(|r| r.valid).unwrap_or(true);
        self.shown.insert(
            field.to_string(),
            ValidationResult {
                valid,
                message: Some(message),
            },
        );
    }

    pub fn clear(&mut self) {
        self.shown.clear();
    }
}

//! Host configuration for a form engine
//!
//! A [`FormConfig`] enumerates the field schema, steps, derivations, messages
//! and the [`Capabilities`] the engine is built with. Configurations load from
//! TOML or JSON; optional behaviours are `Option`s that are resolved once when
//! the engine is constructed.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::constants::{DEFAULT_DUPLICATE_KEY_FIELD, DEFAULT_LANGUAGE, DEFAULT_SUBMISSION_TARGET};
use crate::derivation::DerivationSpec;
use crate::features::{
    AdaptationConfig, AnalyticsConfig, AutosaveConfig, DynamicGroup, FormTimerConfig,
    GamificationConfig, ShieldConfig, SuggestionSources,
};
use crate::navigation::Step;
use crate::schema::FieldSchema;
use crate::storage::StorageKeys;
use crate::submission::IdentifierFormat;

/// Errors that can occur while loading a configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Unsupported configuration format: {0}")]
    UnsupportedFormat(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FormConfig {
    #[serde(default = "default_language")]
    pub language: String,
    /// Message overrides by language, then message key
    #[serde(default)]
    pub messages: HashMap<String, HashMap<String, String>>,
    pub fields: Vec<FieldSchema>,
    #[serde(default)]
    pub steps: Vec<Step>,
    /// Registered in order; an input may only name a field or an earlier derivation
    #[serde(default)]
    pub derivations: Vec<DerivationSpec>,
    #[serde(default)]
    pub storage_keys: StorageKeys,
    #[serde(default)]
    pub capabilities: Capabilities,
}

fn default_language() -> String {
    DEFAULT_LANGUAGE.to_string()
}

impl FormConfig {
    pub fn new(fields: Vec<FieldSchema>) -> Self {
        Self {
            language: default_language(),
            fields,
            ..Self::default()
        }
    }

    pub fn from_toml_str(text: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn from_json_str(text: &str) -> ConfigResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Load from a `.toml` or `.json` file.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Self::from_toml_str(&content),
            Some("json") => Self::from_json_str(&content),
            other => Err(ConfigError::UnsupportedFormat(
                other.unwrap_or_default().to_string(),
            )),
        }
    }

    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

/// Optional behaviours. Absent sections are disabled.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Capabilities {
    pub delivery: DeliveryMode,
    pub duplicate_check: Option<DuplicateCheck>,
    pub identifier: Option<IdentifierFormat>,
    pub confirmation: Option<ConfirmationTemplate>,
    pub autosave: Option<AutosaveConfig>,
    pub adaptation: Option<AdaptationConfig>,
    pub shield: Option<ShieldConfig>,
    pub gamification: Option<GamificationConfig>,
    pub form_timer: Option<FormTimerConfig>,
    pub suggestions: SuggestionSources,
    pub dynamic_groups: Vec<DynamicGroup>,
    pub analytics: Option<AnalyticsConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum DeliveryMode {
    /// Accepted submissions are only recorded locally
    #[default]
    Local,
    /// Delivered through the injected transport
    Remote {
        #[serde(default = "default_target")]
        target: String,
        #[serde(default)]
        offline_queue: bool,
    },
}

fn default_target() -> String {
    DEFAULT_SUBMISSION_TARGET.to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DuplicateCheck {
    pub key_field: String,
}

impl Default for DuplicateCheck {
    fn default() -> Self {
        Self {
            key_field: DEFAULT_DUPLICATE_KEY_FIELD.to_string(),
        }
    }
}

/// Confirmation message composed from the submitted values. `{field}`
/// placeholders in subject and body are replaced with snapshot values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfirmationTemplate {
    pub recipient_field: String,
    pub subject: String,
    pub body: String,
}

impl Default for ConfirmationTemplate {
    fn default() -> Self {
        Self {
            recipient_field: "email".to_string(),
            subject: "Registration Confirmation".to_string(),
            body: "Dear {studentName}, your registration is complete. Student ID: {studentID}"
                .to_string(),
        }
    }
}

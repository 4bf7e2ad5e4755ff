use base64::{engine::general_purpose, Engine as _};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::constants::DEFAULT_TRUST_MESSAGE;

/// Secure input shield settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShieldConfig {
    pub fields: BTreeSet<String>,
    /// Emit an encoded preview of shielded input
    pub encryption_preview: bool,
    pub block_paste: bool,
    pub trust_message: String,
}

impl Default for ShieldConfig {
    fn default() -> Self {
        Self {
            fields: BTreeSet::new(),
            encryption_preview: false,
            block_paste: false,
            trust_message: DEFAULT_TRUST_MESSAGE.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct InputShield {
    config: ShieldConfig,
}

impl InputShield {
    pub fn new(config: ShieldConfig) -> Self {
        Self { config }
    }

    pub fn shields(&self, field: &str) -> bool {
        self.config.fields.contains(field)
    }

    /// Encoded preview of a shielded field's text, when previews are enabled.
    pub fn preview(&self, field: &str, text: &str) -> Option<String> {
        if !self.config.encryption_preview || !self.shields(field) {
            return None;
        }
        Some(format!(
            "Encrypted: {}",
            general_purpose::STANDARD.encode(text.as_bytes())
        ))
    }

    pub fn allows_paste(&self, field: &str) -> bool {
        !(self.config.block_paste && self.shields(field))
    }

    pub fn trust_message(&self) -> &str {
        &self.config.trust_message
    }
}

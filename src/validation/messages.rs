//! Messages by language with an English fallback.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const FALLBACK_LANGUAGE: &str = "en";
pub const KEY_INVALID: &str = "invalid";
pub const KEY_REQUIRED: &str = "required";
pub const KEY_PATTERN: &str = "pattern";
pub const KEY_MIN_LENGTH: &str = "min_length";
pub const KEY_FILE_TYPE: &str = "file_type";
pub const KEY_HINT: &str = "hint";

static BUILTIN: Lazy<HashMap<String, HashMap<String, String>>> = Lazy::new(|| {
    let mut languages = HashMap::new();
    languages.insert(
        "en".to_string(),
        table(&[
            (KEY_INVALID, "{field} is invalid."),
            (KEY_REQUIRED, "{field} is required."),
            (KEY_PATTERN, "{field} is invalid."),
            (KEY_MIN_LENGTH, "{field} must be at least {min} characters."),
            (KEY_FILE_TYPE, "{field} has an unsupported file type."),
            (KEY_HINT, "Please fill this"),
        ]),
    );
    languages.insert(
        "my".to_string(),
        table(&[(KEY_INVALID, "{field} မမှန်ကန်ပါ။")]),
    );
    languages
});

fn table(entries: &[(&str, &str)]) -> HashMap<String, String> {
    entries
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Message templates keyed by language, then by message key.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MessageCatalog {
    language: String,
    #[serde(default)]
    overrides: HashMap<String, HashMap<String, String>>,
}

impl MessageCatalog {
    pub fn new(language: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            overrides: HashMap::new(),
        }
    }

    pub fn with_overrides(mut self, overrides: HashMap<String, HashMap<String, String>>) -> Self {
        self.overrides = overrides;
        self
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    /// Resolve a template.
    ///
    /// Lookup order: language/key, language/`invalid`, `en`/key, `en`/`invalid`.
    /// Overrides win over built-ins at each step.
    pub fn template(&self, key: &str) -> &str {
        let candidates = [
            (self.language.as_str(), key),
            (self.language.as_str(), KEY_INVALID),
            (FALLBACK_LANGUAGE, key),
            (FALLBACK_LANGUAGE, KEY_INVALID),
        ];
        candidates
            .iter()
            .find_map(|(language, key)| self.lookup(language, key))
            .unwrap_or("{field} is invalid.")
    }

    fn lookup(&self, language: &str, key: &str) -> Option<&str> {
        self.overrides
            .get(language)
            .and_then(|keys| keys.get(key))
            .or_else(|| BUILTIN.get(language).and_then(|keys| keys.get(key)))
            .map(String::as_str)
    }

    /// Render a message, substituting `{field}` and `{min}`.
    pub fn render(&self, key: &str, field: &str, min: Option<usize>) -> String {
        let mut message = self.template(key).replace("{field}", field);
        if let Some(min) = min {
            message = message.replace("{min}", &min.to_string());
        }
        message
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_english_messages() {
        let catalog = MessageCatalog::new("en");
        assert_eq!(catalog.render(KEY_INVALID, "email", None), "email is invalid.");
        assert_eq!(
            catalog.render(KEY_MIN_LENGTH, "name", Some(3)),
            "name must be at least 3 characters."
        );
    }

    #[test]
    fn test_language_falls_back_to_its_invalid_message() {
        let catalog = MessageCatalog::new("my");
        assert_eq!(catalog.render(KEY_REQUIRED, "email", None), "email မမှန်ကန်ပါ။");
    }

    #[test]
    fn test_unknown_language_falls_back_to_english() {
        let catalog = MessageCatalog::new("fr");
        assert_eq!(catalog.render(KEY_REQUIRED, "email", None), "email is required.");
    }

    #[test]
    fn test_overrides_take_precedence() {
        let mut fr = HashMap::new();
        fr.insert(KEY_REQUIRED.to_string(), "{field} est obligatoire.".to_string());
        let mut overrides = HashMap::new();
        overrides.insert("fr".to_string(), fr);

        let catalog = MessageCatalog::new("fr").with_overrides(overrides);
        assert_eq!(catalog.render(KEY_REQUIRED, "email", None), "email est obligatoire.");
        assert_eq!(catalog.render(KEY_PATTERN, "email", None), "email is invalid.");
    }
}

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeSet;
use std::fmt;

use super::errors::{RegistrationError, RegistrationResult};
use super::value::FieldValue;

/// Input kind of a field. Determines how raw text is coerced into a [`FieldValue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    #[default]
    Text,
    Email,
    Tel,
    Number,
    Date,
    Select,
    Checkbox,
    File,
    Hidden,
}

impl FieldType {
    /// Coerce raw input text according to the field type.
    pub fn coerce(&self, raw: &str) -> FieldValue {
        match self {
            FieldType::Number => match raw.trim().parse::<f64>() {
                Ok(n) if !raw.trim().is_empty() => FieldValue::Number(n),
                _ => FieldValue::Text(raw.to_string()),
            },
            FieldType::Checkbox => FieldValue::Boolean(matches!(
                raw.trim().to_ascii_lowercase().as_str(),
                "true" | "on" | "1" | "yes" | "checked"
            )),
            _ => FieldValue::Text(raw.to_string()),
        }
    }
}

/// Compiled pattern rule. Serialized as its source text.
#[derive(Clone)]
pub struct FieldPattern {
    regex: Regex,
}

impl FieldPattern {
    pub fn new(source: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            regex: Regex::new(source)?,
        })
    }

    /// Unanchored match: the pattern may match anywhere in the text.
    pub fn matches(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }

    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }
}

impl fmt::Debug for FieldPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("FieldPattern").field(&self.as_str()).finish()
    }
}

impl PartialEq for FieldPattern {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Serialize for FieldPattern {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for FieldPattern {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let source = String::deserialize(deserializer)?;
        FieldPattern::new(&source).map_err(serde::de::Error::custom)
    }
}

/// Declarative description of one field's rules and dependencies.
///
/// Instances are immutable once registered; changing a rule means installing
/// a new version through [`crate::schema::SchemaRegistry`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSchema {
    pub name: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub pattern: Option<FieldPattern>,
    #[serde(default)]
    pub min_length: Option<usize>,
    #[serde(default, rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub depends_on: BTreeSet<String>,
    /// Accepted media types for file fields, e.g. `image/*`
    #[serde(default)]
    pub accept: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
}

impl FieldSchema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            required: false,
            pattern: None,
            min_length: None,
            field_type: FieldType::Text,
            depends_on: BTreeSet::new(),
            accept: None,
            label: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_type(mut self, field_type: FieldType) -> Self {
        self.field_type = field_type;
        self
    }

    /// Attach a pattern rule, compiling it immediately.
    pub fn with_pattern(mut self, source: &str) -> RegistrationResult<Self> {
        let pattern = FieldPattern::new(source).map_err(|e| RegistrationError::InvalidPattern {
            name: self.name.clone(),
            reason: e.to_string(),
        })?;
        self.pattern = Some(pattern);
        Ok(self)
    }

    pub fn with_min_length(mut self, min_length: usize) -> Self {
        self.min_length = Some(min_length);
        self
    }

    pub fn with_accept(mut self, accept: impl Into<String>) -> Self {
        self.accept = Some(accept.into());
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn depends_on<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.depends_on.extend(names.into_iter().map(Into::into));
        self
    }

    /// Name shown in messages.
    pub fn display_name(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.name)
    }

    /// A copy of this schema with the required rule dropped.
    pub fn relaxed(&self) -> Self {
        let mut relaxed = self.clone();
        relaxed.required = false;
        relaxed
    }

    /// Check a media type against `accept` (`image/*`, `application/pdf`, comma lists).
    pub fn accepts_media_type(&self, media_type: &str) -> bool {
        let Some(accept) = &self.accept else {
            return true;
        };
        accept.split(',').map(str::trim).any(|candidate| {
            if candidate == "*/*" {
                return true;
            }
            match candidate.strip_suffix("/*") {
                Some(prefix) => media_type
                    .split('/')
                    .next()
                    .is_some_and(|top| top.eq_ignore_ascii_case(prefix)),
                None => candidate.eq_ignore_ascii_case(media_type),
            }
        })
    }
}

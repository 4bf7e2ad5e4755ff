use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

/// Reference to an uploaded file.
///
/// The engine never holds file contents; the host keeps the bytes and the
/// store only records enough to validate and describe the upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlobRef {
    pub name: String,
    pub media_type: String,
    #[serde(default)]
    pub size: u64,
}

impl BlobRef {
    pub fn new(name: impl Into<String>, media_type: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            media_type: media_type.into(),
            size,
        }
    }
}

/// The value held for a single field.
///
/// `Absent` is the sentinel returned for fields that were never written.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    #[default]
    Absent,
    Text(String),
    Number(f64),
    Boolean(bool),
    Blob(BlobRef),
    Object(Map<String, JsonValue>),
}

/// Shared sentinel for reads of fields that have never been written.
pub static ABSENT: FieldValue = FieldValue::Absent;

impl FieldValue {
    pub fn text(value: impl Into<String>) -> Self {
        FieldValue::Text(value.into())
    }

    /// True for `Absent`, the empty string and `false`.
    ///
    /// Whitespace-only text counts as filled.
    pub fn is_empty(&self) -> bool {
        match self {
            FieldValue::Absent => true,
            FieldValue::Text(s) => s.is_empty(),
            FieldValue::Boolean(b) => !b,
            FieldValue::Number(n) => n.is_nan(),
            FieldValue::Blob(blob) => blob.name.is_empty(),
            FieldValue::Object(map) => map.is_empty(),
        }
    }

    /// Non-empty after trimming whitespace.
    pub fn is_blank(&self) -> bool {
        match self {
            FieldValue::Text(s) => s.trim().is_empty(),
            other => other.is_empty(),
        }
    }

    /// Textual form used by pattern and length rules.
    pub fn as_text(&self) -> String {
        match self {
            FieldValue::Absent => String::new(),
            FieldValue::Text(s) => s.clone(),
            FieldValue::Number(n) => format_number(*n),
            FieldValue::Boolean(b) => b.to_string(),
            FieldValue::Blob(blob) => blob.name.clone(),
            FieldValue::Object(map) => JsonValue::Object(map.clone()).to_string(),
        }
    }

    /// Numeric reading: numbers as-is, numeric text parsed, booleans as 0/1.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(n) => Some(*n),
            FieldValue::Text(s) => s.trim().parse::<f64>().ok(),
            FieldValue::Boolean(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> bool {
        match self {
            FieldValue::Boolean(b) => *b,
            other => !other.is_empty(),
        }
    }

    /// Plain JSON form used in snapshots, exports and transport payloads.
    pub fn to_json(&self) -> JsonValue {
        match self {
            FieldValue::Absent => JsonValue::Null,
            FieldValue::Text(s) => JsonValue::String(s.clone()),
            FieldValue::Number(n) => serde_json::Number::from_f64(*n)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            FieldValue::Boolean(b) => JsonValue::Bool(*b),
            FieldValue::Blob(blob) => serde_json::to_value(blob).unwrap_or(JsonValue::Null),
            FieldValue::Object(map) => JsonValue::Object(map.clone()),
        }
    }

    /// Inverse of [`FieldValue::to_json`] for restoring drafts.
    pub fn from_json(value: &JsonValue) -> Self {
        match value {
            JsonValue::Null => FieldValue::Absent,
            JsonValue::String(s) => FieldValue::Text(s.clone()),
            JsonValue::Number(n) => n.as_f64().map(FieldValue::Number).unwrap_or_default(),
            JsonValue::Bool(b) => FieldValue::Boolean(*b),
            JsonValue::Object(map) => match serde_json::from_value::<BlobRef>(value.clone()) {
                Ok(blob) if map.len() <= 3 && map.contains_key("media_type") => {
                    FieldValue::Blob(blob)
                }
                _ => FieldValue::Object(map.clone()),
            },
            JsonValue::Array(_) => FieldValue::Text(value.to_string()),
        }
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Number(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Boolean(value)
    }
}

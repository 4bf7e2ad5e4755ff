//! Canonical value store for all fields.
//!
//! Values are kept in first-write order. Reading a field that was never
//! written yields the [`ABSENT`] sentinel instead of an error.

use indexmap::IndexMap;
use serde_json::Value as JsonValue;

use crate::schema::{FieldValue, ABSENT};

/// Immutable copy of every stored value, in first-write order.
pub type Snapshot = IndexMap<String, JsonValue>;

#[derive(Debug, Default)]
pub struct ValueStore {
    values: IndexMap<String, FieldValue>,
}

impl ValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write a value, returning the one it replaced.
    pub fn set(&mut self, field: &str, value: FieldValue) -> FieldValue {
        self.values
            .insert(field.to_string(), value)
            .unwrap_or_default()
    }

    pub fn get(&self, field: &str) -> &FieldValue {
        self.values.get(field).unwrap_or(&ABSENT)
    }

    /// Whether the field has been written at least once.
    pub fn contains(&self, field: &str) -> bool {
        self.values.contains_key(field)
    }

    /// Written field names in first-write order.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of written fields whose value is not empty.
    pub fn filled_count<'a, I>(&self, names: I) -> usize
    where
        I: IntoIterator<Item = &'a str>,
    {
        names
            .into_iter()
            .filter(|name| !self.get(name).is_empty())
            .count()
    }

    pub fn snapshot(&self) -> Snapshot {
        self.values
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect()
    }

    /// Drop every value.
    pub fn clear(&mut self) {
        self.values.clear();
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

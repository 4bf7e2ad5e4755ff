//! Append-only field schema registry
//!
//! Every field name maps to an ordered list of immutable schema versions.
//! Readers always see the latest version; older versions are kept for audit.
//! A field is never removed and a version is never edited in place.

use indexmap::IndexMap;
use log::info;
use std::sync::Arc;

use super::types::{FieldSchema, RegistrationError, RegistrationResult};

#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    versions: IndexMap<String, Vec<Arc<FieldSchema>>>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from an initial field list, rejecting duplicate names.
    pub fn from_fields<I>(fields: I) -> RegistrationResult<Self>
    where
        I: IntoIterator<Item = FieldSchema>,
    {
        let mut registry = Self::new();
        for field in fields {
            registry.register(field)?;
        }
        Ok(registry)
    }

    /// Register a brand new field.
    pub fn register(&mut self, schema: FieldSchema) -> RegistrationResult<Arc<FieldSchema>> {
        if self.versions.contains_key(&schema.name) {
            return Err(RegistrationError::DuplicateField { name: schema.name });
        }
        let schema = Arc::new(schema);
        self.versions
            .insert(schema.name.clone(), vec![Arc::clone(&schema)]);
        Ok(schema)
    }

    /// Install a new version of an existing field.
    ///
    /// Rules may be relaxed at runtime but a field that is currently optional
    /// cannot become required again.
    pub fn install_version(&mut self, schema: FieldSchema) -> RegistrationResult<Arc<FieldSchema>> {
        let history = self
            .versions
            .get_mut(&schema.name)
            .ok_or_else(|| RegistrationError::UnknownField {
                name: schema.name.clone(),
            })?;
        let current = history
            .last()
            .ok_or_else(|| RegistrationError::UnknownField {
                name: schema.name.clone(),
            })?;
        if schema.required && !current.required {
            return Err(RegistrationError::TighteningNotAllowed { name: schema.name });
        }
        let schema = Arc::new(schema);
        history.push(Arc::clone(&schema));
        info!(
            "Installed schema version {} for field '{}'",
            history.len(),
            schema.name
        );
        Ok(schema)
    }

    /// Install a not-required version of `name`. No-op when already optional.
    pub fn relax_required(&mut self, name: &str) -> RegistrationResult<Arc<FieldSchema>> {
        let current = self
            .get(name)
            .ok_or_else(|| RegistrationError::UnknownField {
                name: name.to_string(),
            })?;
        if !current.required {
            return Ok(current);
        }
        let relaxed = current.relaxed();
        self.install_version(relaxed)
    }

    /// Latest version of a field.
    pub fn get(&self, name: &str) -> Option<Arc<FieldSchema>> {
        self.versions
            .get(name)
            .and_then(|history| history.last())
            .cloned()
    }

    /// All versions of a field, oldest first.
    pub fn history(&self, name: &str) -> &[Arc<FieldSchema>] {
        self.versions.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.versions.contains_key(name)
    }

    /// Field names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.versions.keys().map(String::as_str)
    }

    /// Latest versions in registration order.
    pub fn fields(&self) -> impl Iterator<Item = Arc<FieldSchema>> + '_ {
        self.versions.values().filter_map(|history| history.last().cloned())
    }

    pub fn len(&self) -> usize {
        self.versions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }
}

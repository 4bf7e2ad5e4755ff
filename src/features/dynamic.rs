//! Dynamic field groups.
//!
//! Each group adds instances named `{base}_{n}`, counting from zero. Adding an
//! instance registers a new schema entry; existing entries are never touched.

use indexmap::IndexMap;
use log::info;
use serde::{Deserialize, Serialize};

use crate::schema::{FieldSchema, FieldType, RegistrationError, RegistrationResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DynamicGroup {
    pub base: String,
    #[serde(default)]
    pub label: Option<String>,
    /// Unlimited when absent
    #[serde(default)]
    pub max_instances: Option<usize>,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub field_type: FieldType,
    #[serde(default)]
    pub min_length: Option<usize>,
}

impl DynamicGroup {
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            label: None,
            max_instances: None,
            required: false,
            field_type: FieldType::Text,
            min_length: None,
        }
    }

    pub fn with_max_instances(mut self, max: usize) -> Self {
        self.max_instances = Some(max);
        self
    }

    fn instance_schema(&self, index: usize) -> FieldSchema {
        let mut schema = FieldSchema::new(format!("{}_{}", self.base, index))
            .with_type(self.field_type);
        if let Some(label) = &self.label {
            schema = schema.with_label(label.clone());
        }
        if let Some(min) = self.min_length {
            schema = schema.with_min_length(min);
        }
        if self.required {
            schema = schema.required();
        }
        schema
    }
}

#[derive(Debug, Clone, Default)]
pub struct DynamicGroups {
    groups: IndexMap<String, (DynamicGroup, usize)>,
}

impl DynamicGroups {
    pub fn new(groups: Vec<DynamicGroup>) -> Self {
        Self {
            groups: groups
                .into_iter()
                .map(|group| (group.base.clone(), (group, 0)))
                .collect(),
        }
    }

    pub fn instance_count(&self, base: &str) -> usize {
        self.groups.get(base).map(|(_, count)| *count).unwrap_or(0)
    }

    /// Schema for the next instance of a group. The count only moves once
    /// the caller confirms registration with [`DynamicGroups::commit`].
    pub fn next_instance(&self, base: &str) -> RegistrationResult<FieldSchema> {
        let (group, count) = self
            .groups
            .get(base)
            .ok_or_else(|| RegistrationError::UnknownField {
                name: base.to_string(),
            })?;
        if let Some(max) = group.max_instances {
            if *count >= max {
                return Err(RegistrationError::InstanceLimit {
                    base: base.to_string(),
                    max,
                });
            }
        }
        Ok(group.instance_schema(*count))
    }

    pub fn commit(&mut self, base: &str) {
        if let Some((_, count)) = self.groups.get_mut(base) {
            *count += 1;
            info!("Added instance {} of dynamic group '{}'", count, base);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instances_are_numbered_from_zero() {
        let mut groups = DynamicGroups::new(vec![DynamicGroup::new("sibling").with_max_instances(2)]);
        let first = groups.next_instance("sibling").unwrap();
        assert_eq!(first.name, "sibling_0");
        groups.commit("sibling");
        assert_eq!(groups.next_instance("sibling").unwrap().name, "sibling_1");
        groups.commit("sibling");

        assert_eq!(
            groups.next_instance("sibling"),
            Err(RegistrationError::InstanceLimit {
                base: "sibling".to_string(),
                max: 2
            })
        );
        assert_eq!(groups.instance_count("sibling"), 2);
    }

    #[test]
    fn test_unknown_group() {
        let groups = DynamicGroups::default();
        assert!(matches!(
            groups.next_instance("pet"),
            Err(RegistrationError::UnknownField { .. })
        ));
    }
}

//! Declarative derived fields: sums, progress, conditional visibility and prices.

use serde::{Deserialize, Serialize};

use super::graph::DerivedField;
use super::pricing::PricingRules;
use crate::schema::{FieldValue, SchemaRegistry};

/// Derived fields holding a field's visibility are named `visible:<field>`.
pub const VISIBILITY_PREFIX: &str = "visible:";

pub fn visibility_key(field: &str) -> String {
    format!("{}{}", VISIBILITY_PREFIX, field)
}

/// Predicate over a single field's value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Condition {
    Equals { field: String, value: String },
    NotEquals { field: String, value: String },
    OneOf { field: String, values: Vec<String> },
    NotEmpty { field: String },
    Checked { field: String },
}

impl Condition {
    pub fn field(&self) -> &str {
        match self {
            Condition::Equals { field, .. }
            | Condition::NotEquals { field, .. }
            | Condition::OneOf { field, .. }
            | Condition::NotEmpty { field }
            | Condition::Checked { field } => field,
        }
    }

    pub fn holds(&self, value: &FieldValue) -> bool {
        match self {
            Condition::Equals { value: expected, .. } => value.as_text() == *expected,
            Condition::NotEquals { value: expected, .. } => value.as_text() != *expected,
            Condition::OneOf { values, .. } => {
                let text = value.as_text();
                values.iter().any(|v| *v == text)
            }
            Condition::NotEmpty { .. } => !value.is_blank(),
            Condition::Checked { .. } => value.as_bool(),
        }
    }
}

/// `visible:<target>` is true while `when` holds.
pub fn visibility(target: &str, when: Condition) -> DerivedField {
    let inputs = vec![when.field().to_string()];
    DerivedField::new(visibility_key(target), inputs, move |values| {
        FieldValue::Boolean(when.holds(values.at(0)))
    })
}

/// Sum of the numeric readings of `inputs`; non-numeric inputs count as zero.
pub fn sum(name: &str, inputs: Vec<String>) -> DerivedField {
    DerivedField::new(name, inputs, |values| {
        FieldValue::Number(values.iter().filter_map(|(_, v)| v.as_number()).sum())
    })
}

/// Percentage of `fields` holding a non-empty value, rounded to an integer.
pub fn progress(name: &str, fields: Vec<String>) -> DerivedField {
    DerivedField::new(name, fields, |values| {
        if values.is_empty() {
            return FieldValue::Number(0.0);
        }
        let filled = values.iter().filter(|(_, v)| !v.is_empty()).count();
        FieldValue::Number((filled as f64 / values.len() as f64 * 100.0).round())
    })
}

/// Host-configurable derived field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DerivationSpec {
    Sum {
        name: String,
        inputs: Vec<String>,
    },
    /// Progress over the listed fields, or every field registered at construction
    Progress {
        name: String,
        #[serde(default)]
        fields: Option<Vec<String>>,
    },
    Visibility {
        field: String,
        when: Condition,
    },
    Price {
        name: String,
        rules: PricingRules,
    },
}

impl DerivationSpec {
    pub fn name(&self) -> String {
        match self {
            DerivationSpec::Sum { name, .. }
            | DerivationSpec::Progress { name, .. }
            | DerivationSpec::Price { name, .. } => name.clone(),
            DerivationSpec::Visibility { field, .. } => visibility_key(field),
        }
    }

    pub fn build(&self, schema: &SchemaRegistry) -> DerivedField {
        match self {
            DerivationSpec::Sum { name, inputs } => sum(name, inputs.clone()),
            DerivationSpec::Progress { name, fields } => {
                let fields = fields
                    .clone()
                    .unwrap_or_else(|| schema.names().map(str::to_string).collect());
                progress(name, fields)
            }
            DerivationSpec::Visibility { field, when } => visibility(field, when.clone()),
            DerivationSpec::Price { name, rules } => rules.clone().into_derived(name.clone()),
        }
    }
}

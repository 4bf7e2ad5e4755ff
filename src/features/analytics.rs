use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::store::Snapshot;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    pub group_field: String,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            group_field: "grade".to_string(),
        }
    }
}

/// Totals over the submitted-entries collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsSummary {
    pub total: usize,
    /// Entry count per group value, in first-seen order
    pub by_group: IndexMap<String, usize>,
}

impl AnalyticsSummary {
    /// Entries without the group field are counted under `"undefined"`.
    pub fn summarize(entries: &[Snapshot], group_field: &str) -> Self {
        let mut by_group = IndexMap::new();
        for entry in entries {
            let group = match entry.get(group_field) {
                Some(JsonValue::String(s)) => s.clone(),
                Some(JsonValue::Null) | None => "undefined".to_string(),
                Some(other) => other.to_string(),
            };
            *by_group.entry(group).or_insert(0) += 1;
        }
        Self {
            total: entries.len(),
            by_group,
        }
    }
}

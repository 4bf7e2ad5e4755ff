use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Per-field suggestion sources.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SuggestionSources {
    sources: IndexMap<String, Vec<String>>,
}

impl SuggestionSources {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_source<I, S>(mut self, field: impl Into<String>, items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sources
            .insert(field.into(), items.into_iter().map(Into::into).collect());
        self
    }

    pub fn has_source(&self, field: &str) -> bool {
        self.sources.contains_key(field)
    }

    /// Source items starting with `text`, ignoring case, in source order.
    /// Empty text matches every item.
    pub fn matching(&self, field: &str, text: &str) -> Vec<String> {
        let Some(items) = self.sources.get(field) else {
            return Vec::new();
        };
        let needle = text.to_lowercase();
        items
            .iter()
            .filter(|item| item.to_lowercase().starts_with(&needle))
            .cloned()
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

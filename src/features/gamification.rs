use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_POINTS_PER_FIELD;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GamificationConfig {
    pub points_per_field: u32,
}

impl Default for GamificationConfig {
    fn default() -> Self {
        Self {
            points_per_field: DEFAULT_POINTS_PER_FIELD,
        }
    }
}

/// Points awarded once per field, the first time it is valid and non-blank.
#[derive(Debug, Clone, Default)]
pub struct PointsTracker {
    config: GamificationConfig,
    completed: IndexSet<String>,
    points: u32,
}

impl PointsTracker {
    pub fn new(config: GamificationConfig) -> Self {
        Self {
            config,
            completed: IndexSet::new(),
            points: 0,
        }
    }

    /// Returns the new total if this input earned points.
    pub fn record(&mut self, field: &str, valid: bool, blank: bool) -> Option<u32> {
        if !valid || blank || self.completed.contains(field) {
            return None;
        }
        self.completed.insert(field.to_string());
        self.points += self.config.points_per_field;
        Some(self.points)
    }

    pub fn points(&self) -> u32 {
        self.points
    }

    /// Fields that have earned points, in the order they did.
    pub fn completed_fields(&self) -> impl Iterator<Item = &str> {
        self.completed.iter().map(String::as_str)
    }

    pub fn reset(&mut self) {
        self.completed.clear();
        self.points = 0;
    }
}

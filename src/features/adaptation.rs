//! Behaviour adaptation.
//!
//! Fields the user keeps skipping are relaxed to optional, and fields left
//! empty after input stops get a hint once the typing threshold passes.

use log::info;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::time::Duration;

use crate::constants::{DEFAULT_SKIP_TOLERANCE, DEFAULT_TYPING_THRESHOLD_MS};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdaptationConfig {
    /// Empty blurs before a required field is relaxed
    pub skip_tolerance: u32,
    pub typing_threshold_ms: u64,
    /// Per-field hint text; fields without one use the catalog hint
    pub hints: HashMap<String, String>,
}

impl Default for AdaptationConfig {
    fn default() -> Self {
        Self {
            skip_tolerance: DEFAULT_SKIP_TOLERANCE,
            typing_threshold_ms: DEFAULT_TYPING_THRESHOLD_MS,
            hints: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct BehaviorTracker {
    config: AdaptationConfig,
    skips: HashMap<String, u32>,
    relaxed: HashSet<String>,
}

impl BehaviorTracker {
    pub fn new(config: AdaptationConfig) -> Self {
        Self {
            config,
            skips: HashMap::new(),
            relaxed: HashSet::new(),
        }
    }

    pub fn typing_threshold(&self) -> Duration {
        Duration::from_millis(self.config.typing_threshold_ms)
    }

    pub fn hint_for(&self, field: &str) -> Option<&str> {
        self.config.hints.get(field).map(String::as_str)
    }

    pub fn skip_count(&self, field: &str) -> u32 {
        self.skips.get(field).copied().unwrap_or(0)
    }

    /// Record a blur. Returns true exactly once per field: when the skip
    /// count first reaches the tolerance.
    pub fn record_blur(&mut self, field: &str, empty: bool) -> bool {
        if empty {
            *self.skips.entry(field.to_string()).or_insert(0) += 1;
        }
        if self.skip_count(field) >= self.config.skip_tolerance
            && self.relaxed.insert(field.to_string())
        {
            info!(
                "Field '{}' skipped {} times, relaxing required rule",
                field,
                self.skip_count(field)
            );
            return true;
        }
        false
    }

    pub fn reset(&mut self) {
        self.skips.clear();
        self.relaxed.clear();
    }
}

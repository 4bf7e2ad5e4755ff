//! Interval autosave with dirty tracking.

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use crate::constants::DEFAULT_AUTOSAVE_INTERVAL_MS;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutosaveConfig {
    /// Minimum time between two writes of the autosave slot
    pub interval_ms: u64,
}

impl Default for AutosaveConfig {
    fn default() -> Self {
        Self {
            interval_ms: DEFAULT_AUTOSAVE_INTERVAL_MS,
        }
    }
}

impl AutosaveConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// Tracks unsaved changes and decides when the next write is due.
#[derive(Debug, Clone)]
pub struct AutosaveTracker {
    config: AutosaveConfig,
    dirty: bool,
    /// Start of the current interval: the last save, or construction
    interval_start: Instant,
}

impl AutosaveTracker {
    pub fn new(config: AutosaveConfig, now: Instant) -> Self {
        Self {
            config,
            dirty: false,
            interval_start: now,
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// A save is due once the interval has elapsed with unsaved changes.
    pub fn is_due(&self, now: Instant) -> bool {
        self.dirty && now.saturating_duration_since(self.interval_start) >= self.config.interval()
    }

    pub fn save_complete(&mut self, now: Instant) {
        self.dirty = false;
        self.interval_start = now;
    }

    /// Keep the changes marked dirty and retry on the next interval.
    pub fn save_failed(&mut self, now: Instant) {
        self.interval_start = now;
    }
}

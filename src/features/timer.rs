//! Pending timers polled by the engine: per-field hint timers and the form
//! deadline. Both the deadline firing and a user cancel clear every timer.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormTimerConfig {
    /// Time from engine construction (or reset) until auto-submit
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Default)]
pub struct Timers {
    form_deadline: Option<Instant>,
    hints: IndexMap<String, Instant>,
}

impl Timers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arm_form(&mut self, now: Instant, duration: Duration) {
        self.form_deadline = Some(now + duration);
    }

    /// (Re)arm a field's hint timer; restarting replaces the old deadline.
    pub fn arm_hint(&mut self, field: &str, deadline: Instant) {
        self.hints.insert(field.to_string(), deadline);
    }

    pub fn cancel_hint(&mut self, field: &str) {
        self.hints.shift_remove(field);
    }

    /// Take the hint timers that have fired, in arming order.
    pub fn take_due_hints(&mut self, now: Instant) -> Vec<String> {
        let due: Vec<String> = self
            .hints
            .iter()
            .filter(|(_, deadline)| **deadline <= now)
            .map(|(field, _)| field.clone())
            .collect();
        for field in &due {
            self.hints.shift_remove(field);
        }
        due
    }

    pub fn form_due(&self, now: Instant) -> bool {
        self.form_deadline.map(|d| d <= now).unwrap_or(false)
    }

    pub fn form_deadline(&self) -> Option<Instant> {
        self.form_deadline
    }

    pub fn pending(&self) -> usize {
        self.hints.len() + usize::from(self.form_deadline.is_some())
    }

    pub fn clear_all(&mut self) {
        self.form_deadline = None;
        self.hints.clear();
    }
}

//! Multi-step navigation state machine
//!
//! States are the step indices `0..N` plus a terminal `Submitted` state.
//! Moving forward is gated on every field of the current step being valid;
//! moving back is never gated.

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::schema::{RegistrationError, RegistrationResult, SchemaRegistry};

/// An ordered group of fields shown together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    pub name: String,
    pub fields: Vec<String>,
}

impl Step {
    pub fn new<I, S>(name: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NavState {
    AtStep(usize),
    Submitted,
}

/// Result of an `advance` request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advance {
    /// Moved to the given index
    Moved(usize),
    /// The current step has invalid fields; nothing changed
    Blocked { invalid_fields: Vec<String> },
    /// The last step is valid; the caller should run the submission pipeline
    ReadyToSubmit,
    /// Already in the terminal state
    AlreadySubmitted,
}

#[derive(Debug, Clone)]
pub struct StepNavigator {
    steps: Vec<Step>,
    state: NavState,
}

impl StepNavigator {
    /// Build a navigator, checking every step field against the schema.
    pub fn new(steps: Vec<Step>, schema: &SchemaRegistry) -> RegistrationResult<Self> {
        for step in &steps {
            if step.fields.is_empty() {
                return Err(RegistrationError::InvalidStep {
                    step: step.name.clone(),
                    reason: "a step needs at least one field".to_string(),
                });
            }
            if let Some(missing) = step.fields.iter().find(|f| !schema.contains(f)) {
                return Err(RegistrationError::InvalidStep {
                    step: step.name.clone(),
                    reason: format!("unknown field '{}'", missing),
                });
            }
        }
        Ok(Self {
            steps,
            state: NavState::AtStep(0),
        })
    }

    pub fn is_multi_step(&self) -> bool {
        !self.steps.is_empty()
    }

    pub fn state(&self) -> NavState {
        self.state
    }

    pub fn current_index(&self) -> Option<usize> {
        match self.state {
            NavState::AtStep(index) => Some(index),
            NavState::Submitted => None,
        }
    }

    pub fn current_step(&self) -> Option<&Step> {
        self.current_index().and_then(|i| self.steps.get(i))
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn is_last_step(&self) -> bool {
        matches!(self.state, NavState::AtStep(i) if i + 1 >= self.steps.len())
    }

    /// Try to move forward. `invalid` receives the current step's fields and
    /// returns the ones that fail validation.
    pub fn advance<F>(&mut self, invalid: F) -> Advance
    where
        F: FnOnce(&[String]) -> Vec<String>,
    {
        let NavState::AtStep(index) = self.state else {
            return Advance::AlreadySubmitted;
        };
        let fields = self
            .steps
            .get(index)
            .map(|s| s.fields.as_slice())
            .unwrap_or(&[]);
        let invalid_fields = invalid(fields);
        if !invalid_fields.is_empty() {
            debug!("Step {} blocked by {:?}", index, invalid_fields);
            return Advance::Blocked { invalid_fields };
        }
        if index + 1 >= self.steps.len() {
            return Advance::ReadyToSubmit;
        }
        self.state = NavState::AtStep(index + 1);
        info!("Advanced to step {}", index + 1);
        Advance::Moved(index + 1)
    }

    /// Move back one step. No-op at the first step and after submission.
    pub fn retreat(&mut self) -> NavState {
        if let NavState::AtStep(index) = self.state {
            if index > 0 {
                self.state = NavState::AtStep(index - 1);
                info!("Retreated to step {}", index - 1);
            }
        }
        self.state
    }

    /// Enter the terminal state after a successful final submission.
    pub fn mark_submitted(&mut self) {
        self.state = NavState::Submitted;
    }

    /// Back to the first step.
    pub fn reset(&mut self) {
        self.state = NavState::AtStep(0);
    }
}

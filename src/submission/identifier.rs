//! Registration identifier generation.
//!
//! Format: `{NAME}{CODE}-{YEAR}-{NNN}` where
//! - `NAME` is the first three characters of the name field, upper-cased
//! - `CODE` is the second whitespace-separated token of the code field
//!   (`"Grade 5"` gives `5`), or `X` when there is none
//! - `YEAR` is the current calendar year
//! - `NNN` is a zero-padded random number below 1000
//!
//! Identifiers are not persisted anywhere except in the submitted snapshot.

use chrono::Datelike;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

use crate::store::Snapshot;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentifierFormat {
    pub name_field: String,
    pub code_field: String,
    /// Field of the snapshot the identifier is written to
    pub target_field: String,
}

impl Default for IdentifierFormat {
    fn default() -> Self {
        Self {
            name_field: "studentName".to_string(),
            code_field: "grade".to_string(),
            target_field: "studentID".to_string(),
        }
    }
}

#[derive(Debug)]
pub struct IdentifierGenerator {
    format: IdentifierFormat,
    rng: Mutex<StdRng>,
}

impl IdentifierGenerator {
    pub fn new(format: IdentifierFormat) -> Self {
        Self {
            format,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Deterministic random component, for tests and replays.
    pub fn with_seed(format: IdentifierFormat, seed: u64) -> Self {
        Self {
            format,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    pub fn format(&self) -> &IdentifierFormat {
        &self.format
    }

    pub fn generate(&self, values: &Snapshot) -> String {
        self.generate_for_year(values, chrono::Utc::now().year())
    }

    pub fn generate_for_year(&self, values: &Snapshot, year: i32) -> String {
        let name = text(values, &self.format.name_field);
        let prefix: String = name.chars().take(3).collect::<String>().to_uppercase();
        let code_source = text(values, &self.format.code_field);
        let code = code_source.split(' ').nth(1).filter(|c| !c.is_empty()).unwrap_or("X");
        let random = match self.rng.lock() {
            Ok(mut rng) => rng.gen_range(0..1000),
            Err(poisoned) => poisoned.into_inner().gen_range(0..1000),
        };
        format!("{}{}-{}-{:03}", prefix, code, year, random)
    }
}

fn text(values: &Snapshot, field: &str) -> String {
    match values.get(field) {
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(serde_json::Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use super::transport::SubmissionPayload;
use crate::store::Snapshot;

/// Immutable snapshot of the form taken at submit time.
///
/// Records are created by the pipeline and only ever cloned afterwards. The
/// digest covers everything that is delivered, so a queued record that was
/// altered on disk is detected before it is sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionRecord {
    id: Uuid,
    sequence: u64,
    created_at: DateTime<Utc>,
    target: String,
    values: Snapshot,
    identifier: Option<String>,
    digest: String,
}

impl SubmissionRecord {
    pub fn new(sequence: u64, target: String, values: Snapshot, identifier: Option<String>) -> Self {
        let digest = compute_digest(sequence, &target, &values, identifier.as_deref());
        Self {
            id: Uuid::new_v4(),
            sequence,
            created_at: Utc::now(),
            target,
            values,
            identifier,
            digest,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn values(&self) -> &Snapshot {
        &self.values
    }

    pub fn identifier(&self) -> Option<&str> {
        self.identifier.as_deref()
    }

    pub fn digest(&self) -> &str {
        &self.digest
    }

    /// Whether the content still matches the digest taken at creation.
    pub fn verify(&self) -> bool {
        compute_digest(
            self.sequence,
            &self.target,
            &self.values,
            self.identifier.as_deref(),
        ) == self.digest
    }

    /// Request body for the transport: the snapshot as a JSON object.
    pub fn payload(&self) -> SubmissionPayload {
        let body: serde_json::Map<String, JsonValue> = self
            .values
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        SubmissionPayload {
            target: self.target.clone(),
            sequence: self.sequence,
            body: JsonValue::Object(body),
        }
    }
}

fn compute_digest(sequence: u64, target: &str, values: &Snapshot, identifier: Option<&str>) -> String {
    let canonical = json!({
        "sequence": sequence,
        "target": target,
        "values": values.iter().map(|(k, v)| json!([k, v])).collect::<Vec<_>>(),
        "identifier": identifier,
    });
    let mut hasher = Sha256::new();
    hasher.update(canonical.to_string().as_bytes());
    hex::encode(hasher.finalize())
}

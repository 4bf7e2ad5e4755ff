//! Submission pipeline
//!
//! A submission runs these stages in order; any stage may end the attempt:
//! 1. Global validity gate
//! 2. Duplicate check against the existing entries and the offline queue
//! 3. Identifier generation (written into the snapshot)
//! 4. Delivery through the transport, queuing on failure when enabled
//! 5. Confirmation notification (failure is logged, never propagated)
//! 6. Completion callback, exactly once per delivered submission
//!
//! A record joins the submitted entries only once delivered. Stages 5 and 6
//! run for queued records when a later drain delivers them.

use log::{error, info, warn};
use serde_json::Value as JsonValue;
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;

use super::error::{SubmissionError, SubmissionResult};
use super::identifier::IdentifierGenerator;
use super::queue::OfflineQueue;
use super::record::SubmissionRecord;
use super::transport::{
    ExistingEntries, Notification, Notifier, ServerAck, Transport, TransportError,
};
use crate::config::ConfirmationTemplate;
use crate::storage::Collections;
use crate::store::Snapshot;

/// Invoked with the final record of every delivered submission.
pub type CompletionCallback = Arc<dyn Fn(&SubmissionRecord) + Send + Sync>;

/// How stage 4 delivers a record.
#[derive(Clone)]
pub enum Delivery {
    /// No remote target; acceptance is local
    LocalOnly,
    Remote {
        transport: Arc<dyn Transport>,
        target: String,
        offline_queue: bool,
    },
}

impl fmt::Debug for Delivery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Delivery::LocalOnly => write!(f, "LocalOnly"),
            Delivery::Remote {
                target,
                offline_queue,
                ..
            } => f
                .debug_struct("Remote")
                .field("target", target)
                .field("offline_queue", offline_queue)
                .finish(),
        }
    }
}

/// Confirmation notification capability: a template plus the channel.
#[derive(Clone, Debug)]
pub struct Confirmation {
    pub template: ConfirmationTemplate,
    pub notifier: Arc<dyn Notifier>,
}

/// Every capability of the pipeline, decided once at construction.
#[derive(Clone)]
pub struct PipelineSettings {
    pub delivery: Delivery,
    pub duplicate_key_field: Option<String>,
    pub existing_entries: Arc<dyn ExistingEntries>,
    pub identifier: Option<Arc<IdentifierGenerator>>,
    pub confirmation: Option<Confirmation>,
    pub on_complete: Option<CompletionCallback>,
}

/// What the engine hands to the pipeline.
#[derive(Debug, Clone)]
pub struct SubmissionRequest {
    pub values: Snapshot,
    pub invalid_fields: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NotificationStatus {
    NotConfigured,
    Sent,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionOutcome {
    /// Delivered (or accepted locally); stages 5 and 6 have run
    Delivered {
        record: SubmissionRecord,
        ack: Option<ServerAck>,
        notification: NotificationStatus,
    },
    /// Delivery failed; the record waits in the offline queue
    Queued {
        record: SubmissionRecord,
        error: TransportError,
    },
}

impl SubmissionOutcome {
    pub fn record(&self) -> &SubmissionRecord {
        match self {
            SubmissionOutcome::Delivered { record, .. } | SubmissionOutcome::Queued { record, .. } => {
                record
            }
        }
    }

    pub fn is_delivered(&self) -> bool {
        matches!(self, SubmissionOutcome::Delivered { .. })
    }
}

/// Result of one drain pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DrainReport {
    /// Sequence numbers delivered, in order
    pub delivered: Vec<u64>,
    /// The failure that stopped the pass, if any
    pub halted: Option<TransportError>,
    /// Records still pending after the pass
    pub remaining: usize,
}

pub struct SubmissionPipeline {
    settings: PipelineSettings,
    collections: Collections,
    queue: OfflineQueue,
    in_flight: Mutex<()>,
    draining: Mutex<()>,
}

impl fmt::Debug for SubmissionPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubmissionPipeline")
            .field("delivery", &self.settings.delivery)
            .field("duplicate_key_field", &self.settings.duplicate_key_field)
            .finish()
    }
}

impl SubmissionPipeline {
    pub fn new(settings: PipelineSettings, collections: Collections) -> Self {
        let queue = OfflineQueue::new(collections.clone());
        Self {
            settings,
            collections,
            queue,
            in_flight: Mutex::new(()),
            draining: Mutex::new(()),
        }
    }

    pub fn queue(&self) -> &OfflineQueue {
        &self.queue
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Whether a submission is currently running.
    pub fn is_in_flight(&self) -> bool {
        self.in_flight.try_lock().is_err()
    }

    /// Run one submission attempt. Reentrant calls while one is pending are rejected.
    pub async fn submit(&self, request: SubmissionRequest) -> SubmissionResult<SubmissionOutcome> {
        let _guard = self
            .in_flight
            .try_lock()
            .map_err(|_| SubmissionError::AlreadyInFlight)?;

        // Stage 1: validity gate
        if !request.invalid_fields.is_empty() {
            info!(
                "Submission aborted: invalid fields {:?}",
                request.invalid_fields
            );
            return Err(SubmissionError::InvalidForm {
                invalid_fields: request.invalid_fields,
            });
        }
        let mut values = request.values;

        // Stage 2: duplicate check
        if let Some(key_field) = &self.settings.duplicate_key_field {
            let value = values.get(key_field).cloned().unwrap_or(JsonValue::Null);
            if !is_blank(&value) && self.is_duplicate(key_field, &value)? {
                info!("Submission aborted: duplicate {} = {}", key_field, value);
                return Err(SubmissionError::Duplicate {
                    key_field: key_field.clone(),
                    value: display(&value),
                });
            }
        }

        // Stage 3: identifier
        let identifier = self.settings.identifier.as_ref().map(|generator| {
            let id = generator.generate(&values);
            values.insert(
                generator.format().target_field.clone(),
                JsonValue::String(id.clone()),
            );
            id
        });

        let sequence = self.collections.next_sequence()?;
        let target = match &self.settings.delivery {
            Delivery::LocalOnly => String::new(),
            Delivery::Remote { target, .. } => target.clone(),
        };
        let record = SubmissionRecord::new(sequence, target, values, identifier);

        // Stage 4: delivery
        let ack = match &self.settings.delivery {
            Delivery::LocalOnly => None,
            Delivery::Remote {
                transport,
                offline_queue,
                ..
            } => match transport.submit(&record.payload()).await {
                Ok(ack) => Some(ack),
                Err(err) if *offline_queue => {
                    warn!(
                        "Delivery of submission #{} failed, queuing: {}",
                        record.sequence(),
                        err
                    );
                    self.queue.enqueue(record.clone())?;
                    return Ok(SubmissionOutcome::Queued { record, error: err });
                }
                Err(err) => {
                    error!("Delivery of submission #{} failed: {}", record.sequence(), err);
                    return Err(SubmissionError::TransportFailed(err));
                }
            },
        };

        self.collections.append_entry(record.values().clone())?;
        info!("Submission #{} delivered", record.sequence());

        // Stages 5 and 6
        let notification = self.after_delivery(&record).await;
        Ok(SubmissionOutcome::Delivered {
            record,
            ack,
            notification,
        })
    }

    /// Deliver queued records in FIFO order until the queue is empty or a
    /// delivery fails. The failed record stays at the head of the queue.
    pub async fn drain(&self) -> SubmissionResult<DrainReport> {
        let _guard = self
            .draining
            .try_lock()
            .map_err(|_| SubmissionError::DrainInProgress)?;

        let mut report = DrainReport::default();
        let Delivery::Remote { transport, .. } = &self.settings.delivery else {
            report.remaining = self.queue.len()?;
            return Ok(report);
        };

        while let Some(record) = self.queue.front()? {
            if !record.verify() {
                error!("Queued submission {} failed its digest check", record.id());
                return Err(SubmissionError::CorruptRecord { id: record.id() });
            }
            match transport.submit(&record.payload()).await {
                Ok(_) => {
                    self.queue.remove(record.id())?;
                    self.collections.append_entry(record.values().clone())?;
                    info!("Drained queued submission #{}", record.sequence());
                    report.delivered.push(record.sequence());
                    self.after_delivery(&record).await;
                }
                Err(err) => {
                    warn!(
                        "Drain halted at submission #{}: {}",
                        record.sequence(),
                        err
                    );
                    report.halted = Some(err);
                    break;
                }
            }
        }
        report.remaining = self.queue.len()?;
        Ok(report)
    }

    /// Drop a pending record without delivering it.
    pub fn abandon(&self, record: &SubmissionRecord) -> SubmissionResult<bool> {
        info!("Abandoning queued submission #{}", record.sequence());
        Ok(self.queue.remove(record.id())?)
    }

    fn is_duplicate(&self, key_field: &str, value: &JsonValue) -> SubmissionResult<bool> {
        if self.settings.existing_entries.contains(key_field, value)? {
            return Ok(true);
        }
        Ok(self
            .queue
            .pending()?
            .iter()
            .any(|record| record.values().get(key_field) == Some(value)))
    }

    async fn after_delivery(&self, record: &SubmissionRecord) -> NotificationStatus {
        let status = match &self.settings.confirmation {
            None => NotificationStatus::NotConfigured,
            Some(confirmation) => {
                let notification = confirmation.template.compose(record.values());
                match confirmation.notifier.send(&notification).await {
                    Ok(()) => NotificationStatus::Sent,
                    Err(err) => {
                        warn!(
                            "Confirmation for submission #{} failed: {}",
                            record.sequence(),
                            err
                        );
                        NotificationStatus::Failed(err.to_string())
                    }
                }
            }
        };
        if let Some(callback) = &self.settings.on_complete {
            callback(record);
        }
        status
    }
}

fn is_blank(value: &JsonValue) -> bool {
    match value {
        JsonValue::Null => true,
        JsonValue::String(s) => s.is_empty(),
        _ => false,
    }
}

fn display(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl ConfirmationTemplate {
    /// Fill the template from the submitted values.
    pub fn compose(&self, values: &Snapshot) -> Notification {
        Notification {
            to: values
                .get(&self.recipient_field)
                .map(display)
                .unwrap_or_default(),
            subject: fill(&self.subject, values),
            body: fill(&self.body, values),
        }
    }
}

/// Replace `{field}` placeholders with snapshot values; unknown fields become empty.
fn fill(template: &str, values: &Snapshot) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        match rest[start..].find('}') {
            Some(len) => {
                let name = &rest[start + 1..start + len];
                if let Some(value) = values.get(name) {
                    if !value.is_null() {
                        out.push_str(&display(value));
                    }
                }
                rest = &rest[start + len + 1..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_template_fill() {
        let mut values = Snapshot::new();
        values.insert("studentName".to_string(), json!("Ann"));
        values.insert("studentID".to_string(), json!("ANN5-2024-001"));
        assert_eq!(
            fill("Dear {studentName}, ID: {studentID}{missing}", &values),
            "Dear Ann, ID: ANN5-2024-001"
        );
        assert_eq!(fill("open { brace", &values), "open { brace");
    }

    #[test]
    fn test_compose_confirmation() {
        let mut values = Snapshot::new();
        values.insert("email".to_string(), json!("ann@example.com"));
        values.insert("studentName".to_string(), json!("Ann"));
        let notification = ConfirmationTemplate::default().compose(&values);
        assert_eq!(notification.to, "ann@example.com");
        assert_eq!(notification.subject, "Registration Confirmation");
        assert!(notification.body.starts_with("Dear Ann,"));
    }
}

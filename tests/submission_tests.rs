mod test_helpers;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use regex::Regex;
use serde_json::json;

use smartform::storage::{Collections, MemoryStorage, SledStorage, Storage, StorageKeys};
use smartform::submission::{
    Delivery, MockNotifier, MockTransport, NotificationStatus, PipelineSettings,
    SubmissionPipeline, SubmissionRequest,
};
use smartform::{
    Collaborators, FieldInput, FormEngine, RegistrationError, Snapshot, SubmissionError,
    SubmissionOutcome, SubmissionRecord, TransportError,
};
use test_helpers::*;

/// Submit, then reset so the next test step can submit again.
async fn submit_and_reset(fx: &mut EngineFixture, name: &str, email: &str) -> SubmissionOutcome {
    fx.fill_valid(name, email);
    let outcome = fx.engine.submit().await.expect("submission accepted");
    fx.engine.reset();
    outcome
}

#[tokio::test]
async fn test_delivered_submission_runs_every_stage() {
    let mut fx = EngineFixture::new(remote_config(false));
    fx.fill_valid("Aung Aung", "aung@example.com");

    let outcome = fx.engine.submit().await.unwrap();
    let SubmissionOutcome::Delivered {
        record,
        ack,
        notification,
    } = outcome
    else {
        panic!("expected delivery, got {:?}", outcome);
    };

    let id = record.identifier().unwrap().to_string();
    assert!(Regex::new(r"^AUN5-\d{4}-\d{3}$").unwrap().is_match(&id));
    assert_eq!(record.values()["studentID"], json!(id));
    assert_eq!(record.sequence(), 1);
    assert_eq!(ack.map(|a| a.status), Some(200));

    let delivered = fx.transport.delivered();
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].target, "https://example.com/api/students");
    assert_eq!(delivered[0].body["studentID"], json!(id));

    assert_eq!(notification, NotificationStatus::Sent);
    let sent = fx.notifier.sent();
    assert_eq!(sent[0].to, "aung@example.com");
    assert_eq!(sent[0].subject, "Registration Confirmation");
    assert_eq!(
        sent[0].body,
        format!("Dear Aung Aung, your registration is complete. Student ID: {}", id)
    );

    // The identifier lives in the record, not in the value store
    assert_eq!(fx.engine.value("studentID"), &smartform::FieldValue::Absent);
    assert_eq!(fx.engine.entries().unwrap().len(), 1);
}

#[tokio::test]
async fn test_invalid_form_aborts_without_side_effects() {
    let mut fx = EngineFixture::new(remote_config(true));
    fx.input("studentName", "Ann");
    let before = fx.engine.snapshot();

    let err = fx.engine.submit().await.unwrap_err();
    assert!(matches!(
        err,
        SubmissionError::InvalidForm { ref invalid_fields }
            if invalid_fields == &vec!["email".to_string(), "grade".to_string()]
    ));
    assert_eq!(fx.transport.attempts(), 0);
    assert_eq!(fx.engine.pending_count().unwrap(), 0);
    assert!(fx.engine.entries().unwrap().is_empty());
    assert_eq!(fx.engine.snapshot(), before);
    assert_eq!(fx.engine.shown_message("grade"), Some("grade is required."));
}

#[tokio::test]
async fn test_duplicate_aborts_before_transport_and_queue() {
    let mut fx = EngineFixture::new(remote_config(true));
    fx.transport.set_offline(true);
    fx.engine
        .import_entries_csv("studentName,email\nAnn,ann@example.com\n")
        .unwrap();
    fx.fill_valid("Ann", "ann@example.com");
    let before = fx.engine.snapshot();

    let err = fx.engine.submit().await.unwrap_err();
    assert!(matches!(
        err,
        SubmissionError::Duplicate { ref key_field, ref value }
            if key_field == "email" && value == "ann@example.com"
    ));
    assert_eq!(fx.transport.attempts(), 0);
    assert_eq!(fx.engine.pending_count().unwrap(), 0);
    assert_eq!(fx.engine.entries().unwrap().len(), 1);
    assert_eq!(fx.engine.snapshot(), before);
    assert!(fx.notifier.sent().is_empty());
}

#[tokio::test]
async fn test_transport_failure_without_queue_is_terminal() {
    let mut fx = EngineFixture::new(remote_config(false));
    fx.transport.set_offline(true);
    fx.fill_valid("Ann", "ann@example.com");
    let before = fx.engine.snapshot();

    let err = fx.engine.submit().await.unwrap_err();
    assert!(matches!(
        err,
        SubmissionError::TransportFailed(TransportError::Unreachable(_))
    ));
    assert_eq!(fx.engine.pending_count().unwrap(), 0);
    assert!(fx.engine.entries().unwrap().is_empty());
    assert!(fx.notifier.sent().is_empty());
    assert_eq!(fx.engine.snapshot(), before);

    // A failed attempt does not end the form
    fx.transport.set_offline(false);
    assert!(fx.engine.submit().await.unwrap().is_delivered());
}

#[tokio::test]
async fn test_transport_failure_queues_when_offline_enabled() {
    let mut fx = EngineFixture::new(remote_config(true));
    fx.transport.set_offline(true);
    fx.fill_valid("Ann", "ann@example.com");

    let outcome = fx.engine.submit().await.unwrap();
    assert!(matches!(outcome, SubmissionOutcome::Queued { .. }));
    assert_eq!(fx.engine.pending_count().unwrap(), 1);
    // Entries and notification wait for delivery
    assert!(fx.engine.entries().unwrap().is_empty());
    assert!(fx.notifier.sent().is_empty());

    fx.transport.set_offline(false);
    fx.engine.drain_offline_queue().await.unwrap();
    assert_eq!(fx.engine.entries().unwrap().len(), 1);
    assert_eq!(fx.notifier.sent().len(), 1);
}

#[tokio::test]
async fn test_queued_record_counts_as_duplicate() {
    let mut fx = EngineFixture::new(remote_config(true));
    fx.transport.set_offline(true);
    submit_and_reset(&mut fx, "Ann", "ann@example.com").await;

    fx.transport.set_offline(false);
    fx.fill_valid("Ann", "ann@example.com");
    let err = fx.engine.submit().await.unwrap_err();
    assert!(matches!(
        err,
        SubmissionError::Duplicate { ref value, .. } if value == "ann@example.com"
    ));
    assert_eq!(fx.transport.attempts(), 1);
    assert_eq!(fx.engine.pending_count().unwrap(), 1);
}

#[tokio::test]
async fn test_drain_is_fifo_and_halts_on_failure() {
    let mut fx = EngineFixture::new(remote_config(true));
    fx.transport.set_offline(true);
    submit_and_reset(&mut fx, "Ann", "ann@example.com").await;
    submit_and_reset(&mut fx, "Bo Bo", "bobo@example.com").await;
    assert_eq!(fx.engine.pending_count().unwrap(), 2);

    // First queued entry fails: both stay queued
    fx.transport.set_offline(false);
    fx.transport.fail_times(1);
    let report = fx.engine.drain_offline_queue().await.unwrap();
    assert!(report.delivered.is_empty());
    assert!(report.halted.is_some());
    assert_eq!(report.remaining, 2);
    assert_eq!(fx.engine.pending_count().unwrap(), 2);
    assert!(fx.transport.delivered().is_empty());

    let report = fx.engine.drain_offline_queue().await.unwrap();
    assert_eq!(report.delivered, vec![1, 2]);
    assert_eq!(report.remaining, 0);
    assert_eq!(fx.transport.delivered_sequences(), vec![1, 2]);

    let recipients: Vec<String> = fx.notifier.sent().into_iter().map(|n| n.to).collect();
    assert_eq!(recipients, vec!["ann@example.com", "bobo@example.com"]);
}

#[tokio::test]
async fn test_notification_failure_does_not_fail_submission() {
    let mut fx = EngineFixture::with_notifier(remote_config(false), MockNotifier::failing());
    fx.fill_valid("Ann", "ann@example.com");

    let outcome = fx.engine.submit().await.unwrap();
    assert!(matches!(
        outcome,
        SubmissionOutcome::Delivered {
            notification: NotificationStatus::Failed(_),
            ..
        }
    ));
    assert_eq!(fx.transport.delivered().len(), 1);
}

#[tokio::test]
async fn test_completion_callback_runs_once_per_delivery() {
    init_logging();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let transport = Arc::new(MockTransport::new());
    let collaborators = Collaborators::new()
        .with_transport(transport.clone())
        .with_notifier(Arc::new(MockNotifier::new()))
        .with_on_complete(Arc::new(move |record: &SubmissionRecord| {
            assert!(record.identifier().is_some());
            counter.fetch_add(1, Ordering::SeqCst);
        }));
    let mut engine = FormEngine::new(
        remote_config(true),
        Arc::new(MemoryStorage::new()),
        collaborators,
    )
    .unwrap();
    engine.handle_input(FieldInput::text("studentName", "Ann"));
    engine.handle_input(FieldInput::text("email", "ann@example.com"));
    engine.handle_input(FieldInput::text("grade", "Grade 5"));

    transport.set_offline(true);
    engine.submit().await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    transport.set_offline(false);
    engine.drain_offline_queue().await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    engine.drain_offline_queue().await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_corrupt_queued_record_halts_drain() {
    let mut fx = EngineFixture::new(remote_config(true));
    fx.transport.set_offline(true);
    submit_and_reset(&mut fx, "Ann", "ann@example.com").await;

    let key = StorageKeys::default().queue;
    let mut queued = fx.storage.get(&key).unwrap().unwrap();
    queued[0]["values"]["email"] = json!("mallory@example.com");
    fx.storage.put(&key, &queued).unwrap();

    fx.transport.set_offline(false);
    let err = fx.engine.drain_offline_queue().await.unwrap_err();
    assert!(matches!(err, SubmissionError::CorruptRecord { .. }));
    assert!(fx.transport.delivered().is_empty());
    assert_eq!(fx.engine.pending_count().unwrap(), 1);
}

#[tokio::test]
async fn test_abandon_removes_queued_record() {
    let mut fx = EngineFixture::new(remote_config(true));
    fx.transport.set_offline(true);
    let outcome = submit_and_reset(&mut fx, "Ann", "ann@example.com").await;

    assert!(fx.engine.pipeline().abandon(outcome.record()).unwrap());
    assert_eq!(fx.engine.pending_count().unwrap(), 0);
    assert!(!fx.engine.pipeline().abandon(outcome.record()).unwrap());
}

#[tokio::test]
async fn test_abandoned_record_leaves_no_entry_and_can_be_resubmitted() {
    let mut fx = EngineFixture::new(remote_config(true));
    fx.transport.set_offline(true);
    let outcome = submit_and_reset(&mut fx, "Ann", "ann@example.com").await;
    fx.engine.pipeline().abandon(outcome.record()).unwrap();

    assert!(fx.engine.entries().unwrap().is_empty());
    assert_eq!(fx.engine.analytics().unwrap().total, 0);

    fx.transport.set_offline(false);
    let outcome = submit_and_reset(&mut fx, "Ann", "ann@example.com").await;
    assert!(outcome.is_delivered());
    assert_eq!(fx.engine.entries().unwrap().len(), 1);
    assert_eq!(fx.engine.analytics().unwrap().total, 1);
}

fn pipeline_with(transport: Arc<MockTransport>) -> SubmissionPipeline {
    let collections = Collections::new(Arc::new(MemoryStorage::new()), StorageKeys::default());
    let settings = PipelineSettings {
        delivery: Delivery::Remote {
            transport,
            target: "https://example.com/api/students".to_string(),
            offline_queue: true,
        },
        duplicate_key_field: None,
        existing_entries: Arc::new(collections.clone()),
        identifier: None,
        confirmation: None,
        on_complete: None,
    };
    SubmissionPipeline::new(settings, collections)
}

fn request(email: &str) -> SubmissionRequest {
    let mut values = Snapshot::new();
    values.insert("email".to_string(), json!(email));
    SubmissionRequest {
        values,
        invalid_fields: Vec::new(),
    }
}

#[tokio::test]
async fn test_reentrant_submit_is_rejected() {
    init_logging();
    let transport = Arc::new(MockTransport::with_delay(Duration::from_millis(50)));
    let pipeline = pipeline_with(transport.clone());

    let (first, second) = tokio::join!(pipeline.submit(request("a@x.io")), async {
        tokio::task::yield_now().await;
        pipeline.submit(request("b@x.io")).await
    });

    assert!(first.unwrap().is_delivered());
    assert!(matches!(second, Err(SubmissionError::AlreadyInFlight)));
    assert_eq!(transport.attempts(), 1);
    assert!(!pipeline.is_in_flight());
}

#[tokio::test]
async fn test_concurrent_drain_is_rejected() {
    init_logging();
    let transport = Arc::new(MockTransport::with_delay(Duration::from_millis(50)));
    let pipeline = pipeline_with(transport.clone());
    transport.set_offline(true);
    pipeline.submit(request("a@x.io")).await.unwrap();
    transport.set_offline(false);

    let (first, second) = tokio::join!(pipeline.drain(), async {
        tokio::task::yield_now().await;
        pipeline.drain().await
    });
    assert_eq!(first.unwrap().delivered, vec![1]);
    assert!(matches!(second, Err(SubmissionError::DrainInProgress)));
}

#[tokio::test]
async fn test_queue_survives_restart_with_sled() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("forms");

    {
        let storage = Arc::new(SledStorage::open(&path).unwrap());
        let transport = Arc::new(MockTransport::new());
        transport.set_offline(true);
        let collaborators = Collaborators::new()
            .with_transport(transport)
            .with_notifier(Arc::new(MockNotifier::new()));
        let mut engine = FormEngine::new(remote_config(true), storage, collaborators).unwrap();
        engine.handle_input(FieldInput::text("studentName", "Ann"));
        engine.handle_input(FieldInput::text("email", "ann@example.com"));
        engine.handle_input(FieldInput::text("grade", "Grade 5"));
        engine.submit().await.unwrap();
        assert_eq!(engine.pending_count().unwrap(), 1);
    }

    let storage = Arc::new(SledStorage::open(&path).unwrap());
    let transport = Arc::new(MockTransport::new());
    let collaborators = Collaborators::new()
        .with_transport(transport.clone())
        .with_notifier(Arc::new(MockNotifier::new()));
    let engine = FormEngine::new(remote_config(true), storage, collaborators).unwrap();
    assert_eq!(engine.pending_count().unwrap(), 1);

    let report = engine.drain_offline_queue().await.unwrap();
    assert_eq!(report.delivered, vec![1]);
    assert_eq!(transport.delivered()[0].body["email"], json!("ann@example.com"));
}

#[test]
fn test_remote_delivery_requires_transport() {
    init_logging();
    let err = FormEngine::new(
        remote_config(false),
        Arc::new(MemoryStorage::new()),
        Collaborators::new().with_notifier(Arc::new(MockNotifier::new())),
    )
    .unwrap_err();
    assert_eq!(
        err,
        RegistrationError::MissingCollaborator {
            capability: "delivery".to_string(),
            collaborator: "transport".to_string()
        }
    );
}

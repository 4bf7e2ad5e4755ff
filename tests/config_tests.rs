mod test_helpers;

use std::fs;
use std::sync::Arc;

use serde_json::{json, Value as JsonValue};

use smartform::config::ConfigError;
use smartform::storage::MemoryStorage;
use smartform::submission::{MockTransport, NotificationStatus};
use smartform::{
    Collaborators, DeliveryMode, EngineEvent, FieldInput, FieldValue, FormConfig, FormEngine,
    NavState, SubmissionOutcome,
};
use test_helpers::*;

const REGISTRATION_TOML: &str = r#"
[[fields]]
name = "studentName"
label = "Student name"
required = true
min_length = 2

[[fields]]
name = "email"
type = "email"
required = true
pattern = '^[^@\s]+@[^@\s]+\.[a-z]+$'

[[fields]]
name = "grade"
type = "select"
required = true

[[fields]]
name = "tuition"
type = "number"

[[fields]]
name = "materials"
type = "checkbox"

[[fields]]
name = "coupon"

[[fields]]
name = "hasSibling"
type = "checkbox"

[[fields]]
name = "siblingName"
required = true

[[steps]]
name = "identity"
fields = ["studentName", "email"]

[[steps]]
name = "enrolment"
fields = ["grade", "tuition", "materials", "coupon", "hasSibling", "siblingName"]

[[derivations]]
kind = "progress"
name = "progress"
fields = ["studentName", "email", "grade"]

[[derivations]]
kind = "visibility"
field = "siblingName"
when = { op = "checked", field = "hasSibling" }

[[derivations]]
kind = "price"
name = "total"

[derivations.rules]
tax_rate = 0.1
line_items = [{ field = "tuition" }]
add_ons = [{ field = "materials", amount = 10.0 }]
coupon = { field = "coupon", codes = { SAVE20 = { type = "flat", amount = 20.0 } } }

[messages.en]
required = "Please fill in {field}."

[capabilities.delivery]
mode = "remote"
target = "https://school.example/api/register"
offline_queue = true

[capabilities.duplicate_check]
key_field = "email"

[capabilities.gamification]
points_per_field = 5

[capabilities.suggestions]
grade = ["Grade 1", "Grade 2", "Grade 5"]

[capabilities.analytics]
group_field = "grade"
"#;

fn engine_from(config: FormConfig) -> (FormEngine, Arc<MockTransport>) {
    init_logging();
    let transport = Arc::new(MockTransport::new());
    let engine = FormEngine::new(
        config,
        Arc::new(MemoryStorage::new()),
        Collaborators::new().with_transport(transport.clone()),
    )
    .expect("Failed to build engine from config");
    (engine, transport)
}

fn input(engine: &mut FormEngine, field: &str, raw: &str) -> Vec<EngineEvent> {
    engine.handle_input(FieldInput::text(field, raw))
}

#[test]
fn test_toml_config_parses_every_section() {
    let config = FormConfig::from_toml_str(REGISTRATION_TOML).unwrap();
    assert_eq!(config.language, "en");
    assert_eq!(config.fields.len(), 8);
    assert_eq!(config.steps.len(), 2);
    assert_eq!(config.derivations.len(), 3);
    assert_eq!(
        config.capabilities.delivery,
        DeliveryMode::Remote {
            target: "https://school.example/api/register".to_string(),
            offline_queue: true
        }
    );
    assert!(config.capabilities.confirmation.is_none());
    assert!(config.capabilities.suggestions.has_source("grade"));
}

#[tokio::test]
async fn test_engine_built_from_toml_runs_the_whole_form() {
    let config = FormConfig::from_toml_str(REGISTRATION_TOML).unwrap();
    let (mut engine, transport) = engine_from(config);

    assert_eq!(engine.derived("progress"), &FieldValue::Number(0.0));
    assert!(!engine.is_visible("siblingName"));

    engine.validate("studentName");
    assert_eq!(
        engine.shown_message("studentName"),
        Some("Please fill in Student name.")
    );

    let events = input(&mut engine, "studentName", "Aung Aung");
    assert!(events.iter().any(|e| matches!(
        e,
        EngineEvent::Points { total: 5, .. }
    )));
    input(&mut engine, "email", "aung@example.com");
    assert_eq!(engine.derived("progress"), &FieldValue::Number(67.0));

    let outcome = engine.advance().await.unwrap();
    assert_eq!(outcome, smartform::StepOutcome::Moved(1));

    let events = input(&mut engine, "grade", "Grade");
    let suggested = events.iter().find_map(|e| match e {
        EngineEvent::Suggestions { items, .. } => Some(items.clone()),
        _ => None,
    });
    assert_eq!(
        suggested,
        Some(vec![
            "Grade 1".to_string(),
            "Grade 2".to_string(),
            "Grade 5".to_string()
        ])
    );
    input(&mut engine, "grade", "Grade 5");
    assert_eq!(engine.points(), Some(15));

    input(&mut engine, "tuition", "100");
    input(&mut engine, "materials", "on");
    assert_eq!(engine.derived("total"), &FieldValue::Number(121.0));
    input(&mut engine, "coupon", "save20");
    assert_eq!(engine.derived("total"), &FieldValue::Number(99.0));

    // siblingName is required but hidden, so it does not block submission
    let outcome = engine.advance().await.unwrap();
    let smartform::StepOutcome::Submitted(SubmissionOutcome::Delivered { record, .. }) = outcome
    else {
        panic!("expected a delivered submission, got {:?}", outcome);
    };
    assert_eq!(record.target(), "https://school.example/api/register");
    assert_eq!(engine.nav_state(), NavState::Submitted);
    assert_eq!(transport.delivered()[0].body["tuition"], json!(100.0));
}

#[tokio::test]
async fn test_visible_required_field_blocks_step() {
    let config = FormConfig::from_toml_str(REGISTRATION_TOML).unwrap();
    let (mut engine, _transport) = engine_from(config);
    input(&mut engine, "studentName", "Ann");
    input(&mut engine, "email", "ann@example.com");
    engine.advance().await.unwrap();

    input(&mut engine, "grade", "Grade 1");
    let events = input(&mut engine, "hasSibling", "on");
    assert!(events.iter().any(|e| matches!(
        e,
        EngineEvent::Derived { name, value } if name == "visible:siblingName" && value == &FieldValue::Boolean(true)
    )));

    let outcome = engine.advance().await.unwrap();
    assert_eq!(
        outcome,
        smartform::StepOutcome::Blocked {
            invalid_fields: vec!["siblingName".to_string()]
        }
    );
    assert_eq!(engine.current_step().map(|s| s.name.as_str()), Some("enrolment"));
}

#[tokio::test]
async fn test_json_config_with_local_delivery() {
    let config = FormConfig::from_json_str(
        r#"{
            "language": "my",
            "fields": [
                {"name": "studentName", "required": true},
                {"name": "grade", "type": "select"}
            ],
            "capabilities": {"analytics": {}}
        }"#,
    )
    .unwrap();
    let (mut engine, transport) = engine_from(config);

    engine.validate("studentName");
    assert_eq!(
        engine.shown_message("studentName"),
        Some("studentName မမှန်ကန်ပါ။")
    );

    input(&mut engine, "studentName", "Mya");
    input(&mut engine, "grade", "Grade 3");
    let outcome = engine.submit().await.unwrap();
    assert!(matches!(
        outcome,
        SubmissionOutcome::Delivered {
            ack: None,
            notification: NotificationStatus::NotConfigured,
            ..
        }
    ));
    assert_eq!(transport.attempts(), 0);
    assert_eq!(engine.entries().unwrap().len(), 1);

    let summary = engine.analytics().unwrap();
    assert_eq!(summary.total, 1);
    assert_eq!(summary.by_group.get("Grade 3"), Some(&1));
}

#[test]
fn test_load_from_file_by_extension() {
    let dir = tempfile::tempdir().unwrap();
    let toml_path = dir.path().join("registration.toml");
    fs::write(&toml_path, REGISTRATION_TOML).unwrap();
    let config = FormConfig::load(&toml_path).unwrap();
    assert_eq!(config.fields.len(), 8);

    let json_path = dir.path().join("registration.json");
    fs::write(&json_path, serde_json::to_string(&config).unwrap()).unwrap();
    let reloaded = FormConfig::load(&json_path).unwrap();
    assert_eq!(reloaded.fields, config.fields);
    assert_eq!(reloaded.derivations, config.derivations);

    let yaml_path = dir.path().join("registration.yaml");
    fs::write(&yaml_path, "fields: []").unwrap();
    assert!(matches!(
        FormConfig::load(&yaml_path),
        Err(ConfigError::UnsupportedFormat(ext)) if ext == "yaml"
    ));
}

#[test]
fn test_export_snapshot_as_json_and_csv() {
    let mut fx = EngineFixture::new(registration_config());
    assert_eq!(fx.engine.export_csv().unwrap(), "");
    assert_eq!(fx.engine.export_entries_csv().unwrap(), "");
    fx.fill_valid("Ann", "ann@example.com");

    let exported: JsonValue = serde_json::from_str(&fx.engine.export_json().unwrap()).unwrap();
    assert_eq!(
        exported,
        json!({"studentName": "Ann", "email": "ann@example.com", "grade": "Grade 5"})
    );

    let csv = fx.engine.export_csv().unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines, vec!["studentName,email,grade", "Ann,ann@example.com,Grade 5"]);
}

#[test]
fn test_import_replaces_entries_and_feeds_analytics() {
    let mut config = registration_config();
    config.capabilities.analytics = Some(Default::default());
    let fx = EngineFixture::new(config);

    let imported = fx
        .engine
        .import_entries_csv(
            "studentName, email, grade\n Ann , ann@example.com, Grade 1\nBo,bo@example.com,Grade 1\nCho,cho@example.com\n",
        )
        .unwrap();
    assert_eq!(imported, 3);

    let entries = fx.engine.entries().unwrap();
    assert_eq!(entries[0]["studentName"], json!("Ann"));
    assert!(entries[2].get("grade").is_none());

    let summary = fx.engine.analytics().unwrap();
    assert_eq!(summary.total, 3);
    assert_eq!(summary.by_group.get("Grade 1"), Some(&2));
    assert_eq!(summary.by_group.get("undefined"), Some(&1));

    let exported = fx.engine.export_entries_csv().unwrap();
    assert_eq!(
        exported.lines().next(),
        Some("studentName,email,grade")
    );

    // A second import replaces rather than appends
    fx.engine
        .import_entries_csv("studentName,email\nDee,dee@example.com\n")
        .unwrap();
    assert_eq!(fx.engine.entries().unwrap().len(), 1);
}

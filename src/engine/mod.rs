//! The form engine
//!
//! [`FormEngine`] owns the value store and wires every component together:
//! input events run validation and derivation synchronously before the
//! handler returns, navigation reads the resulting validity, and submit
//! intents hand a snapshot to the submission pipeline.
//!
//! Time-based behaviour (hint timers, autosave, the form timer) is driven by
//! the host calling [`FormEngine::tick`] with the current instant.

pub mod events;

use indexmap::IndexMap;
use log::{info, warn};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::{Capabilities, DeliveryMode, FormConfig};
use crate::derivation::{visibility_key, DerivationGraph};
use crate::features::{
    AnalyticsConfig, AnalyticsSummary, AutosaveTracker, BehaviorTracker, DynamicGroups,
    InputShield, PointsTracker, SuggestionSources, Timers,
};
use crate::interchange::{self, InterchangeResult};
use crate::navigation::{Advance, NavState, Step, StepNavigator};
use crate::schema::{FieldValue, RegistrationError, RegistrationResult, SchemaRegistry};
use crate::storage::{Collections, Storage, StorageResult};
use crate::store::{Snapshot, ValueStore};
use crate::submission::{
    CompletionCallback, Confirmation, Delivery, DrainReport, ExistingEntries,
    IdentifierGenerator, Notifier, PipelineSettings, SubmissionError, SubmissionOutcome,
    SubmissionPipeline, SubmissionRequest, SubmissionResult, Transport,
};
use crate::validation::messages::KEY_HINT;
use crate::validation::{MessageCatalog, ValidationEngine, ValidationResult};

pub use events::{EngineEvent, FieldInput, RawValue, StepOutcome};

/// Host-supplied collaborators. Which ones are required depends on the
/// configured capabilities.
#[derive(Clone, Default)]
pub struct Collaborators {
    pub transport: Option<Arc<dyn Transport>>,
    pub notifier: Option<Arc<dyn Notifier>>,
    /// Defaults to the engine's own submitted-entries collection
    pub existing_entries: Option<Arc<dyn ExistingEntries>>,
    pub on_complete: Option<CompletionCallback>,
    /// Fixed seed for the identifier's random component
    pub identifier_seed: Option<u64>,
}

impl Collaborators {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn with_existing_entries(mut self, entries: Arc<dyn ExistingEntries>) -> Self {
        self.existing_entries = Some(entries);
        self
    }

    pub fn with_on_complete(mut self, callback: CompletionCallback) -> Self {
        self.on_complete = Some(callback);
        self
    }

    pub fn with_identifier_seed(mut self, seed: u64) -> Self {
        self.identifier_seed = Some(seed);
        self
    }
}

/// Optional behaviours resolved from [`Capabilities`] at construction.
#[derive(Debug)]
struct Features {
    autosave: Option<AutosaveTracker>,
    adaptation: Option<BehaviorTracker>,
    shield: Option<InputShield>,
    points: Option<PointsTracker>,
    form_timer: Option<Duration>,
    suggestions: SuggestionSources,
    dynamic: DynamicGroups,
    analytics: AnalyticsConfig,
}

impl Features {
    fn new(capabilities: &Capabilities, now: Instant) -> Self {
        Self {
            autosave: capabilities
                .autosave
                .clone()
                .map(|config| AutosaveTracker::new(config, now)),
            adaptation: capabilities.adaptation.clone().map(BehaviorTracker::new),
            shield: capabilities.shield.clone().map(InputShield::new),
            points: capabilities.gamification.clone().map(PointsTracker::new),
            form_timer: capabilities
                .form_timer
                .as_ref()
                .map(|t| Duration::from_millis(t.duration_ms)),
            suggestions: capabilities.suggestions.clone(),
            dynamic: DynamicGroups::new(capabilities.dynamic_groups.clone()),
            analytics: capabilities.analytics.clone().unwrap_or_default(),
        }
    }
}

pub struct FormEngine {
    registry: SchemaRegistry,
    store: ValueStore,
    validation: ValidationEngine,
    graph: DerivationGraph,
    navigator: StepNavigator,
    pipeline: SubmissionPipeline,
    collections: Collections,
    features: Features,
    timers: Timers,
}

impl fmt::Debug for FormEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormEngine")
            .field("fields", &self.registry.len())
            .field("derived", &self.graph.len())
            .field("state", &self.navigator.state())
            .field("pipeline", &self.pipeline)
            .finish()
    }
}

impl FormEngine {
    /// Build an engine. Only setup errors can prevent construction; the
    /// engine never starts with an inconsistent schema or derivation graph.
    pub fn new(
        config: FormConfig,
        storage: Arc<dyn Storage>,
        collaborators: Collaborators,
    ) -> RegistrationResult<Self> {
        let registry = SchemaRegistry::from_fields(config.fields)?;

        let mut graph = DerivationGraph::new();
        for spec in &config.derivations {
            graph.register(spec.build(&registry), &registry)?;
        }

        let navigator = StepNavigator::new(config.steps, &registry)?;
        let collections = Collections::new(storage, config.storage_keys);
        let settings = pipeline_settings(&config.capabilities, &collections, collaborators)?;
        let pipeline = SubmissionPipeline::new(settings, collections.clone());

        let now = Instant::now();
        let features = Features::new(&config.capabilities, now);
        let mut timers = Timers::new();
        if let Some(duration) = features.form_timer {
            timers.arm_form(now, duration);
        }

        let store = ValueStore::new();
        graph.recompute_all(&store);

        info!(
            "Form engine ready: {} fields, {} steps, {} derived fields",
            registry.len(),
            navigator.steps().len(),
            graph.len()
        );

        Ok(Self {
            registry,
            store,
            validation: ValidationEngine::new(
                MessageCatalog::new(config.language).with_overrides(config.messages),
            ),
            graph,
            navigator,
            pipeline,
            collections,
            features,
            timers,
        })
    }

    // ========== INPUT EVENTS ==========

    pub fn handle_input(&mut self, input: FieldInput) -> Vec<EngineEvent> {
        self.handle_input_at(input, Instant::now())
    }

    /// Apply one field-change event. Validation and derivation complete
    /// before this returns; events for unknown fields are ignored.
    pub fn handle_input_at(&mut self, input: FieldInput, now: Instant) -> Vec<EngineEvent> {
        let FieldInput { field, value } = input;
        let Some(schema) = self.registry.get(&field) else {
            warn!("Ignoring input for unknown field '{}'", field);
            return Vec::new();
        };
        let value = match value {
            RawValue::Text(raw) => schema.field_type.coerce(&raw),
            RawValue::File(blob) => FieldValue::Blob(blob),
            RawValue::Typed(value) => value,
        };
        let text = value.as_text();
        let blank = value.is_blank();
        let empty = value.is_empty();
        self.store.set(&field, value);

        let mut events = Vec::new();
        let result = self.validation.validate(&self.registry, &self.store, &field);
        let valid = result.valid;
        events.push(EngineEvent::Validation {
            field: field.clone(),
            result,
        });

        events.extend(
            self.graph
                .notify(&field, &self.store)
                .into_iter()
                .map(|update| EngineEvent::Derived {
                    name: update.name,
                    value: update.value,
                }),
        );

        if let Some(points) = self.features.points.as_mut() {
            if let Some(total) = points.record(&field, valid, blank) {
                events.push(EngineEvent::Points {
                    field: field.clone(),
                    total,
                });
            }
        }

        if self.features.suggestions.has_source(&field) {
            events.push(EngineEvent::Suggestions {
                field: field.clone(),
                items: self.features.suggestions.matching(&field, &text),
            });
        }

        if let Some(preview) = self
            .features
            .shield
            .as_ref()
            .and_then(|shield| shield.preview(&field, &text))
        {
            events.push(EngineEvent::ShieldPreview {
                field: field.clone(),
                preview,
            });
        }

        // Hints only wait on fields left empty
        if let Some(adaptation) = &self.features.adaptation {
            if empty {
                self.timers
                    .arm_hint(&field, now + adaptation.typing_threshold());
            } else {
                self.timers.cancel_hint(&field);
            }
        }

        if let Some(autosave) = self.features.autosave.as_mut() {
            autosave.mark_dirty();
        }

        events
    }

    /// Focus left a field. Repeatedly leaving a field empty may relax its
    /// required rule.
    pub fn handle_blur(&mut self, field: &str) -> Vec<EngineEvent> {
        let empty = self.store.get(field).is_empty();
        let Some(adaptation) = self.features.adaptation.as_mut() else {
            return Vec::new();
        };
        if !adaptation.record_blur(field, empty) {
            return Vec::new();
        }
        match self.registry.relax_required(field) {
            Ok(_) => {
                let result = self.validation.validate(&self.registry, &self.store, field);
                vec![
                    EngineEvent::Relaxed {
                        field: field.to_string(),
                    },
                    EngineEvent::Validation {
                        field: field.to_string(),
                        result,
                    },
                ]
            }
            Err(err) => {
                warn!("Could not relax '{}': {}", field, err);
                Vec::new()
            }
        }
    }

    /// Whether a paste into `field` may proceed.
    pub fn handle_paste(&self, field: &str) -> bool {
        let allowed = self
            .features
            .shield
            .as_ref()
            .map(|shield| shield.allows_paste(field))
            .unwrap_or(true);
        if !allowed {
            info!("Blocked paste into shielded field '{}'", field);
        }
        allowed
    }

    // ========== VALIDATION AND VALUES ==========

    pub fn validate(&mut self, field: &str) -> ValidationResult {
        self.validation.validate(&self.registry, &self.store, field)
    }

    pub fn validate_all(&mut self) -> IndexMap<String, ValidationResult> {
        self.validation.validate_all(&self.registry, &self.store)
    }

    /// A field is visible unless a visibility derivation says otherwise.
    pub fn is_visible(&self, field: &str) -> bool {
        is_visible(&self.graph, field)
    }

    /// AND over every visible field's validity.
    pub fn is_form_valid(&self) -> bool {
        self.validation
            .is_form_valid(&self.registry, &self.store, |f| is_visible(&self.graph, f))
    }

    pub fn invalid_fields(&self) -> Vec<String> {
        self.validation
            .invalid_fields(&self.registry, &self.store, |f| is_visible(&self.graph, f))
    }

    pub fn shown_message(&self, field: &str) -> Option<&str> {
        self.validation.shown_message(field)
    }

    pub fn value(&self, field: &str) -> &FieldValue {
        self.store.get(field)
    }

    pub fn derived(&self, name: &str) -> &FieldValue {
        self.graph.current_value(name)
    }

    pub fn snapshot(&self) -> Snapshot {
        self.store.snapshot()
    }

    pub fn schema(&self) -> &SchemaRegistry {
        &self.registry
    }

    pub fn points(&self) -> Option<u32> {
        self.features.points.as_ref().map(PointsTracker::points)
    }

    pub fn trust_message(&self) -> Option<&str> {
        self.features.shield.as_ref().map(InputShield::trust_message)
    }

    // ========== NAVIGATION ==========

    /// Move to the next step, or submit from the last one.
    pub async fn advance(&mut self) -> SubmissionResult<StepOutcome> {
        let registry = &self.registry;
        let store = &self.store;
        let graph = &self.graph;
        let validation = &mut self.validation;
        let step = self.navigator.advance(|fields| {
            fields
                .iter()
                .filter(|f| is_visible(graph, f))
                .filter(|f| !validation.validate(registry, store, f).valid)
                .cloned()
                .collect()
        });
        match step {
            Advance::Moved(index) => Ok(StepOutcome::Moved(index)),
            Advance::Blocked { invalid_fields } => Ok(StepOutcome::Blocked { invalid_fields }),
            Advance::ReadyToSubmit => self.run_submission().await.map(StepOutcome::Submitted),
            Advance::AlreadySubmitted => Err(SubmissionError::AlreadySubmitted),
        }
    }

    pub fn retreat(&mut self) -> NavState {
        self.navigator.retreat()
    }

    pub fn current_step(&self) -> Option<&Step> {
        self.navigator.current_step()
    }

    pub fn nav_state(&self) -> NavState {
        self.navigator.state()
    }

    // ========== SUBMISSION ==========

    /// Run the submission pipeline over a snapshot of the current values.
    /// A multi-step form can only be submitted from its final step.
    ///
    /// The value store is never modified, whatever the outcome.
    pub async fn submit(&mut self) -> SubmissionResult<SubmissionOutcome> {
        if let Some(step) = self.navigator.current_index() {
            if !self.navigator.is_last_step() {
                info!("Submission rejected at step {}", step);
                return Err(SubmissionError::NotAtFinalStep { step });
            }
        }
        self.run_submission().await
    }

    async fn run_submission(&mut self) -> SubmissionResult<SubmissionOutcome> {
        if self.navigator.state() == NavState::Submitted {
            return Err(SubmissionError::AlreadySubmitted);
        }
        let invalid_fields = self.invalid_fields();
        for field in &invalid_fields {
            self.validation.validate(&self.registry, &self.store, field);
        }
        let request = SubmissionRequest {
            values: self.store.snapshot(),
            invalid_fields,
        };
        let outcome = self.pipeline.submit(request).await?;
        self.navigator.mark_submitted();
        Ok(outcome)
    }

    /// Deliver queued submissions, e.g. once connectivity is restored.
    pub async fn drain_offline_queue(&self) -> SubmissionResult<DrainReport> {
        self.pipeline.drain().await
    }

    pub fn pending_count(&self) -> StorageResult<usize> {
        self.pipeline.queue().len()
    }

    pub fn pipeline(&self) -> &SubmissionPipeline {
        &self.pipeline
    }

    // ========== TIMERS ==========

    /// Fire due timers: typing hints, autosave and the form timer.
    pub async fn tick(&mut self, now: Instant) -> Vec<EngineEvent> {
        let mut events = Vec::new();

        for field in self.timers.take_due_hints(now) {
            if !self.store.get(&field).is_empty() {
                continue;
            }
            let message = self
                .features
                .adaptation
                .as_ref()
                .and_then(|a| a.hint_for(&field))
                .map(str::to_string)
                .unwrap_or_else(|| self.validation.catalog().render(KEY_HINT, &field, None));
            self.validation.show_message(&field, message.clone());
            events.push(EngineEvent::Hint { field, message });
        }

        if let Some(autosave) = self.features.autosave.as_mut() {
            if autosave.is_due(now) {
                match self.collections.save_draft(&self.store.snapshot()) {
                    Ok(()) => {
                        autosave.save_complete(now);
                        info!("Autosaved {} fields", self.store.len());
                        events.push(EngineEvent::AutoSaved);
                    }
                    Err(err) => {
                        warn!("Autosave failed: {}", err);
                        autosave.save_failed(now);
                    }
                }
            }
        }

        // Expiry submits from any step
        if self.timers.form_due(now) {
            info!("Form timer expired, submitting");
            self.timers.clear_all();
            events.push(match self.run_submission().await {
                Ok(outcome) => EngineEvent::AutoSubmitted(outcome),
                Err(err) => EngineEvent::AutoSubmitFailed {
                    reason: err.to_string(),
                },
            });
        }

        events
    }

    /// User cancel: clear every pending timer.
    pub fn cancel_timers(&mut self) {
        info!("Cancelled {} pending timers", self.timers.pending());
        self.timers.clear_all();
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.pending()
    }

    /// Clear all values and start over at the first step. Schema versions
    /// installed at runtime are kept.
    pub fn reset(&mut self) {
        let now = Instant::now();
        self.store.clear();
        self.validation.clear();
        self.graph.clear_values();
        self.graph.recompute_all(&self.store);
        self.navigator.reset();
        self.timers.clear_all();
        if let Some(duration) = self.features.form_timer {
            self.timers.arm_form(now, duration);
        }
        if let Some(points) = self.features.points.as_mut() {
            points.reset();
        }
        if let Some(adaptation) = self.features.adaptation.as_mut() {
            adaptation.reset();
        }
        info!("Form reset");
    }

    // ========== DYNAMIC FIELDS AND SUGGESTIONS ==========

    /// Register the next instance of a dynamic group. Returns its field name.
    pub fn add_dynamic_instance(&mut self, base: &str) -> RegistrationResult<String> {
        let schema = self.features.dynamic.next_instance(base)?;
        let name = schema.name.clone();
        self.registry.register(schema)?;
        self.features.dynamic.commit(base);
        Ok(name)
    }

    pub fn suggestions(&self, field: &str) -> Vec<String> {
        self.features
            .suggestions
            .matching(field, &self.store.get(field).as_text())
    }

    // ========== INTERCHANGE ==========

    pub fn export_json(&self) -> InterchangeResult<String> {
        interchange::snapshot_to_json(&self.store.snapshot())
    }

    pub fn export_csv(&self) -> InterchangeResult<String> {
        interchange::snapshot_to_csv(&self.store.snapshot())
    }

    pub fn export_entries_csv(&self) -> InterchangeResult<String> {
        interchange::entries_to_csv(&self.collections.entries()?)
    }

    /// Replace the submitted-entries collection with the CSV rows. Returns
    /// the number of imported entries.
    pub fn import_entries_csv(&self, text: &str) -> InterchangeResult<usize> {
        let entries = interchange::entries_from_csv(text)?;
        self.collections.replace_entries(&entries)?;
        info!("Imported {} entries", entries.len());
        Ok(entries.len())
    }

    pub fn entries(&self) -> StorageResult<Vec<Snapshot>> {
        self.collections.entries()
    }

    pub fn analytics(&self) -> StorageResult<AnalyticsSummary> {
        Ok(AnalyticsSummary::summarize(
            &self.collections.entries()?,
            &self.features.analytics.group_field,
        ))
    }

    // ========== AUTOSAVE DRAFTS ==========

    pub fn saved_draft(&self) -> StorageResult<Option<Snapshot>> {
        self.collections.load_draft()
    }

    /// Load the autosaved draft into the store. Values for fields that are
    /// no longer registered are skipped. Returns whether a draft existed.
    pub fn restore_draft(&mut self) -> StorageResult<bool> {
        let Some(draft) = self.collections.load_draft()? else {
            return Ok(false);
        };
        for (field, value) in &draft {
            if self.registry.contains(field) {
                self.store.set(field, FieldValue::from_json(value));
            }
        }
        self.graph.recompute_all(&self.store);
        info!("Restored draft with {} fields", draft.len());
        Ok(true)
    }

    pub fn discard_draft(&self) -> StorageResult<()> {
        self.collections.clear_draft()
    }
}

fn is_visible(graph: &DerivationGraph, field: &str) -> bool {
    let key = visibility_key(field);
    !graph.contains(&key) || graph.current_value(&key).as_bool()
}

fn pipeline_settings(
    capabilities: &Capabilities,
    collections: &Collections,
    collaborators: Collaborators,
) -> RegistrationResult<PipelineSettings> {
    let delivery = match &capabilities.delivery {
        DeliveryMode::Local => Delivery::LocalOnly,
        DeliveryMode::Remote {
            target,
            offline_queue,
        } => Delivery::Remote {
            transport: collaborators
                .transport
                .clone()
                .ok_or_else(|| missing("delivery", "transport"))?,
            target: target.clone(),
            offline_queue: *offline_queue,
        },
    };

    let confirmation = match &capabilities.confirmation {
        Some(template) => Some(Confirmation {
            template: template.clone(),
            notifier: collaborators
                .notifier
                .clone()
                .ok_or_else(|| missing("confirmation", "notifier"))?,
        }),
        None => None,
    };

    let identifier = capabilities.identifier.clone().map(|format| {
        Arc::new(match collaborators.identifier_seed {
            Some(seed) => IdentifierGenerator::with_seed(format, seed),
            None => IdentifierGenerator::new(format),
        })
    });

    let existing_entries = collaborators
        .existing_entries
        .unwrap_or_else(|| Arc::new(collections.clone()));

    Ok(PipelineSettings {
        delivery,
        duplicate_key_field: capabilities
            .duplicate_check
            .as_ref()
            .map(|d| d.key_field.clone()),
        existing_entries,
        identifier,
        confirmation,
        on_complete: collaborators.on_complete,
    })
}

fn missing(capability: &str, collaborator: &str) -> RegistrationError {
    warn!(
        "Capability '{}' is configured without a {}",
        capability, collaborator
    );
    RegistrationError::MissingCollaborator {
        capability: capability.to_string(),
        collaborator: collaborator.to_string(),
    }
}

#![allow(dead_code)]

pub mod form_builder;

use std::sync::Arc;

use smartform::storage::MemoryStorage;
use smartform::submission::{MockNotifier, MockTransport};
use smartform::{Collaborators, FieldInput, FormConfig, FormEngine};

pub use form_builder::*;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// An engine over in-memory storage with mock collaborators attached.
pub struct EngineFixture {
    pub engine: FormEngine,
    pub transport: Arc<MockTransport>,
    pub notifier: Arc<MockNotifier>,
    pub storage: Arc<MemoryStorage>,
}

impl EngineFixture {
    pub fn new(config: FormConfig) -> Self {
        Self::with_notifier(config, MockNotifier::new())
    }

    pub fn with_notifier(config: FormConfig, notifier: MockNotifier) -> Self {
        init_logging();
        let transport = Arc::new(MockTransport::new());
        let notifier = Arc::new(notifier);
        let storage = Arc::new(MemoryStorage::new());
        let collaborators = Collaborators::new()
            .with_transport(transport.clone())
            .with_notifier(notifier.clone())
            .with_identifier_seed(7);
        let engine = FormEngine::new(config, storage.clone(), collaborators)
            .expect("Failed to build engine");
        Self {
            engine,
            transport,
            notifier,
            storage,
        }
    }

    pub fn input(&mut self, field: &str, raw: &str) {
        self.engine.handle_input(FieldInput::text(field, raw));
    }

    /// Fill every field of the registration form with valid values.
    pub fn fill_valid(&mut self, name: &str, email: &str) {
        self.input("studentName", name);
        self.input("email", email);
        self.input("grade", "Grade 5");
    }
}

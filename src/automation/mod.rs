//! Test discovery and execution contracts
//!
//! A [`TestReader`] knows how to find the tests of one engine type in a
//! scenario folder. The [`ReaderRegistry`] maps engine tags to readers; an
//! engine with no reader is a valid outcome and yields no tests.

pub mod shell;

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

use crate::scenario::{Deployment, TestEngine, TestScenario};

/// Errors raised by readers and tests
#[derive(Error, Debug)]
pub enum AutomationError {
    #[error("Error while reading tests: {0}")]
    Discovery(String),

    #[error("Test '{test}' failed: {reason}")]
    Execution { test: String, reason: String },
}

impl AutomationError {
    /// Create a test execution error
    pub fn execution(test: &str, reason: &str) -> Self {
        Self::Execution {
            test: test.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// A single runnable test
#[async_trait]
pub trait ExecutableTest: Send + Sync {
    /// Display name used in logs and errors
    fn name(&self) -> &str;

    /// Run the test against a deployment, with `location` as the scenario folder
    async fn execute(&self, location: &Path, deployment: &Deployment)
        -> Result<(), AutomationError>;
}

/// Discovery strategy for one test engine
#[async_trait]
pub trait TestReader: Send + Sync {
    /// Locate the tests of `scenario` in `location`, in the order they should run
    async fn read_tests(
        &self,
        location: &Path,
        scenario: &TestScenario,
    ) -> Result<Vec<Box<dyn ExecutableTest>>, AutomationError>;
}

/// Readers keyed by engine type
#[derive(Clone, Default)]
pub struct ReaderRegistry {
    readers: HashMap<TestEngine, Arc<dyn TestReader>>,
}

impl ReaderRegistry {
    /// An empty registry; every engine yields no tests
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the readers that ship with testgrid
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(TestEngine::Shell, Arc::new(shell::ShellTestReader));
        registry
    }

    /// Register a reader, replacing any previous one for the engine
    pub fn register(&mut self, engine: TestEngine, reader: Arc<dyn TestReader>) {
        self.readers.insert(engine, reader);
    }

    /// Get the reader for an engine type
    pub fn get(&self, engine: TestEngine) -> Option<Arc<dyn TestReader>> {
        self.readers.get(&engine).cloned()
    }

    /// Engines that have a reader
    pub fn engines(&self) -> Vec<TestEngine> {
        let mut engines: Vec<_> = self.readers.keys().copied().collect();
        engines.sort_by_key(|e| e.to_string());
        engines
    }
}

impl std::fmt::Debug for ReaderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReaderRegistry")
            .field("engines", &self.engines())
            .finish()
    }
}

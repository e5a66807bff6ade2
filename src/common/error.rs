//! Error types for testgrid
//!
//! Every error that reaches the caller of a scenario run names the scenario,
//! so a failed run can be traced back to its persisted record.

use std::io;
use thiserror::Error;

use crate::automation::AutomationError;
use crate::persistence::StoreError;
use crate::scenario::ScenarioStatus;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for testgrid
#[derive(Error, Debug)]
pub enum Error {
    // === Scenario Errors ===
    #[error("Error occurred when persisting test scenario '{scenario}': {source}")]
    Persistence {
        scenario: String,
        #[source]
        source: StoreError,
    },

    #[error("Exception occurred while running the tests for solution pattern '{scenario}': {source}")]
    ScenarioExecution {
        scenario: String,
        #[source]
        source: AutomationError,
    },

    #[error("Cannot resolve the test location of scenario '{scenario}': {source}")]
    TestLocation {
        scenario: String,
        #[source]
        source: io::Error,
    },

    #[error("Failed to access scenario store '{path}': {source}")]
    Store {
        path: String,
        #[source]
        source: StoreError,
    },

    #[error("Scenario '{scenario}' cannot move from {from} to {to}")]
    InvalidTransition {
        scenario: String,
        from: ScenarioStatus,
        to: ScenarioStatus,
    },

    #[error("Test plan '{plan}' failed: {failed} of {total} scenarios did not complete")]
    PlanFailed {
        plan: String,
        failed: usize,
        total: usize,
    },

    // === Configuration Errors ===
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(String),

    // === IO Errors ===
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to read file '{path}': {error}")]
    FileRead { path: String, error: String },

    // === Serialization Errors ===
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl Error {
    /// Wrap a store failure with the scenario it was writing
    pub fn persistence(scenario: &str, source: StoreError) -> Self {
        Self::Persistence {
            scenario: scenario.to_string(),
            source,
        }
    }

    /// Wrap a discovery or execution failure with the scenario it belongs to
    pub fn scenario_execution(scenario: &str, source: AutomationError) -> Self {
        Self::ScenarioExecution {
            scenario: scenario.to_string(),
            source,
        }
    }

    /// Name of the scenario this error belongs to, if any
    pub fn scenario(&self) -> Option<&str> {
        match self {
            Error::Persistence { scenario, .. }
            | Error::ScenarioExecution { scenario, .. }
            | Error::TestLocation { scenario, .. }
            | Error::InvalidTransition { scenario, .. } => Some(scenario),
            _ => None,
        }
    }

    /// Whether this error came from the persistence layer
    pub fn is_persistence(&self) -> bool {
        matches!(self, Error::Persistence { .. })
    }
}

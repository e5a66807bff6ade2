//! testgrid - scenario execution for deployment test plans
//!
//! Discovers the tests of a scenario, runs them in order against a
//! deployment and keeps a persisted status trail for every run.

pub mod automation;
pub mod cli;
pub mod commands;
pub mod common;
pub mod executor;
pub mod persistence;
pub mod scenario;

// Re-export commonly used types for tests
pub use common::{Error, Result};
pub use executor::ScenarioExecutor;
pub use scenario::{Deployment, ScenarioStatus, TestEngine, TestPlan, TestScenario};

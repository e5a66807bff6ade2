//! Scenario persistence
//!
//! Stores keep one record per scenario identity. Persisting a record without
//! an id inserts it and assigns one; persisting a record with an id replaces
//! the stored copy (last write wins).

mod json_file;
mod memory;

pub use json_file::JsonFileStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use std::io;
use thiserror::Error;

use crate::scenario::TestScenario;

/// Errors raised by scenario stores
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Store I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("Store file '{path}' is corrupt: {error}")]
    Corrupt { path: String, error: String },

    #[error("Store serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Scenario id {0} leaves no room for another id")]
    IdExhausted(u64),
}

/// Durable scenario records
#[async_trait]
pub trait ScenarioStore: Send + Sync {
    /// Insert or update a scenario, returning the stored record
    async fn persist(&self, scenario: &TestScenario) -> Result<TestScenario, StoreError>;

    /// Look up a scenario by id
    async fn find(&self, id: u64) -> Result<Option<TestScenario>, StoreError>;

    /// All stored scenarios in id order
    async fn list(&self) -> Result<Vec<TestScenario>, StoreError>;
}

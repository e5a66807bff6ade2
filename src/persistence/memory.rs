//! In-memory scenario store

use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::Mutex;

use super::{ScenarioStore, StoreError};
use crate::scenario::TestScenario;

#[derive(Debug)]
struct Records {
    next_id: u64,
    scenarios: BTreeMap<u64, TestScenario>,
}

/// Store that keeps records for the lifetime of the process
#[derive(Debug)]
pub struct MemoryStore {
    records: Mutex<Records>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(Records {
                next_id: 1,
                scenarios: BTreeMap::new(),
            }),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ScenarioStore for MemoryStore {
    async fn persist(&self, scenario: &TestScenario) -> Result<TestScenario, StoreError> {
        let mut records = self.records.lock().await;

        let id = match scenario.id {
            Some(id) => id,
            None => records.next_id,
        };
        let after = id.checked_add(1).ok_or(StoreError::IdExhausted(id))?;
        records.next_id = records.next_id.max(after);

        let stored = TestScenario {
            id: Some(id),
            ..scenario.clone()
        };
        records.scenarios.insert(id, stored.clone());
        Ok(stored)
    }

    async fn find(&self, id: u64) -> Result<Option<TestScenario>, StoreError> {
        Ok(self.records.lock().await.scenarios.get(&id).cloned())
    }

    async fn list(&self) -> Result<Vec<TestScenario>, StoreError> {
        Ok(self.records.lock().await.scenarios.values().cloned().collect())
    }
}

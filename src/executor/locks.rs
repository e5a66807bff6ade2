//! Per-scenario run exclusion
//!
//! A scenario's status is written several times during a run, so two runs of
//! the same scenario must never overlap. Runs of different scenarios proceed
//! independently.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::scenario::{TestPlan, TestScenario};

/// Identity a run is locked on
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RunKey {
    /// Scenario the store has assigned an id, whatever plan it runs under
    Id(u64),
    /// Scenario never persisted: plan name plus scenario name
    Name { plan: String, scenario: String },
}

impl RunKey {
    pub fn new(plan: &str, scenario: &str) -> Self {
        Self::Name {
            plan: plan.to_string(),
            scenario: scenario.to_string(),
        }
    }

    /// Key of a scenario about to run under `test_plan`
    pub fn for_scenario(scenario: &TestScenario, test_plan: &TestPlan) -> Self {
        match scenario.id {
            Some(id) => Self::Id(id),
            None => Self::new(&test_plan.name, &scenario.name),
        }
    }
}

type LockMap = HashMap<RunKey, Arc<AsyncMutex<()>>>;

/// Registry of per-scenario locks
#[derive(Debug, Clone, Default)]
pub struct RunLocks {
    locks: Arc<Mutex<LockMap>>,
}

impl RunLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until no other run holds `key`, then hold it until the guard drops
    pub async fn acquire(&self, key: RunKey) -> RunGuard {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
            locks.entry(key.clone()).or_default().clone()
        };

        if lock.try_lock().is_err() {
            tracing::info!(
                key = ?key,
                "Waiting for the active run of this scenario to finish"
            );
        }

        let guard = lock.lock_owned().await;
        RunGuard {
            key,
            locks: self.locks.clone(),
            guard: Some(guard),
        }
    }

    /// Number of scenarios currently running or waiting
    pub fn active(&self) -> usize {
        self.locks.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

/// Held for the duration of one run
#[derive(Debug)]
pub struct RunGuard {
    key: RunKey,
    locks: Arc<Mutex<LockMap>>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        // one reference in the map, one in our guard: nobody is waiting
        let idle = locks
            .get(&self.key)
            .map(|lock| Arc::strong_count(lock) <= 2)
            .unwrap_or(false);
        if idle {
            locks.remove(&self.key);
        }
        self.guard.take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::TestEngine;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_key_serializes() {
        let locks = RunLocks::new();
        let events = Arc::new(Mutex::new(Vec::new()));

        let run = |tag: &'static str| {
            let locks = locks.clone();
            let events = events.clone();
            async move {
                let _guard = locks.acquire(RunKey::new("plan", "payment-flow")).await;
                events.lock().unwrap().push(format!("{tag}-start"));
                tokio::time::sleep(Duration::from_millis(20)).await;
                events.lock().unwrap().push(format!("{tag}-end"));
            }
        };

        tokio::join!(run("a"), run("b"));

        let events = events.lock().unwrap().clone();
        assert_eq!(events.len(), 4);
        assert!(events[0].ends_with("-start"));
        assert_eq!(events[1], events[0].replace("start", "end"));
        assert_eq!(locks.active(), 0);
    }

    #[test]
    fn test_key_prefers_id() {
        let plan = TestPlan::new("nightly", "/repo");
        let mut scenario = TestScenario::new("payment-flow", TestEngine::Shell);
        assert_eq!(
            RunKey::for_scenario(&scenario, &plan),
            RunKey::new("nightly", "payment-flow")
        );

        scenario.id = Some(7);
        assert_eq!(RunKey::for_scenario(&scenario, &plan), RunKey::Id(7));
        assert_eq!(
            RunKey::for_scenario(&scenario, &TestPlan::new("weekly", "/other")),
            RunKey::Id(7)
        );
    }

    #[tokio::test]
    async fn test_different_keys_do_not_block() {
        let locks = RunLocks::new();
        let _a = locks.acquire(RunKey::new("plan", "a")).await;
        let b = tokio::time::timeout(
            Duration::from_millis(100),
            locks.acquire(RunKey::new("plan", "b")),
        )
        .await;
        assert!(b.is_ok());
        assert_eq!(locks.active(), 2);
    }

    #[tokio::test]
    async fn test_guard_drop_releases_entry() {
        let locks = RunLocks::new();
        {
            let _guard = locks.acquire(RunKey::new("plan", "a")).await;
            assert_eq!(locks.active(), 1);
        }
        assert_eq!(locks.active(), 0);
    }
}

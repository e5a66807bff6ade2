//! Scenario execution
//!
//! Runs the tests of one scenario against a deployment and records every
//! status change. A run is all or nothing: RUNNING is persisted first, then
//! either COMPLETED after every test passed, or ERROR as soon as discovery or
//! a test fails. Remaining tests are not attempted after a failure.

mod locks;

pub use locks::{RunGuard, RunKey, RunLocks};

use futures_util::stream::{self, StreamExt};
use std::path::Path;
use std::sync::Arc;

use crate::automation::{AutomationError, ExecutableTest, ReaderRegistry};
use crate::common::{Error, Result};
use crate::persistence::ScenarioStore;
use crate::scenario::{Deployment, ScenarioStatus, TestPlan, TestScenario};

/// Result of one scenario in a plan run
#[derive(Debug)]
pub struct ScenarioOutcome {
    pub name: String,
    pub result: Result<TestScenario>,
}

impl ScenarioOutcome {
    pub fn passed(&self) -> bool {
        matches!(&self.result, Ok(s) if s.status == ScenarioStatus::Completed)
    }
}

/// Drives scenario runs
pub struct ScenarioExecutor {
    readers: ReaderRegistry,
    store: Arc<dyn ScenarioStore>,
    locks: RunLocks,
}

impl ScenarioExecutor {
    pub fn new(readers: ReaderRegistry, store: Arc<dyn ScenarioStore>) -> Self {
        Self {
            readers,
            store,
            locks: RunLocks::new(),
        }
    }

    /// Execute the tests of a scenario
    ///
    /// Returns the persisted scenario with status COMPLETED. On a discovery
    /// or test failure the scenario is persisted with status ERROR before
    /// the error is returned.
    pub async fn run_scenario(
        &self,
        mut scenario: TestScenario,
        deployment: &Deployment,
        test_plan: &TestPlan,
    ) -> Result<TestScenario> {
        let _guard = self
            .locks
            .acquire(RunKey::for_scenario(&scenario, test_plan))
            .await;

        let location = test_plan
            .test_location(&scenario.name)
            .map_err(|source| Error::TestLocation {
                scenario: scenario.name.clone(),
                source,
            })?;

        scenario.test_plan = Some(test_plan.name.clone());
        scenario.transition(ScenarioStatus::Running)?;
        let mut scenario = self.persist(&scenario).await?;

        tracing::info!(
            scenario = %scenario.name,
            engine = %scenario.engine,
            location = %location.display(),
            "Executing tests for solution pattern"
        );

        match self.execute_tests(&scenario, &location, deployment).await {
            Ok(executed) => {
                scenario.transition(ScenarioStatus::Completed)?;
                let scenario = self.persist(&scenario).await?;
                tracing::info!(scenario = %scenario.name, tests = executed, "Scenario completed");
                Ok(scenario)
            }
            Err(fault) => {
                tracing::error!(scenario = %scenario.name, "Scenario failed: {}", fault);
                scenario.transition(ScenarioStatus::Error)?;
                if let Err(e) = self.persist(&scenario).await {
                    tracing::error!(
                        scenario = %scenario.name,
                        "Could not record ERROR status, original failure was: {}",
                        fault
                    );
                    return Err(e);
                }
                Err(Error::scenario_execution(&scenario.name, fault))
            }
        }
    }

    /// Run every scenario of a plan, at most `max_parallel` at a time
    ///
    /// A failing scenario does not stop the others. Outcomes come back in
    /// the order the scenarios were given.
    pub async fn run_plan(
        &self,
        test_plan: &TestPlan,
        scenarios: Vec<TestScenario>,
        deployment: &Deployment,
        max_parallel: usize,
    ) -> Vec<ScenarioOutcome> {
        tracing::info!(
            plan = %test_plan.name,
            scenarios = scenarios.len(),
            max_parallel,
            "Executing test plan"
        );

        stream::iter(scenarios)
            .map(|scenario| async move {
                let name = scenario.name.clone();
                let result = self.run_scenario(scenario, deployment, test_plan).await;
                ScenarioOutcome { name, result }
            })
            .buffered(max_parallel.max(1))
            .collect()
            .await
    }

    /// Store the current status, wrapping failures with the scenario name
    async fn persist(&self, scenario: &TestScenario) -> Result<TestScenario> {
        self.store
            .persist(scenario)
            .await
            .map_err(|e| Error::persistence(&scenario.name, e))
    }

    /// Discover and run the scenario's tests in order, stopping at the first failure
    async fn execute_tests(
        &self,
        scenario: &TestScenario,
        location: &Path,
        deployment: &Deployment,
    ) -> std::result::Result<usize, AutomationError> {
        let tests = self.discover_tests(scenario, location).await?;

        for test in &tests {
            tracing::info!(scenario = %scenario.name, test = test.name(), "Executing test");
            test.execute(location, deployment).await?;
        }

        Ok(tests.len())
    }

    /// Tests of a scenario in discovery order
    ///
    /// A missing folder or an engine without a reader yields no tests.
    async fn discover_tests(
        &self,
        scenario: &TestScenario,
        location: &Path,
    ) -> std::result::Result<Vec<Box<dyn ExecutableTest>>, AutomationError> {
        if !tokio::fs::try_exists(location).await.unwrap_or(false) {
            tracing::warn!(
                scenario = %scenario.name,
                location = %location.display(),
                "Test location does not exist, no tests to run"
            );
            return Ok(Vec::new());
        }

        let Some(reader) = self.readers.get(scenario.engine) else {
            tracing::warn!(
                scenario = %scenario.name,
                engine = %scenario.engine,
                "No test reader registered for engine, no tests to run"
            );
            return Ok(Vec::new());
        };

        reader.read_tests(location, scenario).await
    }
}

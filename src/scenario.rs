//! Scenario data model
//!
//! A scenario is one solution pattern: a folder of tests under a test plan's
//! repository root, run together against a deployment.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::common::{Error, Result};

/// Lifecycle status of a test scenario
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioStatus {
    /// Not run yet, never persisted by a run
    #[default]
    Pending,
    /// A run is in progress
    Running,
    /// All tests ran without a fault
    Completed,
    /// Discovery or a test failed
    Error,
}

impl ScenarioStatus {
    /// Whether no further transition may happen in the current run
    pub fn is_terminal(self) -> bool {
        matches!(self, ScenarioStatus::Completed | ScenarioStatus::Error)
    }

    /// Whether a run may move a scenario from `self` to `next`
    ///
    /// Any state may enter `Running`, since re-runs start over. Terminal
    /// states are only reachable from `Running`.
    pub fn can_transition_to(self, next: ScenarioStatus) -> bool {
        match next {
            ScenarioStatus::Running => true,
            ScenarioStatus::Completed | ScenarioStatus::Error => self == ScenarioStatus::Running,
            ScenarioStatus::Pending => false,
        }
    }
}

impl fmt::Display for ScenarioStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScenarioStatus::Pending => write!(f, "PENDING"),
            ScenarioStatus::Running => write!(f, "RUNNING"),
            ScenarioStatus::Completed => write!(f, "COMPLETED"),
            ScenarioStatus::Error => write!(f, "ERROR"),
        }
    }
}

/// Test engine a scenario's tests are written for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestEngine {
    Jmeter,
    Testng,
    Shell,
}

impl fmt::Display for TestEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TestEngine::Jmeter => write!(f, "jmeter"),
            TestEngine::Testng => write!(f, "testng"),
            TestEngine::Shell => write!(f, "shell"),
        }
    }
}

impl FromStr for TestEngine {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "jmeter" => Ok(TestEngine::Jmeter),
            "testng" => Ok(TestEngine::Testng),
            "shell" | "sh" => Ok(TestEngine::Shell),
            other => Err(Error::Config(format!(
                "Unknown test engine '{}'. Supported engines: jmeter, testng, shell",
                other
            ))),
        }
    }
}

/// A named scenario and its last recorded status
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestScenario {
    /// Identity, assigned by the store on first persist
    #[serde(default)]
    pub id: Option<u64>,
    /// Scenario name, also the test folder name under the plan root
    pub name: String,
    /// Engine selecting the discovery strategy
    pub engine: TestEngine,
    #[serde(default)]
    pub status: ScenarioStatus,
    /// Name of the owning test plan
    #[serde(default)]
    pub test_plan: Option<String>,
}

impl TestScenario {
    /// Create a pending scenario that has never been persisted
    pub fn new(name: impl Into<String>, engine: TestEngine) -> Self {
        Self {
            id: None,
            name: name.into(),
            engine,
            status: ScenarioStatus::Pending,
            test_plan: None,
        }
    }

    /// Move to `next`, rejecting transitions the lifecycle does not allow
    pub fn transition(&mut self, next: ScenarioStatus) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(Error::InvalidTransition {
                scenario: self.name.clone(),
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }
}

/// Parent execution context of a set of scenarios
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestPlan {
    pub name: String,
    /// Root directory holding one folder per scenario
    pub test_repo_dir: PathBuf,
}

impl TestPlan {
    pub fn new(name: impl Into<String>, test_repo_dir: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            test_repo_dir: test_repo_dir.into(),
        }
    }

    /// Absolute test folder of a scenario in this plan
    ///
    /// The path is made absolute against the working directory without
    /// touching the filesystem, so it may not exist.
    pub fn test_location(&self, scenario_name: &str) -> std::io::Result<PathBuf> {
        std::path::absolute(self.test_repo_dir.join(scenario_name))
    }

    /// Scenario folder names directly under the plan root, sorted
    pub fn scenario_dirs(&self) -> Result<Vec<String>> {
        let entries = std::fs::read_dir(&self.test_repo_dir).map_err(|e| Error::FileRead {
            path: self.test_repo_dir.display().to_string(),
            error: e.to_string(),
        })?;

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                if let Some(name) = entry.file_name().to_str() {
                    if !name.starts_with('.') {
                        names.push(name.to_string());
                    }
                }
            }
        }
        names.sort();
        Ok(names)
    }
}

/// A provisioned target the tests run against
///
/// The executor hands this to every test unchanged and never looks inside.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deployment {
    pub name: String,
    /// Endpoints, host names and similar values tests need
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

impl Deployment {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            properties: BTreeMap::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Load a deployment descriptor from a YAML or JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::FileRead {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;

        let is_json = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("json"))
            .unwrap_or(false);
        if is_json {
            Ok(serde_json::from_str(&content)?)
        } else {
            Ok(serde_yaml::from_str(&content)?)
        }
    }
}

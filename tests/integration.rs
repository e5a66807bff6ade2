//! End-to-end tests for scenario execution
//!
//! These tests verify the complete workflow by:
//! 1. Laying out a test plan with shell-script scenarios in a temp directory
//! 2. Running scenarios through the library API and the `testgrid` binary
//! 3. Checking execution order and the persisted status trail

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;

use testgrid::automation::ReaderRegistry;
use testgrid::persistence::{JsonFileStore, ScenarioStore};
use testgrid::{Deployment, Error, ScenarioExecutor, ScenarioStatus, TestEngine, TestPlan, TestScenario};

/// Test context with a plan root and a store file
struct TestContext {
    _temp: tempfile::TempDir,
    /// Test plan root, one folder per scenario
    plan_root: PathBuf,
    /// JSON scenario store
    store_path: PathBuf,
    /// Every script appends its name here
    trace_path: PathBuf,
}

impl TestContext {
    fn new() -> Self {
        let temp = tempfile::tempdir().expect("Failed to create temp dir");
        let plan_root = temp.path().join("nightly");
        fs::create_dir_all(&plan_root).expect("Failed to create plan root");
        let store_path = temp.path().join("store").join("scenarios.json");
        let trace_path = temp.path().join("trace.log");

        Self {
            _temp: temp,
            plan_root,
            store_path,
            trace_path,
        }
    }

    /// Add a script test to a scenario; it records itself then exits with `code`
    fn add_script(&self, scenario: &str, script: &str, code: i32) {
        let dir = self.plan_root.join(scenario);
        fs::create_dir_all(&dir).expect("Failed to create scenario dir");
        let body = format!(
            "echo \"{script}:$TESTGRID_DEPLOYMENT\" >> \"{trace}\"\nexit {code}\n",
            script = script,
            trace = self.trace_path.display(),
            code = code
        );
        fs::write(dir.join(script), body).expect("Failed to write script");
    }

    fn trace(&self) -> Vec<String> {
        fs::read_to_string(&self.trace_path)
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }

    fn plan(&self) -> TestPlan {
        TestPlan::new("nightly", &self.plan_root)
    }

    fn executor(&self) -> (ScenarioExecutor, Arc<JsonFileStore>) {
        let store = Arc::new(JsonFileStore::new(&self.store_path));
        let executor = ScenarioExecutor::new(ReaderRegistry::with_defaults(), store.clone());
        (executor, store)
    }

    /// Run the testgrid binary with an empty config and this context's store
    fn run_cli(&self, args: &[&str]) -> CliOutput {
        let config_path = self.plan_root.parent().unwrap().join("testgrid.toml");
        if !config_path.exists() {
            fs::write(&config_path, "[runner]\nmax_parallel_scenarios = 2\n")
                .expect("Failed to write config");
        }

        let output = Command::new(env!("CARGO_BIN_EXE_testgrid"))
            .arg("--config")
            .arg(&config_path)
            .arg("--store")
            .arg(&self.store_path)
            .args(args)
            .env("NO_COLOR", "1")
            .output()
            .expect("Failed to run testgrid");

        CliOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            success: output.status.success(),
        }
    }
}

/// Output from a testgrid command
#[derive(Debug)]
struct CliOutput {
    stdout: String,
    stderr: String,
    success: bool,
}

fn path_str(path: &Path) -> &str {
    path.to_str().expect("non UTF-8 temp path")
}

#[tokio::test]
async fn test_scenario_runs_scripts_in_order() {
    let ctx = TestContext::new();
    ctx.add_script("payment-flow", "b-checkout.sh", 0);
    ctx.add_script("payment-flow", "a-login.sh", 0);
    let (executor, store) = ctx.executor();

    let scenario = executor
        .run_scenario(
            TestScenario::new("payment-flow", TestEngine::Shell),
            &Deployment::new("wso2-am"),
            &ctx.plan(),
        )
        .await
        .expect("scenario should pass");

    assert_eq!(scenario.status, ScenarioStatus::Completed);
    assert_eq!(
        ctx.trace(),
        vec!["a-login.sh:wso2-am", "b-checkout.sh:wso2-am"]
    );

    let stored = store.list().await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].status, ScenarioStatus::Completed);
    assert_eq!(stored[0].test_plan.as_deref(), Some("nightly"));
}

#[tokio::test]
async fn test_failing_script_persists_error_and_skips_rest() {
    let ctx = TestContext::new();
    ctx.add_script("payment-flow", "1-login.sh", 0);
    ctx.add_script("payment-flow", "2-pay.sh", 1);
    ctx.add_script("payment-flow", "3-refund.sh", 0);
    let (executor, store) = ctx.executor();

    let err = executor
        .run_scenario(
            TestScenario::new("payment-flow", TestEngine::Shell),
            &Deployment::new("d"),
            &ctx.plan(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, Error::ScenarioExecution { ref scenario, .. } if scenario == "payment-flow"));
    assert_eq!(ctx.trace(), vec!["1-login.sh:d", "2-pay.sh:d"]);

    let stored = store.find(1).await.unwrap().expect("record should exist");
    assert_eq!(stored.status, ScenarioStatus::Error);
}

#[tokio::test]
async fn test_unsupported_engine_and_missing_folder_complete() {
    let ctx = TestContext::new();
    ctx.add_script("payment-flow", "a.sh", 0);
    let (executor, store) = ctx.executor();
    let deployment = Deployment::new("d");

    let jmeter = executor
        .run_scenario(
            TestScenario::new("payment-flow", TestEngine::Jmeter),
            &deployment,
            &ctx.plan(),
        )
        .await
        .unwrap();
    let missing = executor
        .run_scenario(
            TestScenario::new("not-there", TestEngine::Shell),
            &deployment,
            &ctx.plan(),
        )
        .await
        .unwrap();

    assert_eq!(jmeter.status, ScenarioStatus::Completed);
    assert_eq!(missing.status, ScenarioStatus::Completed);
    assert!(ctx.trace().is_empty());
    assert_eq!(store.list().await.unwrap().len(), 2);
}

#[test]
fn test_cli_run_and_status() {
    let ctx = TestContext::new();
    ctx.add_script("payment-flow", "a.sh", 0);

    let output = ctx.run_cli(&["run", path_str(&ctx.plan_root), "payment-flow"]);
    assert!(output.success, "run failed: {:?}", output);
    assert!(output.stdout.contains("COMPLETED"));

    // re-running updates the same record
    let output = ctx.run_cli(&["run", path_str(&ctx.plan_root), "payment-flow"]);
    assert!(output.success, "rerun failed: {:?}", output);

    let output = ctx.run_cli(&["status", "--json"]);
    assert!(output.success, "status failed: {:?}", output);
    let scenarios: Vec<TestScenario> =
        serde_json::from_str(&output.stdout).expect("status --json should be valid JSON");
    assert_eq!(scenarios.len(), 1);
    assert_eq!(scenarios[0].status, ScenarioStatus::Completed);
    assert_eq!(scenarios[0].test_plan.as_deref(), Some("nightly"));
}

#[test]
fn test_cli_plan_reports_failures() {
    let ctx = TestContext::new();
    ctx.add_script("checkout", "a.sh", 0);
    ctx.add_script("search", "a.sh", 2);

    let output = ctx.run_cli(&["plan", path_str(&ctx.plan_root)]);
    assert!(!output.success);
    assert!(output.stderr.contains("1 of 2 scenarios"), "stderr: {}", output.stderr);

    let output = ctx.run_cli(&["status"]);
    assert!(output.success);
    assert!(output.stdout.contains("checkout"));
    assert!(output.stdout.contains("ERROR"));
}

#[test]
fn test_cli_rejects_unknown_engine() {
    let ctx = TestContext::new();
    let output = ctx.run_cli(&[
        "run",
        path_str(&ctx.plan_root),
        "payment-flow",
        "--engine",
        "selenium",
    ]);
    assert!(!output.success);
    assert!(output.stderr.contains("Unknown test engine"));
}

#[test]
fn test_cli_status_reports_unreadable_store() {
    let ctx = TestContext::new();
    std::fs::create_dir_all(ctx.store_path.parent().unwrap()).unwrap();
    std::fs::write(&ctx.store_path, "{ not json").unwrap();

    let output = ctx.run_cli(&["status"]);
    assert!(!output.success);
    assert!(
        output.stderr.contains("Failed to access scenario store"),
        "stderr: {}",
        output.stderr
    );
    assert!(!output.stderr.contains("Configuration error"));
}

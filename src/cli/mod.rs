//! CLI command handling
//!
//! Builds the executor from configuration, dispatches commands and formats
//! output.

use colored::Colorize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::automation::ReaderRegistry;
use crate::commands::{Commands, TargetArgs};
use crate::common::config::{Config, ConfigProperty};
use crate::common::{Error, Result};
use crate::executor::{ScenarioExecutor, ScenarioOutcome};
use crate::persistence::{JsonFileStore, ScenarioStore};
use crate::scenario::{Deployment, ScenarioStatus, TestEngine, TestPlan, TestScenario};

/// Deployment name used when no descriptor is given
const DEFAULT_DEPLOYMENT: &str = "local";

/// Dispatch a CLI command
pub async fn dispatch(command: Commands, config: &Config, store_path: &Path) -> Result<()> {
    let store = Arc::new(JsonFileStore::new(store_path));
    tracing::debug!(store = %store.path().display(), "Using scenario store");

    match command {
        Commands::Run {
            plan_root,
            scenario,
            target,
        } => {
            let (plan, engine, deployment) = resolve_target(&plan_root, &target)?;
            let executor = ScenarioExecutor::new(ReaderRegistry::with_defaults(), store.clone());
            let scenario = load_or_new(store.as_ref(), &plan, &scenario, engine).await?;

            let outcome = ScenarioOutcome {
                name: scenario.name.clone(),
                result: executor.run_scenario(scenario, &deployment, &plan).await,
            };
            print_outcome(&outcome);
            outcome.result.map(|_| ())
        }

        Commands::Plan { plan_root, target } => {
            let (plan, engine, deployment) = resolve_target(&plan_root, &target)?;
            let executor = ScenarioExecutor::new(ReaderRegistry::with_defaults(), store.clone());

            let mut scenarios = Vec::new();
            for name in plan.scenario_dirs()? {
                scenarios.push(load_or_new(store.as_ref(), &plan, &name, engine).await?);
            }

            println!(
                "\n{} {} ({} scenarios)",
                "Running Plan:".blue().bold(),
                plan.name.white().bold(),
                scenarios.len()
            );

            let total = scenarios.len();
            let outcomes = executor
                .run_plan(
                    &plan,
                    scenarios,
                    &deployment,
                    config.runner.max_parallel_scenarios,
                )
                .await;

            for outcome in &outcomes {
                print_outcome(outcome);
            }

            let failed = outcomes.iter().filter(|o| !o.passed()).count();
            if failed > 0 {
                return Err(Error::PlanFailed {
                    plan: plan.name,
                    failed,
                    total,
                });
            }
            println!("\n{} {}\n", "✓".green().bold(), "Plan Passed".green().bold());
            Ok(())
        }

        Commands::Status { json } => {
            let scenarios = store.list().await.map_err(|source| Error::Store {
                path: store.path().display().to_string(),
                source,
            })?;

            if json {
                println!("{}", serde_json::to_string_pretty(&scenarios)?);
            } else if scenarios.is_empty() {
                println!("No scenarios recorded");
            } else {
                println!("Scenarios:");
                for scenario in &scenarios {
                    print_scenario(scenario);
                }
            }
            Ok(())
        }

        Commands::Config => {
            for property in ConfigProperty::ALL {
                let shown = match config.property(property) {
                    Some(_) if property.is_secret() => "set (hidden)".to_string(),
                    Some(value) => value,
                    None => "not set".dimmed().to_string(),
                };
                println!("  {:36} {}", property.key(), shown);
            }
            println!(
                "  {:36} {}",
                "store",
                store_path.display().to_string().dimmed()
            );
            Ok(())
        }
    }
}

/// Resolve plan, engine and deployment from the shared run options
fn resolve_target(
    plan_root: &Path,
    target: &TargetArgs,
) -> Result<(TestPlan, TestEngine, Deployment)> {
    let engine: TestEngine = target.engine.parse()?;

    let plan_name = match &target.plan {
        Some(name) => name.clone(),
        None => plan_name_from_root(plan_root),
    };
    let plan = TestPlan::new(plan_name, plan_root);

    let deployment = match &target.deployment {
        Some(path) => Deployment::load(path)?,
        None => Deployment::new(DEFAULT_DEPLOYMENT),
    };

    Ok((plan, engine, deployment))
}

fn plan_name_from_root(plan_root: &Path) -> String {
    std::path::absolute(plan_root)
        .ok()
        .as_deref()
        .and_then(Path::file_name)
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "default".to_string())
}

/// Reuse the stored record of a scenario so re-runs update it in place
async fn load_or_new(
    store: &dyn ScenarioStore,
    plan: &TestPlan,
    name: &str,
    engine: TestEngine,
) -> Result<TestScenario> {
    let existing = store
        .list()
        .await
        .map_err(|e| Error::persistence(name, e))?
        .into_iter()
        .find(|s| s.name == name && s.test_plan.as_deref() == Some(plan.name.as_str()));

    Ok(match existing {
        Some(mut scenario) => {
            scenario.engine = engine;
            scenario
        }
        None => TestScenario::new(name, engine),
    })
}

fn print_outcome(outcome: &ScenarioOutcome) {
    match &outcome.result {
        Ok(scenario) => println!(
            "  {} {} {}",
            "✓".green(),
            outcome.name.white().bold(),
            scenario.status.to_string().green()
        ),
        Err(e) => println!(
            "  {} {} {}",
            "✗".red(),
            outcome.name.white().bold(),
            e.to_string().red()
        ),
    }
}

fn print_scenario(scenario: &TestScenario) {
    let status = match scenario.status {
        ScenarioStatus::Completed => scenario.status.to_string().green(),
        ScenarioStatus::Error => scenario.status.to_string().red(),
        ScenarioStatus::Running => scenario.status.to_string().yellow(),
        ScenarioStatus::Pending => scenario.status.to_string().dimmed(),
    };
    println!(
        "  {:>4} {:24} {:10} {:8} {}",
        scenario.id.map(|id| id.to_string()).unwrap_or_default(),
        scenario.name,
        status,
        scenario.engine.to_string(),
        scenario.test_plan.as_deref().unwrap_or("-")
    );
}

/// Resolve the store path: command line, then configuration, then platform default
pub fn resolve_store_path(explicit: Option<PathBuf>, config: &Config) -> Result<PathBuf> {
    explicit.or_else(|| config.store_path()).ok_or_else(|| {
        Error::Config("Could not determine a scenario store location, pass --store".to_string())
    })
}

//! CLI command definitions
//!
//! Defines the clap commands for the testgrid CLI.

use clap::Subcommand;
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum Commands {
    /// Run one scenario of a test plan
    Run {
        /// Test plan root directory holding one folder per scenario
        plan_root: PathBuf,

        /// Scenario name (folder under the plan root)
        scenario: String,

        #[command(flatten)]
        target: TargetArgs,
    },

    /// Run every scenario folder of a test plan
    Plan {
        /// Test plan root directory holding one folder per scenario
        plan_root: PathBuf,

        #[command(flatten)]
        target: TargetArgs,
    },

    /// Show persisted scenario status
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show which configuration properties are set
    Config,
}

/// Options shared by the run commands
#[derive(clap::Args, Debug, Clone)]
pub struct TargetArgs {
    /// Test engine of the scenario tests (jmeter, testng, shell)
    #[arg(long, default_value = "shell")]
    pub engine: String,

    /// Deployment descriptor (YAML or JSON)
    #[arg(long)]
    pub deployment: Option<PathBuf>,

    /// Test plan name (default: plan root folder name)
    #[arg(long)]
    pub plan: Option<String>,
}

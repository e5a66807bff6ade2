//! testgrid - run test scenarios against a deployment
//!
//! Each scenario is a folder of tests under a test plan root. Scenario status
//! is recorded in a JSON store so later runs and reports can pick it up.

use clap::Parser;
use std::path::PathBuf;
use testgrid::commands::Commands;
use testgrid::common::{config::Config, logging};
use testgrid::{cli, Result};

#[derive(Parser)]
#[command(name = "testgrid", about = "Run test scenarios against a deployment")]
#[command(version, long_about = None)]
struct Cli {
    /// Configuration file (default: platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Scenario store file (default: platform data directory)
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    /// Also write logs to a file (`--log-file=PATH`); a bare `--log-file`
    /// uses the platform log directory
    #[arg(long, global = true, num_args = 0..=1, require_equals = true)]
    log_file: Option<Option<PathBuf>>,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_file = match &cli.log_file {
        Some(Some(path)) => Some(path.clone()),
        Some(None) => logging::default_log_path(),
        None => None,
    };
    let log_guard = logging::init_cli(log_file.as_deref());

    let result = run(cli).await;
    // flush the file writer before exiting
    drop(log_guard);

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let store_path = cli::resolve_store_path(cli.store, &config)?;

    cli::dispatch(cli.command, &config, &store_path).await
}

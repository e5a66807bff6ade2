//! Shell script tests
//!
//! Every `*.sh` file directly inside a scenario folder is one test. Scripts
//! run in file-name order with the scenario folder as working directory and
//! the deployment exported through `TESTGRID_*` environment variables.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command as TokioCommand;

use super::{AutomationError, ExecutableTest, TestReader};
use crate::scenario::{Deployment, TestScenario};

/// Prefix of every environment variable handed to a script
const ENV_PREFIX: &str = "TESTGRID_";

/// How much of stderr to keep in a failure message
const STDERR_TAIL: usize = 512;

/// Reader for the `shell` engine
#[derive(Debug, Default, Clone, Copy)]
pub struct ShellTestReader;

#[async_trait]
impl TestReader for ShellTestReader {
    async fn read_tests(
        &self,
        location: &Path,
        scenario: &TestScenario,
    ) -> Result<Vec<Box<dyn ExecutableTest>>, AutomationError> {
        let discovery_err = |e: std::io::Error| {
            AutomationError::Discovery(format!(
                "cannot list '{}' for scenario '{}': {}",
                location.display(),
                scenario.name,
                e
            ))
        };

        let mut entries = tokio::fs::read_dir(location).await.map_err(discovery_err)?;
        let mut scripts = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(discovery_err)? {
            let path = entry.path();
            let is_file = entry.file_type().await.map_err(discovery_err)?.is_file();
            if is_file && path.extension().map(|ext| ext == "sh").unwrap_or(false) {
                scripts.push(path);
            }
        }
        scripts.sort();

        tracing::debug!(
            scenario = %scenario.name,
            count = scripts.len(),
            "Discovered shell tests"
        );

        Ok(scripts
            .into_iter()
            .map(|script| Box::new(ShellTest::new(script)) as Box<dyn ExecutableTest>)
            .collect())
    }
}

/// One shell script
#[derive(Debug, Clone)]
pub struct ShellTest {
    script: PathBuf,
    name: String,
}

impl ShellTest {
    pub fn new(script: PathBuf) -> Self {
        let name = script
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| script.display().to_string());
        Self { script, name }
    }
}

#[async_trait]
impl ExecutableTest for ShellTest {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(
        &self,
        location: &Path,
        deployment: &Deployment,
    ) -> Result<(), AutomationError> {
        let output = TokioCommand::new("sh")
            .arg(&self.script)
            .current_dir(location)
            .envs(deployment_env(deployment))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| {
                AutomationError::execution(&self.name, &format!("failed to start: {}", e))
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        if !stdout.trim().is_empty() {
            tracing::debug!(test = %self.name, "{}", stdout.trim_end());
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stderr = stderr.trim();
            let tail = &stderr[floor_char_boundary(stderr, stderr.len().saturating_sub(STDERR_TAIL))..];
            let reason = match output.status.code() {
                Some(code) if tail.is_empty() => format!("exited with code {}", code),
                Some(code) => format!("exited with code {}: {}", code, tail),
                None => "terminated by signal".to_string(),
            };
            return Err(AutomationError::execution(&self.name, &reason));
        }

        Ok(())
    }
}

/// Environment variables describing a deployment
///
/// `TESTGRID_DEPLOYMENT` holds the name; each property becomes
/// `TESTGRID_<KEY>` with the key upper-cased and other characters mapped to `_`.
pub fn deployment_env(deployment: &Deployment) -> Vec<(String, String)> {
    let mut env = vec![(format!("{}DEPLOYMENT", ENV_PREFIX), deployment.name.clone())];
    for (key, value) in &deployment.properties {
        let key: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() {
                    c.to_ascii_uppercase()
                } else {
                    '_'
                }
            })
            .collect();
        env.push((format!("{}{}", ENV_PREFIX, key), value.clone()));
    }
    env
}

fn floor_char_boundary(s: &str, mut index: usize) -> usize {
    while index > 0 && !s.is_char_boundary(index) {
        index -= 1;
    }
    index
}

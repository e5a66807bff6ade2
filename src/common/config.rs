//! Configuration file handling
//!
//! The configuration is read once at process start and handed to whichever
//! collaborator needs it. The scenario executor never reads it.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use super::paths::{config_path, store_path};
use super::{Error, Result};

/// Main configuration structure
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Named connection and endpoint properties
    #[serde(default)]
    pub properties: BTreeMap<String, toml::Value>,

    /// Scenario store settings
    #[serde(default)]
    pub store: StoreConfig,

    /// Scenario runner settings
    #[serde(default)]
    pub runner: RunnerConfig,
}

/// Symbolic names of the properties testgrid collaborators look up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigProperty {
    DbUrl,
    DbUser,
    DbUserPass,
    JenkinsHost,
    JenkinsUserAuthKey,
    SsoLoginUrl,
    EnableSso,
    AwsRegionName,
    AwsS3BucketName,
    WumUsername,
    WumPassword,
    DeploymentTinkererEp,
    DeploymentTinkererUsername,
    DeploymentTinkererPassword,
    DeploymentTinkererRestBasePath,
    TestgridHost,
    WaitForStackDeletion,
}

impl ConfigProperty {
    pub const ALL: [ConfigProperty; 17] = [
        ConfigProperty::DbUrl,
        ConfigProperty::DbUser,
        ConfigProperty::DbUserPass,
        ConfigProperty::JenkinsHost,
        ConfigProperty::JenkinsUserAuthKey,
        ConfigProperty::SsoLoginUrl,
        ConfigProperty::EnableSso,
        ConfigProperty::AwsRegionName,
        ConfigProperty::AwsS3BucketName,
        ConfigProperty::WumUsername,
        ConfigProperty::WumPassword,
        ConfigProperty::DeploymentTinkererEp,
        ConfigProperty::DeploymentTinkererUsername,
        ConfigProperty::DeploymentTinkererPassword,
        ConfigProperty::DeploymentTinkererRestBasePath,
        ConfigProperty::TestgridHost,
        ConfigProperty::WaitForStackDeletion,
    ];

    /// Key of the property in the `[properties]` table
    pub fn key(self) -> &'static str {
        match self {
            ConfigProperty::DbUrl => "DB_URL",
            ConfigProperty::DbUser => "DB_USER",
            ConfigProperty::DbUserPass => "DB_USER_PASS",
            ConfigProperty::JenkinsHost => "JENKINS_HOST",
            ConfigProperty::JenkinsUserAuthKey => "JENKINS_USER_AUTH_KEY",
            ConfigProperty::SsoLoginUrl => "SSO_LOGIN_URL",
            ConfigProperty::EnableSso => "ENABLE_SSO",
            ConfigProperty::AwsRegionName => "AWS_REGION_NAME",
            ConfigProperty::AwsS3BucketName => "AWS_S3_BUCKET_NAME",
            ConfigProperty::WumUsername => "WUM_USERNAME",
            ConfigProperty::WumPassword => "WUM_PASSWORD",
            ConfigProperty::DeploymentTinkererEp => "DEPLOYMENT_TINKERER_EP",
            ConfigProperty::DeploymentTinkererUsername => "DEPLOYMENT_TINKERER_USERNAME",
            ConfigProperty::DeploymentTinkererPassword => "DEPLOYMENT_TINKERER_PASSWORD",
            ConfigProperty::DeploymentTinkererRestBasePath => "DEPLOYMENT_TINKERER_REST_BASE_PATH",
            ConfigProperty::TestgridHost => "TESTGRID_HOST",
            ConfigProperty::WaitForStackDeletion => "WAIT_FOR_STACK_DELETION",
        }
    }

    /// Whether the value must never be echoed back to the user
    pub fn is_secret(self) -> bool {
        matches!(
            self,
            ConfigProperty::DbUserPass
                | ConfigProperty::JenkinsUserAuthKey
                | ConfigProperty::WumPassword
                | ConfigProperty::DeploymentTinkererPassword
        )
    }
}

impl fmt::Display for ConfigProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Scenario store settings
#[derive(Debug, Deserialize, Default)]
pub struct StoreConfig {
    /// Path of the JSON scenario store (default: platform data directory)
    pub path: Option<PathBuf>,
}

/// Scenario runner settings
#[derive(Debug, Deserialize)]
pub struct RunnerConfig {
    /// How many scenarios of one plan may run at the same time
    #[serde(default = "default_max_parallel")]
    pub max_parallel_scenarios: usize,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            max_parallel_scenarios: default_max_parallel(),
        }
    }
}

fn default_max_parallel() -> usize {
    1
}

impl Config {
    /// Load configuration from the default config file
    ///
    /// Returns default configuration if file doesn't exist
    pub fn load() -> Result<Self> {
        match config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Load configuration from an explicit file, which must exist
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::FileRead {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(content).map_err(|e| Error::ConfigParse(e.to_string()))?;
        if config.runner.max_parallel_scenarios == 0 {
            return Err(Error::Config(
                "runner.max_parallel_scenarios must be at least 1".to_string(),
            ));
        }
        Ok(config)
    }

    /// Look up a property by symbolic name
    ///
    /// Blank values read as absent.
    pub fn property(&self, property: ConfigProperty) -> Option<String> {
        let value = match self.properties.get(property.key())? {
            toml::Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        if is_blank(&value) {
            None
        } else {
            Some(value)
        }
    }

    /// Whether single sign-on is turned on (`ENABLE_SSO`)
    pub fn sso_enabled(&self) -> bool {
        self.flag(ConfigProperty::EnableSso)
    }

    /// Whether provisioning should wait for stack deletion (`WAIT_FOR_STACK_DELETION`)
    pub fn wait_for_stack_deletion(&self) -> bool {
        self.flag(ConfigProperty::WaitForStackDeletion)
    }

    fn flag(&self, property: ConfigProperty) -> bool {
        self.property(property)
            .map(|v| v.trim().eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    }

    /// Resolve the scenario store path: explicit setting, then platform default
    pub fn store_path(&self) -> Option<PathBuf> {
        self.store.path.clone().or_else(store_path)
    }
}

/// Whether a string is empty or only whitespace
pub fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_empty() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.runner.max_parallel_scenarios, 1);
        assert!(config.store.path.is_none());
        assert_eq!(config.property(ConfigProperty::DbUrl), None);
        assert!(!config.sso_enabled());
    }

    #[test]
    fn test_property_lookup() {
        let config = Config::parse(
            r#"
            [properties]
            DB_URL = "jdbc:mysql://db:3306/testgrid"
            DB_USER = "   "
            ENABLE_SSO = true
            WAIT_FOR_STACK_DELETION = "TRUE"

            [store]
            path = "/var/lib/testgrid/scenarios.json"

            [runner]
            max_parallel_scenarios = 4
            "#,
        )
        .unwrap();

        assert_eq!(
            config.property(ConfigProperty::DbUrl).as_deref(),
            Some("jdbc:mysql://db:3306/testgrid")
        );
        assert_eq!(config.property(ConfigProperty::DbUser), None);
        assert!(config.sso_enabled());
        assert!(config.wait_for_stack_deletion());
        assert_eq!(config.runner.max_parallel_scenarios, 4);
        assert_eq!(
            config.store_path(),
            Some(PathBuf::from("/var/lib/testgrid/scenarios.json"))
        );
    }

    #[test]
    fn test_zero_parallelism_rejected() {
        let err = Config::parse("[runner]\nmax_parallel_scenarios = 0").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_malformed_toml_rejected() {
        assert!(matches!(
            Config::parse("[properties\nDB_URL = 1"),
            Err(Error::ConfigParse(_))
        ));
    }

    #[test]
    fn test_missing_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load_from(&dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(err, Error::FileRead { .. }));
    }

    #[test]
    fn test_property_keys_unique() {
        let mut keys: Vec<_> = ConfigProperty::ALL.iter().map(|p| p.key()).collect();
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), ConfigProperty::ALL.len());
    }
}

//! Platform configuration and data paths
//!
//! Linux: `~/.config/testgrid/` and `~/.local/share/testgrid/`
//! macOS: `~/Library/Application Support/testgrid/`
//! Windows: `%APPDATA%\testgrid\`

use std::io;
use std::path::{Path, PathBuf};

/// Application name used for platform directories
const APP_NAME: &str = "testgrid";

/// Name of the configuration file inside the config directory
pub const CONFIG_FILE: &str = "testgrid.toml";

/// Name of the JSON scenario store inside the data directory
pub const STORE_FILE: &str = "scenarios.json";

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("", "", APP_NAME)
}

/// Get the configuration directory path
pub fn config_dir() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the configuration file
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join(CONFIG_FILE))
}

/// Get the data directory path
pub fn data_dir() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.data_dir().to_path_buf())
}

/// Get the default path of the scenario store
pub fn store_path() -> Option<PathBuf> {
    data_dir().map(|dir| dir.join(STORE_FILE))
}

/// Get the path to the log directory
pub fn log_dir() -> Option<PathBuf> {
    data_dir().map(|dir| dir.join("logs"))
}

/// Create the parent directory of `path` if it is missing
pub fn ensure_parent_dir(path: &Path) -> io::Result<()> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() && !dir.exists() => std::fs::create_dir_all(dir),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_path_is_valid() {
        let path = config_path();
        assert!(path.is_some());
        assert!(path.unwrap().ends_with(CONFIG_FILE));
    }

    #[test]
    fn test_store_path_is_valid() {
        assert!(store_path().unwrap().ends_with(STORE_FILE));
    }

    #[test]
    fn test_ensure_parent_dir_creates_nested() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a").join("b").join("store.json");
        ensure_parent_dir(&file).unwrap();
        assert!(dir.path().join("a").join("b").is_dir());

        // bare file names have no parent to create
        ensure_parent_dir(Path::new("store.json")).unwrap();
    }
}

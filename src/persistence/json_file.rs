//! JSON file scenario store
//!
//! The whole store is one JSON document. Each persist reads it, applies the
//! change and replaces the file through a temporary file in the same
//! directory, so readers see either the old or the new document.
//!
//! Every access holds a lock on a sidecar `<file>.lock` next to the store:
//! shared for reads, exclusive for the read-modify-write of a persist. Two
//! processes, or two stores opened on the same path, never lose an update.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

use super::{ScenarioStore, StoreError};
use crate::scenario::TestScenario;

#[derive(Debug, Serialize, Deserialize)]
struct Document {
    next_id: u64,
    #[serde(default)]
    scenarios: Vec<TestScenario>,
}

impl Default for Document {
    fn default() -> Self {
        Self {
            next_id: 1,
            scenarios: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Access {
    Shared,
    Exclusive,
}

/// Store backed by a JSON file
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
    // serializes read-modify-write cycles within this process
    lock: Arc<Mutex<()>>,
}

impl JsonFileStore {
    /// Open a store at `path`; the file is created on first persist
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn run_blocking<T, F>(&self, access: Access, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Path) -> Result<T, StoreError> + Send + 'static,
    {
        let _guard = self.lock.lock().await;
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || with_file_lock(&path, access, f))
            .await
            .map_err(|e| StoreError::Unavailable(format!("store task failed: {}", e)))?
    }
}

fn lock_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("scenarios"));
    name.push(".lock");
    path.with_file_name(name)
}

/// Run `f` while holding the sidecar lock file, blocking until it is free
fn with_file_lock<T, F>(path: &Path, access: Access, f: F) -> Result<T, StoreError>
where
    F: FnOnce(&Path) -> Result<T, StoreError>,
{
    crate::common::paths::ensure_parent_dir(path)?;
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(lock_path(path))?;
    let mut lock = fd_lock::RwLock::new(file);

    match access {
        Access::Shared => {
            let _held = lock.read()?;
            f(path)
        }
        Access::Exclusive => {
            let _held = lock.write()?;
            f(path)
        }
    }
}

fn read_document(path: &Path) -> Result<Document, StoreError> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Document::default()),
        Err(e) => return Err(e.into()),
    };
    serde_json::from_str(&content).map_err(|e| StoreError::Corrupt {
        path: path.display().to_string(),
        error: e.to_string(),
    })
}

fn write_document(path: &Path, document: &Document) -> Result<(), StoreError> {
    crate::common::paths::ensure_parent_dir(path)?;
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };

    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    serde_json::to_writer_pretty(&mut tmp, document)?;
    tmp.write_all(b"\n")?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| StoreError::Io(e.error))?;
    Ok(())
}

fn upsert(document: &mut Document, scenario: &TestScenario) -> Result<TestScenario, StoreError> {
    let id = scenario.id.unwrap_or(document.next_id);
    let after = id.checked_add(1).ok_or(StoreError::IdExhausted(id))?;
    document.next_id = document.next_id.max(after);

    let stored = TestScenario {
        id: Some(id),
        ..scenario.clone()
    };
    match document.scenarios.iter_mut().find(|s| s.id == Some(id)) {
        Some(existing) => *existing = stored.clone(),
        None => {
            document.scenarios.push(stored.clone());
            document.scenarios.sort_by_key(|s| s.id);
        }
    }
    Ok(stored)
}

#[async_trait]
impl ScenarioStore for JsonFileStore {
    async fn persist(&self, scenario: &TestScenario) -> Result<TestScenario, StoreError> {
        let scenario = scenario.clone();
        self.run_blocking(Access::Exclusive, move |path| {
            let mut document = read_document(path)?;
            let stored = upsert(&mut document, &scenario)?;
            write_document(path, &document)?;
            Ok(stored)
        })
        .await
    }

    async fn find(&self, id: u64) -> Result<Option<TestScenario>, StoreError> {
        self.run_blocking(Access::Shared, move |path| {
            Ok(read_document(path)?
                .scenarios
                .into_iter()
                .find(|s| s.id == Some(id)))
        })
        .await
    }

    async fn list(&self) -> Result<Vec<TestScenario>, StoreError> {
        self.run_blocking(Access::Shared, |path| Ok(read_document(path)?.scenarios))
            .await
    }
}

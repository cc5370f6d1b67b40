//! Tracking storage backends
//!
//! A [`TrackingBackend`] persists ended runs. The JSON backend writes one
//! `{run_id}.json` per run; the in-memory backend backs tests.

use super::Run;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Errors from tracking storage operations
#[derive(Debug, thiserror::Error)]
pub enum TrackingStorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Run not found: {0}")]
    RunNotFound(String),
}

/// Result alias for tracking storage operations
pub type Result<T> = std::result::Result<T, TrackingStorageError>;

/// Persistence for experiment runs
pub trait TrackingBackend {
    fn save_run(&mut self, run: &Run) -> Result<()>;

    fn load_run(&self, run_id: &str) -> Result<Run>;

    fn list_runs(&self) -> Result<Vec<Run>>;
}

/// One pretty-printed JSON file per run under a directory
#[derive(Debug, Clone)]
pub struct JsonFileBackend {
    dir: PathBuf,
}

impl JsonFileBackend {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    fn run_path(&self, run_id: &str) -> PathBuf {
        self.dir.join(format!("{run_id}.json"))
    }
}

impl TrackingBackend for JsonFileBackend {
    fn save_run(&mut self, run: &Run) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let json = serde_json::to_string_pretty(run)?;
        fs::write(self.run_path(&run.run_id), json)?;
        Ok(())
    }

    fn load_run(&self, run_id: &str) -> Result<Run> {
        let path = self.run_path(run_id);
        if !path.exists() {
            return Err(TrackingStorageError::RunNotFound(run_id.to_string()));
        }
        let json = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    fn list_runs(&self) -> Result<Vec<Run>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }
        let mut runs = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) == Some("json") {
                let json = fs::read_to_string(&path)?;
                runs.push(serde_json::from_str(&json)?);
            }
        }
        Ok(runs)
    }
}

/// In-memory backend for tests; no persistence
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    runs: HashMap<String, Run>,
}

impl InMemoryBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl TrackingBackend for InMemoryBackend {
    fn save_run(&mut self, run: &Run) -> Result<()> {
        self.runs.insert(run.run_id.clone(), run.clone());
        Ok(())
    }

    fn load_run(&self, run_id: &str) -> Result<Run> {
        self.runs
            .get(run_id)
            .cloned()
            .ok_or_else(|| TrackingStorageError::RunNotFound(run_id.to_string()))
    }

    fn list_runs(&self) -> Result<Vec<Run>> {
        Ok(self.runs.values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracking::{ExperimentTracker, RunStatus};

    #[test]
    fn json_backend_writes_one_file_per_run() {
        let dir = tempfile::tempdir().unwrap();
        let mut tracker = ExperimentTracker::new("exp", JsonFileBackend::new(dir.path()));

        let a = tracker.start_run(None);
        let b = tracker.start_run(None);
        tracker.end_run(&a, RunStatus::Completed).unwrap();
        tracker.end_run(&b, RunStatus::Failed).unwrap();

        assert!(dir.path().join(format!("{a}.json")).exists());
        assert!(dir.path().join(format!("{b}.json")).exists());
    }

    #[test]
    fn json_backend_missing_run_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let backend = JsonFileBackend::new(dir.path());
        assert!(matches!(
            backend.load_run("run-does-not-exist"),
            Err(TrackingStorageError::RunNotFound(_))
        ));
    }
}

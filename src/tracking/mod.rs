//! Experiment tracking
//!
//! Every training run records its parameters, final metrics, and artifact
//! paths under a named experiment, through the pluggable
//! [`TrackingBackend`](storage::TrackingBackend) trait. Runs are held in
//! memory while active and persisted when ended, so a crashed process never
//! leaves a half-written run marked successful.

pub mod storage;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use storage::{TrackingBackend, TrackingStorageError};

/// Status of a tracking run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    /// Run is actively recording
    Active,
    /// Run completed successfully
    Completed,
    /// Run failed
    Failed,
}

/// A single training run under an experiment.
///
/// Metrics here are final held-out values, one number per name. Curves and
/// other bulky evidence go to artifact files instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Run {
    pub run_id: String,
    pub run_name: Option<String>,
    pub experiment_name: String,
    pub status: RunStatus,
    /// Hyperparameters, string-encoded
    pub params: BTreeMap<String, String>,
    /// Final metric values
    pub metrics: BTreeMap<String, f64>,
    /// Paths of files logged against this run
    pub artifacts: Vec<String>,
    pub tags: BTreeMap<String, String>,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl Run {
    fn new(run_id: String, run_name: Option<String>, experiment_name: String) -> Self {
        Self {
            run_id,
            run_name,
            experiment_name,
            status: RunStatus::Active,
            params: BTreeMap::new(),
            metrics: BTreeMap::new(),
            artifacts: Vec::new(),
            tags: BTreeMap::new(),
            started_at: Utc::now(),
            ended_at: None,
        }
    }
}

/// Errors from experiment tracking operations
#[derive(Debug, thiserror::Error)]
pub enum TrackingError {
    #[error("Run not found: {0}")]
    RunNotFound(String),

    #[error("Run is not active: {0}")]
    RunNotActive(String),

    #[error("Storage error: {0}")]
    Storage(#[from] TrackingStorageError),
}

/// Result alias for tracking operations
pub type Result<T> = std::result::Result<T, TrackingError>;

/// Manages runs under a single experiment name, persisting them through a
/// pluggable [`TrackingBackend`]
#[derive(Debug)]
pub struct ExperimentTracker<B: TrackingBackend> {
    experiment_name: String,
    tags: BTreeMap<String, String>,
    backend: B,
    /// Active runs held in memory until ended
    active_runs: BTreeMap<String, Run>,
}

impl<B: TrackingBackend> ExperimentTracker<B> {
    pub fn new(experiment_name: impl Into<String>, backend: B) -> Self {
        Self {
            experiment_name: experiment_name.into(),
            tags: BTreeMap::new(),
            backend,
            active_runs: BTreeMap::new(),
        }
    }

    /// Add an experiment-level tag inherited by every new run
    pub fn add_tag(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.tags.insert(key.into(), value.into());
    }

    #[must_use]
    pub fn experiment_name(&self) -> &str {
        &self.experiment_name
    }

    /// Start a new run and return its id
    pub fn start_run(&mut self, run_name: Option<&str>) -> String {
        let run_id = format!("run-{:016x}", rand::thread_rng().gen::<u64>());

        let mut run = Run::new(
            run_id.clone(),
            run_name.map(String::from),
            self.experiment_name.clone(),
        );
        run.tags.extend(self.tags.clone());

        self.active_runs.insert(run_id.clone(), run);
        run_id
    }

    /// End a run with the given status and persist it
    pub fn end_run(&mut self, run_id: &str, status: RunStatus) -> Result<()> {
        let mut run = self
            .active_runs
            .remove(run_id)
            .ok_or_else(|| TrackingError::RunNotFound(run_id.to_string()))?;

        run.status = status;
        run.ended_at = Some(Utc::now());

        self.backend.save_run(&run)?;
        Ok(())
    }

    /// Log one hyperparameter
    pub fn log_param(&mut self, run_id: &str, key: &str, value: impl ToString) -> Result<()> {
        let run = self.active_mut(run_id)?;
        run.params.insert(key.to_string(), value.to_string());
        Ok(())
    }

    /// Log a final metric value
    pub fn log_metric(&mut self, run_id: &str, key: &str, value: f64) -> Result<()> {
        let run = self.active_mut(run_id)?;
        run.metrics.insert(key.to_string(), value);
        Ok(())
    }

    /// Log an artifact path
    pub fn log_artifact(&mut self, run_id: &str, path: impl Into<String>) -> Result<()> {
        let run = self.active_mut(run_id)?;
        run.artifacts.push(path.into());
        Ok(())
    }

    /// Fetch a run, checking active runs first and the backend second
    pub fn get_run(&self, run_id: &str) -> Result<Run> {
        if let Some(run) = self.active_runs.get(run_id) {
            return Ok(run.clone());
        }
        self.backend
            .load_run(run_id)
            .map_err(|_| TrackingError::RunNotFound(run_id.to_string()))
    }

    /// All runs of this experiment, active and persisted, newest first
    pub fn list_runs(&self) -> Result<Vec<Run>> {
        let mut runs: Vec<Run> = self.active_runs.values().cloned().collect();
        for run in self.backend.list_runs()? {
            if run.experiment_name == self.experiment_name
                && !self.active_runs.contains_key(&run.run_id)
            {
                runs.push(run);
            }
        }
        runs.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        Ok(runs)
    }

    fn active_mut(&mut self, run_id: &str) -> Result<&mut Run> {
        self.active_runs
            .get_mut(run_id)
            .ok_or_else(|| TrackingError::RunNotActive(run_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storage::{InMemoryBackend, JsonFileBackend};

    #[test]
    fn full_run_lifecycle() {
        let mut tracker = ExperimentTracker::new("hospital-readmission", InMemoryBackend::new());
        tracker.add_tag("dataset", "uci-diabetes");

        let run_id = tracker.start_run(Some("baseline"));
        tracker.log_param(&run_id, "n_trees", 400).unwrap();
        tracker.log_param(&run_id, "learning_rate", 0.05).unwrap();
        tracker.log_metric(&run_id, "roc_auc", 0.71).unwrap();
        tracker.log_artifact(&run_id, "artifacts/roc.svg").unwrap();
        tracker.end_run(&run_id, RunStatus::Completed).unwrap();

        let run = tracker.get_run(&run_id).unwrap();
        assert_eq!(run.status, RunStatus::Completed);
        assert_eq!(run.params.get("n_trees").map(String::as_str), Some("400"));
        assert_eq!(run.metrics.get("roc_auc"), Some(&0.71));
        assert_eq!(run.tags.get("dataset").map(String::as_str), Some("uci-diabetes"));
        assert!(run.ended_at.is_some());
    }

    #[test]
    fn ended_runs_reject_further_logging() {
        let mut tracker = ExperimentTracker::new("exp", InMemoryBackend::new());
        let run_id = tracker.start_run(None);
        tracker.end_run(&run_id, RunStatus::Failed).unwrap();

        assert!(matches!(
            tracker.log_metric(&run_id, "roc_auc", 0.5),
            Err(TrackingError::RunNotActive(_))
        ));
        assert!(matches!(
            tracker.end_run(&run_id, RunStatus::Completed),
            Err(TrackingError::RunNotFound(_))
        ));
    }

    #[test]
    fn run_ids_are_unique() {
        let mut tracker = ExperimentTracker::new("exp", InMemoryBackend::new());
        let a = tracker.start_run(None);
        let b = tracker.start_run(None);
        assert_ne!(a, b);
    }

    #[test]
    fn list_runs_filters_by_experiment() {
        let dir = tempfile::tempdir().unwrap();
        let mut first = ExperimentTracker::new("exp-a", JsonFileBackend::new(dir.path()));
        let run_id = first.start_run(None);
        first.end_run(&run_id, RunStatus::Completed).unwrap();

        let other = ExperimentTracker::new("exp-b", JsonFileBackend::new(dir.path()));
        assert!(other.list_runs().unwrap().is_empty());

        let same = ExperimentTracker::new("exp-a", JsonFileBackend::new(dir.path()));
        assert_eq!(same.list_runs().unwrap().len(), 1);
    }

    #[test]
    fn persisted_runs_survive_a_new_tracker() {
        let dir = tempfile::tempdir().unwrap();
        let run_id = {
            let mut tracker =
                ExperimentTracker::new("exp", JsonFileBackend::new(dir.path()));
            let run_id = tracker.start_run(Some("first"));
            tracker.log_metric(&run_id, "pr_auc", 0.42).unwrap();
            tracker.end_run(&run_id, RunStatus::Completed).unwrap();
            run_id
        };

        let tracker = ExperimentTracker::new("exp", JsonFileBackend::new(dir.path()));
        let run = tracker.get_run(&run_id).unwrap();
        assert_eq!(run.run_name.as_deref(), Some("first"));
        assert_eq!(run.metrics.get("pr_auc"), Some(&0.42));
    }
}

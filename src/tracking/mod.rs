//! Experiment tracking
//!
//! A tracking store groups runs under named experiments; each run records
//! string parameters, numeric metrics and serialized models. Two stores are
//! provided:
//! - [`FileStore`]: MLflow-style directory tree on local disk
//! - [`MemoryStore`]: in-process, for tests and embedding
//!
//! Runs are normally driven through [`ActiveRun`], which always ends the run
//! it started: `finish()` commits it as finished, dropping it unfinished
//! marks it failed.

use std::collections::BTreeMap;
use std::fmt::Display;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{PipelineError, Result};
use crate::ml::ModelArtifact;

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

/// Lifecycle state of a run. Numeric codes follow MLflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    Running,
    Finished,
    Failed,
    Killed,
}

impl RunStatus {
    pub fn code(&self) -> i32 {
        match self {
            RunStatus::Running => 1,
            RunStatus::Finished => 3,
            RunStatus::Failed => 4,
            RunStatus::Killed => 5,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            1 => Some(RunStatus::Running),
            3 => Some(RunStatus::Finished),
            4 => Some(RunStatus::Failed),
            5 => Some(RunStatus::Killed),
            _ => None,
        }
    }
}

/// Named collection of runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Experiment {
    pub experiment_id: String,
    pub name: String,
}

/// Everything recorded for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub run_id: String,
    pub run_name: String,
    pub experiment_id: String,
    pub status: RunStatus,
    /// Milliseconds since the Unix epoch
    pub start_time: i64,
    pub end_time: Option<i64>,
    pub params: BTreeMap<String, String>,
    /// Latest value per metric key
    pub metrics: BTreeMap<String, f64>,
    /// Logged model artifact paths
    pub models: Vec<String>,
}

/// Storage backend for experiments and runs.
pub trait TrackingStore {
    /// Id of the experiment called `name`, creating it if needed.
    fn get_or_create_experiment(&self, name: &str) -> Result<String>;

    /// Open a new run; returns its id.
    fn start_run(&self, experiment_id: &str, run_name: &str) -> Result<String>;

    fn log_param(&self, run_id: &str, key: &str, value: &str) -> Result<()>;

    fn log_metric(&self, run_id: &str, key: &str, value: f64, step: u64) -> Result<()>;

    fn log_model(&self, run_id: &str, artifact_path: &str, model: &ModelArtifact) -> Result<()>;

    fn end_run(&self, run_id: &str, status: RunStatus) -> Result<()>;

    fn get_run(&self, run_id: &str) -> Result<RunRecord>;

    /// Runs of an experiment, oldest first.
    fn list_runs(&self, experiment_id: &str) -> Result<Vec<RunRecord>>;

    fn load_model(&self, run_id: &str, artifact_path: &str) -> Result<ModelArtifact>;
}

/// Scope of one open run.
pub struct ActiveRun<'a, S: TrackingStore + ?Sized> {
    store: &'a S,
    run_id: String,
    ended: bool,
}

impl<'a, S: TrackingStore + ?Sized> ActiveRun<'a, S> {
    pub fn start(store: &'a S, experiment_id: &str, run_name: &str) -> Result<Self> {
        let run_id = store.start_run(experiment_id, run_name)?;
        Ok(Self {
            store,
            run_id,
            ended: false,
        })
    }

    pub fn id(&self) -> &str {
        &self.run_id
    }

    pub fn log_param(&self, key: &str, value: impl Display) -> Result<()> {
        self.store.log_param(&self.run_id, key, &value.to_string())
    }

    pub fn log_metric(&self, key: &str, value: f64) -> Result<()> {
        self.store.log_metric(&self.run_id, key, value, 0)
    }

    pub fn log_model(&self, artifact_path: &str, model: &ModelArtifact) -> Result<()> {
        self.store.log_model(&self.run_id, artifact_path, model)
    }

    /// Commit the run as finished.
    pub fn finish(mut self) -> Result<()> {
        self.ended = true;
        self.store.end_run(&self.run_id, RunStatus::Finished)
    }
}

impl<S: TrackingStore + ?Sized> Drop for ActiveRun<'_, S> {
    fn drop(&mut self) {
        if self.ended {
            return;
        }
        warn!(run_id = %self.run_id, "run dropped before finishing, marking failed");
        if let Err(e) = self.store.end_run(&self.run_id, RunStatus::Failed) {
            warn!(run_id = %self.run_id, error = %e, "failed to end run");
        }
    }
}

/// Param/metric/artifact keys become file names, so path tricks are refused.
pub(crate) fn validate_key(key: &str) -> Result<()> {
    let ok = !key.is_empty()
        && !key.starts_with('/')
        && key.split('/').all(|part| !part.is_empty() && part != "." && part != "..")
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | ' ' | '/'));
    if ok {
        Ok(())
    } else {
        Err(PipelineError::Tracking(format!("invalid key '{}'", key)))
    }
}

pub(crate) fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes_round_trip() {
        for status in [
            RunStatus::Running,
            RunStatus::Finished,
            RunStatus::Failed,
            RunStatus::Killed,
        ] {
            assert_eq!(RunStatus::from_code(status.code()), Some(status));
        }
        assert_eq!(RunStatus::from_code(2), None);
    }

    #[test]
    fn test_validate_key() {
        assert!(validate_key("n_estimators").is_ok());
        assert!(validate_key("model").is_ok());
        assert!(validate_key("nested/model.v1").is_ok());

        assert!(validate_key("").is_err());
        assert!(validate_key("../escape").is_err());
        assert!(validate_key("/abs").is_err());
        assert!(validate_key("a//b").is_err());
        assert!(validate_key("semi;colon").is_err());
    }

    #[test]
    fn test_active_run_finish_and_drop() {
        let store = MemoryStore::new();
        let exp = store.get_or_create_experiment("exp").unwrap();

        let run = ActiveRun::start(&store, &exp, "ok").unwrap();
        let ok_id = run.id().to_string();
        run.log_param("max_depth", 4).unwrap();
        run.finish().unwrap();

        let failed_id = {
            let run = ActiveRun::start(&store, &exp, "boom").unwrap();
            run.id().to_string()
        };

        assert_eq!(store.get_run(&ok_id).unwrap().status, RunStatus::Finished);
        let failed = store.get_run(&failed_id).unwrap();
        assert_eq!(failed.status, RunStatus::Failed);
        assert!(failed.end_time.is_some());
    }
}

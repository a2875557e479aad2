use std::collections::{BTreeMap, HashMap};

use parking_lot::RwLock;

use super::{now_millis, validate_key, Experiment, RunRecord, RunStatus, TrackingStore};
use crate::error::{PipelineError, Result};
use crate::ml::ModelArtifact;

#[derive(Debug, Default)]
struct State {
    experiments: Vec<Experiment>,
    runs: Vec<RunRecord>,
    models: HashMap<(String, String), ModelArtifact>,
}

/// Tracking store kept entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn experiments(&self) -> Vec<Experiment> {
        self.state.read().experiments.clone()
    }

    /// Every run across all experiments, oldest first.
    pub fn runs(&self) -> Vec<RunRecord> {
        self.state.read().runs.clone()
    }
}

fn open_run<'s>(state: &'s mut State, run_id: &str) -> Result<&'s mut RunRecord> {
    let run = state
        .runs
        .iter_mut()
        .find(|r| r.run_id == run_id)
        .ok_or_else(|| PipelineError::Tracking(format!("run not found: {}", run_id)))?;
    if run.status != RunStatus::Running {
        return Err(PipelineError::Tracking(format!(
            "run {} is not active ({:?})",
            run_id, run.status
        )));
    }
    Ok(run)
}

impl TrackingStore for MemoryStore {
    fn get_or_create_experiment(&self, name: &str) -> Result<String> {
        let mut state = self.state.write();
        if let Some(exp) = state.experiments.iter().find(|e| e.name == name) {
            return Ok(exp.experiment_id.clone());
        }
        let experiment_id = (state.experiments.len() + 1).to_string();
        state.experiments.push(Experiment {
            experiment_id: experiment_id.clone(),
            name: name.to_string(),
        });
        Ok(experiment_id)
    }

    fn start_run(&self, experiment_id: &str, run_name: &str) -> Result<String> {
        let mut state = self.state.write();
        if !state
            .experiments
            .iter()
            .any(|e| e.experiment_id == experiment_id)
        {
            return Err(PipelineError::Tracking(format!(
                "experiment not found: {}",
                experiment_id
            )));
        }

        let run_id = uuid::Uuid::new_v4().simple().to_string();
        state.runs.push(RunRecord {
            run_id: run_id.clone(),
            run_name: run_name.to_string(),
            experiment_id: experiment_id.to_string(),
            status: RunStatus::Running,
            start_time: now_millis(),
            end_time: None,
            params: BTreeMap::new(),
            metrics: BTreeMap::new(),
            models: Vec::new(),
        });
        Ok(run_id)
    }

    fn log_param(&self, run_id: &str, key: &str, value: &str) -> Result<()> {
        validate_key(key)?;
        let mut state = self.state.write();
        let run = open_run(&mut state, run_id)?;
        if let Some(existing) = run.params.get(key) {
            if existing != value {
                return Err(PipelineError::Tracking(format!(
                    "param '{}' already logged as '{}'",
                    key, existing
                )));
            }
        }
        run.params.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn log_metric(&self, run_id: &str, key: &str, value: f64, _step: u64) -> Result<()> {
        validate_key(key)?;
        let mut state = self.state.write();
        open_run(&mut state, run_id)?
            .metrics
            .insert(key.to_string(), value);
        Ok(())
    }

    fn log_model(&self, run_id: &str, artifact_path: &str, model: &ModelArtifact) -> Result<()> {
        validate_key(artifact_path)?;
        let mut state = self.state.write();
        let run = open_run(&mut state, run_id)?;
        if !run.models.iter().any(|m| m == artifact_path) {
            run.models.push(artifact_path.to_string());
        }
        state
            .models
            .insert((run_id.to_string(), artifact_path.to_string()), model.clone());
        Ok(())
    }

    fn end_run(&self, run_id: &str, status: RunStatus) -> Result<()> {
        let mut state = self.state.write();
        let run = open_run(&mut state, run_id)?;
        run.status = status;
        run.end_time = Some(now_millis());
        Ok(())
    }

    fn get_run(&self, run_id: &str) -> Result<RunRecord> {
        self.state
            .read()
            .runs
            .iter()
            .find(|r| r.run_id == run_id)
            .cloned()
            .ok_or_else(|| PipelineError::Tracking(format!("run not found: {}", run_id)))
    }

    fn list_runs(&self, experiment_id: &str) -> Result<Vec<RunRecord>> {
        Ok(self
            .state
            .read()
            .runs
            .iter()
            .filter(|r| r.experiment_id == experiment_id)
            .cloned()
            .collect())
    }

    fn load_model(&self, run_id: &str, artifact_path: &str) -> Result<ModelArtifact> {
        self.state
            .read()
            .models
            .get(&(run_id.to_string(), artifact_path.to_string()))
            .cloned()
            .ok_or_else(|| {
                PipelineError::Tracking(format!(
                    "no model '{}' in run {}",
                    artifact_path, run_id
                ))
            })
    }
}

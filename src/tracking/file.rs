//! Local tracking store using the MLflow file-store layout.
//!
//! ```text
//! <root>/<experiment_id>/meta.yaml
//! <root>/<experiment_id>/<run_id>/meta.yaml
//! <root>/<experiment_id>/<run_id>/params/<key>
//! <root>/<experiment_id>/<run_id>/metrics/<key>       "<ts_ms> <value> <step>" per line
//! <root>/<experiment_id>/<run_id>/tags/mlflow.runName
//! <root>/<experiment_id>/<run_id>/artifacts/<path>/MLmodel
//! <root>/<experiment_id>/<run_id>/artifacts/<path>/model.bin
//! ```
//!
//! Experiment ids are positive integers allocated in creation order; run ids
//! are 32-character hex UUIDs.

use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{now_millis, validate_key, RunRecord, RunStatus, TrackingStore};
use crate::error::{PipelineError, Result};
use crate::ml::{ModelArtifact, ModelMetadata};

const META_FILE: &str = "meta.yaml";
const MLMODEL_FILE: &str = "MLmodel";
const MODEL_BIN: &str = "model.bin";
const RUN_NAME_TAG: &str = "mlflow.runName";
const ACTIVE: &str = "active";

#[derive(Debug, Serialize, Deserialize)]
struct ExperimentMeta {
    experiment_id: String,
    name: String,
    artifact_location: String,
    lifecycle_stage: String,
    creation_time: i64,
}

#[derive(Debug, Serialize, Deserialize)]
struct RunMeta {
    run_id: String,
    run_name: String,
    experiment_id: String,
    status: i32,
    start_time: i64,
    end_time: Option<i64>,
    lifecycle_stage: String,
    artifact_uri: String,
    /// Creation order within the experiment; wall-clock millis can tie
    #[serde(default)]
    seq: u64,
}

#[derive(Debug, Serialize, Deserialize)]
struct FlavorConf {
    model_file: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct MlModel {
    artifact_path: String,
    run_id: String,
    utc_time_created: String,
    flavors: BTreeMap<String, FlavorConf>,
    metadata: ModelMetadata,
}

/// Tracking store rooted at a local directory (default `mlruns`).
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        info!(root = %root.display(), "file tracking store ready");
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn experiment_dirs(&self) -> Result<Vec<(u64, PathBuf)>> {
        let mut dirs = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            let path = entry.path();
            let id = entry.file_name().to_str().and_then(|n| n.parse::<u64>().ok());
            if let Some(id) = id {
                if path.join(META_FILE).is_file() {
                    dirs.push((id, path));
                }
            }
        }
        dirs.sort_by_key(|(id, _)| *id);
        Ok(dirs)
    }

    fn run_dir(&self, run_id: &str) -> Result<PathBuf> {
        validate_key(run_id)?;
        for (_, exp_dir) in self.experiment_dirs()? {
            let candidate = exp_dir.join(run_id);
            if candidate.join(META_FILE).is_file() {
                return Ok(candidate);
            }
        }
        Err(PipelineError::Tracking(format!("run not found: {}", run_id)))
    }

    /// Run directory of a run that is still RUNNING.
    fn active_run_dir(&self, run_id: &str) -> Result<(PathBuf, RunMeta)> {
        let dir = self.run_dir(run_id)?;
        let meta: RunMeta = read_yaml(&dir.join(META_FILE))?;
        if meta.status != RunStatus::Running.code() {
            return Err(PipelineError::Tracking(format!(
                "run {} is not active (status {})",
                run_id, meta.status
            )));
        }
        Ok((dir, meta))
    }

    fn read_run(&self, dir: &Path) -> Result<RunRecord> {
        let meta: RunMeta = read_yaml(&dir.join(META_FILE))?;
        let status = RunStatus::from_code(meta.status).ok_or_else(|| {
            PipelineError::Tracking(format!("unknown run status {}", meta.status))
        })?;

        let mut params = BTreeMap::new();
        for (key, path) in list_files(&dir.join("params"))? {
            params.insert(key, fs::read_to_string(path)?);
        }

        let mut metrics = BTreeMap::new();
        for (key, path) in list_files(&dir.join("metrics"))? {
            if let Some(value) = last_metric_value(&fs::read_to_string(&path)?) {
                metrics.insert(key, value);
            }
        }

        let mut models = Vec::new();
        collect_models(&dir.join("artifacts"), "", &mut models)?;
        models.sort();

        Ok(RunRecord {
            run_id: meta.run_id,
            run_name: meta.run_name,
            experiment_id: meta.experiment_id,
            status,
            start_time: meta.start_time,
            end_time: meta.end_time,
            params,
            metrics,
            models,
        })
    }
}

impl TrackingStore for FileStore {
    fn get_or_create_experiment(&self, name: &str) -> Result<String> {
        let existing = self.experiment_dirs()?;
        for (_, dir) in &existing {
            let meta: ExperimentMeta = read_yaml(&dir.join(META_FILE))?;
            if meta.name == name {
                return Ok(meta.experiment_id);
            }
        }

        let next = existing.last().map(|(id, _)| id + 1).unwrap_or(1);
        let experiment_id = next.to_string();
        let dir = self.root.join(&experiment_id);
        fs::create_dir_all(&dir)?;
        write_yaml(
            &dir.join(META_FILE),
            &ExperimentMeta {
                experiment_id: experiment_id.clone(),
                name: name.to_string(),
                artifact_location: dir.display().to_string(),
                lifecycle_stage: ACTIVE.to_string(),
                creation_time: now_millis(),
            },
        )?;
        info!(experiment_id = %experiment_id, name, "experiment created");
        Ok(experiment_id)
    }

    fn start_run(&self, experiment_id: &str, run_name: &str) -> Result<String> {
        validate_key(experiment_id)?;
        let exp_dir = self.root.join(experiment_id);
        if !exp_dir.join(META_FILE).is_file() {
            return Err(PipelineError::Tracking(format!(
                "experiment not found: {}",
                experiment_id
            )));
        }

        let seq = run_metas(&exp_dir)?
            .iter()
            .map(|(meta, _)| meta.seq + 1)
            .max()
            .unwrap_or(0);
        let run_id = uuid::Uuid::new_v4().simple().to_string();
        let dir = exp_dir.join(&run_id);
        for sub in ["params", "metrics", "tags", "artifacts"] {
            fs::create_dir_all(dir.join(sub))?;
        }
        fs::write(dir.join("tags").join(RUN_NAME_TAG), run_name)?;
        write_yaml(
            &dir.join(META_FILE),
            &RunMeta {
                run_id: run_id.clone(),
                run_name: run_name.to_string(),
                experiment_id: experiment_id.to_string(),
                status: RunStatus::Running.code(),
                start_time: now_millis(),
                end_time: None,
                lifecycle_stage: ACTIVE.to_string(),
                artifact_uri: dir.join("artifacts").display().to_string(),
                seq,
            },
        )?;
        debug!(run_id = %run_id, experiment_id, "run started");
        Ok(run_id)
    }

    fn log_param(&self, run_id: &str, key: &str, value: &str) -> Result<()> {
        validate_key(key)?;
        let (dir, _) = self.active_run_dir(run_id)?;
        let path = dir.join("params").join(key);
        if path.is_file() {
            let existing = fs::read_to_string(&path)?;
            if existing != value {
                return Err(PipelineError::Tracking(format!(
                    "param '{}' already logged as '{}'",
                    key, existing
                )));
            }
            return Ok(());
        }
        ensure_parent(&path)?;
        fs::write(&path, value)?;
        Ok(())
    }

    fn log_metric(&self, run_id: &str, key: &str, value: f64, step: u64) -> Result<()> {
        validate_key(key)?;
        let (dir, _) = self.active_run_dir(run_id)?;
        let path = dir.join("metrics").join(key);
        ensure_parent(&path)?;
        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        writeln!(file, "{} {} {}", now_millis(), value, step)?;
        Ok(())
    }

    fn log_model(&self, run_id: &str, artifact_path: &str, model: &ModelArtifact) -> Result<()> {
        validate_key(artifact_path)?;
        let (dir, _) = self.active_run_dir(run_id)?;
        let model_dir = dir.join("artifacts").join(artifact_path);
        fs::create_dir_all(&model_dir)?;

        fs::write(model_dir.join(MODEL_BIN), &model.bytes)?;
        let mut flavors = BTreeMap::new();
        flavors.insert(
            model.flavor.clone(),
            FlavorConf {
                model_file: MODEL_BIN.to_string(),
            },
        );
        write_yaml(
            &model_dir.join(MLMODEL_FILE),
            &MlModel {
                artifact_path: artifact_path.to_string(),
                run_id: run_id.to_string(),
                utc_time_created: chrono::Utc::now().to_rfc3339(),
                flavors,
                metadata: model.metadata.clone(),
            },
        )?;
        debug!(run_id, artifact_path, bytes = model.bytes.len(), "model logged");
        Ok(())
    }

    fn end_run(&self, run_id: &str, status: RunStatus) -> Result<()> {
        let (dir, mut meta) = self.active_run_dir(run_id)?;
        meta.status = status.code();
        meta.end_time = Some(now_millis());
        write_yaml(&dir.join(META_FILE), &meta)?;
        debug!(run_id, ?status, "run ended");
        Ok(())
    }

    fn get_run(&self, run_id: &str) -> Result<RunRecord> {
        let dir = self.run_dir(run_id)?;
        self.read_run(&dir)
    }

    fn list_runs(&self, experiment_id: &str) -> Result<Vec<RunRecord>> {
        validate_key(experiment_id)?;
        let exp_dir = self.root.join(experiment_id);
        if !exp_dir.join(META_FILE).is_file() {
            return Err(PipelineError::Tracking(format!(
                "experiment not found: {}",
                experiment_id
            )));
        }

        let mut metas = run_metas(&exp_dir)?;
        metas.sort_by_key(|(meta, _)| (meta.seq, meta.start_time));
        metas
            .iter()
            .map(|(_, path)| self.read_run(path))
            .collect()
    }

    fn load_model(&self, run_id: &str, artifact_path: &str) -> Result<ModelArtifact> {
        validate_key(artifact_path)?;
        let model_dir = self.run_dir(run_id)?.join("artifacts").join(artifact_path);
        let mlmodel: MlModel = read_yaml(&model_dir.join(MLMODEL_FILE))?;
        let (flavor, conf) = mlmodel.flavors.into_iter().next().ok_or_else(|| {
            PipelineError::Tracking(format!("model '{}' has no flavor", artifact_path))
        })?;

        Ok(ModelArtifact {
            flavor,
            metadata: mlmodel.metadata,
            bytes: fs::read(model_dir.join(conf.model_file))?,
        })
    }
}

/// Meta and directory of every run under an experiment directory.
fn run_metas(exp_dir: &Path) -> Result<Vec<(RunMeta, PathBuf)>> {
    let mut runs = Vec::new();
    for entry in fs::read_dir(exp_dir)? {
        let path = entry?.path();
        let meta_path = path.join(META_FILE);
        if path.is_dir() && meta_path.is_file() {
            runs.push((read_yaml(&meta_path)?, path));
        }
    }
    Ok(runs)
}

fn read_yaml<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T> {
    let text = fs::read_to_string(path)?;
    Ok(serde_yaml::from_str(&text)?)
}

fn write_yaml<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    fs::write(path, serde_yaml::to_string(value)?)?;
    Ok(())
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

/// Files under `dir`, keyed by their path relative to `dir`.
fn list_files(dir: &Path) -> Result<Vec<(String, PathBuf)>> {
    fn walk(dir: &Path, prefix: &str, out: &mut Vec<(String, PathBuf)>) -> Result<()> {
        if !dir.is_dir() {
            return Ok(());
        }
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            let key = if prefix.is_empty() {
                name
            } else {
                format!("{}/{}", prefix, name)
            };
            let path = entry.path();
            if path.is_dir() {
                walk(&path, &key, out)?;
            } else {
                out.push((key, path));
            }
        }
        Ok(())
    }

    let mut out = Vec::new();
    walk(dir, "", &mut out)?;
    Ok(out)
}

fn collect_models(dir: &Path, prefix: &str, out: &mut Vec<String>) -> Result<()> {
    if !dir.is_dir() {
        return Ok(());
    }
    if dir.join(MLMODEL_FILE).is_file() {
        out.push(prefix.to_string());
        return Ok(());
    }
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.path().is_dir() {
            let name = entry.file_name().to_string_lossy().into_owned();
            let key = if prefix.is_empty() {
                name
            } else {
                format!("{}/{}", prefix, name)
            };
            collect_models(&entry.path(), &key, out)?;
        }
    }
    Ok(())
}

fn last_metric_value(history: &str) -> Option<f64> {
    history
        .lines()
        .filter(|l| !l.trim().is_empty())
        .last()
        .and_then(|line| line.split_whitespace().nth(1))
        .and_then(|v| v.parse().ok())
}

//! End-to-end run: load, split, search, plot.

use std::path::PathBuf;

use tracing::info;

use crate::config::Config;
use crate::data::{load_dataset, train_test_split};
use crate::error::{PipelineError, Result};
use crate::ml::RegressorFactory;
use crate::plots::render_diagnostics;
use crate::tracking::TrackingStore;
use crate::training::{GridSearch, SearchReport};

#[derive(Debug)]
pub struct PipelineOutcome {
    pub report: SearchReport,
    /// Index of the trial the plots were drawn from
    pub selected: usize,
    pub plots: Vec<PathBuf>,
}

pub fn run<F, S>(cfg: &Config, factory: F, store: &S) -> Result<PipelineOutcome>
where
    F: RegressorFactory,
    S: TrackingStore + ?Sized,
{
    let dataset = load_dataset(&cfg.data.path)?;
    let split = train_test_split(
        &dataset.features()?,
        &dataset.targets()?,
        cfg.split.test_fraction,
        cfg.split.seed,
    )?;

    let report = GridSearch::new(factory, store)
        .with_experiment(&cfg.tracking.experiment_name)
        .with_run_name(&cfg.tracking.run_name)
        .run(&cfg.grid, &split)?;

    let trial = report
        .select(cfg.plots.selection)
        .ok_or(PipelineError::EmptyData)?;
    info!(
        trial = trial.index,
        run_id = %trial.run_id,
        policy = ?cfg.plots.selection,
        "trial selected for diagnostics"
    );

    let plots = render_diagnostics(trial, &split.x_test, &split.y_test, &cfg.plots.output_dir)?;
    let selected = trial.index;

    Ok(PipelineOutcome {
        report,
        selected,
        plots,
    })
}

//! Brute-force grid search with one tracking run per trial.

use serde::{Deserialize, Serialize};
use tracing::info;

use super::grid::ParameterGrid;
use crate::data::{Matrix, Split};
use crate::error::Result;
use crate::ml::{Hyperparameters, RegressionMetrics, Regressor, RegressorFactory};
use crate::tracking::{ActiveRun, TrackingStore};

/// Experiment all trials are logged under.
pub const DEFAULT_EXPERIMENT: &str = "predicting_wind_solar";

/// Run name given to every trial.
pub const DEFAULT_RUN_NAME: &str = "rf";

/// Artifact path the fitted model is logged under.
pub const MODEL_ARTIFACT: &str = "model";

/// Outcome of one grid point.
#[derive(Debug, Clone)]
pub struct TrialResult {
    /// Position in grid enumeration order
    pub index: usize,
    pub params: Hyperparameters,
    pub metrics: RegressionMetrics,
    /// Predictions on the test partition, one column per target
    pub predictions: Matrix,
    pub run_id: String,
}

/// Which trial feeds the diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionPolicy {
    /// Last trial in enumeration order
    #[default]
    Last,
    /// Lowest RMSE; ties go to the earlier trial
    BestRmse,
}

/// All trials of one search, in enumeration order.
#[derive(Debug, Clone)]
pub struct SearchReport {
    pub experiment_id: String,
    pub trials: Vec<TrialResult>,
}

impl SearchReport {
    pub fn select(&self, policy: SelectionPolicy) -> Option<&TrialResult> {
        match policy {
            SelectionPolicy::Last => self.trials.last(),
            SelectionPolicy::BestRmse => self.trials.iter().reduce(|best, t| {
                if t.metrics.rmse < best.metrics.rmse {
                    t
                } else {
                    best
                }
            }),
        }
    }
}

/// Fits one model per grid point, scores it on the test partition and logs
/// it to the tracking store.
pub struct GridSearch<'a, F, S: TrackingStore + ?Sized> {
    factory: F,
    store: &'a S,
    experiment_name: String,
    run_name: String,
}

impl<'a, F: RegressorFactory, S: TrackingStore + ?Sized> GridSearch<'a, F, S> {
    pub fn new(factory: F, store: &'a S) -> Self {
        Self {
            factory,
            store,
            experiment_name: DEFAULT_EXPERIMENT.to_string(),
            run_name: DEFAULT_RUN_NAME.to_string(),
        }
    }

    pub fn with_experiment(mut self, name: impl Into<String>) -> Self {
        self.experiment_name = name.into();
        self
    }

    pub fn with_run_name(mut self, name: impl Into<String>) -> Self {
        self.run_name = name.into();
        self
    }

    /// Run every trial in grid order. The first failing trial aborts the
    /// search; its run is ended as failed.
    pub fn run(&self, grid: &ParameterGrid, split: &Split) -> Result<SearchReport> {
        let experiment_id = self.store.get_or_create_experiment(&self.experiment_name)?;
        info!(
            experiment = %self.experiment_name,
            experiment_id = %experiment_id,
            trials = grid.len(),
            "grid search started"
        );

        let trials = grid
            .points()
            .enumerate()
            .map(|(index, params)| self.run_trial(index, &experiment_id, params, split))
            .collect::<Result<Vec<_>>>()?;

        info!(experiment_id = %experiment_id, trials = trials.len(), "grid search finished");
        Ok(SearchReport {
            experiment_id,
            trials,
        })
    }

    fn run_trial(
        &self,
        index: usize,
        experiment_id: &str,
        params: Hyperparameters,
        split: &Split,
    ) -> Result<TrialResult> {
        let run = ActiveRun::start(self.store, experiment_id, &self.run_name)?;

        let model = self.factory.fit(&params, &split.x_train, &split.y_train)?;
        let predictions = model.predict(&split.x_test)?;
        let metrics = RegressionMetrics::joint(&split.y_test, &predictions)?;

        println!("{}, RMSE={:.2}", params, metrics.rmse);

        run.log_param("n_estimators", params.n_estimators)?;
        run.log_param("max_depth", params.max_depth)?;
        for (key, value) in metrics.as_pairs() {
            run.log_metric(key, value)?;
        }
        run.log_model(MODEL_ARTIFACT, &model.to_artifact()?)?;

        let run_id = run.id().to_string();
        run.finish()?;

        info!(
            trial = index,
            run_id = %run_id,
            n_estimators = params.n_estimators,
            max_depth = params.max_depth,
            rmse = metrics.rmse,
            mae = metrics.mae,
            r2 = metrics.r2,
            "trial logged"
        );

        Ok(TrialResult {
            index,
            params,
            metrics,
            predictions,
            run_id,
        })
    }
}

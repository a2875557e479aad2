//! Machine Learning Module
//!
//! Multi-output regressors mapping the four weather features to the solar
//! and wind targets, plus the metrics used to score them.
//!
//! # Architecture
//! - [`RegressorFactory`] fits a model for one set of hyperparameters
//! - [`Regressor`] predicts a full target matrix and exports itself as a
//!   [`ModelArtifact`] for the tracking store
//! - [`metrics`] scores predictions jointly across both targets

use serde::{Deserialize, Serialize};

use crate::data::Matrix;
use crate::error::Result;

pub mod baseline;
pub mod forest;
pub mod metrics;

pub use baseline::{MeanFactory, MeanRegressor};
pub use forest::{RandomForest, RandomForestFactory};
pub use metrics::RegressionMetrics;

/// ML Model Type
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ModelType {
    RandomForest,
    Mean,
}

impl ModelType {
    /// Flavor name written next to serialized artifacts.
    pub fn flavor(&self) -> &'static str {
        match self {
            ModelType::RandomForest => "smartcore_random_forest",
            ModelType::Mean => "mean_baseline",
        }
    }
}

/// The two hyperparameters searched by the grid.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Hyperparameters {
    /// Number of trees in the ensemble
    pub n_estimators: usize,
    /// Maximum depth of each tree
    pub max_depth: u16,
}

impl Hyperparameters {
    pub fn new(n_estimators: usize, max_depth: u16) -> Self {
        Self {
            n_estimators,
            max_depth,
        }
    }
}

impl std::fmt::Display for Hyperparameters {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "n_estimators={}, max_depth={}",
            self.n_estimators, self.max_depth
        )
    }
}

/// ML Model Metadata
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelMetadata {
    pub model_id: String,
    pub model_type: ModelType,
    pub trained_at: chrono::DateTime<chrono::Utc>,
    pub training_samples: usize,
    pub feature_names: Vec<String>,
    pub target_names: Vec<String>,
}

impl ModelMetadata {
    pub fn new(model_type: ModelType, x: &Matrix, y: &Matrix) -> Self {
        Self {
            model_id: format!("{}_{}", model_type.flavor(), uuid::Uuid::new_v4().simple()),
            model_type,
            trained_at: chrono::Utc::now(),
            training_samples: x.n_rows(),
            feature_names: x.columns().to_vec(),
            target_names: y.columns().to_vec(),
        }
    }
}

/// Serialized model as handed to a tracking store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelArtifact {
    pub flavor: String,
    pub metadata: ModelMetadata,
    /// bincode encoding of the fitted model
    pub bytes: Vec<u8>,
}

/// A fitted multi-output regressor.
pub trait Regressor: Send + Sync {
    /// Predict one row per input row and one column per target.
    fn predict(&self, x: &Matrix) -> Result<Matrix>;

    fn metadata(&self) -> &ModelMetadata;

    /// Serialize for logging.
    fn to_artifact(&self) -> Result<ModelArtifact>;

    fn model_type(&self) -> ModelType {
        self.metadata().model_type
    }
}

/// Fits a fresh [`Regressor`] for one grid point.
pub trait RegressorFactory {
    type Model: Regressor;

    fn fit(&self, params: &Hyperparameters, x: &Matrix, y: &Matrix) -> Result<Self::Model>;
}

/// Shared shape checks for `fit`.
pub(crate) fn check_training_shapes(x: &Matrix, y: &Matrix) -> Result<()> {
    use crate::error::PipelineError;

    if x.is_empty() || y.is_empty() || x.n_cols() == 0 || y.n_cols() == 0 {
        return Err(PipelineError::EmptyData);
    }
    if x.n_rows() != y.n_rows() {
        return Err(PipelineError::ShapeMismatch(format!(
            "Feature and target count mismatch: {} feature rows, {} target rows",
            x.n_rows(),
            y.n_rows()
        )));
    }
    Ok(())
}

/// Shared feature-layout check for `predict`.
pub(crate) fn check_feature_layout(metadata: &ModelMetadata, x: &Matrix) -> Result<()> {
    if x.columns() != metadata.feature_names.as_slice() {
        return Err(crate::error::PipelineError::ShapeMismatch(format!(
            "model trained on {:?}, got {:?}",
            metadata.feature_names,
            x.columns()
        )));
    }
    Ok(())
}

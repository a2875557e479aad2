//! SmartCore RandomForest wrapper
//!
//! SmartCore's `RandomForestRegressor` predicts a single column, so a
//! multi-output forest is one SmartCore forest per target column, all fit
//! with the same parameters on the same feature matrix. Predictions are
//! stacked column-wise in target order.

use serde::{Deserialize, Serialize};
use smartcore::ensemble::random_forest_regressor::{
    RandomForestRegressor, RandomForestRegressorParameters,
};
use smartcore::linalg::basic::matrix::DenseMatrix;
use tracing::debug;

use super::{
    check_feature_layout, check_training_shapes, Hyperparameters, ModelArtifact, ModelMetadata,
    ModelType, Regressor, RegressorFactory,
};
use crate::data::Matrix;
use crate::error::{PipelineError, Result};

type Forest = RandomForestRegressor<f64, f64, DenseMatrix<f64>, Vec<f64>>;

/// Multi-output random forest regressor.
#[derive(Debug, Serialize, Deserialize)]
pub struct RandomForest {
    pub metadata: ModelMetadata,
    pub params: Hyperparameters,
    pub seed: u64,
    forests: Vec<Forest>,
}

impl RandomForest {
    /// SmartCore parameters for one grid point; everything not searched stays
    /// at the library default.
    pub fn parameters(params: &Hyperparameters, seed: u64) -> RandomForestRegressorParameters {
        RandomForestRegressorParameters {
            n_trees: params.n_estimators,
            max_depth: Some(params.max_depth),
            seed,
            ..Default::default()
        }
    }

    /// Fit one forest per column of `y`.
    pub fn fit(x: &Matrix, y: &Matrix, params: &Hyperparameters, seed: u64) -> Result<Self> {
        check_training_shapes(x, y)?;
        if params.n_estimators == 0 || params.max_depth == 0 {
            return Err(PipelineError::Model(format!(
                "invalid forest hyperparameters: {}",
                params
            )));
        }

        let x_matrix = dense(x);
        let forests = (0..y.n_cols())
            .map(|j| {
                let target = y.column_at(j);
                Forest::fit(&x_matrix, &target, Self::parameters(params, seed)).map_err(|e| {
                    PipelineError::Model(format!(
                        "RandomForest training failed for '{}': {:?}",
                        y.columns()[j],
                        e
                    ))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        debug!(%params, targets = forests.len(), rows = x.n_rows(), "forest fitted");

        Ok(Self {
            metadata: ModelMetadata::new(ModelType::RandomForest, x, y),
            params: *params,
            seed,
            forests,
        })
    }

    /// Restore a forest logged with [`Regressor::to_artifact`].
    pub fn from_artifact(artifact: &ModelArtifact) -> Result<Self> {
        if artifact.flavor != ModelType::RandomForest.flavor() {
            return Err(PipelineError::Serialization(format!(
                "expected flavor '{}', got '{}'",
                ModelType::RandomForest.flavor(),
                artifact.flavor
            )));
        }
        Ok(bincode::deserialize(&artifact.bytes)?)
    }
}

impl Regressor for RandomForest {
    fn predict(&self, x: &Matrix) -> Result<Matrix> {
        check_feature_layout(&self.metadata, x)?;
        if x.is_empty() {
            return Err(PipelineError::EmptyData);
        }

        let x_matrix = dense(x);
        let columns = self
            .forests
            .iter()
            .zip(&self.metadata.target_names)
            .map(|(forest, name)| {
                let values = forest
                    .predict(&x_matrix)
                    .map_err(|e| PipelineError::Model(format!("Prediction failed: {:?}", e)))?;
                Ok((name.clone(), values))
            })
            .collect::<Result<Vec<_>>>()?;

        Matrix::from_columns(columns)
    }

    fn metadata(&self) -> &ModelMetadata {
        &self.metadata
    }

    fn to_artifact(&self) -> Result<ModelArtifact> {
        Ok(ModelArtifact {
            flavor: ModelType::RandomForest.flavor().to_string(),
            metadata: self.metadata.clone(),
            bytes: bincode::serialize(self)?,
        })
    }
}

/// Fits [`RandomForest`]s with a fixed seed.
#[derive(Debug, Clone, Copy)]
pub struct RandomForestFactory {
    pub seed: u64,
}

impl RandomForestFactory {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }
}

impl RegressorFactory for RandomForestFactory {
    type Model = RandomForest;

    fn fit(&self, params: &Hyperparameters, x: &Matrix, y: &Matrix) -> Result<RandomForest> {
        RandomForest::fit(x, y, params, self.seed)
    }
}

fn dense(x: &Matrix) -> DenseMatrix<f64> {
    DenseMatrix::new(x.n_rows(), x.n_cols(), x.as_slice().to_vec(), false)
}

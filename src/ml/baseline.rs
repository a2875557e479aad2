//! Mean baseline: predicts each target's training mean for every row.
//!
//! Useful as a floor when reading grid-search metrics, and cheap enough to
//! drive the search/tracking machinery in tests.

use serde::{Deserialize, Serialize};

use super::{
    check_feature_layout, check_training_shapes, Hyperparameters, ModelArtifact, ModelMetadata,
    ModelType, Regressor, RegressorFactory,
};
use crate::data::Matrix;
use crate::error::{PipelineError, Result};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MeanRegressor {
    pub metadata: ModelMetadata,
    pub means: Vec<f64>,
}

impl MeanRegressor {
    pub fn fit(x: &Matrix, y: &Matrix) -> Result<Self> {
        check_training_shapes(x, y)?;
        let n = y.n_rows() as f64;
        let means = (0..y.n_cols())
            .map(|j| y.column_at(j).iter().sum::<f64>() / n)
            .collect();

        Ok(Self {
            metadata: ModelMetadata::new(ModelType::Mean, x, y),
            means,
        })
    }

    pub fn from_artifact(artifact: &ModelArtifact) -> Result<Self> {
        if artifact.flavor != ModelType::Mean.flavor() {
            return Err(PipelineError::Serialization(format!(
                "expected flavor '{}', got '{}'",
                ModelType::Mean.flavor(),
                artifact.flavor
            )));
        }
        Ok(bincode::deserialize(&artifact.bytes)?)
    }
}

impl Regressor for MeanRegressor {
    fn predict(&self, x: &Matrix) -> Result<Matrix> {
        check_feature_layout(&self.metadata, x)?;
        let rows = vec![self.means.clone(); x.n_rows()];
        Matrix::from_rows(self.metadata.target_names.clone(), &rows)
    }

    fn metadata(&self) -> &ModelMetadata {
        &self.metadata
    }

    fn to_artifact(&self) -> Result<ModelArtifact> {
        Ok(ModelArtifact {
            flavor: ModelType::Mean.flavor().to_string(),
            metadata: self.metadata.clone(),
            bytes: bincode::serialize(self)?,
        })
    }
}

/// Ignores the hyperparameters; every grid point gets the same baseline.
#[derive(Debug, Clone, Copy, Default)]
pub struct MeanFactory;

impl RegressorFactory for MeanFactory {
    type Model = MeanRegressor;

    fn fit(&self, _params: &Hyperparameters, x: &Matrix, y: &Matrix) -> Result<MeanRegressor> {
        MeanRegressor::fit(x, y)
    }
}

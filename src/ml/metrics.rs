//! Regression metrics for multi-output predictions.
//!
//! All three metrics are computed jointly across the target columns rather
//! than reported per target: RMSE and MAE average over every cell, R² is the
//! uniform average of the per-column scores.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::data::Matrix;
use crate::error::{PipelineError, Result};

/// Joint regression metrics for one trial.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegressionMetrics {
    /// Root Mean Square Error
    pub rmse: f64,
    /// Mean Absolute Error
    pub mae: f64,
    /// R² (coefficient of determination)
    pub r2: f64,
}

impl RegressionMetrics {
    /// Score `predicted` against `actual`; both must have the same shape.
    pub fn joint(actual: &Matrix, predicted: &Matrix) -> Result<Self> {
        if actual.n_rows() != predicted.n_rows() || actual.n_cols() != predicted.n_cols() {
            return Err(PipelineError::ShapeMismatch(format!(
                "actual is {}x{}, predicted is {}x{}",
                actual.n_rows(),
                actual.n_cols(),
                predicted.n_rows(),
                predicted.n_cols()
            )));
        }
        if actual.is_empty() || actual.n_cols() == 0 {
            return Err(PipelineError::EmptyData);
        }

        let n = actual.as_slice().len() as f64;
        let (sq, abs) = actual
            .as_slice()
            .iter()
            .zip(predicted.as_slice())
            .fold((0.0, 0.0), |(sq, abs), (a, p)| {
                let e = a - p;
                (sq + e * e, abs + e.abs())
            });

        let r2 = (0..actual.n_cols())
            .map(|j| r2_score(&actual.column_at(j), &predicted.column_at(j)))
            .sum::<f64>()
            / actual.n_cols() as f64;

        Ok(Self {
            rmse: (sq / n).sqrt(),
            mae: abs / n,
            r2,
        })
    }

    /// Metric name/value pairs in logging order.
    pub fn as_pairs(&self) -> [(&'static str, f64); 3] {
        [("rmse", self.rmse), ("mae", self.mae), ("r2", self.r2)]
    }
}

impl fmt::Display for RegressionMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "RMSE={:.3}, MAE={:.3}, R²={:.3}",
            self.rmse, self.mae, self.r2
        )
    }
}

/// Coefficient of determination for one column.
///
/// A constant `actual` column scores 1.0 when matched exactly and 0.0
/// otherwise.
pub fn r2_score(actual: &[f64], predicted: &[f64]) -> f64 {
    let n = actual.len() as f64;
    let mean = actual.iter().sum::<f64>() / n;
    let ss_tot: f64 = actual.iter().map(|a| (a - mean).powi(2)).sum();
    let ss_res: f64 = actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p).powi(2))
        .sum();

    if ss_tot == 0.0 {
        if ss_res == 0.0 {
            1.0
        } else {
            0.0
        }
    } else {
        1.0 - ss_res / ss_tot
    }
}

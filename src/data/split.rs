//! Seeded random train/test partitioning.

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use tracing::info;

use super::Matrix;
use crate::error::{PipelineError, Result};

/// Train/test partitions with row alignment preserved between X and y.
#[derive(Debug, Clone)]
pub struct Split {
    pub x_train: Matrix,
    pub x_test: Matrix,
    pub y_train: Matrix,
    pub y_test: Matrix,
    /// Original row positions of the training rows, in partition order.
    pub train_rows: Vec<usize>,
    /// Original row positions of the test rows, in partition order.
    pub test_rows: Vec<usize>,
}

/// Shuffle row positions with a `StdRng` seeded from `seed` and cut off the
/// first `ceil(test_fraction * n)` of them as the test set.
///
/// The same permutation is applied to `x` and `y`, so the split is identical
/// across runs for the same seed and row count.
pub fn train_test_split(x: &Matrix, y: &Matrix, test_fraction: f64, seed: u64) -> Result<Split> {
    if x.n_rows() != y.n_rows() {
        return Err(PipelineError::ShapeMismatch(format!(
            "X has {} rows, y has {} rows",
            x.n_rows(),
            y.n_rows()
        )));
    }
    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(PipelineError::InvalidSplit(format!(
            "test fraction must be in (0, 1), got {}",
            test_fraction
        )));
    }

    let n = x.n_rows();
    let n_test = (test_fraction * n as f64).ceil() as usize;
    let n_train = n.saturating_sub(n_test);
    if n_test == 0 || n_train == 0 {
        return Err(PipelineError::InvalidSplit(format!(
            "{} rows with test fraction {} leaves an empty partition",
            n, test_fraction
        )));
    }

    let mut positions: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    positions.shuffle(&mut rng);

    let test_rows = positions[..n_test].to_vec();
    let train_rows = positions[n_test..].to_vec();

    info!(seed, n_train, n_test, "train/test split");

    Ok(Split {
        x_train: x.take_rows(&train_rows),
        x_test: x.take_rows(&test_rows),
        y_train: y.take_rows(&train_rows),
        y_test: y.take_rows(&test_rows),
        train_rows,
        test_rows,
    })
}

//! Fixed hyperparameter grid.

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::ml::Hyperparameters;

/// Tree counts searched, outer loop.
pub const DEFAULT_N_ESTIMATORS: [usize; 4] = [4, 9, 25, 64];

/// Depth limits searched, inner loop.
pub const DEFAULT_MAX_DEPTH: [u16; 3] = [2, 4, 10];

/// Cartesian product of tree counts and depth limits.
///
/// Enumeration order is fixed: outer over `n_estimators`, inner over
/// `max_depth`, each in the order given.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterGrid {
    pub n_estimators: Vec<usize>,
    pub max_depth: Vec<u16>,
}

impl Default for ParameterGrid {
    fn default() -> Self {
        Self {
            n_estimators: DEFAULT_N_ESTIMATORS.to_vec(),
            max_depth: DEFAULT_MAX_DEPTH.to_vec(),
        }
    }
}

impl ParameterGrid {
    pub fn new(n_estimators: Vec<usize>, max_depth: Vec<u16>) -> Self {
        Self {
            n_estimators,
            max_depth,
        }
    }

    pub fn len(&self) -> usize {
        self.n_estimators.len() * self.max_depth.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn points(&self) -> impl Iterator<Item = Hyperparameters> + '_ {
        self.n_estimators
            .iter()
            .cartesian_product(self.max_depth.iter())
            .map(|(&n, &d)| Hyperparameters::new(n, d))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_grid_has_twelve_points_in_nested_order() {
        let grid = ParameterGrid::default();
        let points: Vec<_> = grid.points().map(|p| (p.n_estimators, p.max_depth)).collect();

        assert_eq!(grid.len(), 12);
        assert_eq!(
            points,
            vec![
                (4, 2), (4, 4), (4, 10),
                (9, 2), (9, 4), (9, 10),
                (25, 2), (25, 4), (25, 10),
                (64, 2), (64, 4), (64, 10),
            ]
        );
    }

    #[test]
    fn test_empty_axis_means_empty_grid() {
        let grid = ParameterGrid::new(vec![4, 9], vec![]);
        assert!(grid.is_empty());
        assert_eq!(grid.points().count(), 0);
    }
}

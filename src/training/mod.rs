//! Hyperparameter grid search
//!
//! [`ParameterGrid`] enumerates the fixed tree-count × depth product;
//! [`GridSearch`] fits, scores and logs one model per point and returns every
//! trial as a [`TrialResult`], so later stages pick a trial explicitly via
//! [`SelectionPolicy`].

pub mod grid;
pub mod search;

pub use grid::{ParameterGrid, DEFAULT_MAX_DEPTH, DEFAULT_N_ESTIMATORS};
pub use search::{
    GridSearch, SearchReport, SelectionPolicy, TrialResult, DEFAULT_EXPERIMENT, DEFAULT_RUN_NAME,
    MODEL_ARTIFACT,
};

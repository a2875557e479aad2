//! Predicting German solar and wind output from weather features.
//!
//! A random forest regressor is grid-searched over tree count and depth,
//! every trial is logged to an MLflow-style tracking store, and one chosen
//! trial is rendered as actual-vs-predicted scatter plots.

pub mod config;
pub mod data;
pub mod error;
pub mod ml;
pub mod pipeline;
pub mod plots;
pub mod telemetry;
pub mod tracking;
pub mod training;

pub use error::{PipelineError, Result};

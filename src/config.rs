use anyhow::Result;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::training::{ParameterGrid, SelectionPolicy, DEFAULT_EXPERIMENT, DEFAULT_RUN_NAME};

/// Layered settings: built-in defaults, then `config/default.toml`, then
/// `WSF__SECTION__KEY` environment variables.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub data: DataConfig,
    pub split: SplitConfig,
    pub grid: ParameterGrid,
    pub model: ModelConfig,
    pub tracking: TrackingConfig,
    pub plots: PlotsConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataConfig { pub path: PathBuf }
impl Default for DataConfig {
    fn default() -> Self {
        Self { path: PathBuf::from("germany.csv") }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitConfig {
    pub test_fraction: f64,
    pub seed: u64,
}
impl Default for SplitConfig {
    fn default() -> Self {
        Self { test_fraction: 0.2, seed: 42 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Seed for bootstrap sampling inside each forest
    pub seed: u64,
}
impl Default for ModelConfig {
    fn default() -> Self {
        Self { seed: 42 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackingConfig {
    pub experiment_name: String,
    pub run_name: String,
    pub root: PathBuf,
}
impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            experiment_name: DEFAULT_EXPERIMENT.to_string(),
            run_name: DEFAULT_RUN_NAME.to_string(),
            root: PathBuf::from("mlruns"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlotsConfig {
    pub output_dir: PathBuf,
    pub selection: SelectionPolicy,
}
impl Default for PlotsConfig {
    fn default() -> Self {
        Self { output_dir: PathBuf::from("plots"), selection: SelectionPolicy::default() }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::from_figment(Self::figment())
    }

    pub fn figment() -> Figment {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file("config/default.toml"))
            .merge(Env::prefixed("WSF__").split("__"))
    }

    pub fn from_figment(figment: Figment) -> Result<Self> {
        let cfg: Config = figment.extract()?;
        if !(cfg.split.test_fraction > 0.0 && cfg.split.test_fraction < 1.0) {
            anyhow::bail!(
                "split.test_fraction must be in (0, 1), got {}",
                cfg.split.test_fraction
            );
        }
        if cfg.grid.is_empty() {
            anyhow::bail!("grid.n_estimators and grid.max_depth must both be non-empty");
        }
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_reproduce_fixed_pipeline() {
        let cfg = Config::from_figment(Figment::from(Serialized::defaults(Config::default()))).unwrap();

        assert_eq!(cfg.data.path, PathBuf::from("germany.csv"));
        assert_eq!(cfg.split.test_fraction, 0.2);
        assert_eq!(cfg.split.seed, 42);
        assert_eq!(cfg.grid, ParameterGrid::default());
        assert_eq!(cfg.tracking.experiment_name, "predicting_wind_solar");
        assert_eq!(cfg.tracking.run_name, "rf");
        assert_eq!(cfg.plots.selection, SelectionPolicy::Last);
    }

    #[test]
    fn test_toml_overrides_defaults() {
        let figment = Figment::from(Serialized::defaults(Config::default())).merge(Toml::string(
            r#"
            [grid]
            max_depth = [3]

            [plots]
            selection = "best_rmse"
            "#,
        ));
        let cfg = Config::from_figment(figment).unwrap();

        assert_eq!(cfg.grid.max_depth, vec![3]);
        assert_eq!(cfg.grid.n_estimators, vec![4, 9, 25, 64]);
        assert_eq!(cfg.plots.selection, SelectionPolicy::BestRmse);
    }

    #[test]
    fn test_env_overrides_file() {
        figment::Jail::expect_with(|jail| {
            jail.create_dir("config")?;
            jail.create_file("config/default.toml", "[tracking]\nrun_name = \"from_file\"\n")?;
            jail.set_env("WSF__TRACKING__RUN_NAME", "from_env");
            jail.set_env("WSF__SPLIT__SEED", "7");

            let cfg = Config::from_figment(Config::figment()).map_err(|e| e.to_string())?;
            assert_eq!(cfg.tracking.run_name, "from_env");
            assert_eq!(cfg.split.seed, 7);
            Ok(())
        });
    }

    #[test]
    fn test_rejects_bad_fraction() {
        let figment = Figment::from(Serialized::defaults(Config::default()))
            .merge(Serialized::default("split.test_fraction", 1.5));
        assert!(Config::from_figment(figment).is_err());
    }
}

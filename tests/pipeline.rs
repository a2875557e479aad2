use std::path::{Path, PathBuf};

use chrono::{Duration, NaiveDate};
use rstest::rstest;
use tempfile::TempDir;

use wind_solar_forecast::config::Config;
use wind_solar_forecast::data::{load_dataset, train_test_split};
use wind_solar_forecast::ml::{MeanFactory, RandomForestFactory, RegressionMetrics, Regressor, RegressorFactory};
use wind_solar_forecast::ml::{Hyperparameters, RandomForest};
use wind_solar_forecast::pipeline;
use wind_solar_forecast::tracking::{FileStore, MemoryStore, RunStatus, TrackingStore};
use wind_solar_forecast::training::{GridSearch, ParameterGrid, SelectionPolicy};

const ROWS: usize = 100;

/// Hourly rows where solar follows horizontal radiation and wind follows
/// windspeed.
fn write_dataset(dir: &Path) -> PathBuf {
    let start = NaiveDate::from_ymd_opt(2016, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    let mut csv =
        String::from("utc_timestamp,windspeed,temperature,rad_horizontal,rad_diffuse,solar_GW,wind_GW\n");
    for i in 0..ROWS {
        let ts = start + Duration::hours(i as i64);
        let windspeed = ((i * 7) % 13) as f64 * 0.6;
        let temperature = (i % 25) as f64 - 5.0;
        let rad_horizontal = ((i * 37) % 100) as f64 * 8.0;
        let rad_diffuse = rad_horizontal * 0.4;
        let solar = rad_horizontal * 0.05;
        let wind = windspeed * 4.0;
        csv.push_str(&format!(
            "{},{},{},{},{},{},{}\n",
            ts.format("%Y-%m-%d %H:%M:%S"),
            windspeed,
            temperature,
            rad_horizontal,
            rad_diffuse,
            solar,
            wind
        ));
    }
    let path = dir.join("germany.csv");
    std::fs::write(&path, csv).unwrap();
    path
}

fn config(dir: &TempDir) -> Config {
    let mut cfg = Config::default();
    cfg.data.path = write_dataset(dir.path());
    cfg.tracking.root = dir.path().join("mlruns");
    cfg.plots.output_dir = dir.path().join("plots");
    cfg
}

#[test]
fn test_full_run_logs_twelve_trials_and_renders_last() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config(&dir);
    let store = MemoryStore::new();

    let outcome = pipeline::run(&cfg, RandomForestFactory::new(cfg.model.seed), &store).unwrap();

    assert_eq!(outcome.report.trials.len(), 12);
    assert_eq!(outcome.selected, 11);
    let last = &outcome.report.trials[11];
    assert_eq!(last.params, Hyperparameters::new(64, 10));
    assert_eq!(last.predictions.n_rows(), 20);
    assert_eq!(last.predictions.columns(), ["solar_GW", "wind_GW"]);

    let runs = store.list_runs(&outcome.report.experiment_id).unwrap();
    assert_eq!(runs.len(), 12);
    assert!(runs.iter().all(|r| r.status == RunStatus::Finished && r.run_name == "rf"));

    if cfg!(feature = "plots") {
        assert_eq!(outcome.plots.len(), 2);
        assert!(outcome.plots.iter().all(|p| p.is_file()));
    } else {
        assert!(outcome.plots.is_empty());
        assert!(!cfg.plots.output_dir.join("solar_scatter.svg").exists());
    }
}

#[test]
fn test_shallow_forest_beats_mean_baseline() {
    let dir = tempfile::tempdir().unwrap();
    let dataset = load_dataset(write_dataset(dir.path())).unwrap();
    let split = train_test_split(&dataset.features().unwrap(), &dataset.targets().unwrap(), 0.2, 42).unwrap();
    let params = Hyperparameters::new(4, 2);

    let forest: RandomForest = RandomForestFactory::new(42)
        .fit(&params, &split.x_train, &split.y_train)
        .unwrap();
    let baseline = MeanFactory.fit(&params, &split.x_train, &split.y_train).unwrap();

    let forest_metrics =
        RegressionMetrics::joint(&split.y_test, &forest.predict(&split.x_test).unwrap()).unwrap();
    let baseline_metrics =
        RegressionMetrics::joint(&split.y_test, &baseline.predict(&split.x_test).unwrap()).unwrap();

    let cells = split.y_test.as_slice();
    let mean = cells.iter().sum::<f64>() / cells.len() as f64;
    let std = (cells.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / cells.len() as f64).sqrt();
    assert!(forest_metrics.rmse < std, "rmse {} vs std {}", forest_metrics.rmse, std);

    assert!(
        forest_metrics.rmse < baseline_metrics.rmse,
        "forest {} vs baseline {}",
        forest_metrics,
        baseline_metrics
    );
}

#[test]
fn test_rerun_is_reproducible_and_appends_runs() {
    let dir = tempfile::tempdir().unwrap();
    let mut cfg = config(&dir);
    cfg.grid = ParameterGrid::new(vec![4, 9], vec![2, 4]);
    let store = FileStore::new(&cfg.tracking.root).unwrap();

    let first = pipeline::run(&cfg, RandomForestFactory::new(cfg.model.seed), &store).unwrap();
    let second = pipeline::run(&cfg, RandomForestFactory::new(cfg.model.seed), &store).unwrap();

    assert_eq!(first.report.experiment_id, second.report.experiment_id);
    for (a, b) in first.report.trials.iter().zip(&second.report.trials) {
        assert_eq!(a.params, b.params);
        assert_eq!(a.metrics, b.metrics);
        assert_eq!(a.predictions, b.predictions);
        assert_ne!(a.run_id, b.run_id);
    }

    let runs = store.list_runs(&first.report.experiment_id).unwrap();
    assert_eq!(runs.len(), 8);
    let logged: Vec<&str> = first
        .report
        .trials
        .iter()
        .chain(&second.report.trials)
        .map(|t| t.run_id.as_str())
        .collect();
    assert_eq!(runs.iter().map(|r| r.run_id.as_str()).collect::<Vec<_>>(), logged);

    let artifact = store.load_model(&runs[0].run_id, "model").unwrap();
    let reloaded = RandomForest::from_artifact(&artifact).unwrap();
    let dataset = load_dataset(&cfg.data.path).unwrap();
    let features = dataset.features().unwrap();
    assert_eq!(reloaded.predict(&features).unwrap().n_rows(), ROWS);
}

#[test]
fn test_best_rmse_policy_plots_lowest_error_trial() {
    let dir = tempfile::tempdir().unwrap();
    let mut cfg = config(&dir);
    cfg.plots.selection = SelectionPolicy::BestRmse;
    let store = MemoryStore::new();

    let outcome = pipeline::run(&cfg, RandomForestFactory::new(cfg.model.seed), &store).unwrap();

    let best = &outcome.report.trials[outcome.selected];
    assert!(outcome
        .report
        .trials
        .iter()
        .all(|t| best.metrics.rmse <= t.metrics.rmse));
}

#[test]
fn test_missing_dataset_fails_before_any_run() {
    let dir = tempfile::tempdir().unwrap();
    let mut cfg = config(&dir);
    cfg.data.path = dir.path().join("absent.csv");
    let store = MemoryStore::new();

    assert!(pipeline::run(&cfg, RandomForestFactory::new(42), &store).is_err());
    assert!(store.runs().is_empty());
}

#[rstest]
fn test_metrics_in_range_for_every_grid_point(
    #[values(4, 9, 25, 64)] n_estimators: usize,
    #[values(2, 4, 10)] max_depth: u16,
) {
    let dir = tempfile::tempdir().unwrap();
    let dataset = load_dataset(write_dataset(dir.path())).unwrap();
    let split = train_test_split(&dataset.features().unwrap(), &dataset.targets().unwrap(), 0.2, 42).unwrap();
    let store = MemoryStore::new();

    let report = GridSearch::new(RandomForestFactory::new(42), &store)
        .run(&ParameterGrid::new(vec![n_estimators], vec![max_depth]), &split)
        .unwrap();

    let m = report.trials[0].metrics;
    assert!(m.rmse >= 0.0);
    assert!(m.mae >= 0.0);
    assert!(m.mae <= m.rmse + 1e-12);
    assert!(m.r2 <= 1.0);
}

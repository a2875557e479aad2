use anyhow::Result;
use tracing::info;
use wind_solar_forecast::{config, ml::RandomForestFactory, pipeline, telemetry, tracking::FileStore};
use config::Config;
use telemetry::init_tracing;

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cfg = Config::load()?;
    info!(data = %cfg.data.path.display(), trials = cfg.grid.len(), "starting grid search");

    let store = FileStore::new(&cfg.tracking.root)?;
    let outcome = pipeline::run(&cfg, RandomForestFactory::new(cfg.model.seed), &store)?;

    for path in &outcome.plots {
        info!(path = %path.display(), "plot saved");
    }
    if outcome.plots.is_empty() {
        info!("no plots written");
    }
    info!(
        experiment_id = %outcome.report.experiment_id,
        trials = outcome.report.trials.len(),
        selected = outcome.selected,
        "done"
    );
    Ok(())
}

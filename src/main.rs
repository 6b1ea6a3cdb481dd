use anyhow::{bail, Context, Result};
use log::info;

use weather_lstm::config::PipelineConfig;
use weather_lstm::pipeline;
use weather_lstm::report::print_summary;

const USAGE: &str = "usage: weather-forecast <data.csv> [config.json]";

fn main() -> Result<()> {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let data_path = match args.next() {
        Some(path) => path,
        None => bail!(USAGE),
    };
    let config = match args.next() {
        Some(path) => PipelineConfig::from_json_file(&path)
            .with_context(|| format!("failed to load config from {}", path))?,
        None => PipelineConfig::default(),
    };
    if args.next().is_some() {
        bail!(USAGE);
    }

    info!("Forecasting from {} with lookback {}", data_path, config.lookback);
    let report = pipeline::run(&data_path, &config)
        .with_context(|| format!("forecast pipeline failed for {}", data_path))?;
    print_summary(&report);
    Ok(())
}

//! Command-line entry point for a forecasting run

use anyhow::{Context, Result};
use clap::Parser;
use sales_forecast::{Pipeline, PipelineConfig};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Forecast daily unit sales from raw store records", long_about = None)]
struct Cli {
    /// TOML file with pipeline settings
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Raw sales CSV
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Output CSV for the cleaned daily series
    #[arg(long)]
    series_output: Option<PathBuf>,

    /// Output CSV for the forecast
    #[arg(short = 'o', long)]
    forecast_output: Option<PathBuf>,

    /// Output JSON for the selected model
    #[arg(long)]
    model_output: Option<PathBuf>,

    /// Days to hold out and to forecast
    #[arg(long)]
    horizon: Option<usize>,

    /// Interval coverage, e.g. 0.95
    #[arg(long)]
    confidence_level: Option<f64>,

    /// Backtest models one after another
    #[arg(long)]
    sequential: bool,
}

impl Cli {
    fn into_config(self) -> Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::from_toml_file(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => PipelineConfig::default(),
        };

        if let Some(input) = self.input {
            config.input_path = input;
        }
        if let Some(path) = self.series_output {
            config.series_output_path = path;
        }
        if let Some(path) = self.forecast_output {
            config.forecast_output_path = path;
        }
        if self.model_output.is_some() {
            config.model_output_path = self.model_output;
        }
        if let Some(horizon) = self.horizon {
            config.horizon = horizon;
        }
        if let Some(level) = self.confidence_level {
            config.confidence_level = level;
        }
        if self.sequential {
            config.parallel = false;
        }

        config.validate()?;
        Ok(config)
    }
}

fn main() -> Result<()> {
    // Setup logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = Cli::parse().into_config()?;
    info!(input = %config.input_path.display(), horizon = config.horizon, "Starting forecast run");

    let pipeline = Pipeline::new(config)?;
    let report = pipeline
        .run()
        .with_context(|| format!("Forecast run on {} failed", pipeline.config().input_path.display()))?;

    println!("{}", report);
    Ok(())
}

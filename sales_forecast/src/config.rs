//! Pipeline configuration

use crate::error::{ForecastError, Result};
use crate::models::ModelOptions;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Settings for one forecasting run
///
/// Every field has a default, so a TOML file only needs the keys it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Raw sales CSV
    pub input_path: PathBuf,
    /// Where the cleaned daily series is written
    pub series_output_path: PathBuf,
    /// Where the forecast is written
    pub forecast_output_path: PathBuf,
    /// Where the selected model is written as JSON, if anywhere
    pub model_output_path: Option<PathBuf>,
    /// Days held out for backtesting and forecast ahead
    pub horizon: usize,
    /// Two-sided interval coverage
    pub confidence_level: f64,
    /// Optimiser iteration cap per fit
    pub max_iterations: usize,
    /// Wall-clock budget per fit in seconds, 0 disables it
    pub fit_timeout_secs: u64,
    /// Backtest the models concurrently
    pub parallel: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input_path: PathBuf::from("retail_store_inventory.csv"),
            series_output_path: PathBuf::from("cleaned_daily_sales.csv"),
            forecast_output_path: PathBuf::from("forecast_units_sold.csv"),
            model_output_path: None,
            horizon: 30,
            confidence_level: 0.95,
            max_iterations: 10_000,
            fit_timeout_secs: 60,
            parallel: true,
        }
    }
}

impl PipelineConfig {
    /// Load settings from a TOML file
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ForecastError::ConfigError(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse settings from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: PipelineConfig = toml::from_str(content)
            .map_err(|e| ForecastError::ConfigError(format!("Invalid TOML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<()> {
        if self.horizon == 0 {
            return Err(ForecastError::ConfigError(
                "horizon must be at least 1".to_string(),
            ));
        }
        if !(self.confidence_level > 0.0 && self.confidence_level < 1.0) {
            return Err(ForecastError::ConfigError(format!(
                "confidence_level must be in (0, 1), got {}",
                self.confidence_level
            )));
        }
        if self.max_iterations == 0 {
            return Err(ForecastError::ConfigError(
                "max_iterations must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Per-fit model settings
    pub fn model_options(&self) -> ModelOptions {
        ModelOptions {
            max_iterations: self.max_iterations,
            timeout: (self.fit_timeout_secs > 0).then(|| Duration::from_secs(self.fit_timeout_secs)),
            confidence_level: self.confidence_level,
        }
    }
}

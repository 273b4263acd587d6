//! # Sales Forecast
//!
//! Daily retail unit-sales forecasting with backtested model selection.
//!
//! ## Features
//!
//! - Raw sales ingestion from CSV with column-name normalisation
//! - Gap-free daily demand series (same-day records averaged, missing days zero)
//! - Three forecasting models: ARIMA(5,1,0), SARIMA(1,1,1)(1,1,1,7) and an
//!   additive trend plus seasonality model
//! - Backtesting on the last `horizon` days and selection by RMSE
//! - Forecasts with interval bounds written to CSV, fitted model to JSON
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use sales_forecast::{Pipeline, PipelineConfig};
//!
//! let config = PipelineConfig {
//!     input_path: "retail_store_inventory.csv".into(),
//!     ..PipelineConfig::default()
//! };
//!
//! let report = Pipeline::new(config)?.run()?;
//! println!("{}", report);
//! # Ok::<(), sales_forecast::ForecastError>(())
//! ```

pub mod config;
pub mod data;
pub mod error;
pub mod metrics;
pub mod models;
pub mod persistence;
pub mod pipeline;
pub mod producer;
pub mod selector;
pub mod utils;

// Re-export commonly used types
pub use crate::config::PipelineConfig;
pub use crate::data::{DailySeries, DataLoader, RawRecord, SeriesBuilder};
pub use crate::error::{ForecastError, ModelFailure};
pub use crate::models::{
    FittedModel, ForecastModel, ForecastPoint, ForecastResult, ModelKind, ModelOptions,
};
pub use crate::pipeline::{Pipeline, PipelineReport};
pub use crate::selector::{select_best, ModelScore};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");

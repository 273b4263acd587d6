//! # Retail Forecast
//!
//! Umbrella crate for the retail demand forecasting workspace.
//!
//! - [`sales_forecast`]: ingestion, models, backtesting, selection and persistence
//! - [`forecast_math`]: numerical building blocks used by the models
//!
//! ## Example
//!
//! ```
//! use retail_forecast_workspace::sales_forecast::models::ModelKind;
//!
//! assert_eq!(ModelKind::AutoregressiveIntegrated.to_string(), "ARIMA");
//! ```

pub use forecast_math;
pub use sales_forecast;

pub use sales_forecast::{ForecastError, Pipeline, PipelineConfig, PipelineReport};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert!(Pipeline::new(config).is_ok());
    }

    #[test]
    fn test_math_reexport() {
        assert_eq!(forecast_math::difference(&[1.0, 3.0, 6.0], 1), vec![2.0, 3.0]);
    }
}

//! Non-seasonal ARIMA(5,1,0)

use super::sarima::{SarimaEstimator, SarimaOrder};
use super::{FittedModel, ForecastModel, ModelKind, ModelOptions};
use crate::data::DailySeries;
use crate::error::Result;

/// ARIMA model with stationary autoregressive coefficients
#[derive(Debug, Clone)]
pub struct ArimaModel {
    estimator: SarimaEstimator,
}

impl ArimaModel {
    /// ARIMA(5,1,0)
    pub fn new(options: ModelOptions) -> Self {
        Self::with_order(5, 1, 0, options)
    }

    /// ARIMA with a custom `(p, d, q)` order
    pub fn with_order(p: usize, d: usize, q: usize, options: ModelOptions) -> Self {
        Self {
            estimator: SarimaEstimator::new(
                ModelKind::AutoregressiveIntegrated,
                SarimaOrder::new(p, d, q),
                options,
            ),
        }
    }

    /// Model order
    pub fn order(&self) -> SarimaOrder {
        self.estimator.order()
    }
}

impl ForecastModel for ArimaModel {
    fn kind(&self) -> ModelKind {
        ModelKind::AutoregressiveIntegrated
    }

    fn fit(&self, series: &DailySeries) -> Result<Box<dyn FittedModel>> {
        Ok(Box::new(self.estimator.fit(series)?))
    }
}

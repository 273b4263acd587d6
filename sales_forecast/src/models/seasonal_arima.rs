//! Seasonal ARIMA(1,1,1)(1,1,1,7) with a weekly cycle

use super::sarima::{SarimaEstimator, SarimaOrder};
use super::{FittedModel, ForecastModel, ModelKind, ModelOptions};
use crate::data::DailySeries;
use crate::error::Result;

/// Days in the seasonal cycle
pub const WEEKLY_PERIOD: usize = 7;

/// SARIMA model
///
/// Autoregressive coefficients are left unconstrained, so the fitted process
/// is not forced to be stationary. Moving-average coefficients stay in the
/// invertible region, where the conditional sum of squares has a minimum.
#[derive(Debug, Clone)]
pub struct SeasonalArimaModel {
    estimator: SarimaEstimator,
}

impl SeasonalArimaModel {
    /// SARIMA(1,1,1)(1,1,1,7)
    pub fn new(options: ModelOptions) -> Self {
        let order = SarimaOrder::new(1, 1, 1).with_seasonal(1, 1, 1, WEEKLY_PERIOD);
        Self {
            estimator: SarimaEstimator::new(
                ModelKind::SeasonalAutoregressiveIntegrated,
                order,
                options,
            )
            .enforce_stationarity(false),
        }
    }

    /// Model order
    pub fn order(&self) -> SarimaOrder {
        self.estimator.order()
    }
}

impl ForecastModel for SeasonalArimaModel {
    fn kind(&self) -> ModelKind {
        ModelKind::SeasonalAutoregressiveIntegrated
    }

    fn fit(&self, series: &DailySeries) -> Result<Box<dyn FittedModel>> {
        Ok(Box::new(self.estimator.fit(series)?))
    }
}

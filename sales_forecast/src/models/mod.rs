//! Forecasting models for daily demand series
//!
//! Every variant implements the same two-step contract: [`ForecastModel::fit`]
//! estimates parameters from a training series only, and
//! [`FittedModel::forecast`] projects `horizon` days past the last fitted date
//! with two-sided interval bounds.

use crate::data::DailySeries;
use crate::error::{ForecastError, Result};
use crate::utils::future_dates;
use chrono::NaiveDate;
use forecast_math::NelderMeadConfig;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Debug};
use std::time::{Duration, Instant};
use tracing::warn;

pub mod additive;
pub mod arima;
pub mod sarima;
pub mod seasonal_arima;

pub use additive::{AdditiveParameters, AdditiveSeasonalTrend};
pub use arima::ArimaModel;
pub use sarima::{SarimaOrder, SarimaParameters};
pub use seasonal_arima::SeasonalArimaModel;

/// Identifier of a model variant
///
/// Declaration order is the tie-break preference used during selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    /// Non-seasonal ARIMA(5,1,0)
    AutoregressiveIntegrated,
    /// SARIMA(1,1,1)(1,1,1,7)
    SeasonalAutoregressiveIntegrated,
    /// Piecewise-linear trend plus Fourier seasonalities
    AdditiveSeasonalTrend,
}

impl ModelKind {
    /// All variants in tie-break preference order
    pub const ALL: [ModelKind; 3] = [
        ModelKind::AutoregressiveIntegrated,
        ModelKind::SeasonalAutoregressiveIntegrated,
        ModelKind::AdditiveSeasonalTrend,
    ];

    /// Display name of the model
    pub fn name(&self) -> &'static str {
        match self {
            ModelKind::AutoregressiveIntegrated => "ARIMA",
            ModelKind::SeasonalAutoregressiveIntegrated => "SARIMA",
            ModelKind::AdditiveSeasonalTrend => "AdditiveSeasonalTrend",
        }
    }

    /// Position in the tie-break order, lower wins
    pub fn preference(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Settings shared by all model variants
#[derive(Debug, Clone, PartialEq)]
pub struct ModelOptions {
    /// Cap on optimiser iterations for a single fit
    pub max_iterations: usize,
    /// Wall-clock budget for a single fit
    pub timeout: Option<Duration>,
    /// Two-sided interval coverage, e.g. 0.95
    pub confidence_level: f64,
}

impl Default for ModelOptions {
    fn default() -> Self {
        Self {
            max_iterations: 10_000,
            timeout: Some(Duration::from_secs(60)),
            confidence_level: 0.95,
        }
    }
}

impl ModelOptions {
    /// Deadline for a fit starting now
    pub fn deadline(&self) -> Option<Instant> {
        self.timeout.and_then(|t| Instant::now().checked_add(t))
    }

    /// Optimiser settings for a fit starting now
    pub fn optimizer_config(&self) -> NelderMeadConfig {
        NelderMeadConfig {
            max_iter: self.max_iterations,
            deadline: self.deadline(),
            ..Default::default()
        }
    }
}

/// One forecast day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    /// Forecast date
    pub date: NaiveDate,
    /// Point forecast
    #[serde(rename = "forecast_units_sold")]
    pub predicted: f64,
    /// Lower interval bound
    #[serde(rename = "lower_ci")]
    pub lower: f64,
    /// Upper interval bound
    #[serde(rename = "upper_ci")]
    pub upper: f64,
}

/// Forecast over consecutive days with interval bounds
///
/// Dates are strictly increasing by one day and every point satisfies
/// `lower <= predicted <= upper`.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastResult {
    model: ModelKind,
    confidence_level: f64,
    points: Vec<ForecastPoint>,
}

impl ForecastResult {
    /// Create a forecast starting at `start`.
    ///
    /// Bounds that come back out of order are swapped, and widened if needed
    /// so that they contain the point forecast.
    pub fn new(
        model: ModelKind,
        confidence_level: f64,
        start: NaiveDate,
        predicted: Vec<f64>,
        lower: Vec<f64>,
        upper: Vec<f64>,
    ) -> Result<Self> {
        if predicted.len() != lower.len() || predicted.len() != upper.len() {
            return Err(ForecastError::InvalidParameter(format!(
                "Forecast has {} values but {} lower and {} upper bounds",
                predicted.len(),
                lower.len(),
                upper.len()
            )));
        }
        if predicted
            .iter()
            .chain(lower.iter())
            .chain(upper.iter())
            .any(|v| !v.is_finite())
        {
            return Err(ForecastError::convergence(
                model,
                "forecast contains non-finite values",
            ));
        }

        let dates = match start.pred_opt() {
            Some(anchor) => future_dates(anchor, predicted.len()),
            None => {
                return Err(ForecastError::InvalidParameter(format!(
                    "Cannot anchor a forecast at {}",
                    start
                )))
            }
        };

        let mut repaired = 0usize;
        let points = dates
            .into_iter()
            .zip(predicted)
            .zip(lower.into_iter().zip(upper))
            .map(|((date, predicted), (lower, upper))| {
                let (lo, hi) = ordered_bounds(predicted, lower, upper);
                if lo != lower || hi != upper {
                    repaired += 1;
                }
                ForecastPoint {
                    date,
                    predicted,
                    lower: lo,
                    upper: hi,
                }
            })
            .collect();

        if repaired > 0 {
            warn!(model = %model, repaired, "Repaired out-of-order interval bounds");
        }

        Ok(Self {
            model,
            confidence_level,
            points,
        })
    }

    /// Model that produced the forecast
    pub fn model(&self) -> ModelKind {
        self.model
    }

    /// Interval coverage
    pub fn confidence_level(&self) -> f64 {
        self.confidence_level
    }

    /// Forecast days in order
    pub fn points(&self) -> &[ForecastPoint] {
        &self.points
    }

    /// Number of forecast days
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the forecast has no days
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// First forecast date
    pub fn first_date(&self) -> Option<NaiveDate> {
        self.points.first().map(|p| p.date)
    }

    /// Point forecasts
    pub fn predicted(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.predicted).collect()
    }

    /// Lower bounds
    pub fn lower(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.lower).collect()
    }

    /// Upper bounds
    pub fn upper(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.upper).collect()
    }

    /// Same values re-dated to start at `start`
    pub fn anchored_at(&self, start: NaiveDate) -> Result<ForecastResult> {
        ForecastResult::new(
            self.model,
            self.confidence_level,
            start,
            self.predicted(),
            self.lower(),
            self.upper(),
        )
    }
}

/// Order a bound pair and make sure it contains `predicted`
pub fn ordered_bounds(predicted: f64, lower: f64, upper: f64) -> (f64, f64) {
    let (lo, hi) = if lower <= upper {
        (lower, upper)
    } else {
        (upper, lower)
    };
    (lo.min(predicted), hi.max(predicted))
}

/// Serializable snapshot of a fitted model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "family", rename_all = "snake_case")]
pub enum FittedParameters {
    /// ARIMA or SARIMA coefficients
    Sarima(SarimaParameters),
    /// Trend and seasonality coefficients
    Additive(AdditiveParameters),
}

/// Forecast model that can be fitted to a daily series
pub trait ForecastModel: Debug + Send + Sync {
    /// Variant identifier
    fn kind(&self) -> ModelKind;

    /// Estimate parameters from `series` alone
    fn fit(&self, series: &DailySeries) -> Result<Box<dyn FittedModel>>;
}

/// A model whose parameters have been estimated
pub trait FittedModel: Debug + Send {
    /// Variant identifier
    fn kind(&self) -> ModelKind;

    /// Last date of the series the model was fitted on
    fn last_date(&self) -> NaiveDate;

    /// Forecast `horizon` days starting the day after [`FittedModel::last_date`]
    fn forecast(&self, horizon: usize) -> Result<ForecastResult>;

    /// Snapshot of the estimated parameters
    fn parameters(&self) -> FittedParameters;
}

/// The three variants in preference order
pub fn default_models(options: &ModelOptions) -> Vec<Box<dyn ForecastModel>> {
    vec![
        Box::new(ArimaModel::new(options.clone())),
        Box::new(SeasonalArimaModel::new(options.clone())),
        Box::new(AdditiveSeasonalTrend::new(options.clone())),
    ]
}

/// Build the model for a given variant
pub fn model_for(kind: ModelKind, options: &ModelOptions) -> Box<dyn ForecastModel> {
    match kind {
        ModelKind::AutoregressiveIntegrated => Box::new(ArimaModel::new(options.clone())),
        ModelKind::SeasonalAutoregressiveIntegrated => {
            Box::new(SeasonalArimaModel::new(options.clone()))
        }
        ModelKind::AdditiveSeasonalTrend => Box::new(AdditiveSeasonalTrend::new(options.clone())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    #[test]
    fn test_preference_order() {
        assert!(
            ModelKind::AutoregressiveIntegrated.preference()
                < ModelKind::SeasonalAutoregressiveIntegrated.preference()
        );
        assert!(
            ModelKind::SeasonalAutoregressiveIntegrated.preference()
                < ModelKind::AdditiveSeasonalTrend.preference()
        );
    }

    #[test]
    fn test_forecast_result_dates_are_consecutive() {
        let result = ForecastResult::new(
            ModelKind::AutoregressiveIntegrated,
            0.95,
            day(10),
            vec![1.0, 2.0, 3.0],
            vec![0.0, 1.0, 2.0],
            vec![2.0, 3.0, 4.0],
        )
        .unwrap();
        let dates: Vec<NaiveDate> = result.points().iter().map(|p| p.date).collect();
        assert_eq!(dates, vec![day(10), day(11), day(12)]);
        assert_eq!(result.first_date(), Some(day(10)));
    }

    #[test]
    fn test_swapped_bounds_are_repaired() {
        let result = ForecastResult::new(
            ModelKind::AdditiveSeasonalTrend,
            0.95,
            day(1),
            vec![5.0, 5.0],
            vec![7.0, 6.0],
            vec![3.0, 6.5],
        )
        .unwrap();
        assert_eq!(result.lower(), vec![3.0, 5.0]);
        assert_eq!(result.upper(), vec![7.0, 6.5]);
    }

    #[test]
    fn test_non_finite_forecast_is_a_convergence_error() {
        let result = ForecastResult::new(
            ModelKind::SeasonalAutoregressiveIntegrated,
            0.95,
            day(1),
            vec![f64::NAN],
            vec![0.0],
            vec![1.0],
        );
        assert!(matches!(result, Err(ForecastError::ConvergenceError { .. })));
    }

    #[test]
    fn test_length_mismatch() {
        let result = ForecastResult::new(
            ModelKind::AutoregressiveIntegrated,
            0.95,
            day(1),
            vec![1.0, 2.0],
            vec![0.0],
            vec![3.0, 4.0],
        );
        assert!(matches!(result, Err(ForecastError::InvalidParameter(_))));
    }

    #[test]
    fn test_model_for_matches_kind() {
        let options = ModelOptions::default();
        for kind in ModelKind::ALL {
            assert_eq!(model_for(kind, &options).kind(), kind);
        }
        let kinds: Vec<ModelKind> = default_models(&options).iter().map(|m| m.kind()).collect();
        assert_eq!(kinds, ModelKind::ALL.to_vec());
    }
}

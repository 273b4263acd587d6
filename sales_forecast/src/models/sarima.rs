//! Seasonal ARIMA estimation shared by the ARIMA and SARIMA variants
//!
//! The model is `phi(B) Phi(B^s) (1-B)^d (1-B^s)^D y_t = theta(B) Theta(B^s) e_t`
//! without an intercept. Coefficients are estimated by conditional sum of
//! squares on the differenced series, minimised with Nelder-Mead. Forecasts
//! run the recursion on the undifferenced series with future shocks set to
//! zero, and interval widths follow from the psi weights of the full
//! autoregressive operator.

use super::{FittedModel, FittedParameters, ForecastResult, ModelKind, ModelOptions};
use crate::data::DailySeries;
use crate::error::{ForecastError, Result};
use chrono::NaiveDate;
use forecast_math::polynomial::psi_weights;
use forecast_math::statistics::normal_critical_value;
use forecast_math::{
    constrain_stationary, difference, nelder_mead, seasonal_difference, LagPolynomial, Termination,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Orders `(p, d, q)(P, D, Q, s)` of a seasonal ARIMA model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SarimaOrder {
    pub p: usize,
    pub d: usize,
    pub q: usize,
    pub seasonal_p: usize,
    pub seasonal_d: usize,
    pub seasonal_q: usize,
    pub period: usize,
}

impl SarimaOrder {
    /// Non-seasonal order `(p, d, q)`
    pub fn new(p: usize, d: usize, q: usize) -> Self {
        Self {
            p,
            d,
            q,
            seasonal_p: 0,
            seasonal_d: 0,
            seasonal_q: 0,
            period: 1,
        }
    }

    /// Add a seasonal component `(P, D, Q, s)`
    pub fn with_seasonal(mut self, p: usize, d: usize, q: usize, period: usize) -> Self {
        self.seasonal_p = p;
        self.seasonal_d = d;
        self.seasonal_q = q;
        self.period = period.max(1);
        self
    }

    /// Number of estimated coefficients
    pub fn parameter_count(&self) -> usize {
        self.p + self.q + self.seasonal_p + self.seasonal_q
    }

    /// Observations consumed by differencing
    pub fn differencing_loss(&self) -> usize {
        self.d + self.seasonal_d * self.period
    }

    /// Highest lag of the stationary autoregressive part
    pub fn autoregressive_lag(&self) -> usize {
        self.p + self.seasonal_p * self.period
    }
}

/// Estimated coefficients of a seasonal ARIMA model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SarimaParameters {
    pub order: SarimaOrder,
    /// Non-seasonal AR coefficients `phi`
    pub ar: Vec<f64>,
    /// Non-seasonal MA coefficients `theta`
    pub ma: Vec<f64>,
    /// Seasonal AR coefficients `Phi`
    pub seasonal_ar: Vec<f64>,
    /// Seasonal MA coefficients `Theta`
    pub seasonal_ma: Vec<f64>,
    /// Innovation variance
    pub sigma2: f64,
    /// Conditional sum of squares at the optimum
    pub css: f64,
    /// Optimiser iterations used
    pub iterations: usize,
}

impl SarimaParameters {
    /// Stationary AR operator `phi(B) Phi(B^s)`
    pub fn ar_polynomial(&self) -> LagPolynomial {
        LagPolynomial::autoregressive(&self.ar).multiply(&LagPolynomial::seasonal_autoregressive(
            &self.seasonal_ar,
            self.order.period,
        ))
    }

    /// MA operator `theta(B) Theta(B^s)`
    pub fn ma_polynomial(&self) -> LagPolynomial {
        LagPolynomial::moving_average(&self.ma).multiply(&LagPolynomial::seasonal_moving_average(
            &self.seasonal_ma,
            self.order.period,
        ))
    }

    /// AR operator including both differencing factors
    pub fn integrated_ar_polynomial(&self) -> LagPolynomial {
        self.ar_polynomial()
            .multiply(&LagPolynomial::differencing(self.order.d))
            .multiply(&LagPolynomial::seasonal_differencing(
                self.order.seasonal_d,
                self.order.period,
            ))
    }
}

/// Estimates seasonal ARIMA models of a fixed order
#[derive(Debug, Clone)]
pub struct SarimaEstimator {
    kind: ModelKind,
    order: SarimaOrder,
    enforce_stationarity: bool,
    options: ModelOptions,
}

impl SarimaEstimator {
    /// Create an estimator reporting failures as `kind`
    pub fn new(kind: ModelKind, order: SarimaOrder, options: ModelOptions) -> Self {
        Self {
            kind,
            order,
            enforce_stationarity: true,
            options,
        }
    }

    /// Restrict AR coefficients to the stationary region
    pub fn enforce_stationarity(mut self, enforce: bool) -> Self {
        self.enforce_stationarity = enforce;
        self
    }

    /// Model order
    pub fn order(&self) -> SarimaOrder {
        self.order
    }

    /// Fit the model to `series`
    pub fn fit(&self, series: &DailySeries) -> Result<FittedSarima> {
        let order = self.order;
        let y = series.values();

        let differenced = difference(
            &seasonal_difference(y, order.seasonal_d, order.period),
            order.d,
        );
        let usable = differenced.len().saturating_sub(order.autoregressive_lag());
        if usable <= order.parameter_count() {
            return Err(ForecastError::convergence(
                self.kind,
                format!(
                    "{} observations are too few to estimate {} coefficients",
                    y.len(),
                    order.parameter_count()
                ),
            ));
        }

        let objective = |raw: &[f64]| {
            let params = self.coefficients(raw);
            conditional_residuals(&differenced, &params.0, &params.1).1
        };
        let initial = vec![0.0; order.parameter_count()];
        let result = nelder_mead(objective, &initial, &self.options.optimizer_config());

        match result.termination {
            Termination::Converged => {}
            Termination::MaxIterations => {
                return Err(ForecastError::convergence(
                    self.kind,
                    format!(
                        "estimation did not converge within {} iterations",
                        result.iterations
                    ),
                ))
            }
            Termination::Deadline => {
                return Err(ForecastError::convergence(
                    self.kind,
                    format!("estimation timed out after {} iterations", result.iterations),
                ))
            }
        }

        let (ar, ma, blocks) = self.coefficients(&result.point);
        let (innovations, css, effective) = conditional_residuals(&differenced, &ar, &ma);
        if !css.is_finite() || effective == 0 {
            return Err(ForecastError::convergence(
                self.kind,
                "conditional sum of squares is not finite",
            ));
        }

        let parameters = SarimaParameters {
            order,
            ar: blocks.ar,
            ma: blocks.ma,
            seasonal_ar: blocks.seasonal_ar,
            seasonal_ma: blocks.seasonal_ma,
            sigma2: css / effective as f64,
            css,
            iterations: result.iterations,
        };

        debug!(
            model = %self.kind,
            iterations = result.iterations,
            sigma2 = parameters.sigma2,
            "Estimated seasonal ARIMA coefficients"
        );

        // Innovations are indexed like the differenced series, which starts
        // `differencing_loss` days into the undifferenced one.
        let mut residuals = vec![0.0; order.differencing_loss()];
        residuals.extend(innovations);

        Ok(FittedSarima {
            kind: self.kind,
            parameters,
            history: y.to_vec(),
            residuals,
            last_date: series.end(),
            confidence_level: self.options.confidence_level,
        })
    }

    fn coefficients(&self, raw: &[f64]) -> (LagPolynomial, LagPolynomial, CoefficientBlocks) {
        let order = self.order;
        let mut offset = 0;
        let mut take = |n: usize| {
            let block = raw[offset..offset + n].to_vec();
            offset += n;
            block
        };
        let (ar, ma, seasonal_ar, seasonal_ma) = (
            take(order.p),
            take(order.q),
            take(order.seasonal_p),
            take(order.seasonal_q),
        );

        let blocks = CoefficientBlocks {
            ar: self.autoregressive(ar),
            ma: invertible_moving_average(&ma),
            seasonal_ar: self.autoregressive(seasonal_ar),
            seasonal_ma: invertible_moving_average(&seasonal_ma),
        };

        let ar_poly = LagPolynomial::autoregressive(&blocks.ar).multiply(
            &LagPolynomial::seasonal_autoregressive(&blocks.seasonal_ar, order.period),
        );
        let ma_poly = LagPolynomial::moving_average(&blocks.ma).multiply(
            &LagPolynomial::seasonal_moving_average(&blocks.seasonal_ma, order.period),
        );
        (ar_poly, ma_poly, blocks)
    }

    fn autoregressive(&self, raw: Vec<f64>) -> Vec<f64> {
        if self.enforce_stationarity {
            constrain_stationary(&raw)
        } else {
            raw
        }
    }
}

/// Map unconstrained values to invertible MA coefficients
fn invertible_moving_average(raw: &[f64]) -> Vec<f64> {
    // 1 + theta B is invertible exactly when 1 - (-theta) B is stationary
    constrain_stationary(raw).into_iter().map(|v| -v).collect()
}

#[derive(Debug, Clone)]
struct CoefficientBlocks {
    ar: Vec<f64>,
    ma: Vec<f64>,
    seasonal_ar: Vec<f64>,
    seasonal_ma: Vec<f64>,
}

/// Conditional innovations of `ar(B) w_t = ma(B) e_t`.
///
/// Returns the innovations (zero before the first usable index), their sum
/// of squares and the number of terms in the sum.
fn conditional_residuals(
    w: &[f64],
    ar: &LagPolynomial,
    ma: &LagPolynomial,
) -> (Vec<f64>, f64, usize) {
    let start = ar.degree();
    let mut e = vec![0.0; w.len()];
    let mut css = 0.0;

    for t in start..w.len() {
        let mut value = w[t];
        for i in 1..=ar.degree() {
            value += ar.coefficient(i) * w[t - i];
        }
        for j in 1..=ma.degree().min(t) {
            value -= ma.coefficient(j) * e[t - j];
        }
        if !value.is_finite() {
            return (e, f64::INFINITY, w.len().saturating_sub(start));
        }
        e[t] = value;
        css += value * value;
    }

    (e, css, w.len().saturating_sub(start))
}

/// A fitted seasonal ARIMA model
#[derive(Debug, Clone)]
pub struct FittedSarima {
    kind: ModelKind,
    parameters: SarimaParameters,
    history: Vec<f64>,
    residuals: Vec<f64>,
    last_date: NaiveDate,
    confidence_level: f64,
}

impl FittedSarima {
    /// Estimated coefficients
    pub fn sarima_parameters(&self) -> &SarimaParameters {
        &self.parameters
    }

    /// In-sample innovations aligned with the fitted series
    pub fn residuals(&self) -> &[f64] {
        &self.residuals
    }
}

impl FittedModel for FittedSarima {
    fn kind(&self) -> ModelKind {
        self.kind
    }

    fn last_date(&self) -> NaiveDate {
        self.last_date
    }

    fn forecast(&self, horizon: usize) -> Result<ForecastResult> {
        let full_ar = self.parameters.integrated_ar_polynomial();
        let ma = self.parameters.ma_polynomial();

        let mut y = self.history.clone();
        let mut e = self.residuals.clone();
        let mut predicted = Vec::with_capacity(horizon);

        for _ in 0..horizon {
            let t = y.len();
            let mut value = 0.0;
            for i in 1..=full_ar.degree().min(t) {
                value -= full_ar.coefficient(i) * y[t - i];
            }
            for j in 1..=ma.degree().min(t) {
                value += ma.coefficient(j) * e[t - j];
            }
            y.push(value);
            e.push(0.0);
            predicted.push(value);
        }

        let z = normal_critical_value(self.confidence_level)?;
        let psi = psi_weights(&full_ar, &ma, horizon);
        let mut cumulative = 0.0;
        let mut lower = Vec::with_capacity(horizon);
        let mut upper = Vec::with_capacity(horizon);
        for (value, weight) in predicted.iter().zip(psi.iter()) {
            cumulative += weight * weight;
            let half_width = z * (self.parameters.sigma2 * cumulative).sqrt();
            lower.push(value - half_width);
            upper.push(value + half_width);
        }

        let start = self.last_date.succ_opt().ok_or_else(|| {
            ForecastError::InvalidParameter(format!("No day follows {}", self.last_date))
        })?;
        ForecastResult::new(
            self.kind,
            self.confidence_level,
            start,
            predicted,
            lower,
            upper,
        )
    }

    fn parameters(&self) -> FittedParameters {
        FittedParameters::Sarima(self.parameters.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn series(values: Vec<f64>) -> DailySeries {
        DailySeries::new(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), values).unwrap()
    }

    fn estimator(order: SarimaOrder) -> SarimaEstimator {
        SarimaEstimator::new(
            ModelKind::AutoregressiveIntegrated,
            order,
            ModelOptions::default(),
        )
    }

    #[test]
    fn test_conditional_residuals_white_noise() {
        let w = vec![1.0, -1.0, 2.0];
        let (e, css, n) = conditional_residuals(&w, &LagPolynomial::one(), &LagPolynomial::one());
        assert_eq!(e, w);
        assert_relative_eq!(css, 6.0);
        assert_eq!(n, 3);
    }

    #[test]
    fn test_conditional_residuals_ar1() {
        // w_t = 0.5 w_{t-1} + e_t
        let w = vec![2.0, 1.0, 1.5];
        let ar = LagPolynomial::autoregressive(&[0.5]);
        let (e, css, n) = conditional_residuals(&w, &ar, &LagPolynomial::one());
        assert_eq!(n, 2);
        assert_relative_eq!(e[1], 0.0);
        assert_relative_eq!(e[2], 1.0);
        assert_relative_eq!(css, 1.0);
    }

    #[test]
    fn test_random_walk_repeats_last_value() {
        let values: Vec<f64> = vec![3.0, 5.0, 4.0, 6.0, 5.0, 7.0, 6.0, 8.0];
        let fitted = estimator(SarimaOrder::new(0, 1, 0)).fit(&series(values)).unwrap();
        let sigma = fitted.sarima_parameters().sigma2.sqrt();
        let z = normal_critical_value(0.95).unwrap();
        let forecast = fitted.forecast(4).unwrap();
        for (h, point) in forecast.points().iter().enumerate() {
            assert_relative_eq!(point.predicted, 8.0);
            let half_width = z * sigma * ((h + 1) as f64).sqrt();
            assert_relative_eq!(point.upper - point.predicted, half_width, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_constant_series_forecasts_constant() {
        let fitted = estimator(SarimaOrder::new(5, 1, 0))
            .fit(&series(vec![10.0; 65]))
            .unwrap();
        let forecast = fitted.forecast(30).unwrap();
        for point in forecast.points() {
            assert_relative_eq!(point.predicted, 10.0, epsilon = 1e-9);
            assert!(point.lower <= point.predicted && point.predicted <= point.upper);
        }
    }

    #[test]
    fn test_intervals_widen_with_horizon() {
        let values: Vec<f64> = (0..80)
            .map(|i| 50.0 + 5.0 * ((i * 7 % 11) as f64 - 5.0))
            .collect();
        let fitted = estimator(SarimaOrder::new(1, 1, 0)).fit(&series(values)).unwrap();
        let forecast = fitted.forecast(10).unwrap();
        let widths: Vec<f64> = forecast
            .points()
            .iter()
            .map(|p| p.upper - p.lower)
            .collect();
        for pair in widths.windows(2) {
            assert!(pair[1] >= pair[0] - 1e-9);
        }
        assert!(widths[0] > 0.0);
    }

    #[test]
    fn test_too_short_series() {
        let order = SarimaOrder::new(1, 1, 1).with_seasonal(1, 1, 1, 7);
        let result = estimator(order).fit(&series(vec![1.0; 12]));
        assert!(matches!(result, Err(ForecastError::ConvergenceError { .. })));
    }

    #[test]
    fn test_iteration_cap_is_reported() {
        let options = ModelOptions {
            max_iterations: 1,
            ..ModelOptions::default()
        };
        let values: Vec<f64> = (0..60).map(|i| ((i * 13 % 17) as f64).sqrt()).collect();
        let result = SarimaEstimator::new(
            ModelKind::AutoregressiveIntegrated,
            SarimaOrder::new(3, 1, 0),
            options,
        )
        .fit(&series(values));
        assert!(matches!(result, Err(ForecastError::ConvergenceError { .. })));
    }

    #[test]
    fn test_forecast_starts_after_last_date() {
        let data = series((0..40).map(|i| (i % 7) as f64).collect());
        let fitted = estimator(SarimaOrder::new(2, 1, 0)).fit(&data).unwrap();
        let forecast = fitted.forecast(3).unwrap();
        assert_eq!(forecast.first_date(), data.end().succ_opt());
        assert_eq!(forecast.len(), 3);
    }
}

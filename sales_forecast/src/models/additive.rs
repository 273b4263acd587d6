//! Additive trend and seasonality model
//!
//! `y(t) = trend(t) + yearly(t) + weekly(t) + daily(t) + noise`, where the
//! trend is piecewise linear with changepoints spread over the first 80% of
//! the history and each seasonality is a truncated Fourier series. Fitting is
//! penalised least squares with Huber reweighting, so isolated spikes pull
//! the fit less than under plain least squares.
//!
//! Interval bounds come from simulation: future changepoints are drawn at
//! the historical rate with Laplace distributed slope changes, and Gaussian
//! observation noise is added on top.

use super::{FittedModel, FittedParameters, ForecastModel, ForecastResult, ModelKind, ModelOptions};
use crate::data::DailySeries;
use crate::error::{ForecastError, Result};
use chrono::NaiveDate;
use forecast_math::statistics::{quantile, robust_scale};
use forecast_math::{huber_weights, weighted_ridge, FourierSeasonality};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};
use statrs::distribution::Laplace;
use std::time::Instant;
use tracing::debug;

/// Potential trend changepoints
pub const CHANGEPOINTS: usize = 25;
/// Share of the history where changepoints may be placed
pub const CHANGEPOINT_RANGE: f64 = 0.8;
/// Ridge penalty on changepoint slope changes, in scaled units
pub const CHANGEPOINT_PENALTY: f64 = 4.0;
/// Ridge penalty on Fourier coefficients, in scaled units
pub const SEASONALITY_PENALTY: f64 = 1e-4;
/// Huber tuning constant
pub const HUBER_THRESHOLD: f64 = 1.345;
/// Simulated paths used for interval bounds
pub const UNCERTAINTY_SAMPLES: usize = 1000;
/// Default simulation seed
pub const DEFAULT_SEED: u64 = 42;

const BASE_PENALTY: f64 = 1e-9;
const MAX_REWEIGHTS: usize = 200;
const COEFFICIENT_TOLERANCE: f64 = 1e-8;
const SCALE_FLOOR: f64 = 1e-10;

/// Additive trend plus seasonality model
#[derive(Debug, Clone)]
pub struct AdditiveSeasonalTrend {
    options: ModelOptions,
    changepoints: usize,
    changepoint_range: f64,
    seasonalities: Vec<FourierSeasonality>,
    samples: usize,
    seed: u64,
}

impl AdditiveSeasonalTrend {
    /// Model with yearly, weekly and daily seasonality
    pub fn new(options: ModelOptions) -> Self {
        Self {
            options,
            changepoints: CHANGEPOINTS,
            changepoint_range: CHANGEPOINT_RANGE,
            seasonalities: vec![
                FourierSeasonality::new("yearly", 365.25, 10),
                FourierSeasonality::new("weekly", 7.0, 3),
                FourierSeasonality::new("daily", 1.0, 4),
            ],
            samples: UNCERTAINTY_SAMPLES,
            seed: DEFAULT_SEED,
        }
    }

    /// Set the simulation seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the number of simulated paths
    pub fn with_samples(mut self, samples: usize) -> Self {
        self.samples = samples.max(1);
        self
    }

    /// Seasonal components in design-matrix order
    pub fn seasonalities(&self) -> &[FourierSeasonality] {
        &self.seasonalities
    }

    fn fit_additive(&self, series: &DailySeries) -> Result<FittedAdditive> {
        let kind = ModelKind::AdditiveSeasonalTrend;
        let n = series.len();
        if n < 2 {
            return Err(ForecastError::convergence(
                kind,
                "at least two observations are needed to fit a trend",
            ));
        }

        let y_scale = series
            .values()
            .iter()
            .fold(0.0_f64, |acc, v| acc.max(v.abs()));
        let y_scale = if y_scale > 0.0 { y_scale } else { 1.0 };
        let response: Vec<f64> = series.values().iter().map(|v| v / y_scale).collect();

        let t: Vec<f64> = (0..n).map(|i| history_time(i, n)).collect();
        let changepoints = changepoint_locations(&t, self.changepoints, self.changepoint_range);

        let design: Vec<Vec<f64>> = (0..n)
            .map(|i| self.design_row(t[i], epoch_day(series.date_at(i)), &changepoints))
            .collect();

        let mut penalties = vec![BASE_PENALTY, BASE_PENALTY];
        penalties.extend(std::iter::repeat(CHANGEPOINT_PENALTY).take(changepoints.len()));
        let seasonal_columns: usize = self.seasonalities.iter().map(|s| s.columns()).sum();
        penalties.extend(std::iter::repeat(SEASONALITY_PENALTY).take(seasonal_columns));

        let deadline = self.options.deadline();
        let max_reweights = self.options.max_iterations.clamp(1, MAX_REWEIGHTS);
        let mut weights = vec![1.0; n];
        let mut beta: Vec<f64> = Vec::new();
        let mut residuals = vec![0.0; n];
        let mut iterations = 0;
        let mut converged = false;

        while iterations < max_reweights {
            if deadline.is_some_and(|d| Instant::now() >= d) {
                return Err(ForecastError::convergence(
                    kind,
                    format!("fit timed out after {} reweighting passes", iterations),
                ));
            }
            iterations += 1;

            let next = weighted_ridge(&design, &response, &weights, &penalties)
                .map_err(|e| ForecastError::convergence(kind, e.to_string()))?;
            if next.iter().any(|b| !b.is_finite()) {
                return Err(ForecastError::convergence(kind, "coefficients are not finite"));
            }

            let change = if beta.is_empty() {
                f64::INFINITY
            } else {
                max_abs_change(&beta, &next)
            };
            let magnitude = next.iter().fold(0.0_f64, |acc, b| acc.max(b.abs()));
            beta = next;

            for (r, (row, y)) in residuals.iter_mut().zip(design.iter().zip(&response)) {
                *r = y - dot(row, &beta);
            }

            let scale = robust_scale(&residuals).unwrap_or(0.0);
            if scale < SCALE_FLOOR || change <= COEFFICIENT_TOLERANCE * (1.0 + magnitude) {
                converged = true;
                break;
            }
            weights = huber_weights(&residuals, scale, HUBER_THRESHOLD);
        }

        if !converged {
            return Err(ForecastError::convergence(
                kind,
                format!(
                    "robust fit did not settle within {} reweighting passes",
                    iterations
                ),
            ));
        }

        let weight_sum: f64 = weights.iter().sum();
        let sigma = if weight_sum > 0.0 {
            (weights
                .iter()
                .zip(&residuals)
                .map(|(w, r)| w * r * r)
                .sum::<f64>()
                / weight_sum)
                .sqrt()
        } else {
            0.0
        };
        if !sigma.is_finite() {
            return Err(ForecastError::convergence(kind, "residual scale is not finite"));
        }

        let k = changepoints.len();
        let deltas = beta[2..2 + k].to_vec();
        let mut offset = 2 + k;
        let seasonal = self
            .seasonalities
            .iter()
            .map(|s| {
                let coefficients = beta[offset..offset + s.columns()].to_vec();
                offset += s.columns();
                SeasonalCoefficients {
                    seasonality: s.clone(),
                    coefficients,
                }
            })
            .collect();

        debug!(
            iterations,
            changepoints = k,
            sigma,
            "Fitted additive trend and seasonality"
        );

        Ok(FittedAdditive {
            parameters: AdditiveParameters {
                y_scale,
                history_days: n,
                intercept: beta[0],
                slope: beta[1],
                changepoints,
                changepoint_deltas: deltas,
                seasonalities: seasonal,
                sigma,
                iterations,
            },
            last_date: series.end(),
            confidence_level: self.options.confidence_level,
            samples: self.samples,
            seed: self.seed,
        })
    }

    fn design_row(&self, t: f64, day: f64, changepoints: &[f64]) -> Vec<f64> {
        let mut row = Vec::with_capacity(2 + changepoints.len());
        row.push(1.0);
        row.push(t);
        row.extend(changepoints.iter().map(|c| (t - c).max(0.0)));
        for seasonality in &self.seasonalities {
            seasonality.extend_row(day, &mut row);
        }
        row
    }
}

impl ForecastModel for AdditiveSeasonalTrend {
    fn kind(&self) -> ModelKind {
        ModelKind::AdditiveSeasonalTrend
    }

    fn fit(&self, series: &DailySeries) -> Result<Box<dyn FittedModel>> {
        Ok(Box::new(self.fit_additive(series)?))
    }
}

/// Fourier coefficients of one seasonal component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonalCoefficients {
    pub seasonality: FourierSeasonality,
    /// `sin, cos` pairs for harmonics `1..=order`
    pub coefficients: Vec<f64>,
}

/// Estimated coefficients of the additive model
///
/// Coefficients are in units of `y / y_scale`. Trend time runs from 0 on the
/// first fitted day to 1 on the last.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdditiveParameters {
    pub y_scale: f64,
    pub history_days: usize,
    pub intercept: f64,
    pub slope: f64,
    /// Changepoint locations in trend time
    pub changepoints: Vec<f64>,
    /// Slope change at each changepoint
    pub changepoint_deltas: Vec<f64>,
    pub seasonalities: Vec<SeasonalCoefficients>,
    /// Weighted residual standard deviation
    pub sigma: f64,
    /// Reweighting passes used
    pub iterations: usize,
}

impl AdditiveParameters {
    /// Trend at time `t`
    pub fn trend(&self, t: f64) -> f64 {
        self.intercept
            + self.slope * t
            + self
                .changepoints
                .iter()
                .zip(&self.changepoint_deltas)
                .map(|(c, delta)| delta * (t - c).max(0.0))
                .sum::<f64>()
    }

    /// Sum of all seasonal components on `day` (days since 1970-01-01)
    pub fn seasonal(&self, day: f64) -> f64 {
        self.seasonalities
            .iter()
            .map(|s| dot(&s.seasonality.features(day), &s.coefficients))
            .sum()
    }

    /// Scale of the Laplace distribution for future slope changes
    pub fn changepoint_scale(&self) -> f64 {
        if self.changepoint_deltas.is_empty() {
            return 0.0;
        }
        self.changepoint_deltas.iter().map(|d| d.abs()).sum::<f64>()
            / self.changepoint_deltas.len() as f64
    }
}

/// A fitted additive model
#[derive(Debug, Clone)]
pub struct FittedAdditive {
    parameters: AdditiveParameters,
    last_date: NaiveDate,
    confidence_level: f64,
    samples: usize,
    seed: u64,
}

impl FittedAdditive {
    /// Estimated coefficients
    pub fn additive_parameters(&self) -> &AdditiveParameters {
        &self.parameters
    }
}

impl FittedModel for FittedAdditive {
    fn kind(&self) -> ModelKind {
        ModelKind::AdditiveSeasonalTrend
    }

    fn last_date(&self) -> NaiveDate {
        self.last_date
    }

    fn forecast(&self, horizon: usize) -> Result<ForecastResult> {
        let params = &self.parameters;
        let n = params.history_days;
        let last_day = epoch_day(self.last_date);

        let times: Vec<f64> = (1..=horizon).map(|k| history_time(n - 1 + k, n)).collect();
        let seasonal: Vec<f64> = (1..=horizon)
            .map(|k| params.seasonal(last_day + k as f64))
            .collect();
        let baseline: Vec<f64> = times.iter().map(|t| params.trend(*t)).collect();

        let predicted: Vec<f64> = baseline
            .iter()
            .zip(&seasonal)
            .map(|(trend, season)| (trend + season) * params.y_scale)
            .collect();

        // Each observed day carries the same chance of a slope change
        let changepoint_rate = params.changepoints.len() as f64 / n as f64;
        let slope_changes = slope_change_distribution(params.changepoint_scale());
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut paths = vec![Vec::with_capacity(self.samples); horizon];

        for _ in 0..self.samples {
            let mut shifts: Vec<(f64, f64)> = Vec::new();
            for (h, t) in times.iter().enumerate() {
                if rng.gen::<f64>() < changepoint_rate {
                    let delta = slope_changes.as_ref().map_or(0.0, |d| rng.sample(d));
                    shifts.push((*t, delta));
                }
                let drift: f64 = shifts.iter().map(|(start, delta)| delta * (t - start)).sum();
                let noise: f64 = rng.sample::<f64, _>(StandardNormal) * params.sigma;
                paths[h].push((baseline[h] + drift + seasonal[h] + noise) * params.y_scale);
            }
        }

        let alpha = (1.0 - self.confidence_level) / 2.0;
        let mut lower = Vec::with_capacity(horizon);
        let mut upper = Vec::with_capacity(horizon);
        for (path, value) in paths.iter().zip(&predicted) {
            lower.push(quantile(path, alpha).unwrap_or(*value));
            upper.push(quantile(path, 1.0 - alpha).unwrap_or(*value));
        }

        let start = self.last_date.succ_opt().ok_or_else(|| {
            ForecastError::InvalidParameter(format!("No day follows {}", self.last_date))
        })?;
        ForecastResult::new(
            ModelKind::AdditiveSeasonalTrend,
            self.confidence_level,
            start,
            predicted,
            lower,
            upper,
        )
    }

    fn parameters(&self) -> FittedParameters {
        FittedParameters::Additive(self.parameters.clone())
    }
}

/// Trend time of day `index` in a history of `n` days
fn history_time(index: usize, n: usize) -> f64 {
    index as f64 / (n.max(2) - 1) as f64
}

/// Days since 1970-01-01
fn epoch_day(date: NaiveDate) -> f64 {
    date.signed_duration_since(NaiveDate::default()).num_days() as f64
}

/// Evenly spaced changepoints over the first `range` of the history
fn changepoint_locations(t: &[f64], requested: usize, range: f64) -> Vec<f64> {
    let history = (t.len() as f64 * range).floor() as usize;
    let count = requested.min(history.saturating_sub(1));
    if count == 0 {
        return Vec::new();
    }
    let mut indices: Vec<usize> = (1..=count)
        .map(|j| (j as f64 * (history - 1) as f64 / count as f64).round() as usize)
        .collect();
    indices.dedup();
    indices.into_iter().map(|i| t[i]).collect()
}


/// Laplace(0, scale) draws for future slope changes, `None` when no change
/// was fitted
fn slope_change_distribution(scale: f64) -> Option<Laplace> {
    Laplace::new(0.0, scale).ok()
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn max_abs_change(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .fold(0.0_f64, |acc, (x, y)| acc.max((x - y).abs()))
}

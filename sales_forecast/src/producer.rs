//! Final forecast from the full history

use crate::data::DailySeries;
use crate::error::{ForecastError, ModelFailure, Result};
use crate::models::{FittedModel, ForecastModel, ForecastResult, ModelKind};
use crate::utils::future_dates;
use tracing::{info, warn};

/// Forecast together with the fitted model that produced it
#[derive(Debug)]
pub struct ProducedForecast {
    /// Forecast for the days after the series ends
    pub forecast: ForecastResult,
    /// Model refitted on the full series
    pub fitted: Box<dyn FittedModel>,
}

/// Refit `model` on the whole series and forecast `horizon` days past its end.
pub fn produce_forecast(
    model: &dyn ForecastModel,
    series: &DailySeries,
    horizon: usize,
) -> Result<ProducedForecast> {
    let fitted = model.fit(series)?;
    let forecast = fitted.forecast(horizon)?;

    if forecast.len() != horizon {
        return Err(ForecastError::convergence(
            model.kind(),
            format!("expected {} forecast days, got {}", horizon, forecast.len()),
        ));
    }

    let dates = future_dates(series.end(), horizon);
    let forecast = match dates.first() {
        Some(first) if forecast.first_date() != Some(*first) => forecast.anchored_at(*first)?,
        _ => forecast,
    };

    info!(
        model = %model.kind(),
        horizon,
        first_date = ?forecast.first_date(),
        "Produced forecast from full history"
    );
    Ok(ProducedForecast { forecast, fitted })
}

/// Try candidates in order, returning the first forecast that succeeds.
///
/// `ranking` lists model kinds best first. Models that fail to refit are
/// recorded and the next one is tried.
pub fn produce_with_fallback(
    models: &[Box<dyn ForecastModel>],
    ranking: &[ModelKind],
    series: &DailySeries,
    horizon: usize,
) -> Result<(ProducedForecast, Vec<ModelFailure>)> {
    let mut failures = Vec::new();

    for kind in ranking {
        let Some(model) = models.iter().find(|m| m.kind() == *kind) else {
            continue;
        };
        match produce_forecast(model.as_ref(), series, horizon) {
            Ok(produced) => return Ok((produced, failures)),
            Err(err) if err.is_model_local() => {
                warn!(model = %kind, error = %err, "Refit on full history failed");
                failures.push(ModelFailure::new(*kind, err.to_string()));
            }
            Err(err) => return Err(err),
        }
    }

    Err(ForecastError::NoViableModelError(failures))
}

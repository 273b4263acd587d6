//! End-to-end forecasting run
//!
//! ingest -> build series -> hold out the last `horizon` days -> backtest
//! every model -> pick the lowest RMSE -> refit on the full history ->
//! forecast -> write artifacts. Nothing is written until every computation
//! step has succeeded.

use crate::config::PipelineConfig;
use crate::data::{DailySeries, DataLoader, RawRecord, SeriesBuilder};
use crate::error::{ForecastError, ModelFailure, Result};
use crate::metrics::{evaluate_forecast, ForecastMetrics};
use crate::models::{default_models, ForecastModel, ForecastResult, ModelKind};
use crate::persistence::{write_forecast, write_model, write_series, ModelRecord};
use crate::producer::{produce_with_fallback, ProducedForecast};
use crate::selector::{rank_models, ModelScore};
use crate::utils::{train_test_split, Split};
use chrono::NaiveDate;
use rayon::prelude::*;
use std::fmt;
use std::path::PathBuf;
use tracing::{info, warn};

/// Backtest outcome of one model
#[derive(Debug, Clone, PartialEq)]
pub struct BacktestResult {
    /// Evaluated model
    pub model: ModelKind,
    /// Accuracy on the held-out days
    pub metrics: ForecastMetrics,
}

/// Everything a run computed, before anything is written
#[derive(Debug)]
pub struct PipelineOutcome {
    /// Cleaned daily series
    pub series: DailySeries,
    /// Backtests of the models that produced a forecast
    pub backtests: Vec<BacktestResult>,
    /// Models excluded during backtesting or refitting
    pub failures: Vec<ModelFailure>,
    /// Forecast and refitted model of the selected variant
    pub produced: ProducedForecast,
}

impl PipelineOutcome {
    /// Variant that produced the final forecast
    pub fn selected(&self) -> ModelKind {
        self.produced.forecast.model()
    }
}

/// Summary of a completed run
#[derive(Debug, Clone)]
pub struct PipelineReport {
    /// First day of the cleaned series
    pub series_start: NaiveDate,
    /// Last day of the cleaned series
    pub series_end: NaiveDate,
    /// Length of the cleaned series
    pub series_days: usize,
    /// Held-out days used for scoring
    pub horizon: usize,
    /// Backtest accuracy per model
    pub backtests: Vec<BacktestResult>,
    /// Models excluded from the run
    pub failures: Vec<ModelFailure>,
    /// Variant that produced the forecast
    pub selected: ModelKind,
    /// Final forecast
    pub forecast: ForecastResult,
    /// Files written, in write order
    pub artifacts: Vec<PathBuf>,
}

impl PipelineReport {
    /// Backtest accuracy of the model that produced the forecast
    pub fn selected_metrics(&self) -> Option<&ForecastMetrics> {
        self.backtests
            .iter()
            .find(|b| b.model == self.selected)
            .map(|b| &b.metrics)
    }
}

impl fmt::Display for PipelineReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Daily series: {} days ({} to {})",
            self.series_days, self.series_start, self.series_end
        )?;
        writeln!(f, "Backtest over the last {} days:", self.horizon)?;
        for backtest in &self.backtests {
            writeln!(
                f,
                "  {}",
                ModelScore::new(backtest.model, backtest.metrics.rmse)
            )?;
        }
        for failure in &self.failures {
            writeln!(f, "  excluded {}", failure)?;
        }
        match self.selected_metrics() {
            Some(metrics) => {
                writeln!(
                    f,
                    "Selected model: {} (backtest RMSE {:.4})",
                    self.selected, metrics.rmse
                )?;
                write!(f, "{}", metrics)?;
            }
            None => writeln!(f, "Selected model: {}", self.selected)?,
        }
        if let (Some(first), Some(last)) = (self.forecast.points().first(), self.forecast.points().last()) {
            writeln!(
                f,
                "Forecast: {} days ({} to {})",
                self.forecast.len(),
                first.date,
                last.date
            )?;
        }
        for path in &self.artifacts {
            writeln!(f, "Saved {}", path.display())?;
        }
        Ok(())
    }
}

/// Runs the full forecasting workflow
#[derive(Debug)]
pub struct Pipeline {
    config: PipelineConfig,
    models: Vec<Box<dyn ForecastModel>>,
}

impl Pipeline {
    /// Pipeline with the three standard models
    pub fn new(config: PipelineConfig) -> Result<Self> {
        let models = default_models(&config.model_options());
        Self::with_models(config, models)
    }

    /// Pipeline with a custom model set
    pub fn with_models(config: PipelineConfig, models: Vec<Box<dyn ForecastModel>>) -> Result<Self> {
        config.validate()?;
        if models.is_empty() {
            return Err(ForecastError::ConfigError(
                "At least one model is required".to_string(),
            ));
        }
        Ok(Self { config, models })
    }

    /// Active configuration
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Read the configured input file and run
    pub fn run(&self) -> Result<PipelineReport> {
        let records = DataLoader::from_csv(&self.config.input_path)?;
        self.run_on_records(&records)
    }

    /// Run on records that are already in memory
    pub fn run_on_records(&self, records: &[RawRecord]) -> Result<PipelineReport> {
        let outcome = self.forecast(records)?;
        let artifacts = self.persist(&outcome)?;

        Ok(PipelineReport {
            series_start: outcome.series.start(),
            series_end: outcome.series.end(),
            series_days: outcome.series.len(),
            horizon: self.config.horizon,
            selected: outcome.selected(),
            backtests: outcome.backtests,
            failures: outcome.failures,
            forecast: outcome.produced.forecast,
            artifacts,
        })
    }

    /// Compute the forecast without writing anything
    pub fn forecast(&self, records: &[RawRecord]) -> Result<PipelineOutcome> {
        let horizon = self.config.horizon;
        let series = SeriesBuilder::new(horizon).build(records)?;
        info!(
            days = series.len(),
            start = %series.start(),
            end = %series.end(),
            "Built daily series"
        );

        let split = train_test_split(&series, horizon)?;
        let results = self.backtest_all(&split);

        let mut backtests = Vec::new();
        let mut failures = Vec::new();
        for (kind, result) in results {
            match result {
                Ok(metrics) => {
                    info!(model = %kind, rmse = metrics.rmse, "Backtest complete");
                    backtests.push(BacktestResult {
                        model: kind,
                        metrics,
                    });
                }
                Err(err) if err.is_model_local() => {
                    warn!(model = %kind, error = %err, "Model excluded from selection");
                    failures.push(ModelFailure::new(kind, err.to_string()));
                }
                Err(err) => return Err(err),
            }
        }

        let scores: Vec<ModelScore> = backtests
            .iter()
            .map(|b| ModelScore::new(b.model, b.metrics.rmse))
            .collect();
        let ranking: Vec<ModelKind> = rank_models(&scores).iter().map(|s| s.model).collect();
        if ranking.is_empty() {
            return Err(ForecastError::NoViableModelError(failures));
        }
        info!(selected = %ranking[0], "Selected model with lowest backtest RMSE");

        let (produced, refit_failures) =
            produce_with_fallback(&self.models, &ranking, &series, horizon).map_err(|err| {
                match err {
                    ForecastError::NoViableModelError(refit) => {
                        let mut all = failures.clone();
                        all.extend(refit);
                        ForecastError::NoViableModelError(all)
                    }
                    other => other,
                }
            })?;
        failures.extend(refit_failures);

        Ok(PipelineOutcome {
            series,
            backtests,
            failures,
            produced,
        })
    }

    fn backtest_all(&self, split: &Split) -> Vec<(ModelKind, Result<ForecastMetrics>)> {
        if self.config.parallel {
            self.models
                .par_iter()
                .map(|model| (model.kind(), backtest(model.as_ref(), split)))
                .collect()
        } else {
            self.models
                .iter()
                .map(|model| (model.kind(), backtest(model.as_ref(), split)))
                .collect()
        }
    }

    fn persist(&self, outcome: &PipelineOutcome) -> Result<Vec<PathBuf>> {
        let mut artifacts = Vec::new();

        write_series(&self.config.series_output_path, &outcome.series)?;
        artifacts.push(self.config.series_output_path.clone());

        write_forecast(&self.config.forecast_output_path, &outcome.produced.forecast)?;
        artifacts.push(self.config.forecast_output_path.clone());

        if let Some(path) = &self.config.model_output_path {
            let record = ModelRecord::from_fitted(outcome.produced.fitted.as_ref());
            write_model(path, &record)?;
            artifacts.push(path.clone());
        }

        Ok(artifacts)
    }
}

/// Fit on the training prefix and score against the held-out days
pub fn backtest(model: &dyn ForecastModel, split: &Split) -> Result<ForecastMetrics> {
    let fitted = model.fit(&split.train)?;
    let forecast = fitted.forecast(split.horizon())?;
    if forecast.len() != split.horizon() {
        return Err(ForecastError::convergence(
            model.kind(),
            format!(
                "expected {} forecast days, got {}",
                split.horizon(),
                forecast.len()
            ),
        ));
    }

    let metrics = evaluate_forecast(split.test.values(), &forecast.predicted())?;
    if !metrics.rmse.is_finite() {
        return Err(ForecastError::convergence(model.kind(), "backtest RMSE is not finite"));
    }
    Ok(metrics)
}

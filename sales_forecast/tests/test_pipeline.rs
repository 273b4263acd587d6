use chrono::{Duration, NaiveDate};
use sales_forecast::data::DailySeries;
use sales_forecast::error::{ForecastError, Result};
use sales_forecast::models::{
    ArimaModel, FittedModel, FittedParameters, ForecastModel, ForecastResult, ModelKind,
    ModelOptions, SarimaOrder, SarimaParameters, SeasonalArimaModel,
};
use sales_forecast::persistence::{read_forecast, read_model, read_series};
use sales_forecast::{Pipeline, PipelineConfig, RawRecord};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::io::Write;
use std::path::Path;
use tempfile::{tempdir, NamedTempFile};

fn config_in(dir: &Path) -> PipelineConfig {
    PipelineConfig {
        series_output_path: dir.join("cleaned_daily_sales.csv"),
        forecast_output_path: dir.join("forecast_units_sold.csv"),
        ..PipelineConfig::default()
    }
}

fn start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2023, 1, 1).unwrap()
}

fn sample_records(days: i64) -> Vec<RawRecord> {
    let weekly = [0.0, -5.0, -2.0, 1.0, 3.0, 14.0, 10.0];
    (0..days)
        .flat_map(|i| {
            let date = (start() + Duration::days(i)).format("%Y-%m-%d").to_string();
            let level = 90.0 + 0.2 * i as f64 + weekly[(i % 7) as usize];
            let noise = ((i * 29 % 13) as f64 - 6.0) * 0.9;
            vec![
                RawRecord::new(date.clone(), Some(level + noise)),
                RawRecord::new(date, Some(level - 0.5 * noise)),
            ]
        })
        .collect()
}

fn noisy_records(days: i64, seed: u64) -> Vec<RawRecord> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..days)
        .flat_map(|i| {
            let date = (start() + Duration::days(i)).format("%Y-%m-%d").to_string();
            (0..100)
                .map(|_| RawRecord::new(date.clone(), Some(rng.gen_range(0..500) as f64)))
                .collect::<Vec<_>>()
        })
        .collect()
}

fn constant_records(days: i64, value: f64) -> Vec<RawRecord> {
    (0..days)
        .map(|i| {
            let date = (start() + Duration::days(i)).format("%Y-%m-%d").to_string();
            RawRecord::new(date, Some(value))
        })
        .collect()
}

/// Model whose fit always fails
#[derive(Debug)]
struct FailingModel(ModelKind);

impl ForecastModel for FailingModel {
    fn kind(&self) -> ModelKind {
        self.0
    }

    fn fit(&self, _series: &DailySeries) -> Result<Box<dyn FittedModel>> {
        Err(ForecastError::convergence(self.0, "did not converge"))
    }
}

/// Repeats the last value, but only fits series up to `max_days` long
#[derive(Debug)]
struct ShortHistoryModel {
    kind: ModelKind,
    max_days: usize,
}

#[derive(Debug)]
struct LastValue {
    kind: ModelKind,
    value: f64,
    last_date: NaiveDate,
}

impl ForecastModel for ShortHistoryModel {
    fn kind(&self) -> ModelKind {
        self.kind
    }

    fn fit(&self, series: &DailySeries) -> Result<Box<dyn FittedModel>> {
        if series.len() > self.max_days {
            return Err(ForecastError::convergence(self.kind, "history too long"));
        }
        Ok(Box::new(LastValue {
            kind: self.kind,
            value: series.values()[series.len() - 1],
            last_date: series.end(),
        }))
    }
}

impl FittedModel for LastValue {
    fn kind(&self) -> ModelKind {
        self.kind
    }

    fn last_date(&self) -> NaiveDate {
        self.last_date
    }

    fn forecast(&self, horizon: usize) -> Result<ForecastResult> {
        ForecastResult::new(
            self.kind,
            0.95,
            self.last_date + Duration::days(1),
            vec![self.value; horizon],
            vec![self.value; horizon],
            vec![self.value; horizon],
        )
    }

    fn parameters(&self) -> FittedParameters {
        FittedParameters::Sarima(SarimaParameters {
            order: SarimaOrder::new(0, 1, 0),
            ar: Vec::new(),
            ma: Vec::new(),
            seasonal_ar: Vec::new(),
            seasonal_ma: Vec::new(),
            sigma2: 0.0,
            css: 0.0,
            iterations: 0,
        })
    }
}

#[test]
fn test_full_run_from_csv() {
    let dir = tempdir().unwrap();
    let mut input = NamedTempFile::new_in(dir.path()).unwrap();
    writeln!(input, "Date,Store ID,Product ID,Units Sold").unwrap();
    for record in sample_records(120) {
        writeln!(
            input,
            "{},S001,P0001,{:.0}",
            record.date.unwrap(),
            record.units_sold.unwrap()
        )
        .unwrap();
    }
    input.flush().unwrap();

    let config = PipelineConfig {
        input_path: input.path().to_path_buf(),
        model_output_path: Some(dir.path().join("model.json")),
        ..config_in(dir.path())
    };
    let report = Pipeline::new(config.clone()).unwrap().run().unwrap();

    let last_day = start() + Duration::days(119);
    assert_eq!(report.series_days, 120);
    assert_eq!(report.series_end, last_day);

    let points = read_forecast(&config.forecast_output_path).unwrap();
    assert_eq!(points.len(), 30);
    assert_eq!(points[0].date, last_day + Duration::days(1));
    for pair in points.windows(2) {
        assert_eq!(pair[1].date - pair[0].date, Duration::days(1));
    }
    for point in &points {
        assert!(point.lower <= point.predicted && point.predicted <= point.upper);
    }

    let series = read_series(&config.series_output_path).unwrap();
    assert_eq!(series.len(), 120);

    let model = read_model(dir.path().join("model.json")).unwrap();
    assert_eq!(model.model, report.selected);
    assert_eq!(model.fitted_through, last_day);
    assert_eq!(report.artifacts.len(), 3);
}

#[test]
fn test_selected_model_has_lowest_rmse() {
    let dir = tempdir().unwrap();
    let report = Pipeline::new(config_in(dir.path()))
        .unwrap()
        .run_on_records(&sample_records(120))
        .unwrap();

    let best = report
        .backtests
        .iter()
        .map(|b| b.metrics.rmse)
        .fold(f64::INFINITY, f64::min);
    let selected = report
        .backtests
        .iter()
        .find(|b| b.model == report.selected)
        .unwrap();
    assert_eq!(selected.metrics.rmse, best);
    assert_eq!(report.forecast.model(), report.selected);
    assert!(report.to_string().contains("Selected model"));
}

#[test]
fn test_every_model_survives_noisy_history() {
    let dir = tempdir().unwrap();
    let report = Pipeline::new(config_in(dir.path()))
        .unwrap()
        .run_on_records(&noisy_records(120, 99))
        .unwrap();

    assert!(report.failures.is_empty(), "{:?}", report.failures);
    assert_eq!(report.backtests.len(), 3);
    assert_eq!(report.forecast.len(), 30);
    assert_eq!(
        report.forecast.first_date(),
        Some(start() + Duration::days(120))
    );
}

#[test]
fn test_sequential_and_parallel_agree() {
    let records = sample_records(100);
    let parallel_dir = tempdir().unwrap();
    let sequential_dir = tempdir().unwrap();

    let parallel = Pipeline::new(config_in(parallel_dir.path()))
        .unwrap()
        .run_on_records(&records)
        .unwrap();
    let sequential = Pipeline::new(PipelineConfig {
        parallel: false,
        ..config_in(sequential_dir.path())
    })
    .unwrap()
    .run_on_records(&records)
    .unwrap();

    assert_eq!(parallel.selected, sequential.selected);
    assert_eq!(parallel.forecast, sequential.forecast);
}

#[test]
fn test_constant_series_forecasts_constant() {
    let dir = tempdir().unwrap();
    let report = Pipeline::new(config_in(dir.path()))
        .unwrap()
        .run_on_records(&constant_records(95, 10.0))
        .unwrap();

    for backtest in &report.backtests {
        assert!(backtest.metrics.rmse < 1e-3, "{:?}", backtest);
    }
    // Exact ties go to the non-seasonal model
    assert_eq!(report.selected, ModelKind::AutoregressiveIntegrated);
    for value in report.forecast.predicted() {
        assert!((value - 10.0).abs() < 1e-6);
    }
}

#[test]
fn test_all_models_failing_writes_nothing() {
    let dir = tempdir().unwrap();
    let config = config_in(dir.path());
    let models: Vec<Box<dyn ForecastModel>> = ModelKind::ALL
        .iter()
        .map(|kind| Box::new(FailingModel(*kind)) as Box<dyn ForecastModel>)
        .collect();

    let result = Pipeline::with_models(config.clone(), models)
        .unwrap()
        .run_on_records(&sample_records(60));

    match result {
        Err(ForecastError::NoViableModelError(failures)) => assert_eq!(failures.len(), 3),
        other => panic!("expected NoViableModelError, got {:?}", other),
    }
    assert!(!config.series_output_path.exists());
    assert!(!config.forecast_output_path.exists());
}

#[test]
fn test_failed_model_is_excluded() {
    let dir = tempdir().unwrap();
    let options = ModelOptions::default();
    let models: Vec<Box<dyn ForecastModel>> = vec![
        Box::new(FailingModel(ModelKind::AutoregressiveIntegrated)),
        Box::new(SeasonalArimaModel::new(options)),
    ];

    let report = Pipeline::with_models(config_in(dir.path()), models)
        .unwrap()
        .run_on_records(&sample_records(90))
        .unwrap();

    assert_eq!(report.selected, ModelKind::SeasonalAutoregressiveIntegrated);
    assert_eq!(report.backtests.len(), 1);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].model, ModelKind::AutoregressiveIntegrated);
}

#[test]
fn test_refit_failure_falls_back_to_next_model() {
    let dir = tempdir().unwrap();
    let models: Vec<Box<dyn ForecastModel>> = vec![
        Box::new(ShortHistoryModel {
            kind: ModelKind::AutoregressiveIntegrated,
            max_days: 70,
        }),
        Box::new(SeasonalArimaModel::new(ModelOptions::default())),
    ];

    let report = Pipeline::with_models(config_in(dir.path()), models)
        .unwrap()
        .run_on_records(&constant_records(95, 10.0))
        .unwrap();

    assert_eq!(report.selected, ModelKind::SeasonalAutoregressiveIntegrated);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.forecast.len(), 30);
}

#[test]
fn test_short_history_is_rejected() {
    let dir = tempdir().unwrap();
    let config = config_in(dir.path());
    let result = Pipeline::new(config.clone())
        .unwrap()
        .run_on_records(&constant_records(30, 5.0));
    assert!(matches!(result, Err(ForecastError::DataError(_))));
    assert!(!config.series_output_path.exists());
}

#[test]
fn test_empty_model_set_is_rejected() {
    let result = Pipeline::with_models(PipelineConfig::default(), Vec::new());
    assert!(matches!(result, Err(ForecastError::ConfigError(_))));
    // ARIMA alone is a valid model set
    assert!(Pipeline::with_models(
        PipelineConfig::default(),
        vec![Box::new(ArimaModel::new(ModelOptions::default()))]
    )
    .is_ok());
}

//! Writing the cleaned series, the forecast and the fitted model to disk
//!
//! Every artifact is written to a temporary file in the destination
//! directory and renamed into place, so a failed write never leaves a
//! truncated file behind.

use crate::data::DailySeries;
use crate::error::{ForecastError, Result};
use crate::models::{FittedModel, FittedParameters, ForecastPoint, ForecastResult, ModelKind};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::info;

/// One row of the cleaned series file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesRow {
    pub date: NaiveDate,
    pub units_sold: f64,
}

/// Forecast row as read back from disk
#[derive(Debug, Deserialize)]
struct StoredForecastRow {
    date: NaiveDate,
    forecast_units_sold: f64,
    #[serde(default)]
    lower_ci: Option<f64>,
    #[serde(default)]
    upper_ci: Option<f64>,
}

/// Fitted model as stored on disk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelRecord {
    /// Selected model
    pub model: ModelKind,
    /// Last day of the series the model was fitted on
    pub fitted_through: NaiveDate,
    /// Estimated coefficients
    pub parameters: FittedParameters,
}

impl ModelRecord {
    /// Snapshot a fitted model
    pub fn from_fitted(fitted: &dyn FittedModel) -> Self {
        Self {
            model: fitted.kind(),
            fitted_through: fitted.last_date(),
            parameters: fitted.parameters(),
        }
    }
}

/// Write the daily series as `date,units_sold`
pub fn write_series<P: AsRef<Path>>(path: P, series: &DailySeries) -> Result<()> {
    let path = path.as_ref();
    write_atomically(path, |file| {
        let mut writer = csv::Writer::from_writer(file);
        for (date, units_sold) in series.iter() {
            writer.serialize(SeriesRow { date, units_sold })?;
        }
        writer.flush()?;
        Ok(())
    })?;
    info!(path = %path.display(), days = series.len(), "Saved cleaned series");
    Ok(())
}

/// Read a series file written by [`write_series`]
pub fn read_series<P: AsRef<Path>>(path: P) -> Result<DailySeries> {
    let path = path.as_ref();
    let mut reader = csv::Reader::from_path(path).map_err(|e| persistence_error(path, e))?;
    let rows = reader
        .deserialize::<SeriesRow>()
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| persistence_error(path, e))?;

    let first = rows.first().ok_or_else(|| {
        ForecastError::DataError(format!("Series file {} has no rows", path.display()))
    })?;
    for (i, row) in rows.iter().enumerate() {
        if (row.date - first.date).num_days() != i as i64 {
            return Err(ForecastError::DataError(format!(
                "Series file {} is not a consecutive daily series at {}",
                path.display(),
                row.date
            )));
        }
    }
    DailySeries::new(first.date, rows.iter().map(|r| r.units_sold).collect())
}

/// Write the forecast as `date,forecast_units_sold,lower_ci,upper_ci`
pub fn write_forecast<P: AsRef<Path>>(path: P, forecast: &ForecastResult) -> Result<()> {
    let path = path.as_ref();
    write_atomically(path, |file| {
        let mut writer = csv::Writer::from_writer(file);
        for point in forecast.points() {
            writer.serialize(point)?;
        }
        writer.flush()?;
        Ok(())
    })?;
    info!(
        path = %path.display(),
        model = %forecast.model(),
        days = forecast.len(),
        "Saved forecast"
    );
    Ok(())
}

/// Read a forecast file, treating missing bounds as zero
pub fn read_forecast<P: AsRef<Path>>(path: P) -> Result<Vec<ForecastPoint>> {
    let path = path.as_ref();
    let mut reader = csv::Reader::from_path(path).map_err(|e| persistence_error(path, e))?;
    reader
        .deserialize::<StoredForecastRow>()
        .map(|row| {
            row.map(|row| ForecastPoint {
                date: row.date,
                predicted: row.forecast_units_sold,
                lower: row.lower_ci.unwrap_or(0.0),
                upper: row.upper_ci.unwrap_or(0.0),
            })
            .map_err(|e| persistence_error(path, e))
        })
        .collect()
}

/// Write a model snapshot as pretty-printed JSON
pub fn write_model<P: AsRef<Path>>(path: P, record: &ModelRecord) -> Result<()> {
    let path = path.as_ref();
    write_atomically(path, |file| {
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, record)
            .map_err(|e| ForecastError::DataError(e.to_string()))?;
        writer.flush()?;
        Ok(())
    })?;
    info!(path = %path.display(), model = %record.model, "Saved fitted model");
    Ok(())
}

/// Read a model snapshot written by [`write_model`]
pub fn read_model<P: AsRef<Path>>(path: P) -> Result<ModelRecord> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| persistence_error(path, e))?;
    serde_json::from_reader(file).map_err(|e| persistence_error(path, e))
}

fn write_atomically<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut File) -> Result<()>,
{
    let parent = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let mut temp = NamedTempFile::new_in(parent).map_err(|e| persistence_error(path, e))?;

    write(temp.as_file_mut()).map_err(|e| persistence_error(path, e))?;
    temp.as_file()
        .sync_all()
        .map_err(|e| persistence_error(path, e))?;
    temp.persist(path)
        .map_err(|e| persistence_error(path, e.error))?;
    Ok(())
}

fn persistence_error(path: &Path, err: impl std::fmt::Display) -> ForecastError {
    ForecastError::PersistenceError {
        path: path.to_path_buf(),
        message: err.to_string(),
    }
}

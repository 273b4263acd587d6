//! Raw sales records and the daily demand series built from them

use crate::error::{ForecastError, Result};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use polars::prelude::*;
use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;
use tracing::{debug, info};

/// Column holding the transaction date after name normalisation
pub const DATE_COLUMN: &str = "date";
/// Column holding the quantity sold after name normalisation
pub const UNITS_COLUMN: &str = "units_sold";

/// One raw per-product-per-store observation
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    /// Date as it appeared in the source, if present
    pub date: Option<String>,
    /// Quantity sold, `None` when missing or unparseable
    pub units_sold: Option<f64>,
}

impl RawRecord {
    /// Create a new raw record
    pub fn new(date: impl Into<String>, units_sold: Option<f64>) -> Self {
        Self {
            date: Some(date.into()),
            units_sold,
        }
    }
}

/// Data loader for raw sales files
#[derive(Debug)]
pub struct DataLoader;

impl DataLoader {
    /// Load raw records from a CSV file
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<Vec<RawRecord>> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let df = CsvReader::new(file)
            .infer_schema(None)
            .has_header(true)
            .finish()?;

        info!(path = %path.display(), rows = df.height(), "Loaded raw sales file");
        Self::from_dataframe(df)
    }

    /// Extract raw records from an existing DataFrame
    pub fn from_dataframe(mut df: DataFrame) -> Result<Vec<RawRecord>> {
        let normalized: Vec<String> = df
            .get_column_names()
            .iter()
            .map(|name| normalize_column_name(name))
            .collect();
        df.set_column_names(&normalized)?;

        for required in [DATE_COLUMN, UNITS_COLUMN] {
            if !normalized.iter().any(|name| name == required) {
                return Err(ForecastError::DataError(format!(
                    "Required column '{}' not found (columns: {})",
                    required,
                    normalized.join(", ")
                )));
            }
        }

        let dates = df.column(DATE_COLUMN)?.cast(&DataType::Utf8)?;
        let units = df.column(UNITS_COLUMN)?.cast(&DataType::Float64)?;

        let records = dates
            .utf8()?
            .into_iter()
            .zip(units.f64()?.into_iter())
            .map(|(date, units_sold)| RawRecord {
                date: date.map(str::to_string),
                units_sold,
            })
            .collect();

        Ok(records)
    }
}

/// Trim, lowercase and replace spaces and slashes with underscores
pub fn normalize_column_name(name: &str) -> String {
    name.trim().to_lowercase().replace([' ', '/'], "_")
}

/// Parse a calendar date, discarding any time-of-day component
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d-%m-%Y"];
    const DATETIME_FORMATS: [&str; 4] = [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
    ];

    if let Some(date) = DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
    {
        return Some(date);
    }
    if let Some(datetime) = DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
    {
        return Some(datetime.date());
    }
    chrono::DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.date_naive())
}

/// Gap-free daily demand series
///
/// Holds one non-negative, finite value per calendar day starting at
/// `start`. Dates are implied by position, so consecutive entries are always
/// exactly one day apart.
#[derive(Debug, Clone, PartialEq)]
pub struct DailySeries {
    start: NaiveDate,
    values: Vec<f64>,
}

impl DailySeries {
    /// Create a series from a start date and one value per day
    pub fn new(start: NaiveDate, values: Vec<f64>) -> Result<Self> {
        if values.is_empty() {
            return Err(ForecastError::DataError(
                "Daily series must contain at least one day".to_string(),
            ));
        }
        if let Some((i, v)) = values
            .iter()
            .enumerate()
            .find(|(_, v)| !v.is_finite() || **v < 0.0)
        {
            return Err(ForecastError::DataError(format!(
                "Invalid demand value {} on {}",
                v,
                start + Duration::days(i as i64)
            )));
        }
        Ok(Self { start, values })
    }

    /// First date in the series
    pub fn start(&self) -> NaiveDate {
        self.start
    }

    /// Last date in the series
    pub fn end(&self) -> NaiveDate {
        self.date_at(self.values.len() - 1)
    }

    /// Date of the entry at `index`
    pub fn date_at(&self, index: usize) -> NaiveDate {
        self.start + Duration::days(index as i64)
    }

    /// Demand values, one per day
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// All dates in order
    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        (0..self.values.len()).map(move |i| self.date_at(i))
    }

    /// `(date, value)` pairs in order
    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, f64)> + '_ {
        self.values
            .iter()
            .enumerate()
            .map(move |(i, v)| (self.date_at(i), *v))
    }

    /// Number of days
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Always false for a constructed series
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Contiguous sub-series `[start, end)`
    pub fn slice(&self, start: usize, end: usize) -> Result<DailySeries> {
        if start >= end || end > self.values.len() {
            return Err(ForecastError::InvalidParameter(format!(
                "Invalid slice [{}, {}) of a {}-day series",
                start,
                end,
                self.values.len()
            )));
        }
        Ok(DailySeries {
            start: self.date_at(start),
            values: self.values[start..end].to_vec(),
        })
    }
}

/// Turns raw records into a `DailySeries`
///
/// Same-day records are averaged (a daily sales *level*, not a total),
/// unparseable dates are dropped, missing quantities count as zero, and
/// calendar days without any record are filled with zero.
#[derive(Debug, Clone)]
pub struct SeriesBuilder {
    horizon: usize,
}

impl SeriesBuilder {
    /// Create a builder that requires more than `horizon` days of data
    pub fn new(horizon: usize) -> Self {
        Self { horizon }
    }

    /// Build the daily series
    pub fn build(&self, records: &[RawRecord]) -> Result<DailySeries> {
        let mut daily: BTreeMap<NaiveDate, (f64, usize)> = BTreeMap::new();
        let mut dropped = 0usize;

        for record in records {
            let Some(date) = record.date.as_deref().and_then(parse_date) else {
                dropped += 1;
                continue;
            };
            let units = record
                .units_sold
                .filter(|v| v.is_finite() && *v >= 0.0)
                .unwrap_or(0.0);
            let entry = daily.entry(date).or_insert((0.0, 0));
            entry.0 += units;
            entry.1 += 1;
        }

        let (Some(first), Some(last)) = (
            daily.keys().next().copied(),
            daily.keys().next_back().copied(),
        ) else {
            return Err(ForecastError::DataError(
                "No records with a valid date".to_string(),
            ));
        };

        let span = (last - first).num_days() as usize + 1;
        if span <= self.horizon {
            return Err(ForecastError::DataError(format!(
                "Need at least {} days of data, found {}",
                self.horizon + 1,
                span
            )));
        }

        let mut values = vec![0.0; span];
        for (date, (sum, count)) in &daily {
            let index = (*date - first).num_days() as usize;
            values[index] = sum / *count as f64;
        }

        debug!(
            records = records.len(),
            dropped,
            observed_days = daily.len(),
            filled_days = span - daily.len(),
            "Built daily series"
        );

        DailySeries::new(first, values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_normalize_column_name() {
        assert_eq!(normalize_column_name("  Units Sold "), "units_sold");
        assert_eq!(normalize_column_name("Holiday/Promotion"), "holiday_promotion");
        assert_eq!(normalize_column_name("Date"), "date");
    }

    #[test]
    fn test_parse_date_formats() {
        assert_eq!(parse_date("2024-03-05"), Some(date("2024-03-05")));
        assert_eq!(parse_date("2024/03/05"), Some(date("2024-03-05")));
        assert_eq!(parse_date("03/05/2024"), Some(date("2024-03-05")));
        assert_eq!(parse_date("2024-03-05 13:45:00"), Some(date("2024-03-05")));
        assert_eq!(parse_date("2024-03-05T13:45:00Z"), Some(date("2024-03-05")));
        assert_eq!(parse_date("not a date"), None);
        assert_eq!(parse_date(""), None);
    }

    #[test]
    fn test_same_day_records_are_averaged() {
        let records = vec![
            RawRecord::new("2024-01-01", Some(10.0)),
            RawRecord::new("2024-01-01", Some(20.0)),
            RawRecord::new("2024-01-02", Some(5.0)),
        ];
        let series = SeriesBuilder::new(1).build(&records).unwrap();
        assert_eq!(series.values(), &[15.0, 5.0]);
    }

    #[test]
    fn test_missing_units_count_as_zero() {
        let records = vec![
            RawRecord::new("2024-01-01", Some(10.0)),
            RawRecord::new("2024-01-01", None),
            RawRecord::new("2024-01-02", Some(4.0)),
        ];
        let series = SeriesBuilder::new(1).build(&records).unwrap();
        assert_eq!(series.values(), &[5.0, 4.0]);
    }

    #[test]
    fn test_bad_dates_are_dropped() {
        let records = vec![
            RawRecord::new("2024-01-01", Some(1.0)),
            RawRecord::new("garbage", Some(1000.0)),
            RawRecord {
                date: None,
                units_sold: Some(1000.0),
            },
            RawRecord::new("2024-01-02", Some(3.0)),
        ];
        let series = SeriesBuilder::new(1).build(&records).unwrap();
        assert_eq!(series.values(), &[1.0, 3.0]);
    }

    #[test]
    fn test_too_few_days() {
        let records = vec![
            RawRecord::new("2024-01-01", Some(1.0)),
            RawRecord::new("2024-01-03", Some(1.0)),
        ];
        let result = SeriesBuilder::new(3).build(&records);
        assert!(matches!(result, Err(ForecastError::DataError(_))));
    }

    #[test]
    fn test_series_rejects_negative_values() {
        assert!(DailySeries::new(date("2024-01-01"), vec![1.0, -1.0]).is_err());
        assert!(DailySeries::new(date("2024-01-01"), vec![f64::NAN]).is_err());
        assert!(DailySeries::new(date("2024-01-01"), vec![]).is_err());
    }

    #[test]
    fn test_slice_keeps_dates_aligned() {
        let series = DailySeries::new(date("2024-01-01"), vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        let tail = series.slice(2, 4).unwrap();
        assert_eq!(tail.start(), date("2024-01-03"));
        assert_eq!(tail.end(), date("2024-01-04"));
        assert_eq!(tail.values(), &[3.0, 4.0]);
        assert!(series.slice(3, 3).is_err());
    }
}

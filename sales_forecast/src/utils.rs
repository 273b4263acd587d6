//! Backtest splitting and calendar helpers

use crate::data::DailySeries;
use crate::error::{ForecastError, Result};
use chrono::{Duration, NaiveDate};

/// Training prefix and held-out suffix of a daily series
#[derive(Debug, Clone, PartialEq)]
pub struct Split {
    /// Everything before the held-out horizon
    pub train: DailySeries,
    /// The last `horizon` days
    pub test: DailySeries,
}

impl Split {
    /// Number of held-out days
    pub fn horizon(&self) -> usize {
        self.test.len()
    }
}

/// Split a series into training data and the last `horizon` days
pub fn train_test_split(series: &DailySeries, horizon: usize) -> Result<Split> {
    if horizon == 0 {
        return Err(ForecastError::InvalidParameter(
            "Backtest horizon must be at least one day".to_string(),
        ));
    }
    if series.len() <= horizon {
        return Err(ForecastError::InsufficientHistoryError {
            horizon,
            available: series.len(),
        });
    }

    let cut = series.len() - horizon;
    Ok(Split {
        train: series.slice(0, cut)?,
        test: series.slice(cut, series.len())?,
    })
}

/// The `horizon` calendar days following `last`
pub fn future_dates(last: NaiveDate, horizon: usize) -> Vec<NaiveDate> {
    (1..=horizon)
        .map(|step| last + Duration::days(step as i64))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(days: usize) -> DailySeries {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        DailySeries::new(start, (0..days).map(|i| i as f64).collect()).unwrap()
    }

    #[test]
    fn test_split_sizes_and_adjacency() {
        let data = series(40);
        let split = train_test_split(&data, 30).unwrap();
        assert_eq!(split.train.len(), 10);
        assert_eq!(split.test.len(), 30);
        assert_eq!(split.horizon(), 30);
        assert_eq!(split.train.end() + Duration::days(1), split.test.start());
        assert_eq!(split.test.end(), data.end());
    }

    #[test]
    fn test_split_requires_more_than_horizon() {
        let result = train_test_split(&series(30), 30);
        assert!(matches!(
            result,
            Err(ForecastError::InsufficientHistoryError {
                horizon: 30,
                available: 30
            })
        ));
    }

    #[test]
    fn test_future_dates() {
        let last = NaiveDate::from_ymd_opt(2024, 2, 28).unwrap();
        let dates = future_dates(last, 3);
        assert_eq!(
            dates,
            vec![
                NaiveDate::from_ymd_opt(2024, 2, 29).unwrap(),
                NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
                NaiveDate::from_ymd_opt(2024, 3, 2).unwrap(),
            ]
        );
    }
}

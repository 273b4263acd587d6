//! Ordinary and seasonal differencing of a series

/// Apply `d` rounds of first differencing.
///
/// Each round shortens the series by one observation. Rounds that would
/// leave fewer than one value stop early.
pub fn difference(series: &[f64], d: usize) -> Vec<f64> {
    let mut result = series.to_vec();
    for _ in 0..d {
        if result.len() <= 1 {
            return Vec::new();
        }
        result = result.windows(2).map(|w| w[1] - w[0]).collect();
    }
    result
}

/// Apply `d` rounds of lag-`period` differencing.
///
/// Each round shortens the series by `period` observations.
pub fn seasonal_difference(series: &[f64], d: usize, period: usize) -> Vec<f64> {
    if period == 0 {
        return series.to_vec();
    }

    let mut result = series.to_vec();
    for _ in 0..d {
        if result.len() <= period {
            return Vec::new();
        }
        result = result
            .iter()
            .skip(period)
            .zip(result.iter())
            .map(|(current, lagged)| current - lagged)
            .collect();
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_difference() {
        let series = [1.0, 3.0, 6.0, 10.0];
        assert_eq!(difference(&series, 1), vec![2.0, 3.0, 4.0]);
        assert_eq!(difference(&series, 2), vec![1.0, 1.0]);
    }

    #[test]
    fn test_zero_order_is_identity() {
        let series = [4.0, 2.0];
        assert_eq!(difference(&series, 0), series.to_vec());
        assert_eq!(seasonal_difference(&series, 0, 7), series.to_vec());
    }

    #[test]
    fn test_seasonal_difference() {
        let series: Vec<f64> = (0..10).map(|i| (i % 3) as f64 + i as f64).collect();
        let diffed = seasonal_difference(&series, 1, 3);
        assert_eq!(diffed.len(), 7);
        // Periodic part cancels, leaving the linear increment over one period
        assert!(diffed.iter().all(|v| (*v - 3.0).abs() < 1e-12));
    }

    #[test]
    fn test_short_series_collapses() {
        assert!(difference(&[1.0], 1).is_empty());
        assert!(seasonal_difference(&[1.0, 2.0], 1, 7).is_empty());
    }
}

//! Fourier series features for periodic components

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// A periodic component expressed as a truncated Fourier series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FourierSeasonality {
    /// Label used in logs and persisted parameters
    pub name: String,
    /// Period in days
    pub period: f64,
    /// Number of sine/cosine pairs
    pub order: usize,
}

impl FourierSeasonality {
    /// Create a new seasonal component
    pub fn new(name: &str, period: f64, order: usize) -> Self {
        Self {
            name: name.to_string(),
            period,
            order,
        }
    }

    /// Number of design columns this component contributes
    pub fn columns(&self) -> usize {
        2 * self.order
    }

    /// Append `sin(2 pi k t / P), cos(2 pi k t / P)` for `k = 1..=order` to `row`
    pub fn extend_row(&self, t: f64, row: &mut Vec<f64>) {
        for k in 1..=self.order {
            let angle = 2.0 * PI * k as f64 * t / self.period;
            row.push(angle.sin());
            row.push(angle.cos());
        }
    }

    /// Features at time `t` (in days)
    pub fn features(&self, t: f64) -> Vec<f64> {
        let mut row = Vec::with_capacity(self.columns());
        self.extend_row(t, &mut row);
        row
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_feature_layout() {
        let weekly = FourierSeasonality::new("weekly", 7.0, 3);
        let row = weekly.features(0.0);
        assert_eq!(row.len(), 6);
        assert_eq!(row, vec![0.0, 1.0, 0.0, 1.0, 0.0, 1.0]);
    }

    #[test]
    fn test_features_repeat_each_period() {
        let weekly = FourierSeasonality::new("weekly", 7.0, 2);
        let a = weekly.features(3.0);
        let b = weekly.features(10.0);
        for (x, y) in a.iter().zip(b.iter()) {
            assert_relative_eq!(x, y, epsilon = 1e-9);
        }
    }
}

//! Penalised weighted least squares

use crate::{MathError, Result};

/// Solve `min sum_i w_i (y_i - x_i . beta)^2 + sum_j penalty_j beta_j^2`.
///
/// `design` holds one row per observation. Observations with a zero or
/// non-finite weight, or a non-finite response, are skipped.
pub fn weighted_ridge(
    design: &[Vec<f64>],
    response: &[f64],
    weights: &[f64],
    penalties: &[f64],
) -> Result<Vec<f64>> {
    if design.len() != response.len() || design.len() != weights.len() {
        return Err(MathError::InvalidInput(format!(
            "Design has {} rows but response has {} values and weights {}",
            design.len(),
            response.len(),
            weights.len()
        )));
    }

    let k = penalties.len();
    if k == 0 {
        return Err(MathError::InvalidInput(
            "Regression needs at least one column".to_string(),
        ));
    }

    let mut xtx = vec![vec![0.0; k]; k];
    let mut xty = vec![0.0; k];

    for ((row, &y), &w) in design.iter().zip(response).zip(weights) {
        if !(w.is_finite() && w > 0.0 && y.is_finite()) {
            continue;
        }
        if row.len() != k {
            return Err(MathError::InvalidInput(format!(
                "Design row has {} columns, expected {}",
                row.len(),
                k
            )));
        }
        for i in 0..k {
            let wxi = w * row[i];
            xty[i] += wxi * y;
            for j in 0..=i {
                xtx[i][j] += wxi * row[j];
            }
        }
    }

    for i in 0..k {
        for j in 0..i {
            xtx[j][i] = xtx[i][j];
        }
        xtx[i][i] += penalties[i];
    }

    solve_symmetric(&xtx, &xty).ok_or_else(|| {
        MathError::CalculationError("Normal equations are not positive definite".to_string())
    })
}

/// Huber weights for IRLS: `min(1, threshold * scale / |r|)`.
pub fn huber_weights(residuals: &[f64], scale: f64, threshold: f64) -> Vec<f64> {
    let cutoff = threshold * scale;
    residuals
        .iter()
        .map(|r| {
            if !r.is_finite() {
                0.0
            } else if r.abs() <= cutoff || cutoff <= 0.0 {
                1.0
            } else {
                cutoff / r.abs()
            }
        })
        .collect()
}

/// Cholesky solve of a symmetric positive definite system
fn solve_symmetric(a: &[Vec<f64>], b: &[f64]) -> Option<Vec<f64>> {
    let n = b.len();
    let mut l = vec![vec![0.0; n]; n];

    for i in 0..n {
        for j in 0..=i {
            let mut sum = a[i][j];
            for k in 0..j {
                sum -= l[i][k] * l[j][k];
            }
            if i == j {
                if sum <= 0.0 || !sum.is_finite() {
                    return None;
                }
                l[i][j] = sum.sqrt();
            } else {
                l[i][j] = sum / l[j][j];
            }
        }
    }

    let mut y = vec![0.0; n];
    for i in 0..n {
        let mut sum = b[i];
        for j in 0..i {
            sum -= l[i][j] * y[j];
        }
        y[i] = sum / l[i][i];
    }

    let mut x = vec![0.0; n];
    for i in (0..n).rev() {
        let mut sum = y[i];
        for j in (i + 1)..n {
            sum -= l[j][i] * x[j];
        }
        x[i] = sum / l[i][i];
    }

    Some(x)
}

//! Reparameterisation that keeps autoregressive coefficients stationary
//!
//! An AR(p) polynomial is stationary exactly when all of its partial
//! autocorrelations lie strictly inside (-1, 1). Optimisers can therefore
//! search an unconstrained space, squash each coordinate into (-1, 1) and
//! run the Durbin-Levinson recursion to obtain AR coefficients.

/// Map unconstrained values to the coefficients of a stationary AR process.
///
/// The coefficients use the convention `y_t = phi_1 y_{t-1} + ... + e_t`.
pub fn constrain_stationary(unconstrained: &[f64]) -> Vec<f64> {
    let pacf: Vec<f64> = unconstrained
        .iter()
        .map(|x| x / (1.0 + x * x).sqrt())
        .collect();
    pacf_to_ar(&pacf)
}

/// Durbin-Levinson recursion from partial autocorrelations to AR coefficients.
pub fn pacf_to_ar(pacf: &[f64]) -> Vec<f64> {
    let mut phi: Vec<f64> = Vec::with_capacity(pacf.len());
    for (k, &r) in pacf.iter().enumerate() {
        let previous = phi.clone();
        for i in 0..k {
            phi[i] = previous[i] - r * previous[k - 1 - i];
        }
        phi.push(r);
    }
    phi
}

/// Step-down recursion from AR coefficients back to partial autocorrelations.
///
/// Returns `None` when an intermediate partial autocorrelation reaches
/// magnitude one, which means the polynomial is not stationary.
pub fn ar_to_pacf(phi: &[f64]) -> Option<Vec<f64>> {
    let mut current = phi.to_vec();
    let mut pacf = vec![0.0; phi.len()];
    for k in (0..phi.len()).rev() {
        let r = current[k];
        pacf[k] = r;
        if r.abs() >= 1.0 || !r.is_finite() {
            return None;
        }
        let denom = 1.0 - r * r;
        let previous = current.clone();
        current.truncate(k);
        for i in 0..k {
            current[i] = (previous[i] + r * previous[k - 1 - i]) / denom;
        }
    }
    Some(pacf)
}

/// Whether `y_t = sum phi_i y_{t-i} + e_t` is a stationary process
pub fn is_stationary(phi: &[f64]) -> bool {
    ar_to_pacf(phi).is_some()
}

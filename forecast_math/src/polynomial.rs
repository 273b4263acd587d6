//! Polynomials in the backshift (lag) operator
//!
//! A `LagPolynomial` with coefficients `[c0, c1, c2, ...]` stands for
//! `c0 + c1 B + c2 B^2 + ...` where `B y_t = y_{t-1}`. Seasonal ARIMA models
//! are products of such polynomials, so multiplication is the core operation.

/// Polynomial in the lag operator
#[derive(Debug, Clone, PartialEq)]
pub struct LagPolynomial {
    coefficients: Vec<f64>,
}

impl LagPolynomial {
    /// Create a polynomial from raw coefficients, lowest lag first
    pub fn new(coefficients: Vec<f64>) -> Self {
        if coefficients.is_empty() {
            return Self::one();
        }
        Self { coefficients }
    }

    /// The identity polynomial `1`
    pub fn one() -> Self {
        Self {
            coefficients: vec![1.0],
        }
    }

    /// Autoregressive operator `1 - phi_1 B - ... - phi_p B^p`
    pub fn autoregressive(phi: &[f64]) -> Self {
        Self::seasonal_autoregressive(phi, 1)
    }

    /// Moving-average operator `1 + theta_1 B + ... + theta_q B^q`
    pub fn moving_average(theta: &[f64]) -> Self {
        Self::seasonal_moving_average(theta, 1)
    }

    /// Seasonal autoregressive operator `1 - Phi_1 B^s - ... - Phi_P B^{Ps}`
    pub fn seasonal_autoregressive(phi: &[f64], period: usize) -> Self {
        let period = period.max(1);
        let mut coefficients = vec![0.0; phi.len() * period + 1];
        coefficients[0] = 1.0;
        for (i, value) in phi.iter().enumerate() {
            coefficients[(i + 1) * period] = -value;
        }
        Self { coefficients }
    }

    /// Seasonal moving-average operator `1 + Theta_1 B^s + ... + Theta_Q B^{Qs}`
    pub fn seasonal_moving_average(theta: &[f64], period: usize) -> Self {
        let period = period.max(1);
        let mut coefficients = vec![0.0; theta.len() * period + 1];
        coefficients[0] = 1.0;
        for (i, value) in theta.iter().enumerate() {
            coefficients[(i + 1) * period] = *value;
        }
        Self { coefficients }
    }

    /// Differencing operator `(1 - B)^d`
    pub fn differencing(d: usize) -> Self {
        Self::seasonal_differencing(d, 1)
    }

    /// Seasonal differencing operator `(1 - B^s)^d`
    pub fn seasonal_differencing(d: usize, period: usize) -> Self {
        let base = Self::seasonal_autoregressive(&[1.0], period);
        (0..d).fold(Self::one(), |acc, _| acc.multiply(&base))
    }

    /// Product of two lag polynomials
    pub fn multiply(&self, other: &LagPolynomial) -> LagPolynomial {
        let mut coefficients = vec![0.0; self.coefficients.len() + other.coefficients.len() - 1];
        for (i, a) in self.coefficients.iter().enumerate() {
            if *a == 0.0 {
                continue;
            }
            for (j, b) in other.coefficients.iter().enumerate() {
                coefficients[i + j] += a * b;
            }
        }
        LagPolynomial { coefficients }
    }

    /// Highest lag with a stored coefficient
    pub fn degree(&self) -> usize {
        self.coefficients.len() - 1
    }

    /// Coefficients, lowest lag first
    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    /// Coefficient at `lag`, zero beyond the degree
    pub fn coefficient(&self, lag: usize) -> f64 {
        self.coefficients.get(lag).copied().unwrap_or(0.0)
    }

    /// Evaluate the polynomial at `x`
    pub fn evaluate(&self, x: f64) -> f64 {
        self.coefficients
            .iter()
            .rev()
            .fold(0.0, |acc, c| acc * x + c)
    }
}

/// First `count` weights of the MA(infinity) representation `ma(B) / ar(B)`.
///
/// The forecast error variance at horizon `h` is `sigma^2 * sum(psi_j^2, j < h)`.
pub fn psi_weights(ar: &LagPolynomial, ma: &LagPolynomial, count: usize) -> Vec<f64> {
    let mut psi = Vec::with_capacity(count);
    let lead = ar.coefficient(0);
    for j in 0..count {
        let mut value = ma.coefficient(j);
        for i in 1..=j.min(ar.degree()) {
            value -= ar.coefficient(i) * psi[j - i];
        }
        psi.push(value / lead);
    }
    psi
}

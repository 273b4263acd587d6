//! # Forecast Math
//!
//! Numerical building blocks shared by the demand forecasting models.
//! This crate provides differencing, lag-polynomial algebra, derivative-free
//! optimisation, penalised least squares, Fourier seasonal features and a
//! handful of descriptive statistics.

use thiserror::Error;

pub mod differencing;
pub mod fourier;
pub mod optimization;
pub mod polynomial;
pub mod regression;
pub mod stationarity;
pub mod statistics;

/// Errors that can occur in numerical routines
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MathError {
    #[error("Insufficient data for calculation: {0}")]
    InsufficientData(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Calculation error: {0}")]
    CalculationError(String),
}

/// Result type for numerical operations
pub type Result<T> = std::result::Result<T, MathError>;

pub use differencing::{difference, seasonal_difference};
pub use fourier::FourierSeasonality;
pub use optimization::{nelder_mead, NelderMeadConfig, NelderMeadResult, Termination};
pub use polynomial::LagPolynomial;
pub use regression::{huber_weights, weighted_ridge};
pub use stationarity::constrain_stationary;

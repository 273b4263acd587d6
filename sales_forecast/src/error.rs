//! Error types for the sales_forecast crate

use crate::models::ModelKind;
use polars::prelude::PolarsError;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// A model that was excluded from a run, and why
#[derive(Debug, Clone, PartialEq)]
pub struct ModelFailure {
    /// Model that failed
    pub model: ModelKind,
    /// Human readable cause
    pub reason: String,
}

impl ModelFailure {
    /// Create a new failure record
    pub fn new(model: ModelKind, reason: impl Into<String>) -> Self {
        Self {
            model,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for ModelFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.model, self.reason)
    }
}

/// Custom error types for the sales_forecast crate
#[derive(Debug, Error)]
pub enum ForecastError {
    /// Raw input is unreadable, malformed or too short
    #[error("Data error: {0}")]
    DataError(String),

    /// Series too short to hold out a backtest horizon
    #[error("Insufficient history: need more than {horizon} days, got {available}")]
    InsufficientHistoryError { horizon: usize, available: usize },

    /// One model variant could not be estimated
    #[error("{model} failed to converge: {reason}")]
    ConvergenceError { model: ModelKind, reason: String },

    /// Every model variant failed
    #[error("No viable model: {}", describe_failures(.0))]
    NoViableModelError(Vec<ModelFailure>),

    /// Writing an artifact failed
    #[error("Persistence error for {}: {message}", .path.display())]
    PersistenceError { path: PathBuf, message: String },

    /// Error from invalid parameters
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Error in pipeline configuration
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Error from IO operations
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Error from Polars operations
    #[error("Polars error: {0}")]
    PolarsError(String),

    /// Error from CSV reading or writing
    #[error("CSV error: {0}")]
    CsvError(String),

    /// Error from the numerical routines
    #[error("Math error: {0}")]
    MathError(#[from] forecast_math::MathError),
}

impl ForecastError {
    /// Convergence failure attributed to `model`
    pub fn convergence(model: ModelKind, reason: impl Into<String>) -> Self {
        ForecastError::ConvergenceError {
            model,
            reason: reason.into(),
        }
    }

    /// Whether the error only disqualifies a single model
    pub fn is_model_local(&self) -> bool {
        matches!(self, ForecastError::ConvergenceError { .. })
    }
}

fn describe_failures(failures: &[ModelFailure]) -> String {
    if failures.is_empty() {
        return "no models were evaluated".to_string();
    }
    failures
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, ForecastError>;

impl From<PolarsError> for ForecastError {
    fn from(err: PolarsError) -> Self {
        ForecastError::PolarsError(err.to_string())
    }
}

impl From<csv::Error> for ForecastError {
    fn from(err: csv::Error) -> Self {
        ForecastError::CsvError(err.to_string())
    }
}

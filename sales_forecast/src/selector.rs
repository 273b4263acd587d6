//! Choosing the model with the lowest backtest error

use crate::models::ModelKind;
use std::cmp::Ordering;
use std::fmt;

/// Backtest score of one model
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelScore {
    /// Scored model
    pub model: ModelKind,
    /// Root-mean-squared error on the held-out horizon
    pub rmse: f64,
}

impl ModelScore {
    /// Create a new score
    pub fn new(model: ModelKind, rmse: f64) -> Self {
        Self { model, rmse }
    }
}

impl fmt::Display for ModelScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:<22} RMSE {:.4}", self.model.name(), self.rmse)
    }
}

/// Scores with a finite RMSE, best first.
///
/// Ties on RMSE go to the model earlier in [`ModelKind::ALL`].
pub fn rank_models(scores: &[ModelScore]) -> Vec<ModelScore> {
    let mut ranked: Vec<ModelScore> = scores
        .iter()
        .copied()
        .filter(|s| s.rmse.is_finite())
        .collect();
    ranked.sort_by(compare_scores);
    ranked
}

/// Model with the lowest RMSE, `None` if no score is usable
pub fn select_best(scores: &[ModelScore]) -> Option<ModelKind> {
    scores
        .iter()
        .filter(|s| s.rmse.is_finite())
        .min_by(|a, b| compare_scores(a, b))
        .map(|s| s.model)
}

fn compare_scores(a: &ModelScore, b: &ModelScore) -> Ordering {
    a.rmse
        .total_cmp(&b.rmse)
        .then_with(|| a.model.preference().cmp(&b.model.preference()))
}

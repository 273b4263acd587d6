//! Derivative-free minimisation
//!
//! Nelder-Mead simplex search with a hard iteration cap and an optional
//! wall-clock deadline, so a pathological objective cannot stall a caller.

use std::cmp::Ordering;
use std::time::Instant;

/// Why the search stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Both the spread of function values and the simplex size fell below tolerance
    Converged,
    /// Iteration cap reached first
    MaxIterations,
    /// Wall-clock deadline passed first
    Deadline,
}

/// Outcome of a Nelder-Mead search
#[derive(Debug, Clone)]
pub struct NelderMeadResult {
    /// Best point found
    pub point: Vec<f64>,
    /// Objective value at `point`
    pub value: f64,
    /// Iterations performed
    pub iterations: usize,
    /// Reason the search stopped
    pub termination: Termination,
}

impl NelderMeadResult {
    /// Whether the search met its tolerance
    pub fn converged(&self) -> bool {
        self.termination == Termination::Converged
    }
}

/// Tuning for the simplex search
#[derive(Debug, Clone)]
pub struct NelderMeadConfig {
    /// Maximum number of iterations
    pub max_iter: usize,
    /// Relative tolerance on the spread of simplex values
    pub tolerance: f64,
    /// Absolute tolerance on the simplex diameter
    pub x_tolerance: f64,
    /// Step used to build the initial simplex
    pub initial_step: f64,
    /// Stop once this instant has passed
    pub deadline: Option<Instant>,
}

impl Default for NelderMeadConfig {
    fn default() -> Self {
        Self {
            max_iter: 10_000,
            tolerance: 1e-10,
            x_tolerance: 1e-8,
            initial_step: 0.1,
            deadline: None,
        }
    }
}

const REFLECTION: f64 = 1.0;
const EXPANSION: f64 = 2.0;
const CONTRACTION: f64 = 0.5;
const SHRINK: f64 = 0.5;

/// Minimise `objective` starting from `initial`.
///
/// Non-finite objective values are treated as `+inf`, so the simplex walks
/// away from regions where the objective blows up.
pub fn nelder_mead<F>(objective: F, initial: &[f64], config: &NelderMeadConfig) -> NelderMeadResult
where
    F: Fn(&[f64]) -> f64,
{
    let evaluate = |x: &[f64]| {
        let value = objective(x);
        if value.is_finite() {
            value
        } else {
            f64::INFINITY
        }
    };

    let n = initial.len();
    if n == 0 {
        return NelderMeadResult {
            point: Vec::new(),
            value: evaluate(initial),
            iterations: 0,
            termination: Termination::Converged,
        };
    }

    let mut simplex: Vec<Vec<f64>> = Vec::with_capacity(n + 1);
    simplex.push(initial.to_vec());
    for i in 0..n {
        let mut vertex = initial.to_vec();
        let step = if initial[i].abs() > 1e-8 {
            config.initial_step * initial[i].abs()
        } else {
            config.initial_step
        };
        vertex[i] += step;
        simplex.push(vertex);
    }
    let mut values: Vec<f64> = simplex.iter().map(|v| evaluate(v)).collect();

    let mut iterations = 0;
    let termination = loop {
        order_simplex(&mut simplex, &mut values);

        let best = values[0];
        let worst = values[n];
        let spread = worst - best;
        let values_close =
            spread.is_finite() && spread <= config.tolerance * (best.abs() + config.tolerance);
        if values_close && simplex_diameter(&simplex) <= config.x_tolerance {
            break Termination::Converged;
        }
        if iterations >= config.max_iter {
            break Termination::MaxIterations;
        }
        if config.deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            break Termination::Deadline;
        }
        iterations += 1;

        let centroid = centroid_without(&simplex, n);
        let reflected = along(&centroid, &simplex[n], -REFLECTION);
        let reflected_value = evaluate(&reflected);

        if reflected_value < values[0] {
            let expanded = along(&centroid, &simplex[n], -EXPANSION);
            let expanded_value = evaluate(&expanded);
            if expanded_value < reflected_value {
                simplex[n] = expanded;
                values[n] = expanded_value;
            } else {
                simplex[n] = reflected;
                values[n] = reflected_value;
            }
            continue;
        }

        if reflected_value < values[n - 1] {
            simplex[n] = reflected;
            values[n] = reflected_value;
            continue;
        }

        let (contracted, contracted_value) = if reflected_value < values[n] {
            let outside = along(&centroid, &simplex[n], -CONTRACTION);
            let value = evaluate(&outside);
            (outside, value)
        } else {
            let inside = along(&centroid, &simplex[n], CONTRACTION);
            let value = evaluate(&inside);
            (inside, value)
        };

        if contracted_value < values[n].min(reflected_value) {
            simplex[n] = contracted;
            values[n] = contracted_value;
            continue;
        }

        // Shrink every vertex towards the best one
        let best_vertex = simplex[0].clone();
        for i in 1..=n {
            for (x, b) in simplex[i].iter_mut().zip(best_vertex.iter()) {
                *x = b + SHRINK * (*x - b);
            }
            values[i] = evaluate(&simplex[i]);
        }
    };

    order_simplex(&mut simplex, &mut values);
    NelderMeadResult {
        point: simplex.swap_remove(0),
        value: values[0],
        iterations,
        termination,
    }
}

fn order_simplex(simplex: &mut Vec<Vec<f64>>, values: &mut Vec<f64>) {
    let mut indices: Vec<usize> = (0..values.len()).collect();
    indices.sort_by(|&a, &b| values[a].partial_cmp(&values[b]).unwrap_or(Ordering::Equal));
    *simplex = indices.iter().map(|&i| simplex[i].clone()).collect();
    *values = indices.iter().map(|&i| values[i]).collect();
}

fn centroid_without(simplex: &[Vec<f64>], excluded: usize) -> Vec<f64> {
    let n = simplex[0].len();
    let mut centroid = vec![0.0; n];
    for (i, vertex) in simplex.iter().enumerate() {
        if i == excluded {
            continue;
        }
        for (c, x) in centroid.iter_mut().zip(vertex.iter()) {
            *c += x;
        }
    }
    let count = (simplex.len() - 1) as f64;
    centroid.iter_mut().for_each(|c| *c /= count);
    centroid
}

/// `centroid + coefficient * (vertex - centroid)`
fn along(centroid: &[f64], vertex: &[f64], coefficient: f64) -> Vec<f64> {
    centroid
        .iter()
        .zip(vertex.iter())
        .map(|(c, v)| c + coefficient * (v - c))
        .collect()
}

fn simplex_diameter(simplex: &[Vec<f64>]) -> f64 {
    let best = &simplex[0];
    simplex[1..]
        .iter()
        .map(|vertex| {
            vertex
                .iter()
                .zip(best.iter())
                .map(|(a, b)| (a - b).abs())
                .fold(0.0, f64::max)
        })
        .fold(0.0, f64::max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_minimises_quadratic() {
        let result = nelder_mead(
            |x| (x[0] - 2.0).powi(2) + (x[1] + 1.0).powi(2),
            &[0.0, 0.0],
            &NelderMeadConfig::default(),
        );
        assert!(result.converged());
        assert!((result.point[0] - 2.0).abs() < 1e-4);
        assert!((result.point[1] + 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_flat_objective_converges_by_shrinking() {
        let result = nelder_mead(|_| 0.0, &[0.0, 0.0, 0.0], &NelderMeadConfig::default());
        assert!(result.converged());
        assert!(result.iterations > 0 && result.iterations < 100);
        assert_eq!(result.value, 0.0);
    }

    #[test]
    fn test_equal_values_around_minimum_do_not_stop_search() {
        // Vertices can sit either side of the minimum with equal values
        let result = nelder_mead(|x| (x[0] - 1.0).powi(2), &[0.5], &NelderMeadConfig::default());
        assert!(result.converged());
        assert!((result.point[0] - 1.0).abs() < 1e-4);
        assert!(result.value < 1e-8);
    }

    #[test]
    fn test_iteration_cap() {
        let config = NelderMeadConfig {
            max_iter: 3,
            ..Default::default()
        };
        let result = nelder_mead(|x| (x[0] - 100.0).powi(2), &[0.0], &config);
        assert_eq!(result.termination, Termination::MaxIterations);
        assert_eq!(result.iterations, 3);
    }

    #[test]
    fn test_expired_deadline_stops_search() {
        let config = NelderMeadConfig {
            deadline: Instant::now().checked_sub(Duration::from_millis(1)),
            ..Default::default()
        };
        let result = nelder_mead(|x| (x[0] - 5.0).powi(2), &[0.0], &config);
        assert_eq!(result.termination, Termination::Deadline);
    }

    #[test]
    fn test_non_finite_values_are_avoided() {
        let result = nelder_mead(
            |x| if x[0] < 0.0 { f64::NAN } else { (x[0] - 1.0).powi(2) },
            &[0.5],
            &NelderMeadConfig::default(),
        );
        assert!(result.value.is_finite());
        assert!((result.point[0] - 1.0).abs() < 1e-4);
    }
}

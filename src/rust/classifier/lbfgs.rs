use std::collections::VecDeque;

use log::{debug, warn};
use ndarray::Array1;

use super::error::ClassifierError;

/// Settings for the limited-memory BFGS minimizer.
#[derive(Debug, Clone)]
pub struct LbfgsConfig {
    /// Number of correction pairs kept for the inverse Hessian estimate
    pub history: usize,
    pub max_iterations: usize,
    /// Stop once the largest absolute gradient component falls below this
    pub gradient_tolerance: f64,
    /// Stop once the relative decrease of the objective falls below this
    pub function_tolerance: f64,
    /// Maximum step halvings per line search
    pub max_line_search: usize,
}

impl Default for LbfgsConfig {
    fn default() -> Self {
        Self {
            history: 10,
            max_iterations: 100,
            gradient_tolerance: 1e-4,
            function_tolerance: 2.220446049250313e-9,
            max_line_search: 30,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LbfgsOutcome {
    pub x: Array1<f64>,
    pub value: f64,
    pub iterations: usize,
    pub converged: bool,
}

const ARMIJO_C1: f64 = 1e-4;

/// Minimizes a smooth convex objective.
///
/// `objective(x, grad)` must return `f(x)` and write `∇f(x)` into `grad`.
/// Hitting `max_iterations` is not an error: the best point so far is returned
/// with `converged == false`.
pub fn minimize<F>(
    mut objective: F,
    x0: Array1<f64>,
    config: &LbfgsConfig,
) -> Result<LbfgsOutcome, ClassifierError>
where
    F: FnMut(&Array1<f64>, &mut Array1<f64>) -> f64,
{
    let n = x0.len();
    let mut x = x0;
    let mut grad = Array1::zeros(n);
    let mut value = objective(&x, &mut grad);
    check_finite(value)?;

    let mut history: VecDeque<(Array1<f64>, Array1<f64>, f64)> = VecDeque::with_capacity(config.history);
    let mut iterations = 0;

    while iterations < config.max_iterations {
        if max_abs(&grad) <= config.gradient_tolerance {
            debug!("L-BFGS converged on gradient after {} iterations", iterations);
            return Ok(LbfgsOutcome { x, value, iterations, converged: true });
        }

        let mut direction = two_loop_direction(&grad, &history);
        let mut slope = direction.dot(&grad);
        if slope >= 0.0 {
            // Curvature information went stale; restart from steepest descent.
            history.clear();
            direction = -&grad;
            slope = direction.dot(&grad);
        }

        let mut step = if history.is_empty() {
            (1.0 / l2_norm(&grad)).min(1.0)
        } else {
            1.0
        };

        let mut new_grad = Array1::zeros(n);
        let mut accepted = None;
        for _ in 0..config.max_line_search {
            let candidate = &x + &(&direction * step);
            let candidate_value = objective(&candidate, &mut new_grad);
            if candidate_value.is_finite() && candidate_value <= value + ARMIJO_C1 * step * slope {
                accepted = Some((candidate, candidate_value));
                break;
            }
            step *= 0.5;
        }

        let Some((new_x, new_value)) = accepted else {
            warn!("L-BFGS line search failed after {} iterations; keeping current point", iterations);
            return Ok(LbfgsOutcome { x, value, iterations, converged: false });
        };

        iterations += 1;
        let s = &new_x - &x;
        let y = &new_grad - &grad;
        let sy = s.dot(&y);
        if sy > 1e-10 {
            if history.len() == config.history {
                history.pop_front();
            }
            history.push_back((s, y, 1.0 / sy));
        }

        let decrease = (value - new_value) / value.abs().max(new_value.abs()).max(1.0);
        x = new_x;
        grad = new_grad;
        value = new_value;

        if decrease <= config.function_tolerance {
            debug!("L-BFGS converged on objective after {} iterations", iterations);
            return Ok(LbfgsOutcome { x, value, iterations, converged: true });
        }
    }

    let converged = max_abs(&grad) <= config.gradient_tolerance;
    if !converged {
        warn!(
            "L-BFGS stopped after {} iterations without converging (max |grad| = {:.3e})",
            iterations,
            max_abs(&grad)
        );
    }
    Ok(LbfgsOutcome { x, value, iterations, converged })
}

fn two_loop_direction(
    grad: &Array1<f64>,
    history: &VecDeque<(Array1<f64>, Array1<f64>, f64)>,
) -> Array1<f64> {
    let mut q = grad.clone();
    let mut alphas = Vec::with_capacity(history.len());
    for (s, y, rho) in history.iter().rev() {
        let alpha = rho * s.dot(&q);
        q.scaled_add(-alpha, y);
        alphas.push(alpha);
    }

    if let Some((s, y, _)) = history.back() {
        let gamma = s.dot(y) / y.dot(y);
        q *= gamma;
    }

    for ((s, y, rho), alpha) in history.iter().zip(alphas.into_iter().rev()) {
        let beta = rho * y.dot(&q);
        q.scaled_add(alpha - beta, s);
    }
    -q
}

fn check_finite(value: f64) -> Result<(), ClassifierError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ClassifierError::ModelError(format!(
            "Objective is not finite at the starting point ({})",
            value
        )))
    }
}

fn max_abs(v: &Array1<f64>) -> f64 {
    v.iter().fold(0.0, |m, x| m.max(x.abs()))
}

fn l2_norm(v: &Array1<f64>) -> f64 {
    v.dot(v).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimizes_scaled_quadratic() {
        // f(x) = Σ (i + 1) (x_i - i)^2
        let objective = |x: &Array1<f64>, g: &mut Array1<f64>| {
            let mut f = 0.0;
            for i in 0..x.len() {
                let w = (i + 1) as f64;
                let d = x[i] - i as f64;
                f += w * d * d;
                g[i] = 2.0 * w * d;
            }
            f
        };
        let config = LbfgsConfig {
            gradient_tolerance: 1e-8,
            function_tolerance: 0.0,
            ..LbfgsConfig::default()
        };
        let outcome = minimize(objective, Array1::zeros(6), &config).unwrap();
        assert!(outcome.converged);
        for i in 0..6 {
            assert!((outcome.x[i] - i as f64).abs() < 1e-5, "x[{}] = {}", i, outcome.x[i]);
        }
    }

    #[test]
    fn test_minimizes_rosenbrock() {
        let objective = |x: &Array1<f64>, g: &mut Array1<f64>| {
            let (a, b) = (x[0], x[1]);
            g[0] = -2.0 * (1.0 - a) - 400.0 * a * (b - a * a);
            g[1] = 200.0 * (b - a * a);
            (1.0 - a).powi(2) + 100.0 * (b - a * a).powi(2)
        };
        let config = LbfgsConfig {
            max_iterations: 500,
            gradient_tolerance: 1e-6,
            function_tolerance: 0.0,
            ..LbfgsConfig::default()
        };
        let outcome = minimize(objective, ndarray::array![-1.2, 1.0], &config).unwrap();
        assert!((outcome.x[0] - 1.0).abs() < 1e-3);
        assert!((outcome.x[1] - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_stops_at_iteration_limit() {
        let objective = |x: &Array1<f64>, g: &mut Array1<f64>| {
            g[0] = 2.0 * (x[0] - 3.0);
            (x[0] - 3.0).powi(2)
        };
        let config = LbfgsConfig {
            max_iterations: 0,
            ..LbfgsConfig::default()
        };
        let outcome = minimize(objective, Array1::zeros(1), &config).unwrap();
        assert_eq!(outcome.iterations, 0);
        assert!(!outcome.converged);
    }

    #[test]
    fn test_rejects_non_finite_start() {
        let objective = |_: &Array1<f64>, _: &mut Array1<f64>| f64::NAN;
        assert!(minimize(objective, Array1::zeros(2), &LbfgsConfig::default()).is_err());
    }
}

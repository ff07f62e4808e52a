use log::info;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use super::error::ClassifierError;
use super::lbfgs::{minimize, LbfgsConfig};
use super::utils::{log_sum_exp, softmax};
use super::vectorizer::SparseVector;

/// Multinomial (softmax) logistic regression over sparse feature rows.
///
/// `weights` has shape `(classes, features)`; `intercept` has one entry per class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultinomialLogisticRegression {
    weights: Array2<f64>,
    intercept: Array1<f64>,
}

impl MultinomialLogisticRegression {
    pub fn new(weights: Array2<f64>, intercept: Array1<f64>) -> Result<Self, ClassifierError> {
        let model = Self { weights, intercept };
        model.validate()?;
        Ok(model)
    }

    pub fn nb_classes(&self) -> usize {
        self.weights.nrows()
    }

    pub fn nb_features(&self) -> usize {
        self.weights.ncols()
    }

    pub fn weights(&self) -> &Array2<f64> {
        &self.weights
    }

    pub fn intercept(&self) -> &Array1<f64> {
        &self.intercept
    }

    /// Fits the model by minimizing `C · Σ cross-entropy + ½‖W‖²` with L-BFGS.
    ///
    /// The intercept is not penalized. Parameters start at zero, so the fit is
    /// fully determined by the data and settings.
    pub fn fit(
        rows: &[SparseVector],
        targets: &[usize],
        nb_classes: usize,
        nb_features: usize,
        c: f64,
        solver: &LbfgsConfig,
    ) -> Result<Self, ClassifierError> {
        if rows.len() != targets.len() {
            return Err(ClassifierError::ModelError(format!(
                "Got {} feature rows but {} targets",
                rows.len(),
                targets.len()
            )));
        }
        if rows.is_empty() {
            return Err(ClassifierError::BuildError("No training rows".into()));
        }
        if nb_classes < 2 {
            return Err(ClassifierError::BuildError(format!(
                "At least two classes are required, got {}",
                nb_classes
            )));
        }
        if !(c > 0.0 && c.is_finite()) {
            return Err(ClassifierError::ValidationError(format!(
                "Regularization strength must be positive, got {}",
                c
            )));
        }
        if let Some(&bad) = targets.iter().find(|&&t| t >= nb_classes) {
            return Err(ClassifierError::ModelError(format!(
                "Target {} out of range for {} classes",
                bad, nb_classes
            )));
        }
        if let Some(bad) = rows.iter().flat_map(|r| r.indices.iter()).find(|&&i| i >= nb_features) {
            return Err(ClassifierError::ModelError(format!(
                "Feature index {} out of range for {} features",
                bad, nb_features
            )));
        }

        info!(
            "Fitting multinomial logistic regression: {} rows, {} classes, {} features, C = {}",
            rows.len(),
            nb_classes,
            nb_features,
            c
        );

        let layout = Layout { nb_classes, nb_features };
        let objective = |params: &Array1<f64>, grad: &mut Array1<f64>| {
            penalized_loss(params, grad, rows, targets, &layout, c)
        };
        let outcome = minimize(objective, Array1::zeros(layout.len()), solver)?;
        info!(
            "Solver finished after {} iterations (loss = {:.6}, converged = {})",
            outcome.iterations, outcome.value, outcome.converged
        );

        let (weights, intercept) = layout.unpack(&outcome.x);
        Self::new(weights, intercept)
    }

    /// Raw linear scores, one per class.
    pub fn decision_function(&self, features: &SparseVector) -> Result<Array1<f64>, ClassifierError> {
        if let Some(&bad) = features.indices.iter().find(|&&i| i >= self.nb_features()) {
            return Err(ClassifierError::PredictionError(format!(
                "Feature index {} out of range for {} features",
                bad,
                self.nb_features()
            )));
        }
        Ok(Array1::from_iter(
            self.weights
                .outer_iter()
                .zip(self.intercept.iter())
                .map(|(row, &b)| b + features.dot(row)),
        ))
    }

    /// Class probabilities: softmax of the decision scores.
    pub fn predict_proba(&self, features: &SparseVector) -> Result<Array1<f64>, ClassifierError> {
        Ok(softmax(&self.decision_function(features)?))
    }

    pub(crate) fn validate(&self) -> Result<(), ClassifierError> {
        if self.weights.nrows() != self.intercept.len() {
            return Err(ClassifierError::ModelError(format!(
                "Weight matrix has {} rows but intercept has {} entries",
                self.weights.nrows(),
                self.intercept.len()
            )));
        }
        if self.weights.iter().chain(self.intercept.iter()).any(|w| !w.is_finite()) {
            return Err(ClassifierError::ModelError("Model contains non-finite weights".into()));
        }
        Ok(())
    }
}

/// Flat parameter layout: class-major weights followed by one intercept per class.
struct Layout {
    nb_classes: usize,
    nb_features: usize,
}

impl Layout {
    fn len(&self) -> usize {
        self.nb_classes * (self.nb_features + 1)
    }

    fn weight(&self, class: usize, feature: usize) -> usize {
        class * self.nb_features + feature
    }

    fn bias(&self, class: usize) -> usize {
        self.nb_classes * self.nb_features + class
    }

    fn unpack(&self, params: &Array1<f64>) -> (Array2<f64>, Array1<f64>) {
        let weights = Array2::from_shape_fn((self.nb_classes, self.nb_features), |(k, j)| {
            params[self.weight(k, j)]
        });
        let intercept = Array1::from_shape_fn(self.nb_classes, |k| params[self.bias(k)]);
        (weights, intercept)
    }
}

fn penalized_loss(
    params: &Array1<f64>,
    grad: &mut Array1<f64>,
    rows: &[SparseVector],
    targets: &[usize],
    layout: &Layout,
    c: f64,
) -> f64 {
    grad.fill(0.0);
    let k_count = layout.nb_classes;
    let mut scores = vec![0.0; k_count];
    let mut loss = 0.0;

    for (row, &target) in rows.iter().zip(targets) {
        for (k, score) in scores.iter_mut().enumerate() {
            *score = params[layout.bias(k)]
                + row.iter().map(|(j, v)| params[layout.weight(k, j)] * v).sum::<f64>();
        }
        let lse = log_sum_exp(&scores);
        loss += lse - scores[target];

        for (k, &score) in scores.iter().enumerate() {
            let indicator = if k == target { 1.0 } else { 0.0 };
            let residual = c * ((score - lse).exp() - indicator);
            grad[layout.bias(k)] += residual;
            for (j, v) in row.iter() {
                grad[layout.weight(k, j)] += residual * v;
            }
        }
    }

    let mut penalty = 0.0;
    for k in 0..k_count {
        for j in 0..layout.nb_features {
            let idx = layout.weight(k, j);
            penalty += params[idx] * params[idx];
            grad[idx] += params[idx];
        }
    }

    c * loss + 0.5 * penalty
}

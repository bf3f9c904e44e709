//! L2-regularised logistic regression fit by full-batch gradient descent.

use serde::{Deserialize, Serialize};

use crate::common::error::{RiskError, RiskResult};

use super::domain::Classifier;

/// Hyper-parameters for [`LogisticModel::fit`].
#[derive(Copy, Clone, Debug)]
pub struct LogisticParams {
    /// Inverse regularisation strength.
    pub c: f64,
    pub max_iter: usize,
    pub learning_rate: f64,
    /// Stop once every gradient component is below this.
    pub tol: f64,
}

impl Default for LogisticParams {
    fn default() -> Self {
        Self {
            c: 1.0,
            max_iter: 1000,
            learning_rate: 0.5,
            tol: 1e-6,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LogisticModel {
    pub weights: Vec<f64>,
    pub intercept: f64,
}

pub(crate) fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

impl LogisticModel {
    /// Minimise mean log-loss plus `||w||² / (2·C·n)`. The intercept is not
    /// penalised.
    pub fn fit(x: &[Vec<f64>], y: &[u8], params: &LogisticParams) -> RiskResult<Self> {
        let n = x.len();
        if n == 0 || n != y.len() {
            return Err(RiskError::Training {
                details: format!("logistic regression needs matching rows and labels, got {} and {}", n, y.len()),
            });
        }
        let width = x[0].len();
        if x.iter().any(|row| row.len() != width) {
            return Err(RiskError::Training {
                details: "logistic regression rows have uneven widths".to_string(),
            });
        }

        let mut model = LogisticModel {
            weights: vec![0.0; width],
            intercept: 0.0,
        };
        let nf = n as f64;
        let penalty = 1.0 / (params.c * nf);
        let mut grad_w = vec![0.0; width];

        for iter in 0..params.max_iter {
            grad_w.iter_mut().for_each(|g| *g = 0.0);
            let mut grad_b = 0.0;
            for (row, &label) in x.iter().zip(y) {
                let err = model.predict_proba_unchecked(row) - f64::from(label);
                for (g, v) in grad_w.iter_mut().zip(row) {
                    *g += err * v;
                }
                grad_b += err;
            }
            for (g, w) in grad_w.iter_mut().zip(&model.weights) {
                *g = *g / nf + penalty * w;
            }
            grad_b /= nf;

            let largest = grad_w.iter().fold(grad_b.abs(), |acc, g| acc.max(g.abs()));
            if largest < params.tol {
                tracing::debug!(ev = "logistic_converged", iter);
                break;
            }
            for (w, g) in model.weights.iter_mut().zip(&grad_w) {
                *w -= params.learning_rate * g;
            }
            model.intercept -= params.learning_rate * grad_b;
        }

        Ok(model)
    }
}

impl LogisticModel {
    /// Structural check for a deserialised model.
    pub fn validate(&self) -> Result<(), String> {
        if self.weights.is_empty() {
            return Err("logistic regression has no weights".to_string());
        }
        if let Some(i) = self.weights.iter().position(|w| !w.is_finite()) {
            return Err(format!("logistic regression weight {i} is not finite"));
        }
        if !self.intercept.is_finite() {
            return Err("logistic regression intercept is not finite".to_string());
        }
        Ok(())
    }
}

impl Classifier for LogisticModel {
    fn n_features(&self) -> usize {
        self.weights.len()
    }

    fn predict_proba_unchecked(&self, x: &[f64]) -> f64 {
        let z = self
            .weights
            .iter()
            .zip(x)
            .fold(self.intercept, |acc, (w, v)| acc + w * v);
        sigmoid(z)
    }

    /// Absolute coefficients normalised to sum to 1. Inputs are standardised
    /// or encoded upstream, so magnitudes are comparable.
    fn feature_importances(&self) -> Vec<f64> {
        let total: f64 = self.weights.iter().map(|w| w.abs()).sum();
        if total > 0.0 {
            self.weights.iter().map(|w| w.abs() / total).collect()
        } else {
            vec![0.0; self.weights.len()]
        }
    }
}

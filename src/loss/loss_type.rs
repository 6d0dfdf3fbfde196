use serde::{Serialize, Deserialize};

use crate::loss::cross_entropy::CrossEntropyLoss;

/// Loss function applied to the normalized network output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LossFunction {
    CrossEntropy,
}

impl LossFunction {
    pub fn forward(&self, predicted: &[f64], expected: &[f64]) -> f64 {
        match self {
            LossFunction::CrossEntropy => CrossEntropyLoss::loss(predicted, expected),
        }
    }

    pub fn backward(&self, predicted: &[f64], expected: &[f64]) -> Vec<f64> {
        match self {
            LossFunction::CrossEntropy => CrossEntropyLoss::derivative(predicted, expected),
        }
    }
}

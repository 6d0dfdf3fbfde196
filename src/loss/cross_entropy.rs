use crate::activation::normalization::PROBABILITY_FLOOR;

/// Categorical cross-entropy between normalized predictions and a one-hot label.
pub struct CrossEntropyLoss;

impl CrossEntropyLoss {
    /// `L = Σ -label[i] * ln(max(pred[i], 1e-15))`
    pub fn loss(predicted: &[f64], expected: &[f64]) -> f64 {
        predicted.iter().zip(expected.iter())
            .map(|(&p, &e)| -e * p.max(PROBABILITY_FLOOR).ln())
            .sum()
    }

    /// `∂L/∂pred[i] = -(label[i] / pred[i])` for every output.
    ///
    /// This is the gradient w.r.t. the normalized probabilities only; the
    /// softmax Jacobian is applied separately by the normalization step.
    pub fn derivative(predicted: &[f64], expected: &[f64]) -> Vec<f64> {
        predicted.iter().zip(expected.iter())
            .map(|(&p, &e)| -(e / p))
            .collect()
    }
}

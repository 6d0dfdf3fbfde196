use serde::{Serialize, Deserialize};

/// Floor applied to every normalized probability so that no zero reaches `ln`.
pub const PROBABILITY_FLOOR: f64 = 1e-15;

/// Vector-valued normalization turning the last layer's raw logits into
/// probabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NormalizationFunction {
    Softmax,
}

impl NormalizationFunction {
    /// Normalizes all logits at once.
    ///
    /// The max logit is subtracted before exponentiating, then each
    /// probability is floored at [`PROBABILITY_FLOOR`].
    pub fn forward(&self, logits: &[f64]) -> Vec<f64> {
        match self {
            NormalizationFunction::Softmax => {
                let max = logits.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
                let max = if max.is_finite() { max } else { 0.0 };
                let exps: Vec<f64> = logits.iter().map(|&z| (z - max).exp()).collect();
                let sum: f64 = exps.iter().sum();
                exps.iter().map(|&e| (e / sum).max(PROBABILITY_FLOOR)).collect()
            }
        }
    }

    /// Back-propagates `d_outputs` (∂L/∂p) through the full Jacobian,
    /// returning ∂L/∂z for every logit.
    ///
    /// For softmax: `∂p_j/∂z_i = p_i(1 - p_i)` when `i == j`, `-p_j p_i` otherwise.
    pub fn backward(&self, outputs: &[f64], d_outputs: &[f64]) -> Vec<f64> {
        match self {
            NormalizationFunction::Softmax => {
                (0..outputs.len())
                    .map(|i| {
                        d_outputs.iter().zip(outputs.iter()).enumerate()
                            .map(|(j, (&d, &p_j))| {
                                if j == i {
                                    d * p_j * (1.0 - p_j)
                                } else {
                                    -d * p_j * outputs[i]
                                }
                            })
                            .sum()
                    })
                    .collect()
            }
        }
    }
}

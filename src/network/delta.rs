use serde::{Serialize, Deserialize};
use crate::error::{Error, Result};
use crate::math::matrix::Matrix;

/// A gradient or parameter snapshot shaped exactly like a network's
/// `weights`/`biases`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterDelta {
    pub weights: Vec<Matrix>,
    pub biases: Vec<Vec<f64>>,
}

impl ParameterDelta {
    /// All-zero delta with the same shape as `weights`/`biases`.
    pub fn zeros_like(weights: &[Matrix], biases: &[Vec<f64>]) -> ParameterDelta {
        ParameterDelta {
            weights: weights.iter().map(|w| Matrix::zeros(w.rows, w.cols)).collect(),
            biases: biases.iter().map(|b| vec![0.0; b.len()]).collect(),
        }
    }

    pub fn zeroed(&self) -> ParameterDelta {
        ParameterDelta::zeros_like(&self.weights, &self.biases)
    }

    pub fn same_shape(&self, other: &ParameterDelta) -> bool {
        self.weights.len() == other.weights.len()
            && self.biases.len() == other.biases.len()
            && self.weights.iter().zip(other.weights.iter()).all(|(a, b)| a.same_shape(b))
            && self.biases.iter().zip(other.biases.iter()).all(|(a, b)| a.len() == b.len())
    }

    /// `self += other` element-wise. Fails with `InvalidState`, leaving
    /// `self` untouched, when the shapes differ.
    pub fn accumulate(&mut self, other: &ParameterDelta) -> Result<()> {
        if !self.same_shape(other) {
            return Err(Error::InvalidState("parameter deltas have different shapes".to_owned()));
        }
        for (w, ow) in self.weights.iter_mut().zip(other.weights.iter()) {
            w.add_assign(ow);
        }
        for (b, ob) in self.biases.iter_mut().zip(other.biases.iter()) {
            for (x, y) in b.iter_mut().zip(ob.iter()) {
                *x += y;
            }
        }
        Ok(())
    }

    /// Multiplies every weight and bias by `factor`.
    pub fn scale(&mut self, factor: f64) {
        for w in self.weights.iter_mut() {
            for x in w.data.iter_mut().flatten() {
                *x *= factor;
            }
        }
        for x in self.biases.iter_mut().flatten() {
            *x *= factor;
        }
    }

    /// `sqrt(Σ w² + Σ b²)` over every element.
    pub fn global_norm(&self) -> f64 {
        let weights: f64 = self.weights.iter().map(Matrix::squared_sum).sum();
        let biases: f64 = self.biases.iter().flatten().map(|b| b * b).sum();
        (weights + biases).sqrt()
    }

    /// Element-wise arithmetic mean of `deltas`.
    ///
    /// All per-sample deltas are summed first and divided once, so the
    /// result does not depend on an online running update. An empty slice or
    /// deltas of different shapes give `InvalidState`.
    pub fn mean(deltas: &[ParameterDelta]) -> Result<ParameterDelta> {
        let first = deltas.first().ok_or_else(|| {
            Error::InvalidState("no parameter deltas to average".to_owned())
        })?;
        let mut sum = first.zeroed();
        for delta in deltas {
            sum.accumulate(delta)?;
        }
        sum.scale(1.0 / deltas.len() as f64);
        Ok(sum)
    }
}

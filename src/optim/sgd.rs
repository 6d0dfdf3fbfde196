use crate::math::matrix::Matrix;
use crate::network::delta::ParameterDelta;

/// Plain scaled gradient descent: no momentum, no per-parameter scaling.
pub struct Sgd {
    pub learning_rate: f64,
}

impl Sgd {
    pub fn new(learning_rate: f64) -> Sgd {
        Sgd { learning_rate }
    }

    /// `weights -= lr * delta.weights`, `biases -= lr * delta.biases`.
    pub fn step(&self, weights: &mut [Matrix], biases: &mut [Vec<f64>], delta: &ParameterDelta) {
        for (w, dw) in weights.iter_mut().zip(delta.weights.iter()) {
            w.sub_scaled(dw, self.learning_rate);
        }
        for (b, db) in biases.iter_mut().zip(delta.biases.iter()) {
            for (x, d) in b.iter_mut().zip(db.iter()) {
                *x -= self.learning_rate * d;
            }
        }
    }
}

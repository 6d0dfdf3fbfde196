use rand::Rng;
use serde::{Serialize, Deserialize};
use std::f64::consts::PI;

/// How a node's incoming weights are drawn at network construction.
///
/// Each variant is evaluated once per weight with
/// `(input_size, output_size)`, where `input_size` is the node count of the
/// previous layer and `output_size` the node count of the following layer
/// (or of the node's own layer when it is the last one).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightInitializer {
    /// He initialization: N(0, sqrt(2 / input_size)). Pair with ReLU.
    He,
    /// Glorot (Xavier) uniform: U(-l, l) with l = sqrt(6 / (input_size + output_size)).
    Glorot,
    /// Every weight starts at the same value.
    Constant(f64),
}

impl WeightInitializer {
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R, input_size: usize, output_size: usize) -> f64 {
        match *self {
            WeightInitializer::He => {
                let std_dev = (2.0 / input_size.max(1) as f64).sqrt();
                sample_normal(rng, 0.0, std_dev)
            }
            WeightInitializer::Glorot => {
                let limit = (6.0 / (input_size + output_size).max(1) as f64).sqrt();
                rng.gen_range(-limit..=limit)
            }
            WeightInitializer::Constant(value) => value,
        }
    }
}

impl Default for WeightInitializer {
    fn default() -> Self {
        WeightInitializer::Constant(0.5)
    }
}

/// Samples N(mean, std_dev) using the Box-Muller transform.
pub fn sample_normal<R: Rng + ?Sized>(rng: &mut R, mean: f64, std_dev: f64) -> f64 {
    // Both uniforms in (0, 1] so ln() never sees zero.
    let u1: f64 = 1.0 - rng.gen::<f64>();
    let u2: f64 = 1.0 - rng.gen::<f64>();
    let z = (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos();
    mean + z * std_dev
}

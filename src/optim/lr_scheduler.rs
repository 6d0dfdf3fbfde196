use serde::{Serialize, Deserialize};
use std::f64::consts::PI;

/// Learning-rate schedule over one epoch of `epoch_size` batches.
///
/// Each schedule is a pure function of `(batch_index, epoch_size)`; nothing
/// depends on training history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LrScheduler {
    /// `base * 0.01^(i / epoch_size)`
    ExponentialDecay,
    /// `base * 0.5 * (1 + cos(π i / epoch_size))`
    CosineAnnealing,
    /// `base * (1 - i / epoch_size)`
    LinearDecay,
}

impl LrScheduler {
    pub fn learning_rate(&self, base: f64, batch_index: usize, epoch_size: usize) -> f64 {
        let progress = batch_index as f64 / epoch_size as f64;
        match self {
            LrScheduler::ExponentialDecay => base * 0.01_f64.powf(progress),
            LrScheduler::CosineAnnealing => base * 0.5 * (1.0 + (PI * progress).cos()),
            LrScheduler::LinearDecay => base * (1.0 - progress),
        }
    }
}

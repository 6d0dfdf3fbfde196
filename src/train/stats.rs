use serde::{Serialize, Deserialize};

use crate::network::network::NO_FORWARD_PASS;

/// Accuracy and mean loss of a forward-only pass over a sample set.
///
/// Both fields hold [`NO_FORWARD_PASS`] when the set was empty.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EvalReport {
    /// Fraction of samples whose argmax matches the label, in [0, 1].
    pub accuracy: f64,
    pub mean_loss: f64,
}

impl EvalReport {
    pub fn empty() -> EvalReport {
        EvalReport { accuracy: NO_FORWARD_PASS, mean_loss: NO_FORWARD_PASS }
    }

    pub fn is_empty(&self) -> bool {
        self.accuracy == NO_FORWARD_PASS && self.mean_loss == NO_FORWARD_PASS
    }
}

/// Progress emitted after every trained batch.
///
/// Sent on the network's progress channel, if one is set; formatting is up
/// to the receiver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchStats {
    /// 1-based batch index within the epoch.
    pub batch: usize,
    pub epoch_size: usize,
    /// `batch / epoch_size`.
    pub progress: f64,
    /// Learning rate used for this batch.
    pub learning_rate: f64,
    /// Mean loss over the batch's training samples, before the update.
    pub train_loss: f64,
    /// Held-out evaluation after the update.
    pub held_out: EvalReport,
    /// Wall-clock duration of the batch (training + evaluation) in milliseconds.
    pub elapsed_ms: u64,
}

/// Summary of one `descent_epoch` call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpochStats {
    /// Batches actually trained; less than `epoch_size` only on early stop.
    pub batches_run: usize,
    pub epoch_size: usize,
    pub final_learning_rate: f64,
    /// Held-out evaluation after the last trained batch.
    pub held_out: EvalReport,
    /// Lowest held-out mean loss seen during the epoch.
    pub best_loss: f64,
    /// Set when `negative_attempt_limit` ended the epoch.
    pub stopped_early: bool,
    pub elapsed_ms: u64,
}

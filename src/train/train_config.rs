use serde::{Serialize, Deserialize};
use crate::error::{Error, Result};
use crate::optim::lr_scheduler::LrScheduler;

/// Hyperparameters of a training run.
///
/// # Fields
/// - `batch_size`:             samples per `descent_batch` call
/// - `epoch_size`:             batches per `descent_epoch` call
/// - `base_learning_rate`:     learning rate the scheduler decays from
/// - `lr_scheduler`:           recomputed before every batch
/// - `gradient_clip_threshold`: global L2-norm limit for the mean batch
///                              gradient; `None` applies it unclipped
/// - `negative_attempt_limit`: consecutive held-out evaluations allowed to
///                              miss the best loss so far before the epoch
///                              stops early; `0` never stops
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingConfig {
    pub batch_size: usize,
    pub epoch_size: usize,
    pub base_learning_rate: f64,
    pub lr_scheduler: LrScheduler,
    #[serde(default)]
    pub gradient_clip_threshold: Option<f64>,
    #[serde(default)]
    pub negative_attempt_limit: usize,
}

impl TrainingConfig {
    /// Creates a config without a gradient clip threshold.
    pub fn new(
        batch_size: usize,
        epoch_size: usize,
        base_learning_rate: f64,
        lr_scheduler: LrScheduler,
        negative_attempt_limit: usize,
    ) -> Result<Self> {
        let config = TrainingConfig {
            batch_size,
            epoch_size,
            base_learning_rate,
            lr_scheduler,
            gradient_clip_threshold: None,
            negative_attempt_limit,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(Error::InvalidConfig("batch size must be at least 1".to_owned()));
        }
        if self.epoch_size == 0 {
            return Err(Error::InvalidConfig("epoch size must be at least 1".to_owned()));
        }
        if !(self.base_learning_rate.is_finite() && self.base_learning_rate >= 0.0) {
            return Err(Error::InvalidConfig(format!(
                "base learning rate must be finite and non-negative, got {}",
                self.base_learning_rate
            )));
        }
        if let Some(threshold) = self.gradient_clip_threshold {
            check_threshold(threshold)?;
        }
        Ok(())
    }

    /// The only setting that may change after construction. A threshold
    /// that is not finite and positive is refused and the old one kept.
    pub fn set_gradient_threshold(&mut self, threshold: f64) -> Result<()> {
        check_threshold(threshold)?;
        self.gradient_clip_threshold = Some(threshold);
        Ok(())
    }

    /// Learning rate for the 1-based `batch_index` of an epoch.
    pub fn learning_rate_at(&self, batch_index: usize) -> f64 {
        self.lr_scheduler.learning_rate(self.base_learning_rate, batch_index, self.epoch_size)
    }

    /// Serializes the config to a pretty-printed JSON file.
    pub fn save_json(&self, path: &str) -> std::io::Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))
    }

    /// Deserializes and validates a config written by `save_json`.
    pub fn load_json(path: &str) -> std::io::Result<TrainingConfig> {
        let file = std::fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);
        let config: TrainingConfig = serde_json::from_reader(reader)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        config.validate()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        Ok(config)
    }
}

fn check_threshold(threshold: f64) -> Result<()> {
    if threshold.is_finite() && threshold > 0.0 {
        return Ok(());
    }
    Err(Error::InvalidConfig(format!(
        "gradient clip threshold must be finite and positive, got {}",
        threshold
    )))
}

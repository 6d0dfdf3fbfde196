pub mod batch;
pub mod loop_fn;
pub mod stats;
pub mod train_config;

pub use batch::Batch;
pub use stats::{BatchStats, EpochStats, EvalReport};
pub use train_config::TrainingConfig;

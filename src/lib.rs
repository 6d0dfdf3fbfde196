pub mod error;
pub mod math;
pub mod activation;
pub mod loss;
pub mod network;
pub mod optim;
pub mod train;
pub mod cnn;
pub mod data;

// Convenience re-exports
pub use error::{Error, Result};
pub use math::{Matrix, WeightInitializer};
pub use activation::{ActivationFunction, NormalizationFunction};
pub use loss::LossFunction;
pub use network::{ForwardPass, LayerSpec, Network, NetworkConfig, NodeSpec, OutputSpec, ParameterDelta};
pub use optim::LrScheduler;
pub use train::{Batch, BatchStats, EpochStats, EvalReport, TrainingConfig};
pub use cnn::{CnnLayer, CnnModule, CnnNetwork, PoolingMethod, PoolingStage};

pub mod conv;
pub mod filters;
pub mod module;
pub mod network;
pub mod pooling;

pub use conv::{FeatureMap, Image};
pub use module::{CnnLayer, CnnModule};
pub use network::CnnNetwork;
pub use pooling::{PoolingMethod, PoolingStage};

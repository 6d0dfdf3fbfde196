pub mod backward;
pub mod delta;
pub mod forward;
pub mod network;
pub mod spec;

pub use backward::Gradients;
pub use delta::ParameterDelta;
pub use forward::{argmax, ForwardPass};
pub use network::{Network, OutputState, NO_FORWARD_PASS};
pub use spec::{LayerSpec, NetworkConfig, NodeSpec, OutputSpec};

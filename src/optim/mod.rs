pub mod clip;
pub mod lr_scheduler;
pub mod sgd;

pub use clip::clip_by_global_norm;
pub use lr_scheduler::LrScheduler;
pub use sgd::Sgd;

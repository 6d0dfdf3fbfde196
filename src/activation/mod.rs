pub mod activation;
pub mod normalization;

pub use activation::ActivationFunction;
pub use normalization::{NormalizationFunction, PROBABILITY_FLOOR};

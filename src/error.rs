/// Every way a network, trainer or feature extractor call can be refused.
///
/// None of these are corrected silently: the caller decides whether to abort
/// the run or skip the offending batch.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// An input, label or image vector has the wrong length.
    #[error("dimension mismatch: {what} has length {actual}, expected {expected}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    /// A batch does not contain exactly `batch_size` samples.
    #[error("batch size mismatch: got {actual} samples, expected {expected}")]
    BatchSizeMismatch { expected: usize, actual: usize },

    /// An epoch does not contain exactly `epoch_size` batches.
    #[error("epoch size mismatch: got {actual} batches, expected {expected}")]
    EpochSizeMismatch { expected: usize, actual: usize },

    /// The engine is not in a state where the call makes sense,
    /// e.g. `bp` without a pending forward pass.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// A network, training or CNN configuration is inconsistent.
    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn dimension(what: &'static str, expected: usize, actual: usize) -> Error {
        Error::DimensionMismatch { what, expected, actual }
    }
}

use crate::error::{Error, Result};

/// Samples paired with their one-hot labels.
///
/// `T` is `Vec<f64>` for plain feature vectors and an image matrix for the
/// CNN front end.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch<T> {
    pub inputs: Vec<T>,
    pub labels: Vec<Vec<f64>>,
}

impl<T> Batch<T> {
    pub fn new(inputs: Vec<T>, labels: Vec<Vec<f64>>) -> Batch<T> {
        Batch { inputs, labels }
    }

    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }

    /// Fails unless both inputs and labels hold exactly `expected` entries.
    pub fn check_size(&self, expected: usize) -> Result<()> {
        for actual in [self.inputs.len(), self.labels.len()] {
            if actual != expected {
                return Err(Error::BatchSizeMismatch { expected, actual });
            }
        }
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&T, &Vec<f64>)> {
        self.inputs.iter().zip(self.labels.iter())
    }
}

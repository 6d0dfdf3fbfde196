use crate::error::{Error, Result};
use crate::network::network::Network;

/// Everything one forward pass produced for a single sample.
///
/// The pass owns its transient buffers, so several passes can be alive at
/// once and [`Network::backward`] never reads stale state.
#[derive(Debug, Clone, PartialEq)]
pub struct ForwardPass {
    /// The raw input; back-propagation into layer 0 needs it.
    pub input: Vec<f64>,
    pub labels: Vec<f64>,
    /// Pre-activation values per layer.
    pub z: Vec<Vec<f64>>,
    /// Post-activation values per layer.
    pub activations: Vec<Vec<f64>>,
    /// Normalized output probabilities. The raw logits are `z.last()`.
    pub probabilities: Vec<f64>,
    pub loss: f64,
}

impl ForwardPass {
    pub fn logits(&self) -> &[f64] {
        self.z.last().map(Vec::as_slice).unwrap_or(&[])
    }

    /// Leftmost index of the largest probability.
    pub fn prediction_index(&self) -> Option<usize> {
        argmax(&self.probabilities)
    }

    /// Leftmost index of the largest label entry.
    pub fn label_index(&self) -> Option<usize> {
        argmax(&self.labels)
    }

    pub fn is_correct(&self) -> bool {
        self.prediction_index() == self.label_index()
    }
}

impl Network {
    /// Runs one sample through every layer without touching `self`.
    ///
    /// `z[l][n] = weights[l][n] · a[l-1] + biases[l][n]`, then the node's
    /// activation. The last layer's `z` are the logits that the output
    /// normalization turns into probabilities.
    pub fn forward(&self, input: &[f64], labels: &[f64]) -> Result<ForwardPass> {
        if input.len() != self.input_size() {
            return Err(Error::dimension("input", self.input_size(), input.len()));
        }
        if labels.len() != self.output_size() {
            return Err(Error::dimension("labels", self.output_size(), labels.len()));
        }

        let mut z = Vec::with_capacity(self.weights.len());
        let mut activations: Vec<Vec<f64>> = Vec::with_capacity(self.weights.len());
        for (l, weights) in self.weights.iter().enumerate() {
            let previous = if l == 0 { input } else { activations[l - 1].as_slice() };
            let z_layer: Vec<f64> = (0..weights.rows)
                .map(|n| weights.dot_row(n, previous) + self.biases[l][n])
                .collect();
            let a_layer = z_layer.iter().zip(self.activation_fns[l].iter())
                .map(|(&zn, f)| f.forward(zn))
                .collect();
            z.push(z_layer);
            activations.push(a_layer);
        }

        let output = &self.config().output;
        let logits = z.last().map(Vec::as_slice).unwrap_or(&[]);
        let probabilities = output.normalization.forward(logits);
        let loss = output.loss.forward(&probabilities, labels);

        Ok(ForwardPass {
            input: input.to_vec(),
            labels: labels.to_vec(),
            z,
            activations,
            probabilities,
            loss,
        })
    }
}

/// Leftmost index of the maximum; `None` for an empty slice.
pub fn argmax(values: &[f64]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &v) in values.iter().enumerate() {
        match best {
            Some((_, b)) if v <= b => {}
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, _)| i)
}

use crate::error::{Error, Result};
use crate::math::matrix::Matrix;
use crate::network::delta::ParameterDelta;
use crate::network::forward::ForwardPass;
use crate::network::network::Network;

/// Exact per-sample gradients produced by one backward pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Gradients {
    /// ∂L/∂p for each normalized output.
    pub d_loss: Vec<f64>,
    /// ∂L/∂logit, i.e. `d_loss` pushed through the normalization Jacobian.
    pub d_normalization: Vec<f64>,
    /// ∂L/∂z per layer and node.
    pub dz: Vec<Vec<f64>>,
    /// ∂L/∂weights and ∂L/∂biases.
    pub delta: ParameterDelta,
}

impl Network {
    /// Reverse-mode pass over `pass`, computing the gradient of its loss with
    /// respect to every weight and bias.
    ///
    /// `pass` should come from [`Network::forward`] on this network with the
    /// current parameters. A pass whose shape doesn't match the network is
    /// refused with `InvalidState`.
    pub fn backward(&self, pass: &ForwardPass) -> Result<Gradients> {
        self.check_pass_shape(pass)?;
        let output = &self.config().output;
        let d_loss = output.loss.backward(&pass.probabilities, &pass.labels);
        let d_normalization = output.normalization.backward(&pass.probabilities, &d_loss);

        let layers = self.weights.len();
        let mut dz: Vec<Vec<f64>> = vec![Vec::new(); layers];
        dz[layers - 1] = d_normalization.clone();
        for l in (0..layers - 1).rev() {
            let next_weights = &self.weights[l + 1];
            dz[l] = (0..self.weights[l].rows)
                .map(|n| {
                    next_weights.dot_col(n, &dz[l + 1])
                        * self.activation_fns[l][n].backward(pass.z[l][n])
                })
                .collect();
        }

        let weights = dz.iter().enumerate()
            .map(|(l, dz_layer)| {
                let previous = if l == 0 { &pass.input } else { &pass.activations[l - 1] };
                Matrix::outer(dz_layer, previous)
            })
            .collect();

        Ok(Gradients {
            d_loss,
            d_normalization,
            delta: ParameterDelta { weights, biases: dz.clone() },
            dz,
        })
    }

    fn check_pass_shape(&self, pass: &ForwardPass) -> Result<()> {
        let layer_sizes = || self.weights.iter().map(|w| w.rows);
        let matches = pass.input.len() == self.input_size()
            && pass.labels.len() == self.output_size()
            && pass.probabilities.len() == self.output_size()
            && pass.z.len() == self.weights.len()
            && pass.activations.len() == self.weights.len()
            && pass.z.iter().map(Vec::len).eq(layer_sizes())
            && pass.activations.iter().map(Vec::len).eq(layer_sizes());
        if !matches {
            return Err(Error::InvalidState(
                "forward pass doesn't match the network's shape".to_owned(),
            ));
        }
        Ok(())
    }
}

use std::fmt;
use std::sync::mpsc;

use rand::Rng;

use crate::activation::ActivationFunction;
use crate::error::{Error, Result};
use crate::math::matrix::Matrix;
use crate::network::backward::Gradients;
use crate::network::delta::ParameterDelta;
use crate::network::forward::{argmax, ForwardPass};
use crate::network::spec::NetworkConfig;
use crate::optim::sgd::Sgd;
use crate::train::stats::BatchStats;
use crate::train::train_config::TrainingConfig;

/// Returned by statistics queries made before any forward pass.
pub const NO_FORWARD_PASS: f64 = -1.0;

/// Output-side state of the most recent forward/backward call.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputState {
    pub raw_logits: Vec<f64>,
    pub probabilities: Vec<f64>,
    pub labels: Vec<f64>,
    pub loss: f64,
    /// Zero until the matching `bp`.
    pub d_loss: Vec<f64>,
    /// Zero until the matching `bp`.
    pub d_normalization: Vec<f64>,
}

/// The mutable training engine: parameters, per-sample gradients and the
/// bookkeeping of the last forward pass.
///
/// Weights and biases are initialized once in the constructor and only ever
/// change through [`Network::update_parameters`] afterwards.
pub struct Network {
    config: NetworkConfig,
    training: TrainingConfig,
    pub(crate) weights: Vec<Matrix>,
    pub(crate) biases: Vec<Vec<f64>>,
    pub(crate) activation_fns: Vec<Vec<ActivationFunction>>,
    learning_rate: f64,
    pending: Option<ForwardPass>,
    output_state: Option<OutputState>,
    gradients: ParameterDelta,
    dz: Vec<Vec<f64>>,
    label_meanings: Option<Vec<String>>,
    pub(crate) progress_tx: Option<mpsc::Sender<BatchStats>>,
}

impl Network {
    /// Builds and initializes a network using the thread-local RNG.
    pub fn new(config: NetworkConfig, training: TrainingConfig) -> Result<Network> {
        Network::with_rng(config, training, &mut rand::thread_rng())
    }

    /// Builds and initializes a network, drawing every initial weight from `rng`.
    pub fn with_rng<R: Rng + ?Sized>(
        config: NetworkConfig,
        training: TrainingConfig,
        rng: &mut R,
    ) -> Result<Network> {
        config.validate()?;
        let structure = config.layer_structure();

        let mut weights = Vec::with_capacity(config.hidden_layers.len());
        let mut biases = Vec::with_capacity(config.hidden_layers.len());
        let mut activation_fns = Vec::with_capacity(config.hidden_layers.len());
        for (l, layer) in config.hidden_layers.iter().enumerate() {
            let input_size = structure[l];
            let output_size = structure.get(l + 2).copied().unwrap_or(structure[l + 1]);
            let rows = layer.nodes.iter()
                .map(|node| {
                    (0..input_size)
                        .map(|_| node.initializer.sample(rng, input_size, output_size))
                        .collect::<Vec<f64>>()
                })
                .collect::<Vec<Vec<f64>>>();
            let matrix = Matrix::from_data(rows);
            if matrix.cols != input_size {
                return Err(Error::InvalidState(format!(
                    "layer {} has fan-in {}, expected {}", l, matrix.cols, input_size
                )));
            }
            weights.push(matrix);
            biases.push(layer.nodes.iter().map(|node| node.bias).collect::<Vec<f64>>());
            activation_fns.push(layer.nodes.iter().map(|node| node.activation).collect::<Vec<_>>());
        }

        let gradients = ParameterDelta::zeros_like(&weights, &biases);
        let dz = biases.iter().map(|b| vec![0.0; b.len()]).collect();
        log::debug!("initialized network with layer structure {:?}", structure);

        Ok(Network {
            learning_rate: training.base_learning_rate,
            config,
            training,
            weights,
            biases,
            activation_fns,
            pending: None,
            output_state: None,
            gradients,
            dz,
            label_meanings: None,
            progress_tx: None,
        })
    }

    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    pub fn training_config(&self) -> &TrainingConfig {
        &self.training
    }

    pub fn input_size(&self) -> usize {
        self.config.input_size
    }

    pub fn output_size(&self) -> usize {
        self.config.output.size
    }

    pub fn layer_structure(&self) -> Vec<usize> {
        self.config.layer_structure()
    }

    pub fn weights(&self) -> &[Matrix] {
        &self.weights
    }

    pub fn biases(&self) -> &[Vec<f64>] {
        &self.biases
    }

    /// Direct access to the weights. The slice keeps the layer count fixed;
    /// callers must not reshape the matrices.
    pub fn weights_mut(&mut self) -> &mut [Matrix] {
        &mut self.weights
    }

    pub fn biases_mut(&mut self) -> &mut [Vec<f64>] {
        &mut self.biases
    }

    /// Current parameters as a snapshot.
    pub fn parameters(&self) -> ParameterDelta {
        ParameterDelta { weights: self.weights.clone(), biases: self.biases.clone() }
    }

    pub fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    pub fn set_learning_rate(&mut self, learning_rate: f64) {
        self.learning_rate = learning_rate;
    }

    /// Fails with `InvalidConfig` unless `threshold` is finite and positive.
    pub fn set_gradient_threshold(&mut self, threshold: f64) -> Result<()> {
        self.training.set_gradient_threshold(threshold)
    }

    /// Sends one [`BatchStats`] per trained batch to `tx`.
    pub fn set_progress_sender(&mut self, tx: mpsc::Sender<BatchStats>) {
        self.progress_tx = Some(tx);
    }

    // ── Forward / backward ────────────────────────────────────────────────

    /// Forward pass that records its result as the pending pass for [`Network::bp`].
    ///
    /// A rejected sample drops any earlier pending pass, so the next `bp`
    /// fails instead of back-propagating a stale sample. The output state
    /// keeps describing the last accepted sample.
    pub fn fp(&mut self, input: &[f64], labels: &[f64]) -> Result<()> {
        self.pending = None;
        let pass = self.forward(input, labels)?;
        self.output_state = Some(OutputState {
            raw_logits: pass.logits().to_vec(),
            probabilities: pass.probabilities.clone(),
            labels: pass.labels.clone(),
            loss: pass.loss,
            d_loss: vec![0.0; pass.probabilities.len()],
            d_normalization: vec![0.0; pass.probabilities.len()],
        });
        self.pending = Some(pass);
        Ok(())
    }

    /// Back-propagates the pending forward pass, replacing `dW`/`dB`/`dZ`
    /// with its exact per-sample gradients and consuming the pass.
    pub fn bp(&mut self) -> Result<()> {
        let pass = self.pending.take().ok_or_else(|| {
            Error::InvalidState("no forward pass pending".to_owned())
        })?;
        let Gradients { d_loss, d_normalization, dz, delta } = self.backward(&pass)?;
        if let Some(state) = self.output_state.as_mut() {
            state.d_loss = d_loss;
            state.d_normalization = d_normalization;
        }
        self.gradients = delta;
        self.dz = dz;
        Ok(())
    }

    pub fn has_pending_pass(&self) -> bool {
        self.pending.is_some()
    }

    /// Gradients of the last `bp`, or zeros after [`Network::reset_gradients`].
    pub fn gradients(&self) -> &ParameterDelta {
        &self.gradients
    }

    pub fn dz(&self) -> &[Vec<f64>] {
        &self.dz
    }

    pub fn reset_gradients(&mut self) {
        self.gradients = self.gradients.zeroed();
        for layer in self.dz.iter_mut() {
            layer.iter_mut().for_each(|x| *x = 0.0);
        }
    }

    // ── Parameter update ──────────────────────────────────────────────────

    /// `param -= learning_rate * delta` for every weight and bias.
    pub fn update_parameters(&mut self, delta: &ParameterDelta) -> Result<()> {
        if !delta.same_shape(&self.gradients) {
            return Err(Error::InvalidState(
                "parameter delta doesn't match the network's shape".to_owned(),
            ));
        }
        Sgd::new(self.learning_rate).step(&mut self.weights, &mut self.biases, delta);
        Ok(())
    }

    /// Applies the gradients of the last `bp` directly.
    pub fn descent_single_step(&mut self) -> Result<()> {
        let delta = self.gradients.clone();
        self.update_parameters(&delta)
    }

    // ── Statistics of the last forward pass ───────────────────────────────

    pub fn output_state(&self) -> Option<&OutputState> {
        self.output_state.as_ref()
    }

    /// Loss of the last forward pass, or [`NO_FORWARD_PASS`].
    pub fn loss(&self) -> f64 {
        match &self.output_state {
            Some(state) => state.loss,
            None => {
                log::warn!("loss queried before any forward pass");
                NO_FORWARD_PASS
            }
        }
    }

    pub fn prediction_index(&self) -> Option<usize> {
        self.output_state.as_ref().and_then(|s| argmax(&s.probabilities))
    }

    pub fn label_index(&self) -> Option<usize> {
        self.output_state.as_ref().and_then(|s| argmax(&s.labels))
    }

    /// Probability assigned to the predicted class, or [`NO_FORWARD_PASS`].
    pub fn probability(&self) -> f64 {
        match (self.output_state.as_ref(), self.prediction_index()) {
            (Some(state), Some(index)) => state.probabilities[index],
            _ => {
                log::warn!("probability queried before any forward pass");
                NO_FORWARD_PASS
            }
        }
    }

    pub fn is_correct(&self) -> bool {
        self.prediction_index().is_some() && self.prediction_index() == self.label_index()
    }

    /// Human-readable names for the output classes, e.g. `"0"`..`"9"`.
    pub fn set_label_meanings(&mut self, meanings: Vec<String>) -> Result<()> {
        if meanings.len() != self.output_size() {
            return Err(Error::dimension("label meanings", self.output_size(), meanings.len()));
        }
        self.label_meanings = Some(meanings);
        Ok(())
    }

    pub fn prediction_meaning(&self) -> Option<String> {
        self.prediction_index().map(|i| self.meaning_of(i))
    }

    pub fn label_meaning(&self) -> Option<String> {
        self.label_index().map(|i| self.meaning_of(i))
    }

    fn meaning_of(&self, index: usize) -> String {
        match &self.label_meanings {
            Some(meanings) => meanings[index].clone(),
            None => {
                log::warn!("label meanings not set");
                format!("Label index: {}", index)
            }
        }
    }

    /// Dumps biases, weights and their gradients per layer at debug level.
    pub fn log_parameters(&self) {
        for (l, (weights, biases)) in self.weights.iter().zip(self.biases.iter()).enumerate() {
            log::debug!("layer {}: biases {:?}", l + 1, biases);
            log::debug!("layer {}: d_biases {:?}", l + 1, self.gradients.biases[l]);
            for (n, row) in weights.data.iter().enumerate() {
                log::debug!("layer {} node {}: weights {:?}", l + 1, n + 1, row);
                log::debug!("layer {} node {}: d_weights {:?}", l + 1, n + 1, self.gradients.weights[l].data[n]);
            }
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Network {:?} ({:?} + {:?}, batch size {}, learning rate {})",
            self.layer_structure(),
            self.config.output.normalization,
            self.config.output.loss,
            self.training.batch_size,
            self.learning_rate,
        )
    }
}

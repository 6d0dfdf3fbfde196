use serde::{Serialize, Deserialize};
use crate::activation::{ActivationFunction, NormalizationFunction};
use crate::error::{Error, Result};
use crate::loss::LossFunction;
use crate::math::init::WeightInitializer;

/// Describes one node of a fully-connected layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSpec {
    pub activation: ActivationFunction,
    pub initializer: WeightInitializer,
    pub bias: f64,
}

/// Ordered node descriptors of one parameterized layer.
///
/// Nodes of the same layer may carry different activations and initializers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LayerSpec {
    pub nodes: Vec<NodeSpec>,
}

impl LayerSpec {
    pub fn new(nodes: Vec<NodeSpec>) -> LayerSpec {
        LayerSpec { nodes }
    }

    /// `size` identical nodes.
    pub fn uniform(
        size: usize,
        activation: ActivationFunction,
        initializer: WeightInitializer,
        bias: f64,
    ) -> LayerSpec {
        LayerSpec {
            nodes: vec![NodeSpec { activation, initializer, bias }; size],
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Normalization and loss applied on top of the last layer's raw logits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputSpec {
    pub size: usize,
    pub normalization: NormalizationFunction,
    pub loss: LossFunction,
}

impl OutputSpec {
    /// Softmax + cross-entropy over `size` classes.
    pub fn softmax_cross_entropy(size: usize) -> OutputSpec {
        OutputSpec {
            size,
            normalization: NormalizationFunction::Softmax,
            loss: LossFunction::CrossEntropy,
        }
    }
}

/// Full network topology.
///
/// `hidden_layers` lists every parameterized layer, input excluded; the last
/// entry produces the logits that `output` normalizes, so its node count
/// must equal `output.size`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub input_size: usize,
    pub hidden_layers: Vec<LayerSpec>,
    pub output: OutputSpec,
}

impl NetworkConfig {
    pub fn new(input_size: usize, hidden_layers: Vec<LayerSpec>, output: OutputSpec) -> Result<NetworkConfig> {
        let config = NetworkConfig { input_size, hidden_layers, output };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.input_size == 0 {
            return Err(Error::InvalidConfig("input size must be at least 1".to_owned()));
        }
        let last = self.hidden_layers.last().ok_or_else(|| {
            Error::InvalidConfig("network needs at least one layer".to_owned())
        })?;
        if let Some(index) = self.hidden_layers.iter().position(|layer| layer.is_empty()) {
            return Err(Error::InvalidConfig(format!("layer {} has no nodes", index)));
        }
        if self.output.size != last.len() {
            return Err(Error::InvalidConfig(format!(
                "output size {} doesn't match the last layer's {} nodes",
                self.output.size,
                last.len()
            )));
        }
        Ok(())
    }

    /// Same topology with a different input size, e.g. bound to a CNN
    /// front end's feature count.
    pub fn with_input_size(&self, input_size: usize) -> Result<NetworkConfig> {
        NetworkConfig::new(input_size, self.hidden_layers.clone(), self.output.clone())
    }

    /// `[input, layer_1, ..., layer_n]` node counts.
    pub fn layer_structure(&self) -> Vec<usize> {
        std::iter::once(self.input_size)
            .chain(self.hidden_layers.iter().map(LayerSpec::len))
            .collect()
    }

    /// Serializes the config to a pretty-printed JSON file.
    pub fn save_json(&self, path: &str) -> std::io::Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))
    }

    /// Deserializes and validates a config written by `save_json`.
    pub fn load_json(path: &str) -> std::io::Result<NetworkConfig> {
        let file = std::fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);
        let config: NetworkConfig = serde_json::from_reader(reader)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        config.validate()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        Ok(config)
    }
}

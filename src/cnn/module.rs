use num_traits::PrimInt;
use serde::{Serialize, Deserialize};

use crate::cnn::conv::{self, FeatureMap};
use crate::cnn::filters::{self, Kernel3};
use crate::cnn::pooling::PoolingStage;
use crate::error::{Error, Result};

/// One convolution kernel followed by its pooling stages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CnnLayer {
    pub filter: Vec<Vec<i64>>,
    pub pooling: Vec<PoolingStage>,
}

impl CnnLayer {
    pub fn new(filter: Vec<Vec<i64>>, pooling: Vec<PoolingStage>) -> CnnLayer {
        CnnLayer { filter, pooling }
    }

    pub fn from_kernel(kernel: &Kernel3, pooling: Vec<PoolingStage>) -> CnnLayer {
        CnnLayer::new(filters::to_kernel(kernel), pooling)
    }

    pub fn validate(&self) -> Result<()> {
        conv::dimensions(&self.filter, "kernel")?;
        self.pooling.iter().try_for_each(PoolingStage::validate)
    }

    /// Convolution, range rescale, then every pooling stage in order.
    fn apply(&self, image: &FeatureMap, type_max: i64) -> Result<FeatureMap> {
        let convolved = conv::rescale(conv::convolve(image, &self.filter)?, type_max);
        self.pooling.iter().try_fold(convolved, |map, stage| stage.apply(&map))
    }
}

/// Fixed convolution/pooling feature extractor with no learned parameters.
///
/// Every layer sees the same input image; their flattened outputs are
/// concatenated in layer order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CnnModule {
    layers: Vec<CnnLayer>,
    input_height: usize,
    input_width: usize,
    output_feature_count: usize,
}

impl CnnModule {
    /// Builds the module and fixes its feature count by running `sample`
    /// through every layer.
    pub fn new<T: PrimInt + Into<i64>>(sample: &[Vec<T>], layers: Vec<CnnLayer>) -> Result<CnnModule> {
        if layers.is_empty() {
            return Err(Error::InvalidConfig("CNN module needs at least one layer".to_owned()));
        }
        for layer in &layers {
            layer.validate()?;
        }
        let (input_height, input_width) = conv::dimensions(sample, "sample image")?;

        let mut module = CnnModule { layers, input_height, input_width, output_feature_count: 0 };
        let features = module.extract(sample)?;
        if features.is_empty() {
            return Err(Error::InvalidConfig(format!(
                "pooling plan leaves no features for a {}×{} image",
                input_height, input_width
            )));
        }
        module.output_feature_count = features.len();
        log::debug!(
            "CNN module: {} layers, {}×{} input, {} features",
            module.layers.len(),
            input_height,
            input_width,
            module.output_feature_count
        );
        Ok(module)
    }

    pub fn layers(&self) -> &[CnnLayer] {
        &self.layers
    }

    pub fn input_height(&self) -> usize {
        self.input_height
    }

    pub fn input_width(&self) -> usize {
        self.input_width
    }

    /// Length of every vector [`CnnModule::extract`] returns; the input size
    /// of a network fed by this module.
    pub fn output_feature_count(&self) -> usize {
        self.output_feature_count
    }

    /// Runs `image` through every layer and returns the row-major flattened,
    /// concatenated feature vector.
    pub fn extract<T: PrimInt + Into<i64>>(&self, image: &[Vec<T>]) -> Result<Vec<f64>> {
        let (height, width) = conv::dimensions(image, "image")?;
        if height != self.input_height {
            return Err(Error::dimension("image rows", self.input_height, height));
        }
        if width != self.input_width {
            return Err(Error::dimension("image columns", self.input_width, width));
        }

        let type_max = conv::type_max::<T>();
        let widened = conv::widen(image);
        let mut features = Vec::with_capacity(self.output_feature_count);
        for layer in &self.layers {
            let map = layer.apply(&widened, type_max)?;
            features.extend(map.iter().flatten().map(|&v| v as f64));
        }
        Ok(features)
    }
}

use num_traits::PrimInt;
use rand::Rng;

use crate::cnn::conv::Image;
use crate::cnn::module::CnnModule;
use crate::error::{Error, Result};
use crate::network::network::Network;
use crate::network::spec::NetworkConfig;
use crate::train::batch::Batch;
use crate::train::loop_fn::tally;
use crate::train::stats::{EpochStats, EvalReport};
use crate::train::train_config::TrainingConfig;

/// A network whose input is the feature vector of a [`CnnModule`].
///
/// The network's input size is bound to the module's feature count at
/// construction; every image-level call has the same contract as its
/// vector counterpart on [`Network`].
pub struct CnnNetwork {
    module: CnnModule,
    network: Network,
}

impl CnnNetwork {
    pub fn new(module: CnnModule, config: NetworkConfig, training: TrainingConfig) -> Result<CnnNetwork> {
        CnnNetwork::with_rng(module, config, training, &mut rand::thread_rng())
    }

    pub fn with_rng<R: Rng + ?Sized>(
        module: CnnModule,
        config: NetworkConfig,
        training: TrainingConfig,
        rng: &mut R,
    ) -> Result<CnnNetwork> {
        let bound = config.with_input_size(module.output_feature_count())?;
        let network = Network::with_rng(bound, training, rng)?;
        Ok(CnnNetwork { module, network })
    }

    pub fn module(&self) -> &CnnModule {
        &self.module
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    pub fn network_mut(&mut self) -> &mut Network {
        &mut self.network
    }

    fn features<T: PrimInt + Into<i64>>(&self, images: &[Image<T>]) -> Result<Vec<Vec<f64>>> {
        images.iter().map(|image| self.module.extract(image)).collect()
    }

    /// Extracts features from `image` and runs [`Network::fp`] on them.
    pub fn fp_image<T: PrimInt + Into<i64>>(&mut self, image: &[Vec<T>], labels: &[f64]) -> Result<()> {
        let features = self.module.extract(image)?;
        self.network.fp(&features, labels)
    }

    pub fn bp(&mut self) -> Result<()> {
        self.network.bp()
    }

    /// [`Network::descent_batch`] over images. Every image is extracted
    /// before training starts, so a malformed image leaves the parameters
    /// untouched.
    pub fn descent_batch_images<T: PrimInt + Into<i64>>(
        &mut self,
        images: &[Image<T>],
        labels: &[Vec<f64>],
    ) -> Result<f64> {
        let batch_size = self.network.training_config().batch_size;
        for actual in [images.len(), labels.len()] {
            if actual != batch_size {
                return Err(Error::BatchSizeMismatch { expected: batch_size, actual });
            }
        }
        let features = self.features(images)?;
        self.network.descent_batch(&features, labels)
    }

    /// [`Network::descent_epoch`] over image batches.
    pub fn descent_epoch_images<T: PrimInt + Into<i64>>(
        &mut self,
        batches: &[Batch<Image<T>>],
        held_out: &Batch<Image<T>>,
    ) -> Result<EpochStats> {
        let module = &self.module;
        self.network.run_epoch(
            batches,
            held_out,
            |network, batch| {
                let features = batch.inputs.iter()
                    .map(|image| module.extract(image))
                    .collect::<Result<Vec<_>>>()?;
                network.descent_batch(&features, &batch.labels)
            },
            |network, set| evaluate_with(module, network, &set.inputs, &set.labels),
        )
    }

    /// [`Network::evaluate`] over images.
    pub fn evaluate_images<T: PrimInt + Into<i64>>(
        &self,
        images: &[Image<T>],
        labels: &[Vec<f64>],
    ) -> Result<EvalReport> {
        evaluate_with(&self.module, &self.network, images, labels)
    }
}

fn evaluate_with<T: PrimInt + Into<i64>>(
    module: &CnnModule,
    network: &Network,
    images: &[Image<T>],
    labels: &[Vec<f64>],
) -> Result<EvalReport> {
    if images.len() != labels.len() {
        return Err(Error::BatchSizeMismatch {
            expected: images.len(),
            actual: labels.len(),
        });
    }
    tally(images.iter().zip(labels.iter()).map(|(image, label)| {
        module.extract(image).and_then(|features| network.forward(&features, label))
    }))
}

use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread;

use anyhow::{bail, Context};
use clap::{Parser, ValueEnum};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use ferrite_mlp::cnn::filters;
use ferrite_mlp::data::{parse_idx_pair, IdxSet};
use ferrite_mlp::{
    ActivationFunction, Batch, BatchStats, CnnLayer, CnnModule, CnnNetwork, EpochStats, LayerSpec,
    LrScheduler, Network, NetworkConfig, OutputSpec, PoolingMethod, PoolingStage, TrainingConfig,
    WeightInitializer,
};

const N_CLASSES: usize = 10;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Scheduler {
    Exponential,
    Cosine,
    Linear,
}

impl From<Scheduler> for LrScheduler {
    fn from(scheduler: Scheduler) -> LrScheduler {
        match scheduler {
            Scheduler::Exponential => LrScheduler::ExponentialDecay,
            Scheduler::Cosine => LrScheduler::CosineAnnealing,
            Scheduler::Linear => LrScheduler::LinearDecay,
        }
    }
}

/// Trains a digit classifier on IDX (MNIST-format) files for one epoch.
#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    #[arg(long)]
    train_images: PathBuf,
    #[arg(long)]
    train_labels: PathBuf,
    #[arg(long)]
    test_images: PathBuf,
    #[arg(long)]
    test_labels: PathBuf,

    #[arg(long, default_value_t = 32)]
    batch_size: usize,
    /// Batches per epoch; defaults to as many full batches as the training set holds.
    #[arg(long)]
    epoch_size: Option<usize>,
    #[arg(long, default_value_t = 0.1)]
    learning_rate: f64,
    #[arg(long, value_enum, default_value_t = Scheduler::Exponential)]
    scheduler: Scheduler,
    /// Global-norm gradient clip threshold.
    #[arg(long)]
    clip: Option<f64>,
    /// Stop after this many held-out evaluations in a row miss the best loss (0 = never).
    #[arg(long, default_value_t = 0)]
    negative_attempts: usize,

    /// Hidden layer sizes, e.g. `--hidden 128,64`. The 10-node output layer is appended.
    #[arg(long, value_delimiter = ',', default_value = "64")]
    hidden: Vec<usize>,
    /// Network topology as JSON; overrides `--hidden`. The input size is rebound to the data.
    #[arg(long)]
    network: Option<PathBuf>,
    /// Feed the network through the edge/pooling filter bank instead of raw pixels.
    #[arg(long)]
    cnn: bool,

    /// Held-out samples used for the per-batch evaluation.
    #[arg(long, default_value_t = 1000)]
    test_limit: usize,
    #[arg(long)]
    seed: Option<u64>,
    /// Print one JSON line of batch statistics per trained batch to stdout.
    #[arg(long)]
    progress_json: bool,
}

fn load_set(images: &Path, labels: &Path) -> anyhow::Result<IdxSet> {
    let image_bytes = std::fs::read(images)
        .with_context(|| format!("failed to read {}", images.display()))?;
    let label_bytes = std::fs::read(labels)
        .with_context(|| format!("failed to read {}", labels.display()))?;
    parse_idx_pair(&image_bytes, &label_bytes, N_CLASSES)
        .with_context(|| format!("failed to parse {}", images.display()))
}

fn network_config(args: &Args, input_size: usize) -> anyhow::Result<NetworkConfig> {
    if let Some(path) = &args.network {
        let config = NetworkConfig::load_json(&path.to_string_lossy())
            .with_context(|| format!("failed to load network config {}", path.display()))?;
        return Ok(config.with_input_size(input_size)?);
    }
    let mut layers: Vec<LayerSpec> = args.hidden.iter()
        .map(|&size| LayerSpec::uniform(size, ActivationFunction::ReLU, WeightInitializer::He, 0.0))
        .collect();
    layers.push(LayerSpec::uniform(N_CLASSES, ActivationFunction::ReLU, WeightInitializer::Glorot, 0.0));
    Ok(NetworkConfig::new(input_size, layers, OutputSpec::softmax_cross_entropy(N_CLASSES))?)
}

fn filter_bank() -> Vec<CnnLayer> {
    [filters::HORIZONTAL, filters::VERTICAL, filters::SLASH, filters::BACKSLASH]
        .iter()
        .map(|kernel| CnnLayer::from_kernel(kernel, vec![PoolingStage::new(PoolingMethod::Max, 2, 2)]))
        .collect()
}

fn batches_of<T: Clone>(
    inputs: &[T],
    labels: &[Vec<f64>],
    order: &[usize],
    batch_size: usize,
    epoch_size: usize,
) -> Vec<Batch<T>> {
    order.chunks_exact(batch_size)
        .take(epoch_size)
        .map(|chunk| Batch::new(
            chunk.iter().map(|&i| inputs[i].clone()).collect(),
            chunk.iter().map(|&i| labels[i].clone()).collect(),
        ))
        .collect()
}

fn spawn_progress_printer(as_json: bool) -> (mpsc::Sender<BatchStats>, thread::JoinHandle<()>) {
    let (tx, rx) = mpsc::channel::<BatchStats>();
    let handle = thread::spawn(move || {
        for stats in rx {
            if as_json {
                match serde_json::to_string(&stats) {
                    Ok(line) => println!("{}", line),
                    Err(e) => log::warn!("failed to serialize batch stats: {}", e),
                }
            } else {
                log::debug!("{:.1}% of epoch done in {} ms", stats.progress * 100.0, stats.elapsed_ms);
            }
        }
    });
    (tx, handle)
}

fn label_meanings() -> Vec<String> {
    (0..N_CLASSES).map(|digit| digit.to_string()).collect()
}

fn report(network: &Network, stats: &EpochStats) {
    log::info!(
        "ran {}/{} batches{}  final lr {:.6}  best held-out loss {:.4}",
        stats.batches_run,
        stats.epoch_size,
        if stats.stopped_early { " (stopped early)" } else { "" },
        stats.final_learning_rate,
        stats.best_loss,
    );
    log::info!("{}", network);
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let train = load_set(&args.train_images, &args.train_labels)?;
    let mut test = load_set(&args.test_images, &args.test_labels)?;
    test.truncate(args.test_limit);
    log::info!(
        "loaded {} training and {} held-out samples of {}x{} pixels",
        train.len(),
        test.len(),
        train.rows,
        train.cols
    );

    let full_batches = train.len() / args.batch_size.max(1);
    let epoch_size = args.epoch_size.unwrap_or(full_batches);
    if epoch_size == 0 || epoch_size > full_batches {
        bail!(
            "training set holds {} full batches of {}, cannot run an epoch of {}",
            full_batches,
            args.batch_size,
            epoch_size
        );
    }

    let mut training = TrainingConfig::new(
        args.batch_size,
        epoch_size,
        args.learning_rate,
        args.scheduler.into(),
        args.negative_attempts,
    )?;
    if let Some(threshold) = args.clip {
        training.set_gradient_threshold(threshold)?;
    }

    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let mut order: Vec<usize> = (0..train.len()).collect();
    order.shuffle(&mut rng);

    let (tx, printer) = spawn_progress_printer(args.progress_json);

    if args.cnn {
        let sample = train.images.first().context("training set is empty")?;
        let module = CnnModule::new(sample, filter_bank())?;
        log::info!("filter bank yields {} features per image", module.output_feature_count());
        let config = network_config(&args, module.output_feature_count())?;
        let mut model = CnnNetwork::with_rng(module, config, training, &mut rng)?;
        model.network_mut().set_label_meanings(label_meanings())?;
        model.network_mut().set_progress_sender(tx);

        let batches = batches_of(&train.images, &train.labels, &order, args.batch_size, epoch_size);
        let held_out = Batch::new(test.images.clone(), test.labels.clone());
        let stats = model.descent_epoch_images(&batches, &held_out)?;
        report(model.network(), &stats);

        if let (Some(image), Some(label)) = (test.images.first(), test.labels.first()) {
            model.fp_image(image, label)?;
            log::info!(
                "first held-out sample: predicted {:?} with p={:.3}, labelled {:?}",
                model.network().prediction_meaning(),
                model.network().probability(),
                model.network().label_meaning(),
            );
        }
    } else {
        let inputs = train.scaled_inputs();
        let config = network_config(&args, train.rows * train.cols)?;
        let mut network = Network::with_rng(config, training, &mut rng)?;
        network.set_label_meanings(label_meanings())?;
        network.set_progress_sender(tx);

        let batches = batches_of(&inputs, &train.labels, &order, args.batch_size, epoch_size);
        let held_out = Batch::new(test.scaled_inputs(), test.labels.clone());
        let stats = network.descent_epoch(&batches, &held_out)?;
        report(&network, &stats);

        if let (Some(input), Some(label)) = (held_out.inputs.first(), held_out.labels.first()) {
            network.fp(input, label)?;
            log::info!(
                "first held-out sample: predicted {:?} with p={:.3}, labelled {:?}",
                network.prediction_meaning(),
                network.probability(),
                network.label_meaning(),
            );
        }
    }

    // The network (and with it the last sender) is gone once the branch above ends.
    printer.join().map_err(|_| anyhow::anyhow!("progress printer panicked"))?;
    Ok(())
}

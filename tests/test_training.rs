// Batch/epoch driver, clipping and learning-rate schedules.

use std::sync::mpsc;

use approx::assert_abs_diff_eq;
use rand::{rngs::StdRng, Rng, SeedableRng};

use ferrite_mlp::optim::clip_by_global_norm;
use ferrite_mlp::{
    ActivationFunction, Batch, Error, LayerSpec, LrScheduler, Matrix, Network, NetworkConfig,
    OutputSpec, ParameterDelta, TrainingConfig, WeightInitializer,
};

fn two_class_config() -> NetworkConfig {
    NetworkConfig::new(
        2,
        vec![
            LayerSpec::uniform(6, ActivationFunction::Sigmoid, WeightInitializer::Glorot, 0.0),
            LayerSpec::uniform(2, ActivationFunction::ReLU, WeightInitializer::Glorot, 0.0),
        ],
        OutputSpec::softmax_cross_entropy(2),
    )
    .unwrap()
}

fn network(training: TrainingConfig, seed: u64) -> Network {
    Network::with_rng(two_class_config(), training, &mut StdRng::seed_from_u64(seed)).unwrap()
}

/// Points labelled by which coordinate is larger.
fn sample_batch(rng: &mut StdRng, size: usize) -> Batch<Vec<f64>> {
    let mut inputs = Vec::with_capacity(size);
    let mut labels = Vec::with_capacity(size);
    for _ in 0..size {
        let x: f64 = rng.gen_range(-1.0..1.0);
        let y: f64 = rng.gen_range(-1.0..1.0);
        inputs.push(vec![x, y]);
        labels.push(if x > y { vec![1.0, 0.0] } else { vec![0.0, 1.0] });
    }
    Batch::new(inputs, labels)
}

#[test]
fn schedules_at_epoch_boundaries() {
    let base = 0.2;
    assert_abs_diff_eq!(LrScheduler::ExponentialDecay.learning_rate(base, 0, 10), base, epsilon = 1e-12);
    assert_abs_diff_eq!(LrScheduler::ExponentialDecay.learning_rate(base, 10, 10), base * 0.01, epsilon = 1e-12);
    assert_abs_diff_eq!(LrScheduler::ExponentialDecay.learning_rate(base, 5, 10), base * 0.1, epsilon = 1e-12);
    assert_abs_diff_eq!(LrScheduler::CosineAnnealing.learning_rate(base, 0, 10), base, epsilon = 1e-12);
    assert_abs_diff_eq!(LrScheduler::CosineAnnealing.learning_rate(base, 5, 10), base * 0.5, epsilon = 1e-12);
    assert_abs_diff_eq!(LrScheduler::CosineAnnealing.learning_rate(base, 10, 10), 0.0, epsilon = 1e-12);
    assert_abs_diff_eq!(LrScheduler::LinearDecay.learning_rate(base, 10, 10), 0.0, epsilon = 1e-12);
    assert_abs_diff_eq!(LrScheduler::LinearDecay.learning_rate(base, 3, 10), base * 0.7, epsilon = 1e-12);
}

#[test]
fn clipping_scales_to_threshold_and_keeps_direction() {
    let delta = ParameterDelta {
        weights: vec![Matrix::from_data(vec![vec![3.0, 0.0]])],
        biases: vec![vec![4.0]],
    };
    assert_abs_diff_eq!(delta.global_norm(), 5.0, epsilon = 1e-12);

    let clipped = clip_by_global_norm(delta.clone(), Some(1.0));
    assert_abs_diff_eq!(clipped.global_norm(), 1.0, epsilon = 1e-12);
    assert_abs_diff_eq!(clipped.weights[0].data[0][0], 0.6, epsilon = 1e-12);
    assert_abs_diff_eq!(clipped.biases[0][0], 0.8, epsilon = 1e-12);

    assert_eq!(clip_by_global_norm(delta.clone(), Some(5.0)), delta);
    assert_eq!(clip_by_global_norm(delta.clone(), None), delta);
}

#[test]
fn invalid_training_configs_are_rejected() {
    for (batch, epoch, lr) in [(0, 1, 0.1), (1, 0, 0.1), (1, 1, -0.5), (1, 1, f64::NAN)] {
        let err = TrainingConfig::new(batch, epoch, lr, LrScheduler::LinearDecay, 0).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }
}

#[test]
fn gradient_threshold_setters_refuse_unusable_values() {
    let mut config = TrainingConfig::new(1, 1, 0.1, LrScheduler::LinearDecay, 0).unwrap();
    config.set_gradient_threshold(2.0).unwrap();
    for threshold in [f64::NAN, f64::INFINITY, 0.0, -1.0] {
        assert!(matches!(config.set_gradient_threshold(threshold), Err(Error::InvalidConfig(_))));
        assert_eq!(config.gradient_clip_threshold, Some(2.0));
    }

    let mut network = network(config, 14);
    for threshold in [f64::NAN, 0.0, -1.0] {
        assert!(matches!(network.set_gradient_threshold(threshold), Err(Error::InvalidConfig(_))));
    }
    assert_eq!(network.training_config().gradient_clip_threshold, Some(2.0));
    network.training_config().validate().unwrap();
}

#[test]
fn wrong_batch_size_fails_without_touching_parameters() {
    let training = TrainingConfig::new(4, 1, 0.5, LrScheduler::LinearDecay, 0).unwrap();
    let mut network = network(training, 1);
    let before = network.parameters();
    let batch = sample_batch(&mut StdRng::seed_from_u64(2), 3);
    assert_eq!(
        network.descent_batch(&batch.inputs, &batch.labels).unwrap_err(),
        Error::BatchSizeMismatch { expected: 4, actual: 3 }
    );
    assert_eq!(network.parameters(), before);
}

#[test]
fn bad_sample_mid_batch_fails_without_touching_parameters() {
    let training = TrainingConfig::new(3, 1, 0.5, LrScheduler::LinearDecay, 0).unwrap();
    let mut network = network(training, 15);
    let before = network.parameters();
    let mut batch = sample_batch(&mut StdRng::seed_from_u64(16), 3);
    batch.inputs[1] = vec![0.4];
    assert_eq!(
        network.descent_batch(&batch.inputs, &batch.labels).unwrap_err(),
        Error::DimensionMismatch { what: "input", expected: 2, actual: 1 }
    );
    assert_eq!(network.parameters(), before);
    assert!(!network.has_pending_pass());
}

#[test]
fn wrong_epoch_size_is_rejected() {
    let training = TrainingConfig::new(2, 3, 0.5, LrScheduler::LinearDecay, 0).unwrap();
    let mut network = network(training, 3);
    let mut rng = StdRng::seed_from_u64(4);
    let batches: Vec<_> = (0..2).map(|_| sample_batch(&mut rng, 2)).collect();
    let held_out = sample_batch(&mut rng, 8);
    assert_eq!(
        network.descent_epoch(&batches, &held_out).unwrap_err(),
        Error::EpochSizeMismatch { expected: 3, actual: 2 }
    );
}

#[test]
fn evaluating_an_empty_set_yields_sentinels() {
    let training = TrainingConfig::new(1, 1, 0.1, LrScheduler::LinearDecay, 0).unwrap();
    let network = network(training, 5);
    let report = network.evaluate(&[], &[]).unwrap();
    assert!(report.is_empty());
    assert_eq!(report.accuracy, -1.0);
    assert_eq!(report.mean_loss, -1.0);
}

#[test]
fn evaluation_does_not_mutate_the_network() {
    let training = TrainingConfig::new(1, 1, 0.1, LrScheduler::LinearDecay, 0).unwrap();
    let network = network(training, 6);
    let before = network.parameters();
    let held_out = sample_batch(&mut StdRng::seed_from_u64(7), 16);
    let report = network.evaluate(&held_out.inputs, &held_out.labels).unwrap();
    assert!((0.0..=1.0).contains(&report.accuracy));
    assert!(report.mean_loss > 0.0);
    assert_eq!(network.parameters(), before);
    assert!(network.output_state().is_none());
}

#[test]
fn epoch_recomputes_learning_rate_and_reports_progress() {
    let training = TrainingConfig::new(2, 2, 0.1, LrScheduler::LinearDecay, 0).unwrap();
    let mut network = network(training, 8);
    let (tx, rx) = mpsc::channel();
    network.set_progress_sender(tx);

    let mut rng = StdRng::seed_from_u64(9);
    let batches: Vec<_> = (0..2).map(|_| sample_batch(&mut rng, 2)).collect();
    let held_out = sample_batch(&mut rng, 8);
    let stats = network.descent_epoch(&batches, &held_out).unwrap();
    drop(network);

    let progress: Vec<_> = rx.iter().collect();
    assert_eq!(progress.len(), 2);
    assert_eq!(progress[0].batch, 1);
    assert_abs_diff_eq!(progress[0].learning_rate, 0.05, epsilon = 1e-12);
    assert_abs_diff_eq!(progress[1].progress, 1.0, epsilon = 1e-12);
    assert_abs_diff_eq!(progress[1].learning_rate, 0.0, epsilon = 1e-12);

    assert_eq!(stats.batches_run, 2);
    assert!(!stats.stopped_early);
    assert_abs_diff_eq!(stats.final_learning_rate, 0.0, epsilon = 1e-12);
}

#[test]
fn epoch_stops_after_repeated_misses() {
    // A zero learning rate keeps the held-out loss constant, so every
    // evaluation after the first misses the best.
    let training = TrainingConfig::new(2, 6, 0.0, LrScheduler::ExponentialDecay, 2).unwrap();
    let mut network = network(training, 10);
    let mut rng = StdRng::seed_from_u64(11);
    let batches: Vec<_> = (0..6).map(|_| sample_batch(&mut rng, 2)).collect();
    let held_out = sample_batch(&mut rng, 8);

    let stats = network.descent_epoch(&batches, &held_out).unwrap();
    assert!(stats.stopped_early);
    assert_eq!(stats.batches_run, 3);
    assert_eq!(stats.best_loss, stats.held_out.mean_loss);
}

#[test]
fn an_epoch_reduces_training_loss() {
    let mut config = TrainingConfig::new(8, 60, 1.0, LrScheduler::CosineAnnealing, 0).unwrap();
    config.set_gradient_threshold(5.0).unwrap();
    let mut network = network(config, 12);
    let mut rng = StdRng::seed_from_u64(13);
    let batches: Vec<_> = (0..60).map(|_| sample_batch(&mut rng, 8)).collect();
    let held_out = sample_batch(&mut rng, 64);

    let before = network.evaluate(&held_out.inputs, &held_out.labels).unwrap();
    let stats = network.descent_epoch(&batches, &held_out).unwrap();
    assert_eq!(stats.batches_run, 60);
    assert!(stats.held_out.mean_loss < before.mean_loss);
}

// Forward/backward behaviour of the fully-connected engine.

use approx::assert_abs_diff_eq;
use rand::{rngs::StdRng, SeedableRng};

use ferrite_mlp::network::NO_FORWARD_PASS;
use ferrite_mlp::{
    ActivationFunction, Error, LayerSpec, LossFunction, LrScheduler, Network, NetworkConfig,
    NormalizationFunction, OutputSpec, TrainingConfig, WeightInitializer,
};

fn sigmoid_config() -> NetworkConfig {
    NetworkConfig::new(
        3,
        vec![
            LayerSpec::uniform(4, ActivationFunction::Sigmoid, WeightInitializer::Glorot, 0.1),
            LayerSpec::uniform(3, ActivationFunction::Sigmoid, WeightInitializer::Glorot, 0.0),
        ],
        OutputSpec::softmax_cross_entropy(3),
    )
    .unwrap()
}

fn training(batch_size: usize, learning_rate: f64) -> TrainingConfig {
    TrainingConfig::new(batch_size, 1, learning_rate, LrScheduler::LinearDecay, 0).unwrap()
}

fn sigmoid_network(seed: u64, batch_size: usize, learning_rate: f64) -> Network {
    let mut rng = StdRng::seed_from_u64(seed);
    Network::with_rng(sigmoid_config(), training(batch_size, learning_rate), &mut rng).unwrap()
}

const INPUT: [f64; 3] = [0.5, -0.2, 0.8];
const LABELS: [f64; 3] = [0.0, 1.0, 0.0];

#[test]
fn analytic_gradients_match_finite_differences() {
    let mut network = sigmoid_network(42, 1, 0.1);
    let pass = network.forward(&INPUT, &LABELS).unwrap();
    let analytic = network.backward(&pass).unwrap().delta;
    let eps = 1e-6;

    for l in 0..network.weights().len() {
        let (rows, cols) = (network.weights()[l].rows, network.weights()[l].cols);
        for n in 0..rows {
            for k in 0..cols {
                network.weights_mut()[l].data[n][k] += eps;
                let plus = network.forward(&INPUT, &LABELS).unwrap().loss;
                network.weights_mut()[l].data[n][k] -= 2.0 * eps;
                let minus = network.forward(&INPUT, &LABELS).unwrap().loss;
                network.weights_mut()[l].data[n][k] += eps;
                let numeric = (plus - minus) / (2.0 * eps);
                assert_abs_diff_eq!(analytic.weights[l].data[n][k], numeric, epsilon = 1e-4);
            }

            network.biases_mut()[l][n] += eps;
            let plus = network.forward(&INPUT, &LABELS).unwrap().loss;
            network.biases_mut()[l][n] -= 2.0 * eps;
            let minus = network.forward(&INPUT, &LABELS).unwrap().loss;
            network.biases_mut()[l][n] += eps;
            let numeric = (plus - minus) / (2.0 * eps);
            assert_abs_diff_eq!(analytic.biases[l][n], numeric, epsilon = 1e-4);
        }
    }
}

#[test]
fn forward_is_pure_and_fp_records_output_state() {
    let mut network = sigmoid_network(1, 1, 0.1);
    let first = network.forward(&INPUT, &LABELS).unwrap();
    let second = network.forward(&INPUT, &LABELS).unwrap();
    assert_eq!(first, second);
    assert!(network.output_state().is_none());

    network.fp(&INPUT, &LABELS).unwrap();
    let state = network.output_state().unwrap();
    assert_eq!(state.probabilities, first.probabilities);
    assert_eq!(state.raw_logits, first.logits().to_vec());
    assert_eq!(network.loss(), first.loss);
    assert!(network.has_pending_pass());
}

#[test]
fn bp_requires_a_pending_forward_pass() {
    let mut network = sigmoid_network(3, 1, 0.1);
    assert!(matches!(network.bp(), Err(Error::InvalidState(_))));

    network.fp(&INPUT, &LABELS).unwrap();
    network.bp().unwrap();
    assert!(!network.has_pending_pass());
    assert!(matches!(network.bp(), Err(Error::InvalidState(_))));
}

#[test]
fn rejected_sample_drops_the_earlier_pending_pass() {
    let mut network = sigmoid_network(4, 1, 0.1);
    network.fp(&INPUT, &LABELS).unwrap();
    let accepted_loss = network.loss();

    assert!(network.fp(&[0.3], &LABELS).is_err());
    assert!(!network.has_pending_pass());
    assert!(matches!(network.bp(), Err(Error::InvalidState(_))));
    assert_eq!(network.loss(), accepted_loss);
}

#[test]
fn backward_refuses_a_pass_from_another_network() {
    let network = sigmoid_network(6, 1, 0.1);
    let other = Network::with_rng(
        NetworkConfig::new(
            2,
            vec![LayerSpec::uniform(3, ActivationFunction::ReLU, WeightInitializer::He, 0.0)],
            OutputSpec::softmax_cross_entropy(3),
        )
        .unwrap(),
        training(1, 0.1),
        &mut StdRng::seed_from_u64(6),
    )
    .unwrap();
    let foreign = other.forward(&[0.1, 0.2], &LABELS).unwrap();
    assert!(matches!(network.backward(&foreign), Err(Error::InvalidState(_))));

    let mut tampered = network.forward(&INPUT, &LABELS).unwrap();
    tampered.z[0].pop();
    assert!(matches!(network.backward(&tampered), Err(Error::InvalidState(_))));
}

#[test]
fn bp_reports_output_gradients() {
    let mut network = sigmoid_network(5, 1, 0.1);
    network.fp(&INPUT, &LABELS).unwrap();
    network.bp().unwrap();
    let state = network.output_state().unwrap();
    // Softmax + cross-entropy collapses to p - y at the logits.
    for i in 0..3 {
        assert_abs_diff_eq!(state.d_normalization[i], state.probabilities[i] - LABELS[i], epsilon = 1e-9);
    }
    assert_eq!(network.dz().last().unwrap(), &state.d_normalization);
}

#[test]
fn mismatched_vectors_are_rejected() {
    let mut network = sigmoid_network(7, 1, 0.1);
    assert_eq!(
        network.fp(&[1.0, 2.0], &LABELS).unwrap_err(),
        Error::DimensionMismatch { what: "input", expected: 3, actual: 2 }
    );
    assert_eq!(
        network.fp(&INPUT, &[1.0, 0.0]).unwrap_err(),
        Error::DimensionMismatch { what: "labels", expected: 3, actual: 2 }
    );
    assert!(!network.has_pending_pass());
}

#[test]
fn statistics_before_any_forward_pass_are_sentinels() {
    let network = sigmoid_network(9, 1, 0.1);
    assert_eq!(network.loss(), NO_FORWARD_PASS);
    assert_eq!(network.probability(), NO_FORWARD_PASS);
    assert_eq!(network.prediction_index(), None);
    assert_eq!(network.label_index(), None);
    assert!(!network.is_correct());
}

#[test]
fn prediction_statistics_follow_the_probabilities() {
    let mut network = sigmoid_network(11, 1, 0.1);
    network.fp(&INPUT, &LABELS).unwrap();
    let probabilities = network.output_state().unwrap().probabilities.clone();
    let predicted = network.prediction_index().unwrap();
    assert_eq!(network.probability(), probabilities[predicted]);
    assert_eq!(network.label_index(), Some(1));
    assert_eq!(network.is_correct(), predicted == 1);

    assert_eq!(network.label_meaning(), Some("Label index: 1".to_owned()));
    assert_eq!(
        network.set_label_meanings(vec!["a".into(), "b".into()]).unwrap_err(),
        Error::DimensionMismatch { what: "label meanings", expected: 3, actual: 2 }
    );
    network.set_label_meanings(vec!["a".into(), "b".into(), "c".into()]).unwrap();
    assert_eq!(network.label_meaning(), Some("b".to_owned()));
}

#[test]
fn zero_learning_rate_leaves_parameters_untouched() {
    let mut network = sigmoid_network(13, 2, 0.0);
    let before = network.parameters();
    network
        .descent_batch(&[INPUT.to_vec(), vec![0.1, 0.2, 0.3]], &[LABELS.to_vec(), vec![1.0, 0.0, 0.0]])
        .unwrap();
    assert_eq!(network.parameters(), before);
}

#[test]
fn batch_of_identical_samples_applies_the_single_sample_gradient() {
    let mut network = sigmoid_network(17, 3, 0.5);
    let before = network.parameters();
    let pass = network.forward(&INPUT, &LABELS).unwrap();
    let gradient = network.backward(&pass).unwrap().delta;

    let inputs = vec![INPUT.to_vec(); 3];
    let labels = vec![LABELS.to_vec(); 3];
    let train_loss = network.descent_batch(&inputs, &labels).unwrap();
    assert_abs_diff_eq!(train_loss, pass.loss, epsilon = 1e-12);

    let after = network.parameters();
    for l in 0..before.weights.len() {
        for (n, row) in before.weights[l].data.iter().enumerate() {
            for (k, &w) in row.iter().enumerate() {
                let expected = w - 0.5 * gradient.weights[l].data[n][k];
                assert_abs_diff_eq!(after.weights[l].data[n][k], expected, epsilon = 1e-12);
            }
        }
        for (n, &b) in before.biases[l].iter().enumerate() {
            assert_abs_diff_eq!(after.biases[l][n], b - 0.5 * gradient.biases[l][n], epsilon = 1e-12);
        }
    }
}

#[test]
fn descent_single_step_applies_the_last_gradients() {
    let mut network = sigmoid_network(19, 1, 0.25);
    let before = network.parameters();
    network.fp(&INPUT, &LABELS).unwrap();
    network.bp().unwrap();
    let gradient = network.gradients().clone();
    network.descent_single_step().unwrap();
    assert_abs_diff_eq!(
        network.biases()[0][0],
        before.biases[0][0] - 0.25 * gradient.biases[0][0],
        epsilon = 1e-12
    );

    network.reset_gradients();
    assert_eq!(network.gradients().global_norm(), 0.0);
}

#[test]
fn constant_initializer_fills_every_weight() {
    let config = NetworkConfig::new(
        2,
        vec![LayerSpec::uniform(2, ActivationFunction::ReLU, WeightInitializer::Constant(0.5), 0.0)],
        OutputSpec::softmax_cross_entropy(2),
    )
    .unwrap();
    let network = Network::new(config, training(1, 0.1)).unwrap();
    assert_eq!(network.weights()[0].data, vec![vec![0.5, 0.5], vec![0.5, 0.5]]);
    assert_eq!(network.layer_structure(), vec![2, 2]);
}

#[test]
fn softmax_is_stable_and_floored() {
    let probabilities = NormalizationFunction::Softmax.forward(&[1000.0, 0.0, -1000.0]);
    assert!(probabilities.iter().all(|p| p.is_finite() && *p >= 1e-15));
    assert_abs_diff_eq!(probabilities.iter().sum::<f64>(), 1.0, epsilon = 1e-12);
    assert_abs_diff_eq!(probabilities[0], 1.0, epsilon = 1e-12);
}

#[test]
fn cross_entropy_is_non_negative_and_finite() {
    let loss = LossFunction::CrossEntropy;
    assert!(loss.forward(&[0.2, 0.3, 0.5], &[0.0, 0.0, 1.0]) >= 0.0);
    let saturated = loss.forward(&[1.0, 1e-15, 0.0], &[0.0, 0.0, 1.0]);
    assert!(saturated.is_finite() && saturated > 0.0);
    assert_abs_diff_eq!(loss.forward(&[0.0, 1.0], &[0.0, 1.0]), 0.0, epsilon = 1e-12);
}

#[test]
fn output_size_must_match_last_layer() {
    let err = NetworkConfig::new(
        4,
        vec![LayerSpec::uniform(3, ActivationFunction::ReLU, WeightInitializer::He, 0.0)],
        OutputSpec::softmax_cross_entropy(10),
    )
    .unwrap_err();
    assert!(matches!(err, Error::InvalidConfig(_)));
}

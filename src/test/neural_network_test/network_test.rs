use super::*;
use crate::dataset::xor;
use std::time::Duration;

fn quiet_config(seed: u64) -> TrainingConfig {
    TrainingConfig {
        batch_size: 4,
        learning_rate: 0.5,
        seed: Some(seed),
        verbose: false,
    }
}

fn small_network(seed: u64) -> Network {
    Network::with_config(
        2,
        vec![
            Linear::new(3).into(),
            Tanh::new().into(),
            Linear::new(1).into(),
            Sigmoid::new().into(),
        ],
        quiet_config(seed),
    )
    .unwrap()
}

fn assert_same_outputs(a: &Network, b: &Network, epsilon: f64) {
    for point in xor() {
        let left = a.evaluate(&point.input).unwrap();
        let right = b.evaluate(&point.input).unwrap();
        for (l, r) in left.iter().zip(&right) {
            assert_abs_diff_eq!(*l, *r, epsilon = epsilon);
        }
    }
}

#[test]
fn test_network_construction() {
    let network = small_network(1);
    assert_eq!(network.num_inputs(), 2);
    assert_eq!(network.num_outputs(), 1);
    assert_eq!(network.layers().len(), 4);

    let mut width = network.num_inputs();
    for layer in network.layers() {
        assert_eq!(layer.input_shape().width(), width);
        width = layer.num_outputs();
    }

    let text = network.pretty_print();
    assert!(text.contains("Linear"));
    assert!(text.contains("Sigmoid"));
}

#[test]
fn test_network_construction_errors() {
    assert!(matches!(
        Network::new(0, vec![Linear::new(1).into()]),
        Err(ModelError::InputValidationError(_))
    ));
    assert!(matches!(
        Network::new(2, vec![]),
        Err(ModelError::InputValidationError(_))
    ));

    // A cross-entropy Softmax only fits the final position
    assert!(matches!(
        Network::new(2, vec![Softmax::new().into(), Linear::new(2).into()]),
        Err(ModelError::InputValidationError(_))
    ));
    assert!(Network::new(2, vec![Softmax::with_jacobian().into(), Linear::new(2).into()]).is_ok());

    // Preset weights for two inputs cannot follow three
    let preset = Linear::with_parameters(Array2::zeros((1, 2)), Array2::zeros((1, 1))).unwrap();
    assert!(matches!(
        Network::new(3, vec![preset.into()]),
        Err(ModelError::ShapeMismatch(_))
    ));

    let config = TrainingConfig {
        batch_size: 0,
        ..TrainingConfig::default()
    };
    assert!(Network::with_config(2, vec![Linear::new(1).into()], config).is_err());

    let config = TrainingConfig {
        learning_rate: f64::NAN,
        ..TrainingConfig::default()
    };
    assert!(Network::with_config(2, vec![Linear::new(1).into()], config).is_err());
}

#[test]
fn test_network_same_seed_same_weights() {
    assert_eq!(small_network(9).to_bytes(), small_network(9).to_bytes());
    assert_ne!(small_network(9).to_bytes(), small_network(10).to_bytes());
}

#[test]
fn test_network_evaluate() {
    let network = small_network(2);
    let output = network.evaluate(&[0.5, -0.5]).unwrap();
    assert_eq!(output.len(), 1);
    assert!(output[0] > 0.0 && output[0] < 1.0);

    assert!(matches!(
        network.evaluate(&[1.0]),
        Err(ModelError::ShapeMismatch(_))
    ));
}

#[test]
fn test_network_learn() {
    let network = small_network(3);
    let shifts = network
        .learn(&DataPoint::new(vec![1.0, 0.0], vec![1.0]))
        .unwrap();

    assert_eq!(shifts.len(), 4);
    assert!(matches!(shifts[0], Shift::Weight(_)));
    assert!(shifts[1].is_nil());
    assert!(matches!(shifts[2], Shift::Weight(_)));
    assert!(shifts[3].is_nil());

    assert!(matches!(
        network.learn(&DataPoint::new(vec![1.0, 0.0], vec![1.0, 0.0])),
        Err(ModelError::ShapeMismatch(_))
    ));
    assert_eq!(network.empty_shift(), vec![Shift::Nil; 4]);
}

#[test]
fn test_network_learn_moves_towards_target() {
    let mut network = small_network(4);
    let point = DataPoint::new(vec![1.0, 0.0], vec![1.0]);
    let before = network.evaluate(&point.input).unwrap()[0];

    network.train_batch(&[point.clone()]).unwrap();
    let after = network.evaluate(&point.input).unwrap()[0];
    assert!(after > before);
}

#[test]
fn test_network_batch_is_averaged() {
    let point = DataPoint::new(vec![0.3, 0.8], vec![1.0]);
    let mut single = small_network(5);
    let mut repeated = small_network(5);

    single.train_batch(&[point.clone()]).unwrap();
    repeated
        .train_batch(&[point.clone(), point.clone(), point.clone()])
        .unwrap();

    assert_same_outputs(&single, &repeated, 1e-12);
}

#[test]
fn test_network_batch_uses_pre_update_parameters() {
    let data = xor();
    let mut batched = small_network(6);
    let mut sequential = small_network(6);
    sequential.set_config(TrainingConfig {
        learning_rate: 0.5 / data.len() as f64,
        ..quiet_config(6)
    })
    .unwrap();

    batched.train_batch(&data).unwrap();
    for point in &data {
        sequential.train_batch(std::slice::from_ref(point)).unwrap();
    }

    // Per-sample updates see each other's changes, a batch does not
    let point = &data[1];
    let a = batched.evaluate(&point.input).unwrap()[0];
    let b = sequential.evaluate(&point.input).unwrap()[0];
    assert!((a - b).abs() > 1e-12);
}

#[test]
fn test_network_train_batch_errors() {
    let mut network = small_network(7);
    let snapshot = network.to_bytes();

    let empty: [DataPoint; 0] = [];
    assert!(matches!(
        network.train_batch(&empty),
        Err(ModelError::InputValidationError(_))
    ));

    // One bad sample rejects the whole batch and leaves the parameters alone
    let batch = vec![
        DataPoint::new(vec![0.0, 1.0], vec![1.0]),
        DataPoint::new(vec![0.0, 1.0, 2.0], vec![1.0]),
    ];
    assert!(network.train_batch(&batch).is_err());
    assert_eq!(network.to_bytes(), snapshot);
}

#[test]
fn test_network_train_for_counts() {
    let mut network = small_network(8);
    network
        .set_config(TrainingConfig {
            batch_size: 3,
            ..quiet_config(8)
        })
        .unwrap();

    let data = xor();
    let report = network
        .train_for(&data, &data, TrainingLimit::Batches(5))
        .unwrap();

    assert_eq!(report.batches, 5);
    assert_eq!(report.datapoints, 15);
    assert_eq!(report.epochs, 3);
    assert_eq!(report.before.total, 4);
    assert_eq!(report.after.total, 4);
}

#[test]
fn test_network_train_for_counts_full_epochs() {
    let data = xor();
    let mut network = small_network(8);
    network
        .set_config(TrainingConfig {
            batch_size: 2,
            ..quiet_config(8)
        })
        .unwrap();

    // two batches of two cover xor exactly once
    let report = network
        .train_for(&data, &data, TrainingLimit::Batches(2))
        .unwrap();
    assert_eq!(report.datapoints, 4);
    assert_eq!(report.epochs, 1);

    let report = network
        .train_for(&data, &data, TrainingLimit::Batches(4))
        .unwrap();
    assert_eq!(report.datapoints, 8);
    assert_eq!(report.epochs, 2);

    let report = network
        .train_for(&data, &data, TrainingLimit::Batches(1))
        .unwrap();
    assert_eq!(report.datapoints, 2);
    assert_eq!(report.epochs, 0);
}

#[test]
fn test_network_train_zero_duration() {
    let mut network = small_network(9);
    let data = xor();
    let snapshot = network.to_bytes();

    let report = network.train(&data, &data, Duration::ZERO).unwrap();
    assert_eq!(report.batches, 0);
    assert_eq!(report.datapoints, 0);
    assert_eq!(report.before, report.after);
    assert_eq!(network.to_bytes(), snapshot);
}

#[test]
fn test_network_train_errors() {
    let mut network = small_network(10);
    assert!(matches!(
        network.train_for(&[], &xor(), TrainingLimit::Batches(1)),
        Err(ModelError::InputValidationError(_))
    ));

    let bad = vec![DataPoint::new(vec![0.0, 1.0], vec![1.0, 0.0])];
    assert!(matches!(
        network.train_for(&bad, &xor(), TrainingLimit::Batches(3)),
        Err(ModelError::ShapeMismatch(_))
    ));
}

#[test]
fn test_network_training_is_reproducible() {
    let data = xor();
    let mut a = small_network(11);
    let mut b = small_network(11);

    a.train_for(&data, &data, TrainingLimit::Batches(20)).unwrap();
    b.train_for(&data, &data, TrainingLimit::Batches(20)).unwrap();
    assert_eq!(a.to_bytes(), b.to_bytes());
}

#[test]
fn test_network_score_and_errors() {
    let constant = Linear::with_parameters(Array2::zeros((1, 2)), array![[0.25]]).unwrap();
    let network = Network::new(2, vec![constant.into()]).unwrap();
    let data = xor();

    let evaluation = network.score(&data).unwrap();
    // ½ · (0.25² + 0.75² + 0.75² + 0.25²)
    assert_relative_eq!(evaluation.loss, 0.625);
    assert_relative_eq!(evaluation.mean_loss, 0.15625);
    assert_eq!(evaluation.correct, 2);
    assert_eq!(evaluation.total, 4);
    assert_relative_eq!(evaluation.accuracy(), 0.5);

    let errors = network.get_errors(&data).unwrap();
    assert_eq!(errors, vec![data[1].clone(), data[2].clone()]);

    let empty = network.score(&[]).unwrap();
    assert_eq!(empty.total, 0);
    assert_eq!(empty.mean_loss, 0.0);
    assert_eq!(empty.accuracy(), 0.0);
}

#[test]
fn test_network_errors_reject_wrong_target_width() {
    let constant = Linear::with_parameters(Array2::zeros((1, 2)), array![[0.25]]).unwrap();
    let network = Network::new(2, vec![constant.into()]).unwrap();
    let wide = vec![
        DataPoint::new(vec![0.0, 0.0], vec![0.0]),
        DataPoint::new(vec![1.0, 0.0], vec![0.0, 1.0]),
    ];

    assert!(matches!(
        network.get_errors(&wide),
        Err(ModelError::ShapeMismatch(_))
    ));
    assert!(matches!(
        network.score(&wide),
        Err(ModelError::ShapeMismatch(_))
    ));
}

#[test]
fn test_network_layers_mut() {
    let mut network = Network::new(
        2,
        vec![Linear::with_parameters(Array2::zeros((1, 2)), Array2::zeros((1, 1))).unwrap().into()],
    )
    .unwrap();

    let shift = Shift::Weight(WeightShift::new(array![[1.0, 1.0]], array![[0.5]]));
    shift.apply(&mut network.layers_mut()[0], 1.0).unwrap();
    assert_eq!(network.evaluate(&[1.0, 2.0]).unwrap(), vec![3.5]);
}

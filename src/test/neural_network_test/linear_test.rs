use super::*;

fn preset_linear() -> NetworkLayer {
    let linear = Linear::with_parameters(array![[1.0, 2.0], [3.0, 4.0]], array![[0.5], [-0.5]]).unwrap();
    initialized(linear, Shape::column(2))
}

#[test]
fn test_linear_forward() {
    let layer = preset_linear();
    let output = layer.forward(&array![[1.0], [-1.0]]).unwrap();

    // [1 - 2 + 0.5, 3 - 4 - 0.5]
    assert_abs_diff_eq!(output, array![[-0.5], [-1.5]], epsilon = 1e-12);
    assert_eq!(layer.output_shape(), Shape::column(2));
}

#[test]
fn test_linear_back() {
    let layer = preset_linear();
    let (_, shift, downstream) = pass_and_back(&layer, &array![[1.0], [-1.0]], &array![[1.0], [2.0]]);

    let Shift::Weight(shift) = shift else {
        panic!("Linear must produce a weight shift");
    };
    // ΔW = g·xᵀ, Δb = g
    assert_abs_diff_eq!(shift.weights(), &array![[1.0, -1.0], [2.0, -2.0]], epsilon = 1e-12);
    assert_abs_diff_eq!(shift.bias(), &array![[1.0], [2.0]], epsilon = 1e-12);
    // Wᵀ·g
    assert_abs_diff_eq!(downstream, array![[7.0], [10.0]], epsilon = 1e-12);
}

#[test]
fn test_linear_initialization() {
    let layer = initialized(Linear::new(4), Shape::column(2));
    let NetworkLayer::Linear(linear) = &layer else {
        unreachable!()
    };

    assert_eq!(linear.weights().dim(), (4, 2));
    assert_eq!(linear.bias().dim(), (4, 1));
    assert_eq!(layer.param_count(), 12);

    // Glorot limit sqrt(6 / (2 + 4)) = 1
    assert!(linear.weights().iter().all(|w| w.abs() <= 1.0));
    assert!(linear.bias().iter().all(|&b| b == 0.0));
}

#[test]
fn test_linear_accepts_spatial_input() {
    let layer = initialized(Linear::new(1), Shape::new(2, 2, 1));
    let input = array![[1.0], [2.0], [3.0], [4.0]];
    let (_, cache) = layer.pass(&input).unwrap();
    let (_, downstream) = layer.back(cache, &array![[1.0]]).unwrap();
    assert_eq!(downstream.dim(), input.dim());
}

#[test]
fn test_linear_shape_errors() {
    let layer = preset_linear();
    assert!(matches!(
        layer.forward(&array![[1.0], [2.0], [3.0]]),
        Err(ModelError::ShapeMismatch(_))
    ));

    let (_, cache) = layer.pass(&array![[1.0], [2.0]]).unwrap();
    assert!(matches!(
        layer.back(cache, &array![[1.0]]),
        Err(ModelError::ShapeMismatch(_))
    ));

    // Preset weights for 2 inputs cannot consume 3
    let mut preset: NetworkLayer = Linear::with_parameters(Array2::zeros((1, 2)), Array2::zeros((1, 1)))
        .unwrap()
        .into();
    assert!(matches!(
        preset.initialize(Shape::column(3), &mut test_rng()),
        Err(ModelError::ShapeMismatch(_))
    ));
}

#[test]
fn test_linear_rejects_bad_parameters() {
    assert!(Linear::with_parameters(Array2::zeros((2, 3)), Array2::zeros((3, 1))).is_err());
    assert!(Linear::with_parameters(Array2::zeros((0, 3)), Array2::zeros((0, 1))).is_err());

    let mut empty: NetworkLayer = Linear::new(0).into();
    assert!(matches!(
        empty.initialize(Shape::column(3), &mut test_rng()),
        Err(ModelError::InputValidationError(_))
    ));
}

#[test]
fn test_linear_apply_shift() {
    let mut layer = preset_linear();
    let shift = Shift::Weight(WeightShift::new(Array2::ones((2, 2)), Array2::ones((2, 1))));
    shift.apply(&mut layer, 0.5).unwrap();

    let NetworkLayer::Linear(linear) = &layer else {
        unreachable!()
    };
    assert_relative_eq!(linear.weights(), &array![[1.5, 2.5], [3.5, 4.5]]);
    assert_relative_eq!(linear.bias(), &array![[1.0], [0.0]]);
}

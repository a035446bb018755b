use super::*;

#[test]
fn test_relu() {
    let layer = initialized(Relu::new(), Shape::column(4));
    let input = array![[-1.0], [2.0], [0.0], [3.5]];
    let grad = array![[1.0], [1.0], [1.0], [2.0]];

    let (output, shift, downstream) = pass_and_back(&layer, &input, &grad);
    assert_eq!(output, array![[0.0], [2.0], [0.0], [3.5]]);
    assert!(shift.is_nil());
    assert_eq!(downstream, array![[0.0], [1.0], [0.0], [2.0]]);
}

#[test]
fn test_sigmoid() {
    let layer = initialized(Sigmoid::new(), Shape::column(3));
    let input = array![[0.0], [2.0], [-1000.0]];
    let grad = array![[1.0], [1.0], [1.0]];

    let (output, shift, downstream) = pass_and_back(&layer, &input, &grad);
    assert_abs_diff_eq!(output[[0, 0]], 0.5, epsilon = 1e-12);
    assert_abs_diff_eq!(output[[1, 0]], 1.0 / (1.0 + (-2.0f64).exp()), epsilon = 1e-12);
    // Large negative inputs saturate instead of overflowing
    assert!(output[[2, 0]].is_finite() && output[[2, 0]] >= 0.0);

    assert!(shift.is_nil());
    // y · (1 - y)
    assert_abs_diff_eq!(downstream[[0, 0]], 0.25, epsilon = 1e-12);
}

#[test]
fn test_tanh() {
    let layer = initialized(Tanh::new(), Shape::column(2));
    let input = array![[0.0], [0.5]];
    let grad = array![[2.0], [1.0]];

    let (output, _, downstream) = pass_and_back(&layer, &input, &grad);
    assert_abs_diff_eq!(output[[1, 0]], 0.5f64.tanh(), epsilon = 1e-12);
    assert_abs_diff_eq!(downstream[[0, 0]], 2.0, epsilon = 1e-12);
    assert_abs_diff_eq!(
        downstream[[1, 0]],
        1.0 - 0.5f64.tanh().powi(2),
        epsilon = 1e-12
    );
}

#[test]
fn test_activation_keeps_spatial_shape() {
    let shape = Shape::new(2, 2, 3);
    let layer = initialized(Relu::new(), shape);
    assert_eq!(layer.output_shape(), shape);

    let output = layer.forward(&Array2::ones((4, 3))).unwrap();
    assert_eq!(output.dim(), (4, 3));
}

#[test]
fn test_activation_back_rejects_wrong_gradient() {
    let layer = initialized(Sigmoid::new(), Shape::column(3));
    let (_, cache) = layer.pass(&array![[0.0], [1.0], [2.0]]).unwrap();
    assert!(matches!(
        layer.back(cache, &array![[1.0], [1.0]]),
        Err(ModelError::ShapeMismatch(_))
    ));
}

#[test]
fn test_softmax_forward() {
    let layer = initialized(Softmax::new(), Shape::column(3));
    let output = layer.forward(&array![[1.0], [2.0], [3.0]]).unwrap();

    let denominator = 1.0f64.exp() + 2.0f64.exp() + 3.0f64.exp();
    assert_abs_diff_eq!(output[[2, 0]], 3.0f64.exp() / denominator, epsilon = 1e-12);
    assert_abs_diff_eq!(output.sum(), 1.0, epsilon = 1e-12);

    // Max subtraction keeps large inputs finite
    let output = layer.forward(&array![[1000.0], [1001.0], [1002.0]]).unwrap();
    assert!(output.iter().all(|v| v.is_finite()));
    assert_abs_diff_eq!(output.sum(), 1.0, epsilon = 1e-12);
}

#[test]
fn test_softmax_cross_entropy_passes_gradient_through() {
    let layer = initialized(Softmax::new(), Shape::column(3));
    let grad = array![[0.3], [-0.2], [-0.1]];
    let (_, shift, downstream) = pass_and_back(&layer, &array![[0.5], [0.1], [-0.3]], &grad);

    assert!(shift.is_nil());
    assert_eq!(downstream, grad);
}

#[test]
fn test_softmax_jacobian_gradient() {
    let layer = initialized(Softmax::with_jacobian(), Shape::column(3));
    let input = array![[0.5], [0.1], [-0.3]];
    let grad = array![[1.0], [0.0], [0.0]];
    let (output, _, downstream) = pass_and_back(&layer, &input, &grad);

    // ∂y₀/∂x = y₀ · (e₀ - y)
    let y = output.column(0).to_owned();
    assert_abs_diff_eq!(downstream[[0, 0]], y[0] * (1.0 - y[0]), epsilon = 1e-12);
    assert_abs_diff_eq!(downstream[[1, 0]], -y[0] * y[1], epsilon = 1e-12);
    assert_abs_diff_eq!(downstream[[2, 0]], -y[0] * y[2], epsilon = 1e-12);
    // The Jacobian rows sum to zero
    assert_abs_diff_eq!(downstream.sum(), 0.0, epsilon = 1e-12);
}

#[test]
fn test_activation_layer_types() {
    let layers: Vec<NetworkLayer> = vec![
        Relu::new().into(),
        Sigmoid::new().into(),
        Tanh::new().into(),
        Softmax::new().into(),
    ];
    let names: Vec<&str> = layers.iter().map(|layer| layer.layer_type()).collect();
    assert_eq!(names, vec!["Relu", "Sigmoid", "Tanh", "Softmax"]);
    assert!(layers.iter().all(|layer| layer.param_count() == 0));
}

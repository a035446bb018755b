use super::*;

fn counting_input(rows: usize, cols: usize) -> Tensor {
    Array2::from_shape_fn((rows, cols), |(i, j)| (i * cols + j + 1) as f64)
}

#[test]
fn test_max_pooling_2d_forward() {
    let layer = initialized(MaxPool2D::new((2, 2)).unwrap(), Shape::new(1, 4, 4));
    let output = layer.forward(&counting_input(4, 4)).unwrap();

    assert_eq!(layer.output_shape(), Shape::new(1, 2, 2));
    assert_eq!(output, array![[6.0, 8.0], [14.0, 16.0]]);
}

#[test]
fn test_max_pooling_2d_back_routes_to_maxima() {
    let layer = initialized(MaxPool2D::new((2, 2)).unwrap(), Shape::new(1, 4, 4));
    let (_, shift, downstream) =
        pass_and_back(&layer, &counting_input(4, 4), &array![[1.0, 2.0], [3.0, 4.0]]);

    assert!(shift.is_nil());
    let mut expected = Array2::zeros((4, 4));
    expected[[1, 1]] = 1.0;
    expected[[1, 3]] = 2.0;
    expected[[3, 1]] = 3.0;
    expected[[3, 3]] = 4.0;
    assert_eq!(downstream, expected);
}

#[test]
fn test_max_pooling_2d_drops_partial_windows() {
    let layer = initialized(MaxPool2D::new((2, 2)).unwrap(), Shape::new(1, 5, 5));
    assert_eq!(layer.output_shape(), Shape::new(1, 2, 2));

    let output = layer.forward(&counting_input(5, 5)).unwrap();
    assert_eq!(output, array![[7.0, 9.0], [17.0, 19.0]]);
}

#[test]
fn test_max_pooling_2d_per_channel() {
    let layer = initialized(MaxPool2D::new((2, 2)).unwrap(), Shape::new(2, 2, 2));
    let input = array![[1.0, 5.0], [2.0, 3.0], [-4.0, -1.0], [-3.0, -2.0]];

    let output = layer.forward(&input).unwrap();
    assert_eq!(output, array![[5.0], [-1.0]]);
}

#[test]
fn test_max_pooling_2d_tie_takes_first() {
    let layer = initialized(MaxPool2D::new((2, 2)).unwrap(), Shape::new(1, 2, 2));
    let (_, _, downstream) = pass_and_back(&layer, &Array2::ones((2, 2)), &array![[1.0]]);
    assert_eq!(downstream, array![[1.0, 0.0], [0.0, 0.0]]);
}

#[test]
fn test_max_pooling_2d_errors() {
    assert!(MaxPool2D::new((0, 2)).is_err());
    assert!(MaxPool2D::new((2, 0)).is_err());

    let mut layer: NetworkLayer = MaxPool2D::new((3, 3)).unwrap().into();
    assert!(matches!(
        layer.initialize(Shape::new(1, 2, 4), &mut test_rng()),
        Err(ModelError::ShapeMismatch(_))
    ));

    let layer = initialized(MaxPool2D::new((2, 2)).unwrap(), Shape::new(1, 4, 4));
    let (_, cache) = layer.pass(&counting_input(4, 4)).unwrap();
    assert!(matches!(
        layer.back(cache, &Array2::ones((3, 1))),
        Err(ModelError::ShapeMismatch(_))
    ));
}

use super::*;

fn weight_shift(value: f64) -> Shift {
    Shift::Weight(WeightShift::new(
        Array2::from_elem((2, 3), value),
        Array2::from_elem((2, 1), value),
    ))
}

fn kernel_shift(value: f64) -> Shift {
    Shift::Kernel(KernelShift::new(Array4::from_elem((1, 1, 2, 2), value)))
}

#[test]
fn test_shift_nil_is_identity() {
    let shift = weight_shift(1.5);
    assert_eq!(Shift::Nil.combine(shift.clone()).unwrap(), shift);
    assert_eq!(shift.clone().combine(Shift::Nil).unwrap(), shift);
    assert_eq!(Shift::Nil.combine(Shift::Nil).unwrap(), Shift::Nil);
    assert_eq!(Shift::default(), Shift::Nil);
}

#[test]
fn test_shift_combine_sums() {
    let combined = weight_shift(1.0).combine(weight_shift(2.5)).unwrap();
    assert_eq!(combined, weight_shift(3.5));

    let combined = kernel_shift(-1.0).combine(kernel_shift(0.25)).unwrap();
    assert_eq!(combined, kernel_shift(-0.75));
}

#[test]
fn test_shift_combine_commutative_and_associative() {
    let a = weight_shift(0.1);
    let b = weight_shift(0.2);
    let c = weight_shift(0.3);

    let ab = a.clone().combine(b.clone()).unwrap();
    let ba = b.clone().combine(a.clone()).unwrap();
    assert_eq!(ab, ba);

    let left = ab.combine(c.clone()).unwrap();
    let right = a.combine(b.combine(c).unwrap()).unwrap();
    let (Shift::Weight(left), Shift::Weight(right)) = (left, right) else {
        unreachable!()
    };
    assert_abs_diff_eq!(left.weights(), right.weights(), epsilon = 1e-12);
    assert_abs_diff_eq!(left.bias(), right.bias(), epsilon = 1e-12);
}

#[test]
fn test_shift_composite_combine() {
    let part = |value: f64| WeightShift::new(Array2::from_elem((1, 2), value), Array2::from_elem((1, 1), value));
    let a = Shift::Composite(CompositeShift::new(part(1.0), part(2.0), part(3.0), part(4.0)));
    let b = Shift::Composite(CompositeShift::new(part(1.0), part(1.0), part(1.0), part(1.0)));

    let Shift::Composite(sum) = a.combine(b).unwrap() else {
        unreachable!()
    };
    assert_eq!(sum.input(), &part(2.0));
    assert_eq!(sum.forget(), &part(3.0));
    assert_eq!(sum.cell(), &part(4.0));
    assert_eq!(sum.output(), &part(5.0));
}

#[test]
fn test_shift_combine_mismatch() {
    assert!(matches!(
        weight_shift(1.0).combine(kernel_shift(1.0)),
        Err(ModelError::ShiftMismatch(_))
    ));

    let wider = Shift::Weight(WeightShift::zeros(2, 4));
    assert!(matches!(
        weight_shift(1.0).combine(wider),
        Err(ModelError::ShiftMismatch(_))
    ));

    let composite = Shift::Composite(CompositeShift::zeros(2, 3));
    assert!(matches!(
        composite.combine(weight_shift(1.0)),
        Err(ModelError::ShiftMismatch(_))
    ));
}

#[test]
fn test_shift_scaled() {
    assert_eq!(weight_shift(2.0).scaled(0.5), weight_shift(1.0));
    assert_eq!(kernel_shift(3.0).scaled(-1.0), kernel_shift(-3.0));
    assert_eq!(Shift::Nil.scaled(10.0), Shift::Nil);
}

#[test]
fn test_shift_apply() {
    let mut layer = initialized(
        Linear::with_parameters(Array2::zeros((2, 3)), Array2::zeros((2, 1))).unwrap(),
        Shape::column(3),
    );
    weight_shift(2.0).apply(&mut layer, 0.25).unwrap();

    let NetworkLayer::Linear(linear) = &layer else {
        unreachable!()
    };
    assert!(linear.weights().iter().all(|&w| w == 0.5));
    assert!(linear.bias().iter().all(|&b| b == 0.5));

    // Nil leaves any layer untouched
    let mut relu = initialized(Relu::new(), Shape::column(3));
    Shift::Nil.apply(&mut relu, 1.0).unwrap();
    Shift::Nil.apply(&mut layer, 1.0).unwrap();
}

#[test]
fn test_shift_apply_mismatch() {
    let mut linear = initialized(Linear::new(2), Shape::column(3));
    assert!(matches!(
        kernel_shift(1.0).apply(&mut linear, 1.0),
        Err(ModelError::ShiftMismatch(_))
    ));
    assert!(matches!(
        Shift::Weight(WeightShift::zeros(2, 5)).apply(&mut linear, 1.0),
        Err(ModelError::ShiftMismatch(_))
    ));

    let mut relu = initialized(Relu::new(), Shape::column(3));
    assert!(matches!(
        weight_shift(1.0).apply(&mut relu, 1.0),
        Err(ModelError::ShiftMismatch(_))
    ));

    let mut conv = initialized(Conv2D::new((2, 2), 2).unwrap(), Shape::new(1, 3, 3));
    assert!(matches!(
        kernel_shift(1.0).apply(&mut conv, 1.0),
        Err(ModelError::ShiftMismatch(_))
    ));
}

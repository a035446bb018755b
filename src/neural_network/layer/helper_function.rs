use super::*;

/// Validates that a dimension value is greater than 0
///
/// # Parameters
///
/// - `value` - The dimension value to validate
/// - `name` - The name of the dimension for error messages
///
/// # Returns
///
/// * `Ok(())` if validation passes
/// * `Err(ModelError::InputValidationError)` if `value` is 0
pub(super) fn validate_dimension_greater_than_zero(
    value: usize,
    name: &str,
) -> Result<(), ModelError> {
    if value == 0 {
        return Err(ModelError::InputValidationError(format!(
            "{} must be greater than 0",
            name
        )));
    }
    Ok(())
}

/// Checks that `tensor` holds exactly `expected` values.
pub(super) fn validate_tensor_width(
    tensor: &Tensor,
    expected: usize,
    layer: &str,
    what: &str,
) -> Result<(), ModelError> {
    if tensor.len() != expected {
        return Err(ModelError::ShapeMismatch(format!(
            "{} {} holds {} values, expected {}",
            layer,
            what,
            tensor.len(),
            expected
        )));
    }
    Ok(())
}

/// Checks that two tensors have identical dimensions.
pub(super) fn validate_same_dims(
    actual: &Tensor,
    expected: &Tensor,
    layer: &str,
) -> Result<(), ModelError> {
    if actual.dim() != expected.dim() {
        return Err(ModelError::ShapeMismatch(format!(
            "{} gradient has shape {:?} but the cached tensor has shape {:?}",
            layer,
            actual.dim(),
            expected.dim()
        )));
    }
    Ok(())
}

/// Copies `tensor` row-major into a matrix of `dims`.
///
/// # Returns
///
/// - `Ok(Tensor)` - A new tensor with the same values in row-major order
/// - `Err(ModelError::ShapeMismatch)` - If the element counts differ
pub(super) fn reshape(tensor: &Tensor, dims: (usize, usize)) -> Result<Tensor, ModelError> {
    if tensor.len() != dims.0 * dims.1 {
        return Err(ModelError::ShapeMismatch(format!(
            "cannot reshape {} values into {:?}",
            tensor.len(),
            dims
        )));
    }
    Array2::from_shape_vec(dims, tensor.iter().copied().collect())
        .map_err(|e| ModelError::ShapeMismatch(e.to_string()))
}

/// Reads `tensor` row-major as a `(channels, rows, cols)` volume.
pub(super) fn to_volume(tensor: &Tensor, shape: Shape) -> Result<Array3<f64>, ModelError> {
    if tensor.len() != shape.width() {
        return Err(ModelError::ShapeMismatch(format!(
            "cannot read {} values as a {} volume",
            tensor.len(),
            shape
        )));
    }
    Array3::from_shape_vec(
        (shape.channels, shape.rows, shape.cols),
        tensor.iter().copied().collect(),
    )
    .map_err(|e| ModelError::ShapeMismatch(e.to_string()))
}

/// Writes a volume back into the canonical `(channels · rows) × cols` layout.
pub(super) fn from_volume(volume: Array3<f64>) -> Result<Tensor, ModelError> {
    let (channels, rows, cols) = volume.dim();
    let values: Vec<f64> = volume.into_iter().collect();
    Array2::from_shape_vec((channels * rows, cols), values)
        .map_err(|e| ModelError::ShapeMismatch(e.to_string()))
}

/// Xavier/Glorot uniform bound `sqrt(6 / (fan_in + fan_out))`
pub(super) fn glorot_limit(fan_in: usize, fan_out: usize) -> f64 {
    (6.0 / (fan_in + fan_out) as f64).sqrt()
}

/// Xavier/Glorot uniform initialization for a `dims` weight matrix.
pub(super) fn glorot_uniform<R: Rng + ?Sized>(
    dims: (usize, usize),
    fan_in: usize,
    fan_out: usize,
    rng: &mut R,
) -> Array2<f64> {
    let limit = glorot_limit(fan_in, fan_out);
    Array2::random_using(dims, Uniform::new(-limit, limit), rng)
}

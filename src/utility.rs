/// Returns the index of the largest value in `values`.
///
/// Ties resolve to the first occurrence and `NaN` entries never win. An empty slice yields 0.
///
/// # Parameters
///
/// * `values` - Output or target vector
///
/// # Returns
///
/// * `usize` - Position of the maximum
pub fn get_max_index(values: &[f64]) -> usize {
    values
        .iter()
        .enumerate()
        .fold((0, f64::NEG_INFINITY), |(best_index, best), (index, &value)| {
            if value > best {
                (index, value)
            } else {
                (best_index, best)
            }
        })
        .0
}

/// Decodes a one-hot (or probability) vector into the class index it encodes.
pub fn from_one_hot(target: &[f64]) -> usize {
    get_max_index(target)
}

/// Decides whether a prediction counts as correct for `target`.
///
/// Multi-output predictions are correct when their arg-max matches the arg-max of the one-hot
/// target. A single output has no meaningful arg-max, so it is thresholded at 0.5 and compared
/// with the target thresholded the same way.
///
/// # Parameters
///
/// - `output` - Network prediction
/// - `target` - Expected output
///
/// # Returns
///
/// * `bool` - `true` when the prediction and the target agree
pub fn is_correct(output: &[f64], target: &[f64]) -> bool {
    if output.len() == 1 && target.len() == 1 {
        (output[0] >= 0.5) == (target[0] >= 0.5)
    } else {
        get_max_index(output) == from_one_hot(target)
    }
}

use super::*;

/// ReLU (Rectified Linear Unit) activation layer.
///
/// Applies `max(0, x)` element-wise, keeping the input shape. The cache is the input, since
/// the derivative is 1 where the input was positive and 0 elsewhere.
#[derive(Debug, Clone, Default)]
pub struct Relu {
    input_shape: Shape,
}

impl Relu {
    /// Creates a new ReLU activation layer.
    ///
    /// # Returns
    ///
    /// - `Self` - A new `Relu` layer instance
    pub fn new() -> Self {
        Relu::default()
    }
}

impl Layer for Relu {
    type Cache = Tensor;

    fn pass(&self, input: &Tensor) -> Result<(Tensor, Self::Cache), ModelError> {
        validate_tensor_width(input, self.input_shape.width(), "Relu", "input")?;
        let output = map_elementwise(input, |x| if x > 0.0 { x } else { 0.0 });
        Ok((output, input.clone()))
    }

    fn back(&self, cache: Self::Cache, grad_output: &Tensor) -> Result<(Shift, Tensor), ModelError> {
        let grad_input = scale_gradient(grad_output, &cache, "Relu", |x| {
            if x > 0.0 { 1.0 } else { 0.0 }
        })?;
        Ok((Shift::Nil, grad_input))
    }

    fn layer_type(&self) -> &str {
        "Relu"
    }

    activation_shape_functions!();
    activation_codec_functions!("Relu");
}

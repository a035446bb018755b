use super::*;

/// Tanh (Hyperbolic Tangent) activation layer.
///
/// Caches its output `y`; the derivative is `1 - y²`.
#[derive(Debug, Clone, Default)]
pub struct Tanh {
    input_shape: Shape,
}

impl Tanh {
    pub fn new() -> Self {
        Tanh::default()
    }
}

impl Layer for Tanh {
    type Cache = Tensor;

    fn pass(&self, input: &Tensor) -> Result<(Tensor, Self::Cache), ModelError> {
        validate_tensor_width(input, self.input_shape.width(), "Tanh", "input")?;
        let output = map_elementwise(input, f64::tanh);
        Ok((output.clone(), output))
    }

    fn back(&self, cache: Self::Cache, grad_output: &Tensor) -> Result<(Shift, Tensor), ModelError> {
        let grad_input = scale_gradient(grad_output, &cache, "Tanh", |y| 1.0 - y * y)?;
        Ok((Shift::Nil, grad_input))
    }

    fn layer_type(&self) -> &str {
        "Tanh"
    }

    activation_shape_functions!();
    activation_codec_functions!("Tanh");
}

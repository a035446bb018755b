use super::*;

/// Sigmoid activation layer.
///
/// Applies `1 / (1 + e^-x)` element-wise. The cache is the output `y`, from which the
/// derivative `y · (1 - y)` follows.
#[derive(Debug, Clone, Default)]
pub struct Sigmoid {
    input_shape: Shape,
}

impl Sigmoid {
    /// Creates a new Sigmoid activation layer.
    pub fn new() -> Self {
        Sigmoid::default()
    }
}

impl Layer for Sigmoid {
    type Cache = Tensor;

    fn pass(&self, input: &Tensor) -> Result<(Tensor, Self::Cache), ModelError> {
        validate_tensor_width(input, self.input_shape.width(), "Sigmoid", "input")?;
        let output = map_elementwise(input, |x| {
            1.0 / (1.0 + (-x.clamp(-EXP_CLAMP, EXP_CLAMP)).exp())
        });
        Ok((output.clone(), output))
    }

    fn back(&self, cache: Self::Cache, grad_output: &Tensor) -> Result<(Shift, Tensor), ModelError> {
        let grad_input = scale_gradient(grad_output, &cache, "Sigmoid", |y| y * (1.0 - y))?;
        Ok((Shift::Nil, grad_input))
    }

    fn layer_type(&self) -> &str {
        "Sigmoid"
    }

    activation_shape_functions!();
    activation_codec_functions!("Sigmoid");
}

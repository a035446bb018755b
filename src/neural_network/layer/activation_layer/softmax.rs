use super::*;

/// How a Softmax layer turns the upstream gradient into its downstream gradient.
///
/// The network injects `target - prediction` into the last layer. Read as the gradient of
/// softmax followed by cross-entropy with respect to the softmax *input*, that value already
/// accounts for the softmax Jacobian, so `CrossEntropy` passes it through unchanged. This is
/// only valid for the final layer of a network, which `Network` enforces at construction.
/// `Jacobian` applies the full Jacobian `y ⊙ (g - ⟨y, g⟩)` and may be placed anywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SoftmaxGradient {
    #[default]
    CrossEntropy,
    Jacobian,
}

impl SoftmaxGradient {
    fn index(self) -> i32 {
        match self {
            SoftmaxGradient::CrossEntropy => 0,
            SoftmaxGradient::Jacobian => 1,
        }
    }

    fn from_index(index: i32) -> Result<Self, ModelError> {
        match index {
            0 => Ok(SoftmaxGradient::CrossEntropy),
            1 => Ok(SoftmaxGradient::Jacobian),
            _ => Err(ModelError::DecodeError(format!(
                "unknown softmax gradient mode {}",
                index
            ))),
        }
    }
}

/// Softmax activation layer.
///
/// Exponentiates every value after subtracting the maximum and normalizes over the whole
/// buffer, so the output sums to 1. The cache is the output.
///
/// # Fields
///
/// - `input_shape` - Recorded input shape, equal to the output shape
/// - `gradient` - Backward contract, see [`SoftmaxGradient`]
#[derive(Debug, Clone, Default)]
pub struct Softmax {
    input_shape: Shape,
    gradient: SoftmaxGradient,
}

impl Softmax {
    /// Creates a Softmax layer for the final position, paired with the cross-entropy gradient.
    pub fn new() -> Self {
        Softmax::default()
    }

    /// Creates a Softmax layer that applies its full Jacobian in the backward pass.
    pub fn with_jacobian() -> Self {
        Softmax {
            input_shape: Shape::default(),
            gradient: SoftmaxGradient::Jacobian,
        }
    }

    pub fn gradient(&self) -> SoftmaxGradient {
        self.gradient
    }
}

impl Layer for Softmax {
    type Cache = Tensor;

    fn pass(&self, input: &Tensor) -> Result<(Tensor, Self::Cache), ModelError> {
        validate_tensor_width(input, self.input_shape.width(), "Softmax", "input")?;

        let max = input.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let mut output = map_elementwise(input, |x| (x - max).max(-EXP_CLAMP).exp());
        let sum = output.sum();
        output.mapv_inplace(|x| x / sum);

        Ok((output.clone(), output))
    }

    fn back(&self, cache: Self::Cache, grad_output: &Tensor) -> Result<(Shift, Tensor), ModelError> {
        validate_same_dims(grad_output, &cache, "Softmax")?;

        let grad_input = match self.gradient {
            SoftmaxGradient::CrossEntropy => grad_output.clone(),
            SoftmaxGradient::Jacobian => {
                let dot: f64 = Zip::from(grad_output)
                    .and(&cache)
                    .fold(0.0, |acc, &g, &y| acc + g * y);
                let mut grad_input = grad_output.clone();
                Zip::from(&mut grad_input)
                    .and(&cache)
                    .for_each(|g, &y| *g = y * (*g - dot));
                grad_input
            }
        };

        Ok((Shift::Nil, grad_input))
    }

    fn layer_type(&self) -> &str {
        "Softmax"
    }

    activation_shape_functions!();

    fn to_bytes(&self) -> Vec<u8> {
        let mut writer = ByteWriter::new();
        writer.write_shape(self.input_shape);
        writer.write_i32(self.gradient.index());
        writer.into_bytes()
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self, ModelError> {
        let mut reader = ByteReader::new(bytes);
        let input_shape = reader.read_shape("Softmax input shape")?;
        let gradient = SoftmaxGradient::from_index(reader.read_i32("Softmax gradient mode")?)?;
        reader.finish("Softmax payload")?;
        Ok(Softmax {
            input_shape,
            gradient,
        })
    }

    fn pretty_print(&self) -> String {
        format!(
            "Softmax {} -> {} ({:?} gradient)",
            self.input_shape,
            self.output_shape(),
            self.gradient
        )
    }
}

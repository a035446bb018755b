use super::*;

/// Threshold for parallel computation (in number of elements)
/// For tensors with fewer elements, sequential computation is faster due to overhead
const ACTIVATION_PARALLEL_THRESHOLD: usize = 10_000;

/// Exponent arguments are clamped to this range so `exp` never overflows
const EXP_CLAMP: f64 = 500.0;

/// Applies `f` to every element of a copy of `input`.
fn map_elementwise<F>(input: &Tensor, f: F) -> Tensor
where
    F: Fn(f64) -> f64 + Sync + Send,
{
    let mut output = input.clone();
    if output.len() >= ACTIVATION_PARALLEL_THRESHOLD {
        output.par_mapv_inplace(f);
    } else {
        output.mapv_inplace(f);
    }
    output
}

/// Multiplies the upstream gradient by `derivative(cached)` element by element.
fn scale_gradient<F>(
    grad_output: &Tensor,
    cached: &Tensor,
    layer: &str,
    derivative: F,
) -> Result<Tensor, ModelError>
where
    F: Fn(f64) -> f64 + Sync + Send,
{
    validate_same_dims(grad_output, cached, layer)?;

    let mut grad_input = grad_output.clone();
    if grad_input.len() >= ACTIVATION_PARALLEL_THRESHOLD {
        Zip::from(&mut grad_input)
            .and(cached)
            .par_for_each(|grad, &value| *grad *= derivative(value));
    } else {
        Zip::from(&mut grad_input)
            .and(cached)
            .for_each(|grad, &value| *grad *= derivative(value));
    }
    Ok(grad_input)
}

/// Shape bookkeeping shared by every activation layer: the output has the input's shape.
macro_rules! activation_shape_functions {
    () => {
        fn initialize<R: Rng + ?Sized>(
            &mut self,
            input_shape: Shape,
            _rng: &mut R,
        ) -> Result<(), ModelError> {
            validate_dimension_greater_than_zero(input_shape.width(), "input width")?;
            self.input_shape = input_shape;
            Ok(())
        }

        fn input_shape(&self) -> Shape {
            self.input_shape
        }

        fn output_shape(&self) -> Shape {
            self.input_shape
        }
    };
}

/// Payload shared by the parameter-free activations: the input shape only.
macro_rules! activation_codec_functions {
    ($name:literal) => {
        fn to_bytes(&self) -> Vec<u8> {
            let mut writer = ByteWriter::new();
            writer.write_shape(self.input_shape);
            writer.into_bytes()
        }

        fn from_bytes(bytes: &[u8]) -> Result<Self, ModelError> {
            let mut reader = ByteReader::new(bytes);
            let input_shape = reader.read_shape(concat!($name, " input shape"))?;
            reader.finish(concat!($name, " payload"))?;
            Ok(Self { input_shape })
        }
    };
}

/// ReLU (Rectified Linear Unit) activation layer
pub mod relu;
/// Sigmoid activation layer
pub mod sigmoid;
/// Softmax activation layer
pub mod softmax;
/// Tanh (Hyperbolic Tangent) activation layer
pub mod tanh;

pub use relu::*;
pub use sigmoid::*;
pub use softmax::*;
pub use tanh::*;

use crate::error::ModelError;
use crate::neural_network::Tensor;
use crate::neural_network::shape::Shape;
use crate::neural_network::shift::Shift;
use rand::Rng;

/// Defines the interface for neural network layers.
///
/// A layer never mutates its own trainable parameters while computing: `pass` and `back`
/// take `&self` and return freshly allocated values, so the same layer can serve many
/// concurrent forward/backward pairs. Parameters change only when a [`Shift`] is applied.
pub trait Layer: Send + Sync {
    /// Forward-pass state needed by the matching `back` call.
    type Cache: Send;

    /// Records the input structure and allocates parameters.
    ///
    /// Layers constructed with explicit parameters keep them and only check that they fit
    /// `input_shape`.
    ///
    /// # Parameters
    ///
    /// - `input_shape` - Output shape of the previous layer (or the network input)
    /// - `rng` - Random source used for weight initialization
    ///
    /// # Returns
    ///
    /// - `Ok(())` - The layer is ready for `pass`
    /// - `Err(ModelError::ShapeMismatch)` - The layer cannot consume `input_shape`
    fn initialize<R: Rng + ?Sized>(
        &mut self,
        input_shape: Shape,
        rng: &mut R,
    ) -> Result<(), ModelError>;

    /// Transforms `input` and returns the output together with the cache for `back`.
    ///
    /// # Parameters
    ///
    /// * `input` - Tensor holding `input_shape().width()` values
    ///
    /// # Returns
    ///
    /// - `Ok((Tensor, Self::Cache))` - Output in the canonical layout of `output_shape()` and the cache
    /// - `Err(ModelError::ShapeMismatch)` - If the input does not match the initialized shape
    fn pass(&self, input: &Tensor) -> Result<(Tensor, Self::Cache), ModelError>;

    /// Cache-free forward pass used for inference.
    fn forward(&self, input: &Tensor) -> Result<Tensor, ModelError> {
        self.pass(input).map(|(output, _)| output)
    }

    /// Computes the parameter shift and the gradient for the previous layer.
    ///
    /// # Parameters
    ///
    /// - `cache` - The cache returned by the matching `pass`
    /// - `grad_output` - Gradient flowing in from the next layer, shaped like the output
    ///
    /// # Returns
    ///
    /// - `Ok((Shift, Tensor))` - This layer's shift (`Shift::Nil` when parameter-free) and the
    ///   downstream gradient shaped like the input that produced `cache`
    /// - `Err(ModelError::ShapeMismatch)` - If the gradient or the cache is malformed
    fn back(&self, cache: Self::Cache, grad_output: &Tensor) -> Result<(Shift, Tensor), ModelError>;

    /// Input structure recorded by `initialize`.
    fn input_shape(&self) -> Shape;

    /// Output structure, derived from the input shape and the layer configuration.
    fn output_shape(&self) -> Shape;

    /// Declared output width, used to chain layer construction.
    fn num_outputs(&self) -> usize {
        self.output_shape().width()
    }

    /// Returns the type name of the layer (e.g. "Linear").
    fn layer_type(&self) -> &str;

    /// Returns the total number of trainable parameters in the layer.
    fn param_count(&self) -> usize {
        0
    }

    /// Encodes exactly the state needed to rebuild the layer: shape and parameter values.
    fn to_bytes(&self) -> Vec<u8>;

    /// Rebuilds a fully initialized layer from the bytes written by `to_bytes`.
    ///
    /// # Returns
    ///
    /// - `Ok(Self)` - A layer in the same state as the encoded one
    /// - `Err(ModelError::DecodeError)` - If the payload is truncated, has trailing bytes or holds invalid dimensions
    fn from_bytes(bytes: &[u8]) -> Result<Self, ModelError>
    where
        Self: Sized;

    /// Human-readable structural summary.
    fn pretty_print(&self) -> String {
        format!(
            "{} {} -> {}",
            self.layer_type(),
            self.input_shape(),
            self.output_shape()
        )
    }
}

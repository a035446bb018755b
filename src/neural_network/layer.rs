use super::*;
use crate::neural_network::serialize::{ByteReader, ByteWriter};
use ndarray::{Array2, Array3, Array4, Axis, Zip, s};
use ndarray_rand::RandomExt;
use ndarray_rand::rand_distr::Uniform;
use rand::Rng;
use rayon::prelude::*;

/// Shared helpers: dimension validation, reshaping and weight initialization
mod helper_function;
use helper_function::*;

/// Elementwise activation layers (ReLU, Sigmoid, Tanh) and Softmax
pub mod activation_layer;
/// 2D convolution layer
pub mod conv_2d;
/// Flatten layer
pub mod flatten;
/// Fully connected layer
pub mod linear;
/// Long Short-Term Memory layer
pub mod lstm;
/// 2D max pooling layer
pub mod max_pooling_2d;

pub use activation_layer::*;
pub use conv_2d::*;
pub use flatten::*;
pub use linear::*;
pub use lstm::*;
pub use max_pooling_2d::*;

/// Generates the closed layer set: the kind index, the `NetworkLayer` and `LayerCache` enums
/// and their exhaustive dispatch. Each variant wraps the layer type of the same name.
macro_rules! network_layers {
    ($($variant:ident = $index:literal),* $(,)?) => {
        /// Identifies a layer variant; the index is the tag stored in the persisted format.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum LayerKind {
            $($variant),*
        }

        impl LayerKind {
            /// Every kind, in index order
            pub const ALL: &'static [LayerKind] = &[$(LayerKind::$variant),*];

            /// Index written in front of each layer payload
            pub fn index(self) -> i32 {
                match self {
                    $(LayerKind::$variant => $index),*
                }
            }

            /// Maps a persisted index back to its kind.
            ///
            /// # Returns
            ///
            /// - `Ok(LayerKind)` - The kind with this index
            /// - `Err(ModelError::DecodeError)` - If no kind has this index
            pub fn from_index(index: i32) -> Result<LayerKind, ModelError> {
                match index {
                    $($index => Ok(LayerKind::$variant),)*
                    _ => Err(ModelError::DecodeError(format!(
                        "unknown layer kind index {}",
                        index
                    ))),
                }
            }

            pub fn name(self) -> &'static str {
                match self {
                    $(LayerKind::$variant => stringify!($variant)),*
                }
            }
        }

        /// A layer of any supported kind, as stored in a [`Network`].
        #[derive(Debug, Clone)]
        pub enum NetworkLayer {
            $($variant($variant)),*
        }

        /// Forward-pass state of any layer kind, consumed by [`NetworkLayer::back`].
        #[derive(Debug)]
        pub enum LayerCache {
            $($variant(<$variant as Layer>::Cache)),*
        }

        $(
            impl From<$variant> for NetworkLayer {
                fn from(layer: $variant) -> Self {
                    NetworkLayer::$variant(layer)
                }
            }
        )*

        impl LayerCache {
            /// Kind of the layer that produced this cache
            pub fn kind(&self) -> LayerKind {
                match self {
                    $(LayerCache::$variant(_) => LayerKind::$variant),*
                }
            }
        }

        impl NetworkLayer {
            pub fn kind(&self) -> LayerKind {
                match self {
                    $(NetworkLayer::$variant(_) => LayerKind::$variant),*
                }
            }

            pub fn initialize<R: Rng + ?Sized>(
                &mut self,
                input_shape: Shape,
                rng: &mut R,
            ) -> Result<(), ModelError> {
                match self {
                    $(NetworkLayer::$variant(layer) => layer.initialize(input_shape, rng)),*
                }
            }

            pub fn pass(&self, input: &Tensor) -> Result<(Tensor, LayerCache), ModelError> {
                match self {
                    $(NetworkLayer::$variant(layer) => layer
                        .pass(input)
                        .map(|(output, cache)| (output, LayerCache::$variant(cache)))),*
                }
            }

            pub fn forward(&self, input: &Tensor) -> Result<Tensor, ModelError> {
                match self {
                    $(NetworkLayer::$variant(layer) => layer.forward(input)),*
                }
            }

            /// Runs the backward pass with a cache produced by this layer's `pass`.
            ///
            /// # Returns
            ///
            /// - `Ok((Shift, Tensor))` - The parameter shift and the downstream gradient
            /// - `Err(ModelError::ShapeMismatch)` - If the cache belongs to another layer kind or the gradient is malformed
            pub fn back(
                &self,
                cache: LayerCache,
                grad_output: &Tensor,
            ) -> Result<(Shift, Tensor), ModelError> {
                match (self, cache) {
                    $((NetworkLayer::$variant(layer), LayerCache::$variant(cache)) => {
                        layer.back(cache, grad_output)
                    })*
                    (layer, cache) => Err(ModelError::ShapeMismatch(format!(
                        "{} layer received a {} cache",
                        layer.layer_type(),
                        cache.kind().name()
                    ))),
                }
            }

            pub fn input_shape(&self) -> Shape {
                match self {
                    $(NetworkLayer::$variant(layer) => layer.input_shape()),*
                }
            }

            pub fn output_shape(&self) -> Shape {
                match self {
                    $(NetworkLayer::$variant(layer) => layer.output_shape()),*
                }
            }

            pub fn num_outputs(&self) -> usize {
                match self {
                    $(NetworkLayer::$variant(layer) => layer.num_outputs()),*
                }
            }

            pub fn layer_type(&self) -> &str {
                match self {
                    $(NetworkLayer::$variant(layer) => layer.layer_type()),*
                }
            }

            pub fn param_count(&self) -> usize {
                match self {
                    $(NetworkLayer::$variant(layer) => layer.param_count()),*
                }
            }

            /// Encodes the layer payload (without the kind tag).
            pub fn to_bytes(&self) -> Vec<u8> {
                match self {
                    $(NetworkLayer::$variant(layer) => layer.to_bytes()),*
                }
            }

            /// Decodes a payload written by `to_bytes` for a layer of `kind`.
            pub fn from_kind_bytes(kind: LayerKind, bytes: &[u8]) -> Result<Self, ModelError> {
                match kind {
                    $(LayerKind::$variant => $variant::from_bytes(bytes).map(NetworkLayer::$variant)),*
                }
            }

            pub fn pretty_print(&self) -> String {
                match self {
                    $(NetworkLayer::$variant(layer) => layer.pretty_print()),*
                }
            }
        }
    };
}

network_layers! {
    Linear = 0,
    Relu = 1,
    Sigmoid = 2,
    Tanh = 3,
    Softmax = 4,
    Conv2D = 5,
    MaxPool2D = 6,
    Flatten = 7,
    Lstm = 8,
}

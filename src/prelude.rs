pub use crate::dataset::{DataPoint, xor};
pub use crate::error::{IoError, ModelError};
pub use crate::neural_network::layer::{
    Conv2D, Flatten, LayerKind, Linear, Lstm, MaxPool2D, NetworkLayer, Relu, Sigmoid, Softmax,
    SoftmaxGradient, Tanh,
};
pub use crate::neural_network::serialize::FILE_EXTENSION;
pub use crate::neural_network::{
    Evaluation, Layer, Network, Shape, Shift, Tensor, TrainingConfig, TrainingLimit,
    TrainingReport,
};
pub use crate::utility::{from_one_hot, get_max_index, is_correct};

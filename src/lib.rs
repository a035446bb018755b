/// Error types shared by every part of the crate.
///
/// - `ModelError` covers shape violations, shift misuse and decode failures
/// - `IoError` covers file system and configuration failures around persistence
pub mod error;

pub use error::{IoError, ModelError};

/// Small numeric helpers consumed by the network: arg-max lookup, one-hot decoding
/// and the correctness rule used when scoring predictions.
pub mod utility;

/// Dataset item type and a built-in XOR table.
///
/// The network only ever sees fixed-length numeric vectors, so a dataset is simply
/// a slice of `DataPoint` values.
///
/// # Examples
/// ```rust
/// use stacknet::dataset::{DataPoint, xor};
///
/// let table = xor();
/// assert_eq!(table.len(), 4);
/// let point = DataPoint::new(vec![0.0, 1.0], vec![1.0]);
/// assert_eq!(point.input.len(), 2);
/// ```
pub mod dataset;

/// Components for building, training and persisting layered neural networks.
///
/// # Core Components
///
/// ## Layer Types
/// - **Linear**: Fully connected `W·x + b`
/// - **Activation**: Relu, Sigmoid, Tanh and Softmax
/// - **Conv2D**: Valid-mode 2-D cross-correlation over a kernel set
/// - **MaxPool2D**: Non-overlapping max pooling
/// - **Flatten**: Row-major reshape to a single column
/// - **Lstm**: Recurrent layer with four gated sub-layers and backpropagation through time
///
/// ## Gradients
/// - **Shift**: Per-layer parameter delta, combinable across samples and applied with a
///   learning-rate scale
///
/// ## Model
/// - **Network**: Flat stack of layers with concurrent mini-batch training
/// - **Persistence**: Self-describing binary format for heterogeneous layer stacks
///
/// # Examples
/// ```rust
/// use stacknet::prelude::*;
///
/// let config = TrainingConfig {
///     batch_size: 4,
///     learning_rate: 2.0,
///     seed: Some(7),
///     verbose: false,
/// };
/// let mut network = Network::with_config(
///     2,
///     vec![
///         Linear::new(4).into(),
///         Sigmoid::new().into(),
///         Linear::new(1).into(),
///         Sigmoid::new().into(),
///     ],
///     config,
/// )
/// .unwrap();
///
/// let data = xor();
/// let report = network
///     .train_for(&data, &data, TrainingLimit::Batches(10))
///     .unwrap();
/// assert_eq!(report.batches, 10);
///
/// let output = network.evaluate(&[1.0, 0.0]).unwrap();
/// assert_eq!(output.len(), 1);
/// ```
pub mod neural_network;

/// Convenience re-exports of the types needed to build and train a network.
pub mod prelude;

pub mod layer;
pub mod network;
pub mod neural_network_trait;
pub mod serialize;
pub mod shape;
pub mod shift;
pub mod training_config;
pub mod training_report;

pub use layer::*;
pub use network::*;
pub use shape::*;
pub use shift::*;
pub use training_config::*;
pub use training_report::*;

pub use crate::error::ModelError;
use ndarray::Array2;

/// Dense 2-D buffer passed between layers.
///
/// Vectors travel as `n × 1` columns; spatial data uses the canonical
/// `(channels · rows) × cols` layout described by [`Shape`].
pub type Tensor = Array2<f64>;

pub use neural_network_trait::Layer;

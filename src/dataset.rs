use serde::{Deserialize, Serialize};

/// A single training or validation example.
///
/// # Fields
///
/// - `input` - Values fed to the first layer, length must equal the network's input width
/// - `output` - Expected values of the final layer, usually a one-hot vector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataPoint {
    pub input: Vec<f64>,
    pub output: Vec<f64>,
}

impl DataPoint {
    /// Creates a new data point from an input vector and its expected output
    pub fn new(input: Vec<f64>, output: Vec<f64>) -> Self {
        DataPoint { input, output }
    }
}

/// The four-row XOR truth table with a single target column.
///
/// # Returns
///
/// * `Vec<DataPoint>` - `[0,0]→0`, `[0,1]→1`, `[1,0]→1`, `[1,1]→0`
pub fn xor() -> Vec<DataPoint> {
    vec![
        DataPoint::new(vec![0.0, 0.0], vec![0.0]),
        DataPoint::new(vec![0.0, 1.0], vec![1.0]),
        DataPoint::new(vec![1.0, 0.0], vec![1.0]),
        DataPoint::new(vec![1.0, 1.0], vec![0.0]),
    ]
}

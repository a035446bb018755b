use crate::error::{IoError, ModelError};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufWriter;

/// Hyperparameters of a training run.
///
/// Missing fields take their default when deserialized, so a JSON file only needs the
/// values it changes.
///
/// # Fields
///
/// - `batch_size` - Samples per parameter update (default 16)
/// - `learning_rate` - Step size; each update is scaled by `learning_rate / batch length` (default 1.0)
/// - `seed` - Seed of the network's random source used for weight initialization and shuffling; `None` draws from entropy
/// - `verbose` - Whether training shows a progress bar and prints summaries (default true)
///
/// # Example
/// ```rust
/// use stacknet::neural_network::TrainingConfig;
///
/// let config: TrainingConfig = serde_json::from_str(r#"{ "batch_size": 8, "seed": 42 }"#).unwrap();
/// assert_eq!(config.batch_size, 8);
/// assert_eq!(config.learning_rate, 1.0);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub batch_size: usize,
    pub learning_rate: f64,
    pub seed: Option<u64>,
    pub verbose: bool,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        TrainingConfig {
            batch_size: 16,
            learning_rate: 1.0,
            seed: None,
            verbose: true,
        }
    }
}

impl TrainingConfig {
    /// Checks that the batch size is positive and the learning rate is finite and positive.
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.batch_size == 0 {
            return Err(ModelError::InputValidationError(
                "batch_size must be greater than 0".to_string(),
            ));
        }
        if !self.learning_rate.is_finite() || self.learning_rate <= 0.0 {
            return Err(ModelError::InputValidationError(format!(
                "learning_rate must be finite and positive, got {}",
                self.learning_rate
            )));
        }
        Ok(())
    }

    /// Loads and validates a configuration from a JSON file.
    ///
    /// # Returns
    ///
    /// - `Ok(TrainingConfig)` - The loaded configuration
    /// - `Err(IoError)` - If the file cannot be read, is not valid JSON or fails validation
    pub fn from_json_file(path: &str) -> Result<Self, IoError> {
        let reader = IoError::load_in_buf_reader(path)?;
        let config: TrainingConfig = serde_json::from_reader(reader).map_err(IoError::JsonError)?;
        config.validate().map_err(IoError::ModelError)?;
        Ok(config)
    }

    /// Writes the configuration as pretty-printed JSON.
    pub fn save_to_path(&self, path: &str) -> Result<(), IoError> {
        let file = File::create(path).map_err(IoError::StdIoError)?;
        serde_json::to_writer_pretty(BufWriter::new(file), self).map_err(IoError::JsonError)
    }
}

use std::fs::File;
use std::io::BufReader;

/// Error types that can occur while building, running, training or decoding a network
///
/// # Variants
///
/// - `InputValidationError` - Construction arguments, datasets or configuration values are unusable
/// - `ShapeMismatch` - A tensor, cache or gradient does not have the shape a layer was initialized for
/// - `ShiftMismatch` - Two shifts of different kinds were combined, or a shift was applied to a layer of another kind
/// - `DecodeError` - A persisted network blob is corrupt, truncated or describes an unknown layer kind
#[derive(Debug, Clone, PartialEq)]
pub enum ModelError {
    InputValidationError(String),
    ShapeMismatch(String),
    ShiftMismatch(String),
    DecodeError(String),
}

impl std::fmt::Display for ModelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelError::InputValidationError(msg) => write!(f, "Input validation error: {}", msg),
            ModelError::ShapeMismatch(msg) => write!(f, "Shape mismatch: {}", msg),
            ModelError::ShiftMismatch(msg) => write!(f, "Shift mismatch: {}", msg),
            ModelError::DecodeError(msg) => write!(f, "Decode error: {}", msg),
        }
    }
}

impl std::error::Error for ModelError {}

/// Input/Output error types that can occur while saving, opening or configuring a network
///
/// # Variants
///
/// - `StdIoError` - Wraps standard I/O errors from file system operations
/// - `JsonError` - Wraps JSON errors raised while reading a training configuration
/// - `ModelError` - The bytes were read but could not be turned into a network
#[derive(Debug)]
pub enum IoError {
    StdIoError(std::io::Error),
    JsonError(serde_json::Error),
    ModelError(ModelError),
}

impl IoError {
    pub fn load_in_buf_reader(path: &str) -> Result<BufReader<File>, IoError> {
        let file = File::open(path).map_err(IoError::StdIoError)?;
        Ok(BufReader::new(file))
    }
}

impl std::fmt::Display for IoError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IoError::StdIoError(e) => write!(f, "IO error: {}", e),
            IoError::JsonError(e) => write!(f, "JSON error: {}", e),
            IoError::ModelError(e) => write!(f, "Model error: {}", e),
        }
    }
}

impl std::error::Error for IoError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            IoError::StdIoError(e) => Some(e),
            IoError::JsonError(e) => Some(e),
            IoError::ModelError(e) => Some(e),
        }
    }
}

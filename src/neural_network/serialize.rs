use crate::error::{IoError, ModelError};
use crate::neural_network::layer::{LayerKind, NetworkLayer};
use crate::neural_network::network::Network;
use crate::neural_network::shape::Shape;
use ndarray::Array2;
use std::fs;
use std::path::{Path, PathBuf};

/// File extension used by `Network::save` and `Network::open`
pub const FILE_EXTENSION: &str = "stacknet";

const I32_BYTES: usize = 4;
const F64_BYTES: usize = 8;

/// Append-only little-endian encoder for layer payloads and network blobs.
#[derive(Debug, Default)]
pub struct ByteWriter {
    bytes: Vec<u8>,
}

impl ByteWriter {
    pub fn new() -> Self {
        ByteWriter { bytes: Vec::new() }
    }

    pub fn write_i32(&mut self, value: i32) {
        self.bytes.extend_from_slice(&value.to_le_bytes());
    }

    /// Writes a dimension or count. Values beyond `i32::MAX` are written as -1 so that decoding
    /// rejects them instead of reading a wrapped size.
    pub fn write_usize(&mut self, value: usize) {
        self.write_i32(i32::try_from(value).unwrap_or(-1));
    }

    pub fn write_f64(&mut self, value: f64) {
        self.bytes.extend_from_slice(&value.to_le_bytes());
    }

    /// Writes every value in iteration order (row-major for ndarray arrays).
    pub fn write_values<'a, I>(&mut self, values: I)
    where
        I: IntoIterator<Item = &'a f64>,
    {
        for &value in values {
            self.write_f64(value);
        }
    }

    pub fn write_shape(&mut self, shape: Shape) {
        self.write_usize(shape.channels);
        self.write_usize(shape.rows);
        self.write_usize(shape.cols);
    }

    /// Writes a length-prefixed block of bytes.
    pub fn write_block(&mut self, block: &[u8]) {
        self.write_usize(block.len());
        self.bytes.extend_from_slice(block);
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

/// Cursor over a byte slice; every read is bounds-checked and reports a `DecodeError`.
#[derive(Debug)]
pub struct ByteReader<'a> {
    bytes: &'a [u8],
    position: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        ByteReader { bytes, position: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.position
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    fn take(&mut self, len: usize, what: &str) -> Result<&'a [u8], ModelError> {
        if len > self.remaining() {
            return Err(ModelError::DecodeError(format!(
                "unexpected end of data while reading {} ({} bytes needed, {} left)",
                what,
                len,
                self.remaining()
            )));
        }
        let slice = &self.bytes[self.position..self.position + len];
        self.position += len;
        Ok(slice)
    }

    pub fn read_i32(&mut self, what: &str) -> Result<i32, ModelError> {
        let mut raw = [0u8; I32_BYTES];
        raw.copy_from_slice(self.take(I32_BYTES, what)?);
        Ok(i32::from_le_bytes(raw))
    }

    /// Reads a strictly positive dimension.
    pub fn read_dimension(&mut self, what: &str) -> Result<usize, ModelError> {
        let value = self.read_i32(what)?;
        if value <= 0 {
            return Err(ModelError::DecodeError(format!(
                "{} must be positive, found {}",
                what, value
            )));
        }
        Ok(value as usize)
    }

    pub fn read_f64(&mut self, what: &str) -> Result<f64, ModelError> {
        let mut raw = [0u8; F64_BYTES];
        raw.copy_from_slice(self.take(F64_BYTES, what)?);
        Ok(f64::from_le_bytes(raw))
    }

    /// Reads `count` values, checking the length before allocating.
    pub fn read_values(&mut self, count: usize, what: &str) -> Result<Vec<f64>, ModelError> {
        let len = count.checked_mul(F64_BYTES).ok_or_else(|| {
            ModelError::DecodeError(format!("{} holds too many values ({})", what, count))
        })?;
        let raw = self.take(len, what)?;
        Ok(raw
            .chunks_exact(F64_BYTES)
            .map(|chunk| {
                let mut value = [0u8; F64_BYTES];
                value.copy_from_slice(chunk);
                f64::from_le_bytes(value)
            })
            .collect())
    }

    pub fn read_array2(&mut self, dims: (usize, usize), what: &str) -> Result<Array2<f64>, ModelError> {
        let count = dims.0.checked_mul(dims.1).ok_or_else(|| {
            ModelError::DecodeError(format!("{} dimensions {:?} overflow", what, dims))
        })?;
        let values = self.read_values(count, what)?;
        Array2::from_shape_vec(dims, values)
            .map_err(|e| ModelError::DecodeError(format!("{}: {}", what, e)))
    }

    /// Reads a shape of positive dimensions whose width does not overflow.
    pub fn read_shape(&mut self, what: &str) -> Result<Shape, ModelError> {
        let channels = self.read_dimension(what)?;
        let rows = self.read_dimension(what)?;
        let cols = self.read_dimension(what)?;
        let shape = Shape::new(channels, rows, cols);
        if shape.checked_width().is_none() {
            return Err(ModelError::DecodeError(format!(
                "{} ({}, {}, {}) holds more values than fit in memory",
                what, channels, rows, cols
            )));
        }
        Ok(shape)
    }

    /// Reads a block written by `ByteWriter::write_block`.
    pub fn read_block(&mut self, what: &str) -> Result<&'a [u8], ModelError> {
        let len = self.read_i32(what)?;
        if len < 0 {
            return Err(ModelError::DecodeError(format!(
                "{} has a negative length ({})",
                what, len
            )));
        }
        self.take(len as usize, what)
    }

    /// Fails if any bytes were left unread.
    pub fn finish(self, what: &str) -> Result<(), ModelError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(ModelError::DecodeError(format!(
                "{} has {} trailing bytes",
                what,
                self.remaining()
            )))
        }
    }
}

/// Encodes a network topology and every layer's state into one blob.
///
/// Layout: `[i32 num_inputs]` then, per layer, `[i32 kind][i32 byte_length][payload]`.
pub fn encode_network(num_inputs: usize, layers: &[NetworkLayer]) -> Vec<u8> {
    let mut writer = ByteWriter::new();
    writer.write_usize(num_inputs);
    for layer in layers {
        writer.write_i32(layer.kind().index());
        writer.write_block(&layer.to_bytes());
    }
    writer.into_bytes()
}

/// Decodes a blob written by `encode_network`.
///
/// Every layer is fully rebuilt before the topology is accepted, and each decoded layer must
/// consume exactly the width the previous one produces.
///
/// # Returns
///
/// - `Ok((usize, Vec<NetworkLayer>))` - The input width and the initialized layers
/// - `Err(ModelError::DecodeError)` - Corrupt or truncated data, an unknown layer kind or a broken chain
pub fn decode_network(bytes: &[u8]) -> Result<(usize, Vec<NetworkLayer>), ModelError> {
    let mut reader = ByteReader::new(bytes);
    let num_inputs = reader.read_dimension("network input width")?;

    let mut layers = Vec::new();
    let mut width = num_inputs;
    while !reader.is_empty() {
        let kind = LayerKind::from_index(reader.read_i32("layer kind")?)?;
        let payload = reader.read_block("layer payload")?;
        let layer = NetworkLayer::from_kind_bytes(kind, payload)?;

        let expected = layer.input_shape().width();
        if expected != width {
            return Err(ModelError::DecodeError(format!(
                "layer {} ({}) expects {} inputs but the previous layer produces {}",
                layers.len(),
                layer.layer_type(),
                expected,
                width
            )));
        }
        width = layer.num_outputs();
        layers.push(layer);
    }

    if layers.is_empty() {
        return Err(ModelError::DecodeError(
            "network blob contains no layers".to_string(),
        ));
    }

    Ok((num_inputs, layers))
}

impl Network {
    /// Serializes the network topology and all parameters.
    pub fn to_bytes(&self) -> Vec<u8> {
        encode_network(self.num_inputs(), self.layers())
    }

    /// Rebuilds a network from `to_bytes` output. The network receives a default `TrainingConfig`.
    ///
    /// # Returns
    ///
    /// - `Ok(Network)` - A network whose layers behave exactly like the encoded ones
    /// - `Err(ModelError)` - If the blob is corrupt; no partially decoded network is returned
    pub fn from_bytes(bytes: &[u8]) -> Result<Network, ModelError> {
        let (num_inputs, layers) = decode_network(bytes)?;
        Network::from_initialized_layers(num_inputs, layers)
    }

    /// Writes the network to `dir/name.stacknet`, creating `dir` when needed.
    ///
    /// # Returns
    ///
    /// - `Ok(PathBuf)` - Path of the written file
    /// - `Err(IoError)` - If the directory or file cannot be written
    pub fn save<P: AsRef<Path>>(&self, dir: P, name: &str) -> Result<PathBuf, IoError> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir).map_err(IoError::StdIoError)?;
        let path = dir.join(format!("{}.{}", name, FILE_EXTENSION));
        fs::write(&path, self.to_bytes()).map_err(IoError::StdIoError)?;
        Ok(path)
    }

    /// Reads a network previously written by `save`.
    pub fn open<P: AsRef<Path>>(dir: P, name: &str) -> Result<Network, IoError> {
        let path = dir.as_ref().join(format!("{}.{}", name, FILE_EXTENSION));
        let bytes = fs::read(&path).map_err(IoError::StdIoError)?;
        Network::from_bytes(&bytes).map_err(IoError::ModelError)
    }
}

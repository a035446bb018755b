use super::*;

/// Threshold for deciding between parallel and sequential execution.
/// When the number of channels is at least this threshold, channels are pooled in parallel.
const MAX_POOL_2D_PARALLEL_THRESHOLD: usize = 32;

/// Forward state of a [`MaxPool2D`] pass.
///
/// # Fields
///
/// - `max_positions` - For every output cell (row-major), the flat row-major index of the input value it took
/// - `input_dims` - Dimensions of the input matrix, restored by the backward pass
#[derive(Debug, Clone)]
pub struct MaxPool2DCache {
    pub max_positions: Vec<usize>,
    pub input_dims: (usize, usize),
}

/// 2D max pooling layer.
///
/// Slides a `(pool rows, pool cols)` window over every channel with a stride equal to the
/// window, keeping the largest value. Rows and columns that do not fill a whole window are
/// dropped, so the output shape is `{channels, rows / pool rows, cols / pool cols}`.
///
/// # Example
/// ```rust
/// use stacknet::prelude::*;
///
/// let network = Network::new(
///     16,
///     vec![Conv2D::new((1, 1), 1).unwrap().with_input_shape(4, 4).into(), MaxPool2D::new((2, 2)).unwrap().into()],
/// )
/// .unwrap();
/// assert_eq!(network.num_outputs(), 4);
/// ```
#[derive(Debug, Clone)]
pub struct MaxPool2D {
    pool_size: (usize, usize),
    input_shape: Shape,
}

impl MaxPool2D {
    /// Creates a new 2D max pooling layer.
    ///
    /// # Parameters
    ///
    /// - `pool_size` - Window size as (rows, cols)
    ///
    /// # Returns
    ///
    /// - `Ok(MaxPool2D)` - New layer instance
    /// - `Err(ModelError::InputValidationError)` - If a window dimension is zero
    pub fn new(pool_size: (usize, usize)) -> Result<Self, ModelError> {
        validate_dimension_greater_than_zero(pool_size.0, "pool rows")?;
        validate_dimension_greater_than_zero(pool_size.1, "pool cols")?;
        Ok(MaxPool2D {
            pool_size,
            input_shape: Shape::default(),
        })
    }

    pub fn pool_size(&self) -> (usize, usize) {
        self.pool_size
    }

    fn check_input_shape(&self, input_shape: Shape) -> Result<(), ModelError> {
        validate_dimension_greater_than_zero(input_shape.width(), "input width")?;
        if input_shape.rows < self.pool_size.0 || input_shape.cols < self.pool_size.1 {
            return Err(ModelError::ShapeMismatch(format!(
                "MaxPool2D window {:?} does not fit input {}",
                self.pool_size, input_shape
            )));
        }
        Ok(())
    }

    /// Pools one channel, returning `(value, flat input index)` per output cell.
    fn pool_channel(&self, volume: &Array3<f64>, channel: usize) -> Vec<(f64, usize)> {
        let (pool_rows, pool_cols) = self.pool_size;
        let Shape { rows, cols, .. } = self.input_shape;
        let offset = channel * rows * cols;
        let out_rows = rows / pool_rows;
        let out_cols = cols / pool_cols;

        let mut cells = Vec::with_capacity(out_rows * out_cols);
        for out_i in 0..out_rows {
            for out_j in 0..out_cols {
                let (top, left) = (out_i * pool_rows, out_j * pool_cols);
                let mut best = (volume[[channel, top, left]], offset + top * cols + left);
                for i in top..top + pool_rows {
                    for j in left..left + pool_cols {
                        let value = volume[[channel, i, j]];
                        if value > best.0 {
                            best = (value, offset + i * cols + j);
                        }
                    }
                }
                cells.push(best);
            }
        }
        cells
    }
}

impl Layer for MaxPool2D {
    type Cache = MaxPool2DCache;

    fn initialize<R: Rng + ?Sized>(
        &mut self,
        input_shape: Shape,
        _rng: &mut R,
    ) -> Result<(), ModelError> {
        self.check_input_shape(input_shape)?;
        self.input_shape = input_shape;
        Ok(())
    }

    fn pass(&self, input: &Tensor) -> Result<(Tensor, Self::Cache), ModelError> {
        let volume = to_volume(input, self.input_shape)?;
        let channels = self.input_shape.channels;

        let pooled: Vec<Vec<(f64, usize)>> = if channels >= MAX_POOL_2D_PARALLEL_THRESHOLD {
            (0..channels)
                .into_par_iter()
                .map(|c| self.pool_channel(&volume, c))
                .collect()
        } else {
            (0..channels).map(|c| self.pool_channel(&volume, c)).collect()
        };

        let (values, max_positions): (Vec<f64>, Vec<usize>) = pooled.into_iter().flatten().unzip();
        let output = Array2::from_shape_vec(self.output_shape().canonical_dims(), values)
            .map_err(|e| ModelError::ShapeMismatch(e.to_string()))?;

        Ok((
            output,
            MaxPool2DCache {
                max_positions,
                input_dims: input.dim(),
            },
        ))
    }

    fn back(&self, cache: Self::Cache, grad_output: &Tensor) -> Result<(Shift, Tensor), ModelError> {
        validate_tensor_width(grad_output, cache.max_positions.len(), "MaxPool2D", "gradient")?;

        let input_len = cache.input_dims.0 * cache.input_dims.1;
        let mut grad_input = vec![0.0; input_len];
        for (&grad, &position) in grad_output.iter().zip(&cache.max_positions) {
            let slot = grad_input.get_mut(position).ok_or_else(|| {
                ModelError::ShapeMismatch(format!(
                    "MaxPool2D cache position {} is outside an input of {} values",
                    position, input_len
                ))
            })?;
            *slot += grad;
        }

        let grad_input = Array2::from_shape_vec(cache.input_dims, grad_input)
            .map_err(|e| ModelError::ShapeMismatch(e.to_string()))?;
        Ok((Shift::Nil, grad_input))
    }

    fn input_shape(&self) -> Shape {
        self.input_shape
    }

    fn output_shape(&self) -> Shape {
        Shape::new(
            self.input_shape.channels,
            self.input_shape.rows / self.pool_size.0,
            self.input_shape.cols / self.pool_size.1,
        )
    }

    fn layer_type(&self) -> &str {
        "MaxPool2D"
    }

    fn to_bytes(&self) -> Vec<u8> {
        let mut writer = ByteWriter::new();
        writer.write_shape(self.input_shape);
        writer.write_usize(self.pool_size.0);
        writer.write_usize(self.pool_size.1);
        writer.into_bytes()
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self, ModelError> {
        let mut reader = ByteReader::new(bytes);
        let input_shape = reader.read_shape("MaxPool2D input shape")?;
        let pool_rows = reader.read_dimension("MaxPool2D pool rows")?;
        let pool_cols = reader.read_dimension("MaxPool2D pool cols")?;
        reader.finish("MaxPool2D payload")?;

        let mut layer = MaxPool2D::new((pool_rows, pool_cols))?;
        layer
            .check_input_shape(input_shape)
            .map_err(|e| ModelError::DecodeError(e.to_string()))?;
        layer.input_shape = input_shape;
        Ok(layer)
    }

    fn pretty_print(&self) -> String {
        format!(
            "MaxPool2D {:?} {} -> {}",
            self.pool_size,
            self.input_shape,
            self.output_shape()
        )
    }
}

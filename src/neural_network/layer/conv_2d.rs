use super::*;

/// Threshold for parallel computation (output cells across all kernels).
/// Smaller workloads run sequentially.
const CONV_2D_PARALLEL_THRESHOLD: usize = 10_000;

/// Forward state of a [`Conv2D`] pass.
///
/// # Fields
///
/// - `input` - The input read as a `(channels, rows, cols)` volume
/// - `input_dims` - Dimensions of the input matrix, restored by the backward pass
#[derive(Debug, Clone)]
pub struct Conv2DCache {
    pub input: Array3<f64>,
    pub input_dims: (usize, usize),
}

/// 2D convolution layer (valid-mode cross-correlation, no bias).
///
/// Each kernel spans every input channel and produces one output channel:
/// `y[k, i, j] = Σ_c Σ_a Σ_b K[k, c, a, b] · x[c, i + a, j + b]`.
/// The output shape is `{kernels, rows - kernel rows + 1, cols - kernel cols + 1}`.
///
/// A Conv2D placed first in a network receives a flat vector; declare the image size with
/// [`Conv2D::with_input_shape`] so the vector can be read as `channels × rows × cols`.
///
/// # Fields
///
/// - `kernel_size` - Kernel size as (rows, cols)
/// - `num_kernels` - Number of kernels (output channels)
/// - `image_size` - Optional declared (rows, cols) of each input channel
/// - `input_shape` - Recorded input shape
/// - `kernels` - Kernel weights with shape (kernels, channels, kernel rows, kernel cols)
///
/// # Example
/// ```rust
/// use stacknet::prelude::*;
///
/// let network = Network::new(
///     36,
///     vec![
///         Conv2D::new((3, 3), 2).unwrap().with_input_shape(6, 6).into(),
///         Relu::new().into(),
///         Flatten::new().into(),
///         Linear::new(3).into(),
///     ],
/// )
/// .unwrap();
///
/// assert_eq!(network.layers()[0].output_shape(), Shape::new(2, 4, 4));
/// assert_eq!(network.evaluate(&[0.5; 36]).unwrap().len(), 3);
/// ```
#[derive(Debug, Clone)]
pub struct Conv2D {
    kernel_size: (usize, usize),
    num_kernels: usize,
    image_size: Option<(usize, usize)>,
    input_shape: Shape,
    kernels: Array4<f64>,
}

impl Conv2D {
    /// Creates a convolution layer whose kernels are allocated by `initialize`.
    ///
    /// # Parameters
    ///
    /// - `kernel_size` - Kernel size as (rows, cols)
    /// - `num_kernels` - Number of kernels
    ///
    /// # Returns
    ///
    /// - `Ok(Conv2D)` - New layer instance
    /// - `Err(ModelError::InputValidationError)` - If any dimension is zero
    pub fn new(kernel_size: (usize, usize), num_kernels: usize) -> Result<Self, ModelError> {
        validate_dimension_greater_than_zero(kernel_size.0, "kernel rows")?;
        validate_dimension_greater_than_zero(kernel_size.1, "kernel cols")?;
        validate_dimension_greater_than_zero(num_kernels, "number of kernels")?;

        Ok(Conv2D {
            kernel_size,
            num_kernels,
            image_size: None,
            input_shape: Shape::default(),
            kernels: Array4::zeros((num_kernels, 0, kernel_size.0, kernel_size.1)),
        })
    }

    /// Creates a layer with preset kernels of shape (kernels, channels, kernel rows, kernel cols).
    pub fn with_kernels(kernels: Array4<f64>) -> Result<Self, ModelError> {
        let (num_kernels, channels, rows, cols) = kernels.dim();
        let mut layer = Conv2D::new((rows, cols), num_kernels)?;
        validate_dimension_greater_than_zero(channels, "kernel channels")?;
        layer.kernels = kernels;
        Ok(layer)
    }

    /// Declares the `(rows, cols)` of each input channel; the channel count is derived from the
    /// input width.
    pub fn with_input_shape(mut self, rows: usize, cols: usize) -> Self {
        self.image_size = Some((rows, cols));
        self
    }

    pub fn kernel_size(&self) -> (usize, usize) {
        self.kernel_size
    }

    pub fn num_kernels(&self) -> usize {
        self.num_kernels
    }

    pub fn kernels(&self) -> &Array4<f64> {
        &self.kernels
    }

    /// Adds `scale · shift` to the kernels.
    pub fn apply_shift(&mut self, shift: &KernelShift, scale: f64) -> Result<(), ModelError> {
        if shift.kernels().dim() != self.kernels.dim() {
            return Err(ModelError::ShiftMismatch(format!(
                "kernel shift {:?} does not fit a Conv2D layer with kernels {:?}",
                shift.kernels().dim(),
                self.kernels.dim()
            )));
        }
        self.kernels.scaled_add(scale, shift.kernels());
        Ok(())
    }

    /// Resolves the spatial input shape from the previous layer's output shape.
    fn resolve_input_shape(&self, input_shape: Shape) -> Result<Shape, ModelError> {
        let width = input_shape.width();
        validate_dimension_greater_than_zero(width, "input width")?;

        let shape = match self.image_size {
            Some((rows, cols)) => {
                if rows == 0 || cols == 0 || width % (rows * cols) != 0 {
                    return Err(ModelError::ShapeMismatch(format!(
                        "Conv2D cannot read {} values as images of {}x{}",
                        width, rows, cols
                    )));
                }
                Shape::new(width / (rows * cols), rows, cols)
            }
            None if input_shape.is_column() => {
                return Err(ModelError::ShapeMismatch(format!(
                    "Conv2D received a flat input {}; declare the image size with with_input_shape",
                    input_shape
                )));
            }
            None => input_shape,
        };

        if shape.rows < self.kernel_size.0 || shape.cols < self.kernel_size.1 {
            return Err(ModelError::ShapeMismatch(format!(
                "Conv2D kernel {:?} does not fit input {}",
                self.kernel_size, shape
            )));
        }
        Ok(shape)
    }

    fn output_dims(&self) -> (usize, usize) {
        (
            (self.input_shape.rows + 1).saturating_sub(self.kernel_size.0),
            (self.input_shape.cols + 1).saturating_sub(self.kernel_size.1),
        )
    }

    /// Whether the kernel loop is large enough to run on the rayon pool.
    fn is_parallel(&self) -> bool {
        let (out_rows, out_cols) = self.output_dims();
        out_rows * out_cols * self.kernels.len() >= CONV_2D_PARALLEL_THRESHOLD
    }

    /// Cross-correlates `volume` with one kernel.
    fn correlate_kernel(&self, volume: &Array3<f64>, kernel: usize) -> Array2<f64> {
        let (out_rows, out_cols) = self.output_dims();
        let (_, channels, kernel_rows, kernel_cols) = self.kernels.dim();

        let mut feature_map = Array2::zeros((out_rows, out_cols));
        for c in 0..channels {
            for a in 0..kernel_rows {
                for b in 0..kernel_cols {
                    feature_map.scaled_add(
                        self.kernels[[kernel, c, a, b]],
                        &volume.slice(s![c, a..a + out_rows, b..b + out_cols]),
                    );
                }
            }
        }
        feature_map
    }

    /// Kernel delta and the input-gradient contribution of one kernel.
    fn back_kernel(
        &self,
        volume: &Array3<f64>,
        grad: &Array3<f64>,
        kernel: usize,
    ) -> (Array3<f64>, Array3<f64>) {
        let (out_rows, out_cols) = self.output_dims();
        let (_, channels, kernel_rows, kernel_cols) = self.kernels.dim();
        let grad_map = grad.index_axis(Axis(0), kernel);

        let mut delta = Array3::zeros((channels, kernel_rows, kernel_cols));
        let mut grad_input = Array3::zeros(volume.dim());
        for c in 0..channels {
            for a in 0..kernel_rows {
                for b in 0..kernel_cols {
                    delta[[c, a, b]] =
                        (&grad_map * &volume.slice(s![c, a..a + out_rows, b..b + out_cols])).sum();
                    grad_input
                        .slice_mut(s![c, a..a + out_rows, b..b + out_cols])
                        .scaled_add(self.kernels[[kernel, c, a, b]], &grad_map);
                }
            }
        }
        (delta, grad_input)
    }
}

impl Layer for Conv2D {
    type Cache = Conv2DCache;

    fn initialize<R: Rng + ?Sized>(
        &mut self,
        input_shape: Shape,
        rng: &mut R,
    ) -> Result<(), ModelError> {
        let shape = self.resolve_input_shape(input_shape)?;
        let (kernel_rows, kernel_cols) = self.kernel_size;
        let dims = (self.num_kernels, shape.channels, kernel_rows, kernel_cols);

        if self.kernels.dim().1 == 0 {
            let fan_in = shape.channels * kernel_rows * kernel_cols;
            let fan_out = self.num_kernels * kernel_rows * kernel_cols;
            let limit = glorot_limit(fan_in, fan_out);
            self.kernels = Array4::random_using(dims, Uniform::new(-limit, limit), rng);
        } else if self.kernels.dim() != dims {
            return Err(ModelError::ShapeMismatch(format!(
                "Conv2D kernels {:?} do not fit input {}",
                self.kernels.dim(),
                shape
            )));
        }

        self.input_shape = shape;
        Ok(())
    }

    fn pass(&self, input: &Tensor) -> Result<(Tensor, Self::Cache), ModelError> {
        let volume = to_volume(input, self.input_shape)?;

        let feature_maps: Vec<Array2<f64>> = if self.is_parallel() {
            (0..self.num_kernels)
                .into_par_iter()
                .map(|k| self.correlate_kernel(&volume, k))
                .collect()
        } else {
            (0..self.num_kernels)
                .map(|k| self.correlate_kernel(&volume, k))
                .collect()
        };

        let values: Vec<f64> = feature_maps.iter().flat_map(|map| map.iter().copied()).collect();
        let output = Array2::from_shape_vec(self.output_shape().canonical_dims(), values)
            .map_err(|e| ModelError::ShapeMismatch(e.to_string()))?;

        Ok((
            output,
            Conv2DCache {
                input: volume,
                input_dims: input.dim(),
            },
        ))
    }

    fn back(&self, cache: Self::Cache, grad_output: &Tensor) -> Result<(Shift, Tensor), ModelError> {
        if cache.input.dim()
            != (
                self.input_shape.channels,
                self.input_shape.rows,
                self.input_shape.cols,
            )
        {
            return Err(ModelError::ShapeMismatch(format!(
                "Conv2D cache holds a volume of {:?}, expected {}",
                cache.input.dim(),
                self.input_shape
            )));
        }
        let grad = to_volume(grad_output, self.output_shape())?;

        let per_kernel: Vec<(Array3<f64>, Array3<f64>)> = if self.is_parallel() {
            (0..self.num_kernels)
                .into_par_iter()
                .map(|k| self.back_kernel(&cache.input, &grad, k))
                .collect()
        } else {
            (0..self.num_kernels)
                .map(|k| self.back_kernel(&cache.input, &grad, k))
                .collect()
        };

        let mut delta = Array4::zeros(self.kernels.dim());
        let mut grad_input = Array3::zeros(cache.input.dim());
        for (k, (kernel_delta, kernel_grad)) in per_kernel.into_iter().enumerate() {
            delta.index_axis_mut(Axis(0), k).assign(&kernel_delta);
            grad_input += &kernel_grad;
        }

        let grad_input = reshape(&from_volume(grad_input)?, cache.input_dims)?;
        Ok((Shift::Kernel(KernelShift::new(delta)), grad_input))
    }

    fn input_shape(&self) -> Shape {
        self.input_shape
    }

    fn output_shape(&self) -> Shape {
        let (rows, cols) = self.output_dims();
        Shape::new(self.num_kernels, rows, cols)
    }

    fn layer_type(&self) -> &str {
        "Conv2D"
    }

    fn param_count(&self) -> usize {
        self.kernels.len()
    }

    fn to_bytes(&self) -> Vec<u8> {
        let mut writer = ByteWriter::new();
        writer.write_shape(self.input_shape);
        writer.write_usize(self.kernel_size.0);
        writer.write_usize(self.kernel_size.1);
        writer.write_usize(self.num_kernels);
        writer.write_values(self.kernels.iter());
        writer.into_bytes()
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self, ModelError> {
        let mut reader = ByteReader::new(bytes);
        let input_shape = reader.read_shape("Conv2D input shape")?;
        let kernel_rows = reader.read_dimension("Conv2D kernel rows")?;
        let kernel_cols = reader.read_dimension("Conv2D kernel cols")?;
        let num_kernels = reader.read_dimension("Conv2D kernel count")?;

        let dims = (num_kernels, input_shape.channels, kernel_rows, kernel_cols);
        let count = dims
            .0
            .checked_mul(dims.1)
            .and_then(|n| n.checked_mul(dims.2))
            .and_then(|n| n.checked_mul(dims.3))
            .ok_or_else(|| ModelError::DecodeError(format!("Conv2D kernels {:?} overflow", dims)))?;
        let values = reader.read_values(count, "Conv2D kernels")?;
        reader.finish("Conv2D payload")?;

        let kernels = Array4::from_shape_vec(dims, values)
            .map_err(|e| ModelError::DecodeError(e.to_string()))?;
        let mut layer = Conv2D::with_kernels(kernels)?.with_input_shape(input_shape.rows, input_shape.cols);
        layer.input_shape = layer
            .resolve_input_shape(input_shape)
            .map_err(|e| ModelError::DecodeError(e.to_string()))?;
        if layer.output_shape().checked_width().is_none() {
            return Err(ModelError::DecodeError(format!(
                "Conv2D output {:?} overflows",
                layer.output_shape()
            )));
        }
        Ok(layer)
    }

    fn pretty_print(&self) -> String {
        format!(
            "Conv2D {}x{}x{} {} -> {}, {} params",
            self.num_kernels,
            self.kernel_size.0,
            self.kernel_size.1,
            self.input_shape,
            self.output_shape(),
            self.param_count()
        )
    }
}

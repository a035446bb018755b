use super::*;

/// Fully connected layer computing `weights · input + bias`.
///
/// The input is read as a column of `inputs` values, so a Linear layer may follow any layer
/// whose output width matches, regardless of its spatial structure. The downstream gradient is
/// returned in the layout the input arrived in.
///
/// # Fields
///
/// - `input_shape` - Recorded input shape, always a column of `inputs` values
/// - `outputs` - Number of output neurons
/// - `weights` - Weight matrix with shape (outputs, inputs)
/// - `bias` - Bias column with shape (outputs, 1)
///
/// # Example
/// ```rust
/// use stacknet::prelude::*;
/// use ndarray::array;
///
/// let layer = Linear::with_parameters(array![[1.0, 2.0], [0.0, -1.0]], array![[0.5], [0.0]]).unwrap();
/// let network = Network::new(2, vec![layer.into()]).unwrap();
///
/// let output = network.evaluate(&[1.0, 1.0]).unwrap();
/// assert_eq!(output, vec![3.5, -1.0]);
/// ```
#[derive(Debug, Clone)]
pub struct Linear {
    input_shape: Shape,
    outputs: usize,
    weights: Array2<f64>,
    bias: Array2<f64>,
}

impl Linear {
    /// Creates a layer with `outputs` neurons. Weights are allocated by `initialize` once the
    /// input width is known.
    pub fn new(outputs: usize) -> Self {
        Linear {
            input_shape: Shape::default(),
            outputs,
            weights: Array2::zeros((outputs, 0)),
            bias: Array2::zeros((outputs, 1)),
        }
    }

    /// Creates a layer with preset parameters.
    ///
    /// # Parameters
    ///
    /// - `weights` - Weight matrix with shape (outputs, inputs)
    /// - `bias` - Bias column with shape (outputs, 1)
    ///
    /// # Returns
    ///
    /// - `Ok(Linear)` - A layer that keeps these parameters when initialized with `inputs` values
    /// - `Err(ModelError::InputValidationError)` - If a dimension is zero or the bias does not fit the weights
    pub fn with_parameters(weights: Array2<f64>, bias: Array2<f64>) -> Result<Self, ModelError> {
        let (outputs, inputs) = weights.dim();
        validate_dimension_greater_than_zero(outputs, "outputs")?;
        validate_dimension_greater_than_zero(inputs, "inputs")?;
        if bias.dim() != (outputs, 1) {
            return Err(ModelError::InputValidationError(format!(
                "bias shape {:?} does not match {} outputs",
                bias.dim(),
                outputs
            )));
        }

        Ok(Linear {
            input_shape: Shape::column(inputs),
            outputs,
            weights,
            bias,
        })
    }

    /// Number of input values
    pub fn inputs(&self) -> usize {
        self.weights.ncols()
    }

    /// Number of output neurons
    pub fn outputs(&self) -> usize {
        self.outputs
    }

    pub fn weights(&self) -> &Array2<f64> {
        &self.weights
    }

    pub fn bias(&self) -> &Array2<f64> {
        &self.bias
    }

    /// Adds `scale · shift` to the weights and the bias.
    pub fn apply_shift(&mut self, shift: &WeightShift, scale: f64) -> Result<(), ModelError> {
        if shift.weights().dim() != self.weights.dim() || shift.bias().dim() != self.bias.dim() {
            return Err(ModelError::ShiftMismatch(format!(
                "weight shift {:?}/{:?} does not fit a Linear layer with weights {:?}",
                shift.weights().dim(),
                shift.bias().dim(),
                self.weights.dim()
            )));
        }
        self.weights.scaled_add(scale, shift.weights());
        self.bias.scaled_add(scale, shift.bias());
        Ok(())
    }

    /// `weights · column + bias` for an `(inputs, 1)` column.
    pub(crate) fn affine(&self, column: &Tensor) -> Tensor {
        self.weights.dot(column) + &self.bias
    }

    /// Parameter gradients and downstream gradient for an `(inputs, 1)` column and an
    /// `(outputs, 1)` upstream gradient.
    pub(crate) fn back_column(&self, column: &Tensor, grad: &Tensor) -> (WeightShift, Tensor) {
        let delta_weights = grad.dot(&column.t());
        let downstream = self.weights.t().dot(grad);
        (WeightShift::new(delta_weights, grad.clone()), downstream)
    }

    /// Allocates Glorot-initialized weights and zero bias for `inputs` values.
    pub(crate) fn allocate<R: Rng + ?Sized>(&mut self, inputs: usize, bias_value: f64, rng: &mut R) {
        self.weights = glorot_uniform((self.outputs, inputs), inputs, self.outputs, rng);
        self.bias = Array2::from_elem((self.outputs, 1), bias_value);
        self.input_shape = Shape::column(inputs);
    }

    /// Writes the payload into an existing writer; LSTM gates reuse this.
    pub(crate) fn write_payload(&self, writer: &mut ByteWriter) {
        writer.write_usize(self.inputs());
        writer.write_usize(self.outputs);
        writer.write_values(self.weights.iter());
        writer.write_values(self.bias.iter());
    }
}

impl Layer for Linear {
    type Cache = Tensor;

    fn initialize<R: Rng + ?Sized>(
        &mut self,
        input_shape: Shape,
        rng: &mut R,
    ) -> Result<(), ModelError> {
        validate_dimension_greater_than_zero(self.outputs, "outputs")?;
        let inputs = input_shape.width();
        validate_dimension_greater_than_zero(inputs, "input width")?;

        match self.weights.ncols() {
            // Not allocated yet
            0 => self.allocate(inputs, 0.0, rng),
            n if n == inputs => self.input_shape = Shape::column(inputs),
            n => {
                return Err(ModelError::ShapeMismatch(format!(
                    "Linear layer has weights for {} inputs but the previous layer produces {}",
                    n, inputs
                )));
            }
        }
        Ok(())
    }

    fn pass(&self, input: &Tensor) -> Result<(Tensor, Self::Cache), ModelError> {
        validate_tensor_width(input, self.inputs(), "Linear", "input")?;
        let column = reshape(input, (self.inputs(), 1))?;
        Ok((self.affine(&column), input.clone()))
    }

    fn back(&self, cache: Self::Cache, grad_output: &Tensor) -> Result<(Shift, Tensor), ModelError> {
        validate_tensor_width(&cache, self.inputs(), "Linear", "cache")?;
        validate_tensor_width(grad_output, self.outputs, "Linear", "gradient")?;

        let column = reshape(&cache, (self.inputs(), 1))?;
        let grad = reshape(grad_output, (self.outputs, 1))?;
        let (shift, downstream) = self.back_column(&column, &grad);

        Ok((Shift::Weight(shift), reshape(&downstream, cache.dim())?))
    }

    fn input_shape(&self) -> Shape {
        self.input_shape
    }

    fn output_shape(&self) -> Shape {
        Shape::column(self.outputs)
    }

    fn layer_type(&self) -> &str {
        "Linear"
    }

    fn param_count(&self) -> usize {
        self.weights.len() + self.bias.len()
    }

    fn to_bytes(&self) -> Vec<u8> {
        let mut writer = ByteWriter::new();
        self.write_payload(&mut writer);
        writer.into_bytes()
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self, ModelError> {
        let mut reader = ByteReader::new(bytes);
        let layer = read_linear(&mut reader)?;
        reader.finish("Linear payload")?;
        Ok(layer)
    }

    fn pretty_print(&self) -> String {
        format!(
            "Linear {} -> {}, {} params",
            self.input_shape,
            self.output_shape(),
            self.param_count()
        )
    }
}

/// Reads a payload written by `Linear::write_payload`.
pub(crate) fn read_linear(reader: &mut ByteReader) -> Result<Linear, ModelError> {
    let inputs = reader.read_dimension("Linear inputs")?;
    let outputs = reader.read_dimension("Linear outputs")?;
    let weights = reader.read_array2((outputs, inputs), "Linear weights")?;
    let bias = reader.read_array2((outputs, 1), "Linear bias")?;
    Linear::with_parameters(weights, bias).map_err(|e| ModelError::DecodeError(e.to_string()))
}

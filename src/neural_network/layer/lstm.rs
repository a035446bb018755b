use super::linear::read_linear;
use super::*;

/// Exponent arguments of the gate sigmoid are clamped to this range
const GATE_CLAMP: f64 = 500.0;

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x.clamp(-GATE_CLAMP, GATE_CLAMP)).exp())
}

/// Gate activations of one timestep, kept for backpropagation through time.
///
/// All tensors are columns; `concat` is `[x_t; h_{t-1}]`.
#[derive(Debug, Clone)]
pub struct LstmStep {
    pub concat: Tensor,
    pub input_gate: Tensor,
    pub forget_gate: Tensor,
    pub cell_gate: Tensor,
    pub output_gate: Tensor,
    pub cell_prev: Tensor,
    pub cell_tanh: Tensor,
}

/// Forward state of an [`Lstm`] pass: one entry per timestep plus the input layout.
#[derive(Debug, Clone)]
pub struct LstmCache {
    pub steps: Vec<LstmStep>,
    pub input_dims: (usize, usize),
}

/// Long Short-Term Memory layer.
///
/// The input buffer is read row-major as `timesteps × input_size`, where the number of
/// timesteps is the input width divided by `input_size`. Each step runs four gates, each a
/// [`Linear`] layer over the concatenation `[x_t; h_{t-1}]`:
///
/// - `i = σ(W_i·[x; h] + b_i)`, `f = σ(W_f·[x; h] + b_f)`, `g = tanh(W_g·[x; h] + b_g)`, `o = σ(W_o·[x; h] + b_o)`
/// - `c_t = f ⊙ c_{t-1} + i ⊙ g`, `h_t = o ⊙ tanh(c_t)`
///
/// The output is the final hidden state, a column of `hidden_size` values. Freshly allocated
/// forget gates start with a bias of 1.0.
///
/// # Example
/// ```rust
/// use stacknet::prelude::*;
///
/// // 5 timesteps of 3 features
/// let network = Network::new(15, vec![Lstm::new(3, 8).unwrap().into(), Linear::new(2).into()]).unwrap();
/// assert_eq!(network.layers()[0].num_outputs(), 8);
/// assert_eq!(network.evaluate(&[0.1; 15]).unwrap().len(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct Lstm {
    input_size: usize,
    hidden_size: usize,
    input_shape: Shape,
    input_gate: Linear,
    forget_gate: Linear,
    cell_gate: Linear,
    output_gate: Linear,
}

impl Lstm {
    /// Creates an LSTM layer; gate weights are allocated by `initialize`.
    ///
    /// # Parameters
    ///
    /// - `input_size` - Features per timestep
    /// - `hidden_size` - Size of the hidden and cell state
    ///
    /// # Returns
    ///
    /// - `Ok(Lstm)` - New layer instance
    /// - `Err(ModelError::InputValidationError)` - If either size is 0
    pub fn new(input_size: usize, hidden_size: usize) -> Result<Self, ModelError> {
        validate_dimension_greater_than_zero(input_size, "input_size")?;
        validate_dimension_greater_than_zero(hidden_size, "hidden_size")?;

        Ok(Lstm {
            input_size,
            hidden_size,
            input_shape: Shape::default(),
            input_gate: Linear::new(hidden_size),
            forget_gate: Linear::new(hidden_size),
            cell_gate: Linear::new(hidden_size),
            output_gate: Linear::new(hidden_size),
        })
    }

    pub fn input_size(&self) -> usize {
        self.input_size
    }

    pub fn hidden_size(&self) -> usize {
        self.hidden_size
    }

    /// Number of timesteps read from one input buffer
    pub fn timesteps(&self) -> usize {
        self.input_shape.width() / self.input_size
    }

    /// The gates in `(input, forget, cell, output)` order
    pub fn gates(&self) -> [&Linear; 4] {
        [
            &self.input_gate,
            &self.forget_gate,
            &self.cell_gate,
            &self.output_gate,
        ]
    }

    /// Adds `scale · shift` to every gate.
    pub fn apply_shift(&mut self, shift: &CompositeShift, scale: f64) -> Result<(), ModelError> {
        self.input_gate.apply_shift(shift.input(), scale)?;
        self.forget_gate.apply_shift(shift.forget(), scale)?;
        self.cell_gate.apply_shift(shift.cell(), scale)?;
        self.output_gate.apply_shift(shift.output(), scale)
    }

    fn check_input_shape(&self, input_shape: Shape) -> Result<(), ModelError> {
        let width = input_shape.width();
        if width == 0 || width % self.input_size != 0 {
            return Err(ModelError::ShapeMismatch(format!(
                "Lstm input width {} is not a positive multiple of input_size {}",
                width, self.input_size
            )));
        }
        Ok(())
    }

    fn check_gate(&self, gate: &Linear, name: &str) -> Result<(), ModelError> {
        if gate.outputs() != self.hidden_size || gate.inputs() != self.input_size + self.hidden_size {
            return Err(ModelError::ShapeMismatch(format!(
                "Lstm {} gate maps {} -> {}, expected {} -> {}",
                name,
                gate.inputs(),
                gate.outputs(),
                self.input_size + self.hidden_size,
                self.hidden_size
            )));
        }
        Ok(())
    }

    /// Runs one timestep from `(h, c)` and returns the step record with the new `(h, c)`.
    fn step(&self, x_t: ndarray::ArrayView1<f64>, h: &Tensor, c: &Tensor) -> (LstmStep, Tensor, Tensor) {
        let concat_len = self.input_size + self.hidden_size;
        let concat = Array2::from_shape_fn((concat_len, 1), |(row, _)| {
            if row < self.input_size {
                x_t[row]
            } else {
                h[[row - self.input_size, 0]]
            }
        });

        let input_gate = self.input_gate.affine(&concat).mapv(sigmoid);
        let forget_gate = self.forget_gate.affine(&concat).mapv(sigmoid);
        let cell_gate = self.cell_gate.affine(&concat).mapv(f64::tanh);
        let output_gate = self.output_gate.affine(&concat).mapv(sigmoid);

        let cell = &forget_gate * c + &input_gate * &cell_gate;
        let cell_tanh = cell.mapv(f64::tanh);
        let hidden = &output_gate * &cell_tanh;

        let step = LstmStep {
            concat,
            input_gate,
            forget_gate,
            cell_gate,
            output_gate,
            cell_prev: c.clone(),
            cell_tanh,
        };
        (step, hidden, cell)
    }
}

impl Layer for Lstm {
    type Cache = LstmCache;

    fn initialize<R: Rng + ?Sized>(
        &mut self,
        input_shape: Shape,
        rng: &mut R,
    ) -> Result<(), ModelError> {
        self.check_input_shape(input_shape)?;

        let concat_len = self.input_size + self.hidden_size;
        let gates = [
            (&mut self.input_gate, 0.0),
            (&mut self.forget_gate, 1.0),
            (&mut self.cell_gate, 0.0),
            (&mut self.output_gate, 0.0),
        ];
        for (gate, bias) in gates {
            if gate.inputs() == 0 {
                gate.allocate(concat_len, bias, rng);
            } else {
                gate.initialize(Shape::column(concat_len), rng)?;
            }
        }

        self.input_shape = input_shape;
        Ok(())
    }

    fn pass(&self, input: &Tensor) -> Result<(Tensor, Self::Cache), ModelError> {
        let timesteps = self.timesteps();
        validate_tensor_width(input, timesteps * self.input_size, "Lstm", "input")?;
        let sequence = reshape(input, (timesteps, self.input_size))?;

        let mut hidden = Array2::zeros((self.hidden_size, 1));
        let mut cell = Array2::zeros((self.hidden_size, 1));
        let mut steps = Vec::with_capacity(timesteps);
        for x_t in sequence.rows() {
            let (step, next_hidden, next_cell) = self.step(x_t, &hidden, &cell);
            steps.push(step);
            hidden = next_hidden;
            cell = next_cell;
        }

        Ok((
            hidden,
            LstmCache {
                steps,
                input_dims: input.dim(),
            },
        ))
    }

    fn back(&self, cache: Self::Cache, grad_output: &Tensor) -> Result<(Shift, Tensor), ModelError> {
        let timesteps = self.timesteps();
        if cache.steps.len() != timesteps {
            return Err(ModelError::ShapeMismatch(format!(
                "Lstm cache holds {} steps, expected {}",
                cache.steps.len(),
                timesteps
            )));
        }
        validate_tensor_width(grad_output, self.hidden_size, "Lstm", "gradient")?;

        let concat_len = self.input_size + self.hidden_size;
        let mut shift = CompositeShift::zeros(self.hidden_size, concat_len);
        let mut grad_sequence = Array2::zeros((timesteps, self.input_size));
        let mut grad_hidden = reshape(grad_output, (self.hidden_size, 1))?;
        let mut grad_cell: Tensor = Array2::zeros((self.hidden_size, 1));

        for (t, step) in cache.steps.iter().enumerate().rev() {
            let grad_output_gate = &grad_hidden * &step.cell_tanh;
            let grad_cell_total = &grad_cell
                + &(&grad_hidden * &step.output_gate * step.cell_tanh.mapv(|y| 1.0 - y * y));

            // Gradients with respect to the gate pre-activations
            let pre_input = &grad_cell_total * &step.cell_gate * step.input_gate.mapv(|y| y * (1.0 - y));
            let pre_forget =
                &grad_cell_total * &step.cell_prev * step.forget_gate.mapv(|y| y * (1.0 - y));
            let pre_cell = &grad_cell_total * &step.input_gate * step.cell_gate.mapv(|y| 1.0 - y * y);
            let pre_output = grad_output_gate * step.output_gate.mapv(|y| y * (1.0 - y));

            let (input_shift, d_input) = self.input_gate.back_column(&step.concat, &pre_input);
            let (forget_shift, d_forget) = self.forget_gate.back_column(&step.concat, &pre_forget);
            let (cell_shift, d_cell) = self.cell_gate.back_column(&step.concat, &pre_cell);
            let (output_shift, d_output) = self.output_gate.back_column(&step.concat, &pre_output);
            shift.accumulate(&CompositeShift::new(
                input_shift,
                forget_shift,
                cell_shift,
                output_shift,
            ))?;

            let grad_concat = d_input + d_forget + d_cell + d_output;
            grad_sequence
                .row_mut(t)
                .assign(&grad_concat.slice(s![..self.input_size, 0]));
            grad_hidden = grad_concat.slice(s![self.input_size.., ..]).to_owned();
            grad_cell = grad_cell_total * &step.forget_gate;
        }

        Ok((Shift::Composite(shift), reshape(&grad_sequence, cache.input_dims)?))
    }

    fn input_shape(&self) -> Shape {
        self.input_shape
    }

    fn output_shape(&self) -> Shape {
        Shape::column(self.hidden_size)
    }

    fn layer_type(&self) -> &str {
        "Lstm"
    }

    fn param_count(&self) -> usize {
        self.gates().iter().map(|gate| gate.param_count()).sum()
    }

    fn to_bytes(&self) -> Vec<u8> {
        let mut writer = ByteWriter::new();
        writer.write_shape(self.input_shape);
        writer.write_usize(self.input_size);
        writer.write_usize(self.hidden_size);
        for gate in self.gates() {
            let mut gate_writer = ByteWriter::new();
            gate.write_payload(&mut gate_writer);
            writer.write_block(&gate_writer.into_bytes());
        }
        writer.into_bytes()
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self, ModelError> {
        let mut reader = ByteReader::new(bytes);
        let input_shape = reader.read_shape("Lstm input shape")?;
        let input_size = reader.read_dimension("Lstm input_size")?;
        let hidden_size = reader.read_dimension("Lstm hidden_size")?;

        let mut read_gate = |name: &str| -> Result<Linear, ModelError> {
            let mut gate_reader = ByteReader::new(reader.read_block(name)?);
            let gate = read_linear(&mut gate_reader)?;
            gate_reader.finish(name)?;
            Ok(gate)
        };
        let input_gate = read_gate("Lstm input gate")?;
        let forget_gate = read_gate("Lstm forget gate")?;
        let cell_gate = read_gate("Lstm cell gate")?;
        let output_gate = read_gate("Lstm output gate")?;
        reader.finish("Lstm payload")?;

        let layer = Lstm {
            input_size,
            hidden_size,
            input_shape,
            input_gate,
            forget_gate,
            cell_gate,
            output_gate,
        };

        let decode_error = |e: ModelError| ModelError::DecodeError(e.to_string());
        layer.check_input_shape(input_shape).map_err(decode_error)?;
        for (gate, name) in layer.gates().into_iter().zip(["input", "forget", "cell", "output"]) {
            layer.check_gate(gate, name).map_err(decode_error)?;
        }
        Ok(layer)
    }

    fn pretty_print(&self) -> String {
        format!(
            "Lstm {} -> {}, {} steps of {}, {} params",
            self.input_shape,
            self.output_shape(),
            self.timesteps(),
            self.input_size,
            self.param_count()
        )
    }
}

use crate::error::ModelError;
use crate::neural_network::layer::NetworkLayer;
use ndarray::{Array2, Array4};

/// Parameter delta of a [`Linear`](crate::neural_network::Linear) layer.
///
/// # Fields
///
/// - `weights` - Weight delta with shape (outputs, inputs)
/// - `bias` - Bias delta with shape (outputs, 1)
#[derive(Debug, Clone, PartialEq)]
pub struct WeightShift {
    weights: Array2<f64>,
    bias: Array2<f64>,
}

impl WeightShift {
    pub fn new(weights: Array2<f64>, bias: Array2<f64>) -> Self {
        WeightShift { weights, bias }
    }

    /// An all-zero delta for a layer with `outputs` neurons over `inputs` values
    pub fn zeros(outputs: usize, inputs: usize) -> Self {
        WeightShift {
            weights: Array2::zeros((outputs, inputs)),
            bias: Array2::zeros((outputs, 1)),
        }
    }

    pub fn weights(&self) -> &Array2<f64> {
        &self.weights
    }

    pub fn bias(&self) -> &Array2<f64> {
        &self.bias
    }

    /// Adds `other` element by element.
    pub fn accumulate(&mut self, other: &WeightShift) -> Result<(), ModelError> {
        if self.weights.dim() != other.weights.dim() || self.bias.dim() != other.bias.dim() {
            return Err(ModelError::ShiftMismatch(format!(
                "cannot combine weight shifts of shapes {:?} and {:?}",
                self.weights.dim(),
                other.weights.dim()
            )));
        }
        self.weights += &other.weights;
        self.bias += &other.bias;
        Ok(())
    }

    fn scale(&mut self, factor: f64) {
        self.weights *= factor;
        self.bias *= factor;
    }
}

/// Parameter delta of a [`Conv2D`](crate::neural_network::Conv2D) layer, with shape
/// (kernels, channels, kernel rows, kernel cols).
#[derive(Debug, Clone, PartialEq)]
pub struct KernelShift {
    kernels: Array4<f64>,
}

impl KernelShift {
    pub fn new(kernels: Array4<f64>) -> Self {
        KernelShift { kernels }
    }

    pub fn kernels(&self) -> &Array4<f64> {
        &self.kernels
    }

    pub fn accumulate(&mut self, other: &KernelShift) -> Result<(), ModelError> {
        if self.kernels.dim() != other.kernels.dim() {
            return Err(ModelError::ShiftMismatch(format!(
                "cannot combine kernel shifts of shapes {:?} and {:?}",
                self.kernels.dim(),
                other.kernels.dim()
            )));
        }
        self.kernels += &other.kernels;
        Ok(())
    }
}

/// Parameter delta of an [`Lstm`](crate::neural_network::Lstm) layer: one weight shift per gate.
#[derive(Debug, Clone, PartialEq)]
pub struct CompositeShift {
    input: WeightShift,
    forget: WeightShift,
    cell: WeightShift,
    output: WeightShift,
}

impl CompositeShift {
    pub fn new(
        input: WeightShift,
        forget: WeightShift,
        cell: WeightShift,
        output: WeightShift,
    ) -> Self {
        CompositeShift {
            input,
            forget,
            cell,
            output,
        }
    }

    /// An all-zero delta for gates with `outputs` neurons over `inputs` values
    pub fn zeros(outputs: usize, inputs: usize) -> Self {
        CompositeShift::new(
            WeightShift::zeros(outputs, inputs),
            WeightShift::zeros(outputs, inputs),
            WeightShift::zeros(outputs, inputs),
            WeightShift::zeros(outputs, inputs),
        )
    }

    pub fn input(&self) -> &WeightShift {
        &self.input
    }

    pub fn forget(&self) -> &WeightShift {
        &self.forget
    }

    pub fn cell(&self) -> &WeightShift {
        &self.cell
    }

    pub fn output(&self) -> &WeightShift {
        &self.output
    }

    pub fn accumulate(&mut self, other: &CompositeShift) -> Result<(), ModelError> {
        self.input.accumulate(&other.input)?;
        self.forget.accumulate(&other.forget)?;
        self.cell.accumulate(&other.cell)?;
        self.output.accumulate(&other.output)
    }

    fn scale(&mut self, factor: f64) {
        self.input.scale(factor);
        self.forget.scale(factor);
        self.cell.scale(factor);
        self.output.scale(factor);
    }
}

/// Accumulated parameter delta of one layer.
///
/// Every layer's `back` returns a `Shift`, so the training loop folds and applies them without
/// knowing the layer kinds. Parameter-free layers return `Nil`, which is also the identity of
/// [`Shift::combine`]; a batch accumulator therefore starts as `Nil` for every layer.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Shift {
    #[default]
    Nil,
    Weight(WeightShift),
    Kernel(KernelShift),
    Composite(CompositeShift),
}

impl Shift {
    /// Name of the variant, for error messages
    pub fn kind_name(&self) -> &'static str {
        match self {
            Shift::Nil => "Nil",
            Shift::Weight(_) => "Weight",
            Shift::Kernel(_) => "Kernel",
            Shift::Composite(_) => "Composite",
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Shift::Nil)
    }

    /// Sums two shifts element by element.
    ///
    /// `Nil` is the identity on either side. The sum of same-kind shifts is commutative and
    /// associative up to floating-point rounding.
    ///
    /// # Returns
    ///
    /// - `Ok(Shift)` - The combined shift
    /// - `Err(ModelError::ShiftMismatch)` - If the shifts have different kinds or shapes
    pub fn combine(self, other: Shift) -> Result<Shift, ModelError> {
        match (self, other) {
            (Shift::Nil, shift) | (shift, Shift::Nil) => Ok(shift),
            (Shift::Weight(mut a), Shift::Weight(b)) => {
                a.accumulate(&b)?;
                Ok(Shift::Weight(a))
            }
            (Shift::Kernel(mut a), Shift::Kernel(b)) => {
                a.accumulate(&b)?;
                Ok(Shift::Kernel(a))
            }
            (Shift::Composite(mut a), Shift::Composite(b)) => {
                a.accumulate(&b)?;
                Ok(Shift::Composite(a))
            }
            (a, b) => Err(ModelError::ShiftMismatch(format!(
                "cannot combine a {} shift with a {} shift",
                a.kind_name(),
                b.kind_name()
            ))),
        }
    }

    /// Returns the shift multiplied by `factor`.
    pub fn scaled(self, factor: f64) -> Shift {
        match self {
            Shift::Nil => Shift::Nil,
            Shift::Weight(mut shift) => {
                shift.scale(factor);
                Shift::Weight(shift)
            }
            Shift::Kernel(mut shift) => {
                shift.kernels *= factor;
                Shift::Kernel(shift)
            }
            Shift::Composite(mut shift) => {
                shift.scale(factor);
                Shift::Composite(shift)
            }
        }
    }

    /// Adds `scale · delta` to the parameters of `layer`.
    ///
    /// `Nil` leaves any layer untouched.
    ///
    /// # Returns
    ///
    /// - `Ok(())` - The layer parameters were updated
    /// - `Err(ModelError::ShiftMismatch)` - If the shift was not produced by a layer of this kind and shape
    pub fn apply(&self, layer: &mut NetworkLayer, scale: f64) -> Result<(), ModelError> {
        match (self, layer) {
            (Shift::Nil, _) => Ok(()),
            (Shift::Weight(shift), NetworkLayer::Linear(linear)) => linear.apply_shift(shift, scale),
            (Shift::Kernel(shift), NetworkLayer::Conv2D(conv)) => conv.apply_shift(shift, scale),
            (Shift::Composite(shift), NetworkLayer::Lstm(lstm)) => lstm.apply_shift(shift, scale),
            (shift, layer) => Err(ModelError::ShiftMismatch(format!(
                "cannot apply a {} shift to a {} layer",
                shift.kind_name(),
                layer.layer_type()
            ))),
        }
    }
}

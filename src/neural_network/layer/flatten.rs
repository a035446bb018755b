use super::*;

/// Flatten layer.
///
/// Reads its input row-major into a single column of `channels · rows · cols` values. The
/// backward pass reverses the mapping, so the previous layer gets its gradient back in the
/// layout its output had.
#[derive(Debug, Clone, Default)]
pub struct Flatten {
    input_shape: Shape,
}

impl Flatten {
    pub fn new() -> Self {
        Flatten::default()
    }
}

impl Layer for Flatten {
    /// Dimensions of the input matrix
    type Cache = (usize, usize);

    fn initialize<R: Rng + ?Sized>(
        &mut self,
        input_shape: Shape,
        _rng: &mut R,
    ) -> Result<(), ModelError> {
        validate_dimension_greater_than_zero(input_shape.width(), "input width")?;
        self.input_shape = input_shape;
        Ok(())
    }

    fn pass(&self, input: &Tensor) -> Result<(Tensor, Self::Cache), ModelError> {
        let width = self.input_shape.width();
        validate_tensor_width(input, width, "Flatten", "input")?;
        Ok((reshape(input, (width, 1))?, input.dim()))
    }

    fn back(&self, cache: Self::Cache, grad_output: &Tensor) -> Result<(Shift, Tensor), ModelError> {
        validate_tensor_width(grad_output, self.input_shape.width(), "Flatten", "gradient")?;
        Ok((Shift::Nil, reshape(grad_output, cache)?))
    }

    fn input_shape(&self) -> Shape {
        self.input_shape
    }

    fn output_shape(&self) -> Shape {
        Shape::column(self.input_shape.width())
    }

    fn layer_type(&self) -> &str {
        "Flatten"
    }

    fn to_bytes(&self) -> Vec<u8> {
        let mut writer = ByteWriter::new();
        writer.write_shape(self.input_shape);
        writer.into_bytes()
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self, ModelError> {
        let mut reader = ByteReader::new(bytes);
        let input_shape = reader.read_shape("Flatten input shape")?;
        reader.finish("Flatten payload")?;
        Ok(Flatten { input_shape })
    }
}

use std::fmt;

/// Structural description of the data flowing into or out of a layer.
///
/// The width (`channels · rows · cols`) is what chains layers together; the finer structure
/// lets spatial layers (Conv2D, MaxPool2D, Flatten) interpret a buffer without extra
/// configuration. A plain vector of `n` values is `Shape::column(n)`.
///
/// # Fields
///
/// - `channels` - Number of stacked feature maps
/// - `rows` - Height of each feature map
/// - `cols` - Width of each feature map
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Shape {
    pub channels: usize,
    pub rows: usize,
    pub cols: usize,
}

impl Shape {
    /// Creates a shape with the given number of channels, rows and columns
    pub fn new(channels: usize, rows: usize, cols: usize) -> Self {
        Shape {
            channels,
            rows,
            cols,
        }
    }

    /// A single column holding `len` values
    pub fn column(len: usize) -> Self {
        Shape::new(1, len, 1)
    }

    /// Total number of values described by this shape
    pub fn width(&self) -> usize {
        self.channels * self.rows * self.cols
    }

    /// Total number of values, or `None` if the product overflows `usize`
    pub fn checked_width(&self) -> Option<usize> {
        self.channels
            .checked_mul(self.rows)
            .and_then(|n| n.checked_mul(self.cols))
    }

    /// Matrix dimensions of the canonical tensor layout: channels stacked vertically.
    pub fn canonical_dims(&self) -> (usize, usize) {
        (self.channels * self.rows, self.cols)
    }

    pub fn is_column(&self) -> bool {
        self.channels == 1 && self.cols == 1
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_column() {
            write!(f, "({})", self.rows)
        } else {
            write!(f, "({}, {}, {})", self.channels, self.rows, self.cols)
        }
    }
}

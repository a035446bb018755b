use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// When a training run stops. Both limits are checked between batches only, so a batch in
/// flight always completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrainingLimit {
    /// Stop once this much wall-clock time has elapsed
    Duration(Duration),
    /// Stop after exactly this many batches
    Batches(usize),
}

/// Loss and accuracy of a network on a dataset.
///
/// # Fields
///
/// - `loss` - Sum over the dataset of `½ · Σ (prediction - target)²`
/// - `mean_loss` - `loss` divided by the number of samples (0 for an empty dataset)
/// - `correct` - Number of correctly classified samples
/// - `total` - Number of samples
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Evaluation {
    pub loss: f64,
    pub mean_loss: f64,
    pub correct: usize,
    pub total: usize,
}

impl Evaluation {
    /// Fraction of correctly classified samples, 0 for an empty dataset
    pub fn accuracy(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.correct as f64 / self.total as f64
        }
    }
}

impl fmt::Display for Evaluation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Loss: {:.6} (mean {:.6}), Correct Guesses: {}/{} ({:.2}%)",
            self.loss,
            self.mean_loss,
            self.correct,
            self.total,
            self.accuracy() * 100.0
        )
    }
}

/// Outcome of [`Network::train`](crate::neural_network::Network::train).
///
/// # Fields
///
/// - `before` - Validation score before the first batch
/// - `after` - Validation score after the last batch
/// - `epochs` - Completed passes over the training set
/// - `datapoints` - Training samples consumed
/// - `batches` - Parameter updates applied
/// - `elapsed` - Wall-clock time spent in the batch loop
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrainingReport {
    pub before: Evaluation,
    pub after: Evaluation,
    pub epochs: usize,
    pub datapoints: usize,
    pub batches: usize,
    pub elapsed: Duration,
}

use crate::dataset::DataPoint;
use crate::error::ModelError;
use crate::neural_network::layer::{LayerCache, NetworkLayer, SoftmaxGradient};
use crate::neural_network::shape::Shape;
use crate::neural_network::shift::Shift;
use crate::neural_network::training_config::TrainingConfig;
use crate::neural_network::training_report::{Evaluation, TrainingLimit, TrainingReport};
use crate::neural_network::Tensor;
use crate::utility::is_correct;
use indicatif::{ProgressBar, ProgressStyle};
use ndarray::Array2;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rayon::prelude::*;
use std::borrow::Borrow;
use std::time::{Duration, Instant};

/// A flat stack of layers trained by mini-batch gradient descent.
///
/// Construction chains every layer's `initialize` with the previous layer's output shape, so
/// each layer's declared output width matches the next layer's input width from then on.
/// Parameters change only inside [`Network::train_batch`], after all per-sample gradients of
/// the batch have been computed.
///
/// # Fields
///
/// - `num_inputs` - Width of the input vector
/// - `layers` - The layer stack, first to last
/// - `config` - Hyperparameters of training runs
/// - `rng` - Random source for weight initialization and shuffling
///
/// # Example
/// ```rust
/// use stacknet::prelude::*;
///
/// let mut network = Network::with_config(
///     3,
///     vec![Linear::new(5).into(), Tanh::new().into(), Linear::new(2).into(), Softmax::new().into()],
///     TrainingConfig { batch_size: 2, verbose: false, seed: Some(1), ..TrainingConfig::default() },
/// )
/// .unwrap();
///
/// let data = vec![
///     DataPoint::new(vec![1.0, 0.0, 0.0], vec![1.0, 0.0]),
///     DataPoint::new(vec![0.0, 0.0, 1.0], vec![0.0, 1.0]),
/// ];
/// network.train_batch(&data).unwrap();
///
/// let output = network.evaluate(&[1.0, 0.0, 0.0]).unwrap();
/// assert!((output.iter().sum::<f64>() - 1.0).abs() < 1e-9);
/// ```
#[derive(Debug, Clone)]
pub struct Network {
    num_inputs: usize,
    layers: Vec<NetworkLayer>,
    config: TrainingConfig,
    rng: StdRng,
}

impl Network {
    /// Builds a network with the default [`TrainingConfig`].
    pub fn new(num_inputs: usize, layers: Vec<NetworkLayer>) -> Result<Self, ModelError> {
        Network::with_config(num_inputs, layers, TrainingConfig::default())
    }

    /// Builds a network, initializing every layer in order.
    ///
    /// # Parameters
    ///
    /// - `num_inputs` - Width of the input vector
    /// - `layers` - Layers from first to last; each is initialized with the previous output shape
    /// - `config` - Training hyperparameters; its seed drives weight initialization
    ///
    /// # Returns
    ///
    /// - `Ok(Network)` - An initialized network
    /// - `Err(ModelError::InputValidationError)` - Invalid config, zero inputs, no layers, or a
    ///   cross-entropy Softmax that is not the final layer
    /// - `Err(ModelError::ShapeMismatch)` - A layer cannot consume the previous layer's output
    pub fn with_config(
        num_inputs: usize,
        mut layers: Vec<NetworkLayer>,
        config: TrainingConfig,
    ) -> Result<Self, ModelError> {
        config.validate()?;
        if num_inputs == 0 {
            return Err(ModelError::InputValidationError(
                "num_inputs must be greater than 0".to_string(),
            ));
        }
        if layers.is_empty() {
            return Err(ModelError::InputValidationError(
                "a network needs at least one layer".to_string(),
            ));
        }

        let mut rng = seeded_rng(config.seed);
        let mut shape = Shape::column(num_inputs);
        for layer in layers.iter_mut() {
            layer.initialize(shape, &mut rng)?;
            shape = layer.output_shape();
        }
        validate_softmax_placement(&layers)?;

        Ok(Network {
            num_inputs,
            layers,
            config,
            rng,
        })
    }

    /// Wraps layers that already hold their shapes and parameters, checking that they chain.
    pub(crate) fn from_initialized_layers(
        num_inputs: usize,
        layers: Vec<NetworkLayer>,
    ) -> Result<Self, ModelError> {
        let mut width = num_inputs;
        for (index, layer) in layers.iter().enumerate() {
            if layer.input_shape().width() != width {
                return Err(ModelError::ShapeMismatch(format!(
                    "layer {} ({}) expects {} inputs but receives {}",
                    index,
                    layer.layer_type(),
                    layer.input_shape().width(),
                    width
                )));
            }
            width = layer.num_outputs();
        }
        validate_softmax_placement(&layers)?;

        let config = TrainingConfig::default();
        Ok(Network {
            num_inputs,
            layers,
            rng: seeded_rng(config.seed),
            config,
        })
    }

    pub fn num_inputs(&self) -> usize {
        self.num_inputs
    }

    /// Output width of the final layer
    pub fn num_outputs(&self) -> usize {
        self.layers.last().map_or(0, NetworkLayer::num_outputs)
    }

    pub fn layers(&self) -> &[NetworkLayer] {
        &self.layers
    }

    /// Mutable access to the layers, for inspecting or adjusting parameters in place.
    pub fn layers_mut(&mut self) -> &mut [NetworkLayer] {
        &mut self.layers
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Replaces the training configuration. A seeded config also reseeds the shuffling source.
    pub fn set_config(&mut self, config: TrainingConfig) -> Result<(), ModelError> {
        config.validate()?;
        if let Some(seed) = config.seed {
            self.rng = StdRng::seed_from_u64(seed);
        }
        self.config = config;
        Ok(())
    }

    fn input_tensor(&self, input: &[f64]) -> Result<Tensor, ModelError> {
        if input.len() != self.num_inputs {
            return Err(ModelError::ShapeMismatch(format!(
                "network expects {} inputs, received {}",
                self.num_inputs,
                input.len()
            )));
        }
        Array2::from_shape_vec((self.num_inputs, 1), input.to_vec())
            .map_err(|e| ModelError::ShapeMismatch(e.to_string()))
    }

    /// Runs a pure forward pass and returns the final activation vector.
    ///
    /// # Returns
    ///
    /// - `Ok(Vec<f64>)` - The output of the last layer, row-major
    /// - `Err(ModelError::ShapeMismatch)` - If `input` does not hold `num_inputs` values
    pub fn evaluate(&self, input: &[f64]) -> Result<Vec<f64>, ModelError> {
        let mut activation = self.input_tensor(input)?;
        for layer in &self.layers {
            activation = layer.forward(&activation)?;
        }
        Ok(activation.iter().copied().collect())
    }

    /// Computes one sample's shifts: a forward pass keeping every cache, the injected gradient
    /// `target - prediction`, then every layer's `back` in reverse order.
    ///
    /// The network is only read, so many samples can be learned concurrently.
    ///
    /// # Returns
    ///
    /// - `Ok(Vec<Shift>)` - One shift per layer, in layer order
    /// - `Err(ModelError::ShapeMismatch)` - If the input or target width is wrong
    pub fn learn(&self, point: &DataPoint) -> Result<Vec<Shift>, ModelError> {
        if point.output.len() != self.num_outputs() {
            return Err(ModelError::ShapeMismatch(format!(
                "network produces {} outputs, target has {}",
                self.num_outputs(),
                point.output.len()
            )));
        }

        let mut activation = self.input_tensor(&point.input)?;
        let mut caches: Vec<LayerCache> = Vec::with_capacity(self.layers.len());
        for layer in &self.layers {
            let (output, cache) = layer.pass(&activation)?;
            caches.push(cache);
            activation = output;
        }

        let target = Array2::from_shape_vec(activation.dim(), point.output.clone())
            .map_err(|e| ModelError::ShapeMismatch(e.to_string()))?;
        let mut grad = target - &activation;

        let mut shifts = Vec::with_capacity(self.layers.len());
        for (layer, cache) in self.layers.iter().zip(caches).rev() {
            let (shift, downstream) = layer.back(cache, &grad)?;
            shifts.push(shift);
            grad = downstream;
        }
        shifts.reverse();
        Ok(shifts)
    }

    /// One identity shift per layer
    pub fn empty_shift(&self) -> Vec<Shift> {
        vec![Shift::Nil; self.layers.len()]
    }

    /// Trains on one batch.
    ///
    /// Per-sample shifts are computed in parallel against the current parameters, folded in
    /// sample order into one accumulator per layer, and applied with
    /// `learning_rate / batch.len()` so the update is the average of the sample shifts.
    ///
    /// # Returns
    ///
    /// - `Ok(())` - Every layer was updated
    /// - `Err(ModelError)` - If the batch is empty or any sample fails; no parameter is changed then
    pub fn train_batch<D>(&mut self, batch: &[D]) -> Result<(), ModelError>
    where
        D: Borrow<DataPoint> + Sync,
    {
        if batch.is_empty() {
            return Err(ModelError::InputValidationError(
                "cannot train on an empty batch".to_string(),
            ));
        }

        let per_sample: Vec<Vec<Shift>> = batch
            .par_iter()
            .map(|point| self.learn(Borrow::<DataPoint>::borrow(point)))
            .collect::<Result<_, _>>()?;

        let mut accumulated = self.empty_shift();
        for shifts in per_sample {
            for (total, shift) in accumulated.iter_mut().zip(shifts) {
                *total = std::mem::take(total).combine(shift)?;
            }
        }

        let scale = self.config.learning_rate / batch.len() as f64;
        for (shift, layer) in accumulated.iter().zip(self.layers.iter_mut()) {
            shift.apply(layer, scale)?;
        }
        Ok(())
    }

    /// Trains until `duration` has elapsed.
    ///
    /// See [`Network::train_for`].
    pub fn train(
        &mut self,
        training: &[DataPoint],
        validation: &[DataPoint],
        duration: Duration,
    ) -> Result<TrainingReport, ModelError> {
        self.train_for(training, validation, TrainingLimit::Duration(duration))
    }

    /// Scores `validation`, trains batches until `limit` is reached, then scores again.
    ///
    /// Samples are drawn in order from a shuffled permutation of `training`, which is
    /// reshuffled each time it is exhausted (one epoch). The limit is checked between batches.
    ///
    /// # Parameters
    ///
    /// - `training` - Samples to learn from
    /// - `validation` - Held-out samples for the before/after scores
    /// - `limit` - Wall-clock duration or batch count
    ///
    /// # Returns
    ///
    /// - `Ok(TrainingReport)` - Scores and counters of the run
    /// - `Err(ModelError)` - If `training` is empty or a batch fails; the run stops at that batch
    pub fn train_for(
        &mut self,
        training: &[DataPoint],
        validation: &[DataPoint],
        limit: TrainingLimit,
    ) -> Result<TrainingReport, ModelError> {
        if training.is_empty() {
            return Err(ModelError::InputValidationError(
                "training set is empty".to_string(),
            ));
        }

        let before = self.score(validation)?;
        if self.config.verbose {
            println!("Before training: {}", before);
        }

        let progress_bar = self.progress_bar(limit);
        let start = Instant::now();
        let mut order: Vec<usize> = (0..training.len()).collect();
        order.shuffle(&mut self.rng);
        let mut cursor = 0;
        let mut epochs = 0;
        let mut datapoints = 0;
        let mut batches = 0;

        loop {
            let finished = match limit {
                TrainingLimit::Duration(duration) => start.elapsed() >= duration,
                TrainingLimit::Batches(count) => batches >= count,
            };
            if finished {
                break;
            }

            let mut batch: Vec<&DataPoint> = Vec::with_capacity(self.config.batch_size);
            for _ in 0..self.config.batch_size {
                if cursor == order.len() {
                    order.shuffle(&mut self.rng);
                    cursor = 0;
                }
                batch.push(&training[order[cursor]]);
                cursor += 1;
                datapoints += 1;
                // an epoch counts once its last sample is drawn
                if cursor == order.len() {
                    epochs += 1;
                }
            }

            if let Err(e) = self.train_batch(&batch) {
                progress_bar.abandon_with_message(format!("Training aborted: {}", e));
                return Err(e);
            }
            batches += 1;

            progress_bar.inc(1);
            progress_bar.set_message(format!(
                "epoch {} | {} datapoints",
                epochs, datapoints
            ));
        }

        let elapsed = start.elapsed();
        progress_bar.finish_with_message("Training completed");

        let after = self.score(validation)?;
        let report = TrainingReport {
            before,
            after,
            epochs,
            datapoints,
            batches,
            elapsed,
        };

        if self.config.verbose {
            println!("After training: {}", report.after);
            println!(
                "Trained {} batches over {} epochs ({} datapoints) in {:.2?}",
                report.batches, report.epochs, report.datapoints, report.elapsed
            );
        }

        Ok(report)
    }

    fn progress_bar(&self, limit: TrainingLimit) -> ProgressBar {
        if !self.config.verbose {
            return ProgressBar::hidden();
        }

        match limit {
            TrainingLimit::Batches(count) => {
                let progress_bar = ProgressBar::new(count as u64);
                progress_bar.set_style(
                    ProgressStyle::default_bar()
                        .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} | {msg}")
                        .unwrap_or_else(|_| ProgressStyle::default_bar())
                        .progress_chars("█▓░"),
                );
                progress_bar
            }
            TrainingLimit::Duration(_) => {
                let progress_bar = ProgressBar::new_spinner();
                progress_bar.set_style(
                    ProgressStyle::default_spinner()
                        .template("[{elapsed_precise}] {spinner} {pos} batches | {msg}")
                        .unwrap_or_else(|_| ProgressStyle::default_spinner()),
                );
                progress_bar
            }
        }
    }

    /// Scores the network on `dataset`, evaluating samples in parallel.
    ///
    /// # Returns
    ///
    /// - `Ok(Evaluation)` - Total and mean loss `½ · Σ (prediction - target)²` and the number of correct samples
    /// - `Err(ModelError::ShapeMismatch)` - If a sample's input or target width is wrong
    pub fn score(&self, dataset: &[DataPoint]) -> Result<Evaluation, ModelError> {
        let results: Vec<(f64, bool)> = dataset
            .par_iter()
            .map(|point| -> Result<(f64, bool), ModelError> {
                let output = self.evaluate(&point.input)?;
                check_target_width(&output, &point.output)?;
                let loss = 0.5
                    * output
                        .iter()
                        .zip(&point.output)
                        .map(|(prediction, target)| (prediction - target).powi(2))
                        .sum::<f64>();
                Ok((loss, is_correct(&output, &point.output)))
            })
            .collect::<Result<Vec<_>, ModelError>>()?;

        let loss: f64 = results.iter().map(|(loss, _)| loss).sum();
        let correct = results.iter().filter(|(_, correct)| *correct).count();
        let total = results.len();
        Ok(Evaluation {
            loss,
            mean_loss: if total == 0 { 0.0 } else { loss / total as f64 },
            correct,
            total,
        })
    }

    /// Returns the samples of `dataset` the network misclassifies, in dataset order.
    ///
    /// Fails with `ModelError::ShapeMismatch` under the same conditions as [`Network::score`].
    pub fn get_errors(&self, dataset: &[DataPoint]) -> Result<Vec<DataPoint>, ModelError> {
        let checked: Vec<Option<DataPoint>> = dataset
            .par_iter()
            .map(|point| -> Result<Option<DataPoint>, ModelError> {
                let output = self.evaluate(&point.input)?;
                check_target_width(&output, &point.output)?;
                Ok((!is_correct(&output, &point.output)).then(|| point.clone()))
            })
            .collect::<Result<Vec<_>, ModelError>>()?;
        Ok(checked.into_iter().flatten().collect())
    }

    /// Multi-line structural summary: one line per layer with its shapes.
    pub fn pretty_print(&self) -> String {
        let params: usize = self.layers.iter().map(NetworkLayer::param_count).sum();
        let mut text = format!(
            "Network: {} inputs -> {} outputs, {} layers, {} params\n",
            self.num_inputs,
            self.num_outputs(),
            self.layers.len(),
            params
        );
        for (index, layer) in self.layers.iter().enumerate() {
            text.push_str(&format!("  [{}] {}\n", index, layer.pretty_print()));
        }
        text
    }

    /// Prints [`Network::pretty_print`] to standard output.
    pub fn summary(&self) {
        print!("{}", self.pretty_print());
    }
}

fn seeded_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

/// A cross-entropy Softmax passes `target - prediction` through unchanged, which is only the
/// right gradient when it is the final layer.
fn validate_softmax_placement(layers: &[NetworkLayer]) -> Result<(), ModelError> {
    let last = layers.len().saturating_sub(1);
    for (index, layer) in layers.iter().enumerate() {
        if let NetworkLayer::Softmax(softmax) = layer {
            if softmax.gradient() == SoftmaxGradient::CrossEntropy && index != last {
                return Err(ModelError::InputValidationError(format!(
                    "Softmax at position {} uses the cross-entropy gradient and must be the final layer; use Softmax::with_jacobian elsewhere",
                    index
                )));
            }
        }
    }
    Ok(())
}

fn check_target_width(output: &[f64], target: &[f64]) -> Result<(), ModelError> {
    if output.len() != target.len() {
        return Err(ModelError::ShapeMismatch(format!(
            "network produces {} outputs, target has {}",
            output.len(),
            target.len()
        )));
    }
    Ok(())
}

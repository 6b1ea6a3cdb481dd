use log::{debug, info};
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::{ForecastError, Result};
use crate::loss::{LossFunction, MSELoss};
use crate::models::forecaster::{Forecaster, ForecasterGradients};
use crate::optimizers::{Adam, Optimizer};
use crate::sequence::SequenceSet;

/// Configuration for training hyperparameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f64,
    pub clip_gradient: Option<f64>,
    pub hidden_size: usize,
    pub num_layers: usize,
    pub seed: u64,
    pub print_every: usize,
    pub early_stopping: Option<EarlyStoppingConfig>,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        TrainingConfig {
            epochs: 50,
            batch_size: 32,
            learning_rate: 0.001,
            clip_gradient: Some(5.0),
            hidden_size: 64,
            num_layers: 2,
            seed: 42,
            print_every: 1,
            early_stopping: Some(EarlyStoppingConfig::default()),
        }
    }
}

/// Which loss the early stopper watches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EarlyStoppingMetric {
    /// Falls back to training loss when there is no validation set.
    ValidationLoss,
    TrainLoss,
}

/// Stop after `patience` epochs without an improvement larger than `min_delta`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EarlyStoppingConfig {
    pub patience: usize,
    pub min_delta: f64,
    pub restore_best_weights: bool,
    pub monitor: EarlyStoppingMetric,
}

impl Default for EarlyStoppingConfig {
    fn default() -> Self {
        EarlyStoppingConfig {
            patience: 5,
            min_delta: 0.0,
            restore_best_weights: true,
            monitor: EarlyStoppingMetric::ValidationLoss,
        }
    }
}

/// Training metrics tracked during training
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrainingMetrics {
    pub epoch: usize,
    pub train_loss: f64,
    pub validation_loss: Option<f64>,
    pub time_elapsed: f64,
    pub learning_rate: f64,
}

/// Tracks the monitored loss and remembers the best model seen so far
pub struct EarlyStopper {
    config: EarlyStoppingConfig,
    best_score: f64,
    wait: usize,
    best_epoch: Option<usize>,
    stopped_epoch: Option<usize>,
    best_weights: Option<Forecaster>,
}

impl EarlyStopper {
    pub fn new(config: EarlyStoppingConfig) -> Self {
        EarlyStopper {
            config,
            best_score: f64::INFINITY,
            wait: 0,
            best_epoch: None,
            stopped_epoch: None,
            best_weights: None,
        }
    }

    /// Record one epoch. Returns `(should_stop, is_best)`.
    pub fn should_stop(&mut self, metrics: &TrainingMetrics, model: &Forecaster) -> (bool, bool) {
        let score = match self.config.monitor {
            EarlyStoppingMetric::ValidationLoss => metrics.validation_loss.unwrap_or(metrics.train_loss),
            EarlyStoppingMetric::TrainLoss => metrics.train_loss,
        };

        if score < self.best_score - self.config.min_delta {
            self.best_score = score;
            self.best_epoch = Some(metrics.epoch);
            self.wait = 0;
            if self.config.restore_best_weights {
                self.best_weights = Some(model.clone());
            }
            return (false, true);
        }

        self.wait += 1;
        if self.wait >= self.config.patience {
            self.stopped_epoch = Some(metrics.epoch);
            return (true, false);
        }
        (false, false)
    }

    pub fn best_score(&self) -> f64 {
        self.best_score
    }

    pub fn best_epoch(&self) -> Option<usize> {
        self.best_epoch
    }

    pub fn stopped_epoch(&self) -> Option<usize> {
        self.stopped_epoch
    }

    /// Hand over the snapshot taken at the best epoch, if one was kept.
    pub fn take_best_weights(&mut self) -> Option<Forecaster> {
        self.best_weights.take()
    }
}

/// Per-epoch loss curve plus how training ended.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TrainingHistory {
    pub epochs: Vec<TrainingMetrics>,
    pub best_epoch: Option<usize>,
    pub stopped_epoch: Option<usize>,
    pub restored_best_weights: bool,
}

impl TrainingHistory {
    pub fn train_losses(&self) -> Vec<f64> {
        self.epochs.iter().map(|m| m.train_loss).collect()
    }

    pub fn validation_losses(&self) -> Vec<f64> {
        self.epochs.iter().filter_map(|m| m.validation_loss).collect()
    }
}

/// Mini-batch trainer for a [`Forecaster`] with configurable loss and optimizer
pub struct ForecastTrainer<L: LossFunction, O: Optimizer> {
    pub model: Forecaster,
    pub loss_function: L,
    pub optimizer: O,
    pub config: TrainingConfig,
    history: TrainingHistory,
}

impl<L: LossFunction, O: Optimizer> ForecastTrainer<L, O> {
    pub fn new(model: Forecaster, loss_function: L, optimizer: O) -> Self {
        ForecastTrainer {
            model,
            loss_function,
            optimizer,
            config: TrainingConfig::default(),
            history: TrainingHistory::default(),
        }
    }

    pub fn with_config(mut self, config: TrainingConfig) -> Self {
        self.config = config;
        self
    }

    /// Train for up to `config.epochs` epochs, validating after each one.
    ///
    /// Batches are reshuffled every epoch from `config.seed`, so two runs with
    /// the same data and config produce the same model.
    pub fn train(&mut self, train_data: &SequenceSet, validation_data: Option<&SequenceSet>) -> Result<()> {
        if train_data.is_empty() {
            return Err(ForecastError::EmptyDataset("training set"));
        }
        self.model.check_input(&train_data.x)?;
        let validation_data = match validation_data {
            Some(val) if !val.is_empty() => {
                self.model.check_input(&val.x)?;
                Some(val)
            }
            _ => None,
        };

        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let mut stopper = self.config.early_stopping.clone().map(EarlyStopper::new);
        let mut order: Vec<usize> = (0..train_data.len()).collect();
        self.history = TrainingHistory::default();

        info!(
            "Starting training for {} epochs on {} sequences ({} parameters)...",
            self.config.epochs,
            train_data.len(),
            self.model.num_parameters()
        );

        for epoch in 0..self.config.epochs {
            let start_time = Instant::now();
            order.shuffle(&mut rng);

            let mut epoch_loss = 0.0;
            for batch in train_data.batches(self.config.batch_size, &order) {
                let (loss, mut gradients) = self.model.compute_gradients(&batch.x, &batch.y, &self.loss_function);

                // Apply gradient clipping to prevent exploding gradients
                if let Some(clip_value) = self.config.clip_gradient {
                    clip_gradients(&mut gradients, clip_value);
                }
                self.model.update_parameters(&gradients, &mut self.optimizer);
                epoch_loss += loss * batch.len() as f64;
            }
            epoch_loss /= train_data.len() as f64;

            let validation_loss =
                validation_data.map(|val| self.model.evaluate_loss(&val.x, &val.y, &self.loss_function));

            let metrics = TrainingMetrics {
                epoch,
                train_loss: epoch_loss,
                validation_loss,
                time_elapsed: start_time.elapsed().as_secs_f64(),
                learning_rate: self.optimizer.learning_rate(),
            };

            if self.config.print_every > 0 && epoch % self.config.print_every == 0 {
                match validation_loss {
                    Some(val_loss) => info!(
                        "Epoch {}: Train Loss: {:.6}, Val Loss: {:.6}, Time: {:.2}s",
                        epoch, epoch_loss, val_loss, metrics.time_elapsed
                    ),
                    None => info!(
                        "Epoch {}: Train Loss: {:.6}, Time: {:.2}s",
                        epoch, epoch_loss, metrics.time_elapsed
                    ),
                }
            }

            let should_stop = match stopper.as_mut() {
                Some(stopper) => {
                    let (should_stop, is_best) = stopper.should_stop(&metrics, &self.model);
                    if is_best {
                        debug!("Epoch {}: new best monitored loss {:.6}", epoch, stopper.best_score());
                    }
                    should_stop
                }
                None => false,
            };
            self.history.epochs.push(metrics);

            if should_stop {
                info!("Early stopping at epoch {}", epoch);
                break;
            }
        }

        if let Some(mut stopper) = stopper {
            self.history.best_epoch = stopper.best_epoch();
            self.history.stopped_epoch = stopper.stopped_epoch();
            if let Some(best) = stopper.take_best_weights() {
                info!("Restoring weights from epoch {}", stopper.best_epoch().unwrap_or(0));
                self.model = best;
                self.history.restored_best_weights = true;
            }
        }

        info!("Training completed after {} epochs", self.history.epochs.len());
        Ok(())
    }

    pub fn get_latest_metrics(&self) -> Option<&TrainingMetrics> {
        self.history.epochs.last()
    }

    pub fn get_metrics_history(&self) -> &[TrainingMetrics] {
        &self.history.epochs
    }

    pub fn history(&self) -> &TrainingHistory {
        &self.history
    }

    /// Consume the trainer, keeping the fitted model and its history.
    pub fn into_parts(self) -> (Forecaster, TrainingHistory) {
        (self.model, self.history)
    }
}

/// Build a model from `config` and wrap it in an Adam/MSE trainer.
pub fn create_forecast_trainer(num_features: usize, config: TrainingConfig) -> ForecastTrainer<MSELoss, Adam> {
    let mut rng = StdRng::seed_from_u64(config.seed);
    let model = Forecaster::new(num_features, config.hidden_size, config.num_layers, &mut rng);
    let optimizer = Adam::new(config.learning_rate);
    ForecastTrainer::new(model, MSELoss, optimizer).with_config(config)
}

/// Clip each gradient matrix to `max_norm` by its Frobenius norm
fn clip_gradients(gradients: &mut ForecasterGradients, max_norm: f64) {
    for matrix in gradients.matrices_mut() {
        clip_gradient_matrix(matrix, max_norm);
    }
}

fn clip_gradient_matrix(matrix: &mut Array2<f64>, max_norm: f64) {
    let norm = matrix.mapv(|x| x * x).sum().sqrt();
    if norm > max_norm {
        let scale = max_norm / norm;
        matrix.mapv_inplace(|x| x * scale);
    }
}

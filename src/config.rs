//! Training configuration

use serde::{Deserialize, Serialize};

use crate::error::ComputeError;

/// Hyperparameters and seeds for a training run.
///
/// The defaults reproduce the reference training recipe: 100 epochs, batches
/// of 4, an 80/20 split seeded with 42.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingConfig {
    pub epochs: usize,
    pub batch_size: usize,
    /// Fraction of the dataset held out for validation
    pub validation_split: f64,
    /// Seed for the train/validation shuffle
    pub split_seed: u64,
    /// Seed for weight initialisation, epoch shuffling and dropout
    pub init_seed: u64,
    pub learning_rate: f64,
    pub dropout_rate: f64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            epochs: 100,
            batch_size: 4,
            validation_split: 0.2,
            split_seed: 42,
            init_seed: 42,
            learning_rate: 0.001,
            dropout_rate: 0.5,
        }
    }
}

impl TrainingConfig {
    /// Set the number of training epochs
    pub fn with_epochs(mut self, epochs: usize) -> Self {
        self.epochs = epochs;
        self
    }

    /// Set the mini-batch size
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Set the fraction held out for validation
    pub fn with_validation_split(mut self, fraction: f64) -> Self {
        self.validation_split = fraction;
        self
    }

    /// Set the split and weight-init seeds
    pub fn with_seeds(mut self, split_seed: u64, init_seed: u64) -> Self {
        self.split_seed = split_seed;
        self.init_seed = init_seed;
        self
    }

    /// Set the Adam learning rate
    pub fn with_learning_rate(mut self, learning_rate: f64) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    /// Set the dropout rate after the hidden layer
    pub fn with_dropout_rate(mut self, rate: f64) -> Self {
        self.dropout_rate = rate;
        self
    }

    /// Reject values training cannot run with
    pub fn validate(&self) -> Result<(), ComputeError> {
        if self.epochs == 0 {
            return Err(ComputeError::InvalidConfig("epochs must be at least 1".into()));
        }
        if self.batch_size == 0 {
            return Err(ComputeError::InvalidConfig(
                "batch_size must be at least 1".into(),
            ));
        }
        if !(self.validation_split > 0.0 && self.validation_split < 1.0) {
            return Err(ComputeError::InvalidConfig(format!(
                "validation_split must be in (0, 1), got {}",
                self.validation_split
            )));
        }
        if !(self.learning_rate > 0.0 && self.learning_rate.is_finite()) {
            return Err(ComputeError::InvalidConfig(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }
        if !(0.0..1.0).contains(&self.dropout_rate) {
            return Err(ComputeError::InvalidConfig(format!(
                "dropout_rate must be in [0, 1), got {}",
                self.dropout_rate
            )));
        }
        Ok(())
    }
}

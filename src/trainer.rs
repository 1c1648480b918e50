//! Model training
//!
//! Splits the labeled dataset, fits a fresh [`SquatNet`] with Adam on
//! mini-batches for a fixed number of epochs, and records per-epoch metrics.
//! Validation metrics are reported only; the model after the last epoch is
//! the one returned.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::artifact::ModelArtifact;
use crate::config::TrainingConfig;
use crate::dataset::train_validation_split;
use crate::error::ComputeError;
use crate::metrics::{binary_cross_entropy, evaluate, predicted_label, ConfusionMatrix};
use crate::model::layers::dropout_mask;
use crate::model::{Adam, SquatNet, HIDDEN_UNITS};
use crate::types::{LabeledDataset, LabeledSample};

/// Metrics for one epoch
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EpochMetrics {
    pub epoch: usize,
    pub loss: f64,
    pub accuracy: f64,
    pub val_loss: Option<f64>,
    pub val_accuracy: Option<f64>,
}

/// Per-epoch metrics of a run, in order
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TrainingHistory {
    pub epochs: Vec<EpochMetrics>,
}

impl TrainingHistory {
    pub fn last(&self) -> Option<&EpochMetrics> {
        self.epochs.last()
    }
}

/// Headline numbers of a finished run, stored in the artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingSummary {
    pub train_samples: usize,
    pub validation_samples: usize,
    pub epochs: usize,
    pub final_loss: f64,
    pub final_accuracy: f64,
    pub final_val_loss: Option<f64>,
    pub final_val_accuracy: Option<f64>,
}

/// Result of [`Trainer::fit`]
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub artifact: ModelArtifact,
    pub history: TrainingHistory,
}

pub struct Trainer {
    config: TrainingConfig,
}

impl Default for Trainer {
    fn default() -> Self {
        Self {
            config: TrainingConfig::default(),
        }
    }
}

impl Trainer {
    pub fn new(config: TrainingConfig) -> Result<Self, ComputeError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Train a new model on `dataset`.
    pub fn fit(&self, dataset: &LabeledDataset) -> Result<TrainingOutcome, ComputeError> {
        let config = &self.config;
        let split = train_validation_split(dataset, config.validation_split, config.split_seed)?;
        tracing::info!(
            train = split.train.len(),
            validation = split.validation.len(),
            epochs = config.epochs,
            batch_size = config.batch_size,
            "training model"
        );

        let mut rng = StdRng::seed_from_u64(config.init_seed);
        let mut network = SquatNet::new(&mut rng);
        let mut optimizer = Adam::new(config.learning_rate);
        let mut history = TrainingHistory::default();
        let mut order: Vec<usize> = (0..split.train.len()).collect();

        for epoch in 1..=config.epochs {
            order.shuffle(&mut rng);

            let mut loss_sum = 0.0;
            let mut matrix = ConfusionMatrix::default();
            for batch in order.chunks(config.batch_size) {
                let samples: Vec<&LabeledSample> = batch.iter().map(|&i| &split.train[i]).collect();
                let (batch_loss, gradients) =
                    self.batch_gradients(&network, &samples, &mut matrix, &mut rng);
                loss_sum += batch_loss;
                optimizer.step(&mut network, &gradients);
            }

            let validation = evaluate(&network, &split.validation);
            let metrics = EpochMetrics {
                epoch,
                loss: loss_sum / split.train.len() as f64,
                accuracy: matrix.accuracy(),
                val_loss: validation.map(|v| v.loss),
                val_accuracy: validation.map(|v| v.accuracy()),
            };
            tracing::debug!(
                epoch,
                loss = metrics.loss,
                accuracy = metrics.accuracy,
                val_loss = ?metrics.val_loss,
                val_accuracy = ?metrics.val_accuracy,
                "epoch complete"
            );
            history.epochs.push(metrics);
        }

        let summary = match history.last() {
            Some(last) => TrainingSummary {
                train_samples: split.train.len(),
                validation_samples: split.validation.len(),
                epochs: config.epochs,
                final_loss: last.loss,
                final_accuracy: last.accuracy,
                final_val_loss: last.val_loss,
                final_val_accuracy: last.val_accuracy,
            },
            None => return Err(ComputeError::InvalidConfig("no epochs were run".into())),
        };
        tracing::info!(
            loss = summary.final_loss,
            accuracy = summary.final_accuracy,
            val_accuracy = ?summary.final_val_accuracy,
            "training finished"
        );

        Ok(TrainingOutcome {
            artifact: ModelArtifact::new(network, config.clone(), summary),
            history,
        })
    }

    /// Forward and backward over one mini-batch with dropout active.
    /// Returns the summed loss and the batch-averaged gradients.
    fn batch_gradients(
        &self,
        network: &SquatNet,
        samples: &[&LabeledSample],
        matrix: &mut ConfusionMatrix,
        rng: &mut StdRng,
    ) -> (f64, SquatNet) {
        let mut gradients = network.zeros_like();
        let mut loss = 0.0;

        for sample in samples {
            let target = sample.label.as_target();
            let mask = dropout_mask(HIDDEN_UNITS, self.config.dropout_rate, rng);
            let pass = network.forward(sample.features.values(), mask);

            loss += binary_cross_entropy(pass.probability, target);
            matrix.record(sample.label, predicted_label(pass.probability));
            network.backward(&pass, pass.probability - target, &mut gradients);
        }

        gradients.scale(1.0 / samples.len() as f64);
        (loss, gradients)
    }
}

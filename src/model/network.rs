//! The squat classifier network
//!
//! ```text
//! [20, 3] -> Conv1d(16, k=3) + ReLU -> MaxPool(2)
//!         -> Conv1d(32, k=3) + ReLU -> GlobalAveragePool
//!         -> Dense(16) + ReLU -> Dropout -> Dense(1) + sigmoid
//! ```

use ndarray::{arr1, Array1, Array2, ArrayViewD, ArrayViewMutD};
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::layers::{relu, relu_backward, sigmoid, Conv1d, Dense, GlobalAveragePool, MaxPool1d};
use crate::error::ComputeError;
use crate::types::{FeatureTensor, CHANNELS};

/// Filters in the first convolution
pub const CONV1_FILTERS: usize = 16;
/// Filters in the second convolution
pub const CONV2_FILTERS: usize = 32;
/// Kernel width of both convolutions
pub const KERNEL_SIZE: usize = 3;
/// Max-pool window
pub const POOL_SIZE: usize = 2;
/// Width of the hidden dense layer
pub const HIDDEN_UNITS: usize = 16;

/// Names of the tensors returned by [`SquatNet::parameters`], in order
const PARAMETER_NAMES: [&str; 8] = [
    "conv1.weight",
    "conv1.bias",
    "conv2.weight",
    "conv2.bias",
    "hidden.weight",
    "hidden.bias",
    "output.weight",
    "output.bias",
];

/// Convolutional binary classifier over feature tensors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SquatNet {
    pub conv1: Conv1d,
    pub pool: MaxPool1d,
    pub conv2: Conv1d,
    pub hidden: Dense,
    pub output: Dense,
}

/// Intermediate values of one forward pass, kept for backpropagation
#[derive(Debug, Clone)]
pub struct ForwardPass {
    input: Array2<f64>,
    conv1_z: Array2<f64>,
    pool_winners: Array2<usize>,
    pooled: Array2<f64>,
    conv2_z: Array2<f64>,
    averaged: Array1<f64>,
    hidden_z: Array1<f64>,
    hidden_out: Array1<f64>,
    dropout_mask: Option<Array1<f64>>,
    pub probability: f64,
}

impl SquatNet {
    /// Fresh network with Glorot-uniform weights and zero biases
    pub fn new<R: Rng>(rng: &mut R) -> Self {
        Self {
            conv1: Conv1d::new(CHANNELS, CONV1_FILTERS, KERNEL_SIZE, rng),
            pool: MaxPool1d::new(POOL_SIZE),
            conv2: Conv1d::new(CONV1_FILTERS, CONV2_FILTERS, KERNEL_SIZE, rng),
            hidden: Dense::new(CONV2_FILTERS, HIDDEN_UNITS, rng),
            output: Dense::new(HIDDEN_UNITS, 1, rng),
        }
    }

    /// Zero-valued network of the same layout, used as a gradient buffer
    pub fn zeros_like(&self) -> Self {
        Self {
            conv1: self.conv1.zeros_like(),
            pool: self.pool,
            conv2: self.conv2.zeros_like(),
            hidden: self.hidden.zeros_like(),
            output: self.output.zeros_like(),
        }
    }

    /// Squat probability for one feature tensor (inference mode, no dropout)
    pub fn predict(&self, features: &FeatureTensor) -> f64 {
        self.forward(features.values(), None).probability
    }

    /// Forward pass. `dropout_mask` is applied after the hidden layer and
    /// is only supplied while training.
    pub fn forward(&self, input: &Array2<f64>, dropout_mask: Option<Array1<f64>>) -> ForwardPass {
        let conv1_z = self.conv1.forward(input);
        let (pooled, pool_winners) = self.pool.forward(&relu(&conv1_z));
        let conv2_z = self.conv2.forward(&pooled);
        let averaged = GlobalAveragePool::forward(&relu(&conv2_z));
        let hidden_z = self.hidden.forward(&averaged);
        let mut hidden_out = relu(&hidden_z);
        if let Some(mask) = &dropout_mask {
            hidden_out *= mask;
        }
        let logit = self.output.forward(&hidden_out)[0];

        ForwardPass {
            input: input.clone(),
            conv1_z,
            pool_winners,
            pooled,
            conv2_z,
            averaged,
            hidden_z,
            hidden_out,
            dropout_mask,
            probability: sigmoid(logit),
        }
    }

    /// Backpropagate `grad_logit` (dLoss/dlogit) through `pass`, accumulating
    /// parameter gradients into `grad`.
    pub fn backward(&self, pass: &ForwardPass, grad_logit: f64, grad: &mut SquatNet) {
        let mut grad_hidden = self
            .output
            .backward(&pass.hidden_out, &arr1(&[grad_logit]), &mut grad.output);
        if let Some(mask) = &pass.dropout_mask {
            grad_hidden *= mask;
        }
        let grad_hidden_z = relu_backward(&pass.hidden_z, &grad_hidden);
        let grad_averaged = self
            .hidden
            .backward(&pass.averaged, &grad_hidden_z, &mut grad.hidden);

        let grad_conv2 = GlobalAveragePool::backward(&grad_averaged, pass.conv2_z.nrows());
        let grad_conv2_z = relu_backward(&pass.conv2_z, &grad_conv2);
        let grad_pooled = self
            .conv2
            .backward(&pass.pooled, &grad_conv2_z, &mut grad.conv2);

        let grad_conv1 =
            self.pool
                .backward(&pass.pool_winners, &grad_pooled, pass.conv1_z.nrows());
        let grad_conv1_z = relu_backward(&pass.conv1_z, &grad_conv1);
        self.conv1.backward(&pass.input, &grad_conv1_z, &mut grad.conv1);
    }

    /// Trainable tensors in a fixed order
    pub fn parameters(&self) -> Vec<ArrayViewD<'_, f64>> {
        vec![
            self.conv1.weight.view().into_dyn(),
            self.conv1.bias.view().into_dyn(),
            self.conv2.weight.view().into_dyn(),
            self.conv2.bias.view().into_dyn(),
            self.hidden.weight.view().into_dyn(),
            self.hidden.bias.view().into_dyn(),
            self.output.weight.view().into_dyn(),
            self.output.bias.view().into_dyn(),
        ]
    }

    /// Mutable trainable tensors, same order as [`SquatNet::parameters`]
    pub fn parameters_mut(&mut self) -> Vec<ArrayViewMutD<'_, f64>> {
        vec![
            self.conv1.weight.view_mut().into_dyn(),
            self.conv1.bias.view_mut().into_dyn(),
            self.conv2.weight.view_mut().into_dyn(),
            self.conv2.bias.view_mut().into_dyn(),
            self.hidden.weight.view_mut().into_dyn(),
            self.hidden.bias.view_mut().into_dyn(),
            self.output.weight.view_mut().into_dyn(),
            self.output.bias.view_mut().into_dyn(),
        ]
    }

    pub fn parameter_count(&self) -> usize {
        self.parameters().iter().map(|p| p.len()).sum()
    }

    /// Multiply every parameter by `factor`
    pub fn scale(&mut self, factor: f64) {
        for mut tensor in self.parameters_mut() {
            tensor.mapv_inplace(|v| v * factor);
        }
    }

    /// Check that every weight is a finite number. JSON has no encoding for
    /// NaN or infinity, so a diverged network cannot be persisted.
    pub fn validate_finite(&self) -> Result<(), ComputeError> {
        for (name, tensor) in PARAMETER_NAMES.iter().zip(self.parameters()) {
            if let Some(value) = tensor.iter().find(|v| !v.is_finite()) {
                return Err(ComputeError::ModelFormat(format!(
                    "{} contains non-finite weight {}",
                    name, value
                )));
            }
        }
        Ok(())
    }

    /// Check that deserialised weights have the layout this network expects
    pub fn validate_shapes(&self) -> Result<(), ComputeError> {
        let expected: [(&str, &[usize], &[usize]); 8] = [
            ("conv1.weight", self.conv1.weight.shape(), &[KERNEL_SIZE, CHANNELS, CONV1_FILTERS]),
            ("conv1.bias", self.conv1.bias.shape(), &[CONV1_FILTERS]),
            ("conv2.weight", self.conv2.weight.shape(), &[KERNEL_SIZE, CONV1_FILTERS, CONV2_FILTERS]),
            ("conv2.bias", self.conv2.bias.shape(), &[CONV2_FILTERS]),
            ("hidden.weight", self.hidden.weight.shape(), &[CONV2_FILTERS, HIDDEN_UNITS]),
            ("hidden.bias", self.hidden.bias.shape(), &[HIDDEN_UNITS]),
            ("output.weight", self.output.weight.shape(), &[HIDDEN_UNITS, 1]),
            ("output.bias", self.output.bias.shape(), &[1]),
        ];

        for (name, actual, wanted) in expected {
            if actual != wanted {
                return Err(ComputeError::ModelFormat(format!(
                    "{} has shape {:?}, expected {:?}",
                    name, actual, wanted
                )));
            }
        }

        if self.pool.size != POOL_SIZE {
            return Err(ComputeError::ModelFormat(format!(
                "pool size {}, expected {}",
                self.pool.size, POOL_SIZE
            )));
        }

        Ok(())
    }
}

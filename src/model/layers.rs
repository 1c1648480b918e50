//! Network layers with forward and backward passes
//!
//! Sequences are laid out as `[steps, channels]`. Backward passes accumulate
//! parameter gradients into a zero-initialised layer of the same shape and
//! return the gradient with respect to the layer input.

use ndarray::{s, Array, Array1, Array2, Array3, Axis, Dimension};
use rand::distributions::Uniform;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Glorot/Xavier uniform initialisation bound
fn glorot_limit(fan_in: usize, fan_out: usize) -> f64 {
    (6.0 / (fan_in + fan_out) as f64).sqrt()
}

/// 1D convolution, stride 1, no padding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conv1d {
    /// Kernel [kernel_size, in_channels, out_channels]
    pub weight: Array3<f64>,
    /// Bias [out_channels]
    pub bias: Array1<f64>,
}

impl Conv1d {
    pub fn new<R: Rng>(
        in_channels: usize,
        out_channels: usize,
        kernel_size: usize,
        rng: &mut R,
    ) -> Self {
        let limit = glorot_limit(kernel_size * in_channels, kernel_size * out_channels);
        let dist = Uniform::new_inclusive(-limit, limit);
        let weight = Array3::from_shape_fn((kernel_size, in_channels, out_channels), |_| {
            rng.sample(&dist)
        });

        Self {
            weight,
            bias: Array1::zeros(out_channels),
        }
    }

    pub fn zeros_like(&self) -> Self {
        Self {
            weight: Array3::zeros(self.weight.raw_dim()),
            bias: Array1::zeros(self.bias.raw_dim()),
        }
    }

    pub fn kernel_size(&self) -> usize {
        self.weight.dim().0
    }

    pub fn out_channels(&self) -> usize {
        self.weight.dim().2
    }

    /// Input [steps, in_channels] -> output [steps - kernel_size + 1, out_channels]
    pub fn forward(&self, input: &Array2<f64>) -> Array2<f64> {
        let kernel_size = self.kernel_size();
        let out_len = input.nrows() + 1 - kernel_size;
        let mut output = Array2::zeros((out_len, self.out_channels()));

        for offset in 0..kernel_size {
            let window = input.slice(s![offset..offset + out_len, ..]);
            output += &window.dot(&self.weight.index_axis(Axis(0), offset));
        }
        output += &self.bias;

        output
    }

    pub fn backward(
        &self,
        input: &Array2<f64>,
        grad_output: &Array2<f64>,
        grad: &mut Conv1d,
    ) -> Array2<f64> {
        let out_len = grad_output.nrows();
        let mut grad_input = Array2::zeros(input.raw_dim());

        grad.bias += &grad_output.sum_axis(Axis(0));
        for offset in 0..self.kernel_size() {
            let window = input.slice(s![offset..offset + out_len, ..]);
            let mut grad_kernel = grad.weight.index_axis_mut(Axis(0), offset);
            grad_kernel += &window.t().dot(grad_output);

            let mut grad_window = grad_input.slice_mut(s![offset..offset + out_len, ..]);
            grad_window += &grad_output.dot(&self.weight.index_axis(Axis(0), offset).t());
        }

        grad_input
    }
}

/// Max pooling over non-overlapping windows; trailing steps that do not fill
/// a window are dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaxPool1d {
    pub size: usize,
}

impl MaxPool1d {
    pub fn new(size: usize) -> Self {
        Self { size }
    }

    /// Returns the pooled sequence and, per output cell, the input step that won.
    pub fn forward(&self, input: &Array2<f64>) -> (Array2<f64>, Array2<usize>) {
        let (steps, channels) = input.dim();
        let out_len = steps / self.size;
        let mut output = Array2::zeros((out_len, channels));
        let mut winners = Array2::zeros((out_len, channels));

        for t in 0..out_len {
            for c in 0..channels {
                let start = t * self.size;
                let mut best = start;
                for step in start + 1..start + self.size {
                    if input[[step, c]] > input[[best, c]] {
                        best = step;
                    }
                }
                output[[t, c]] = input[[best, c]];
                winners[[t, c]] = best;
            }
        }

        (output, winners)
    }

    pub fn backward(
        &self,
        winners: &Array2<usize>,
        grad_output: &Array2<f64>,
        input_steps: usize,
    ) -> Array2<f64> {
        let mut grad_input = Array2::zeros((input_steps, grad_output.ncols()));
        for ((t, c), &g) in grad_output.indexed_iter() {
            grad_input[[winners[[t, c]], c]] += g;
        }
        grad_input
    }
}

/// Mean over the time axis
pub struct GlobalAveragePool;

impl GlobalAveragePool {
    pub fn forward(input: &Array2<f64>) -> Array1<f64> {
        input.sum_axis(Axis(0)) / input.nrows() as f64
    }

    pub fn backward(grad_output: &Array1<f64>, input_steps: usize) -> Array2<f64> {
        let scale = 1.0 / input_steps as f64;
        Array2::from_shape_fn((input_steps, grad_output.len()), |(_, c)| {
            grad_output[c] * scale
        })
    }
}

/// Fully connected layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dense {
    /// Weight matrix [in_features, out_features]
    pub weight: Array2<f64>,
    /// Bias [out_features]
    pub bias: Array1<f64>,
}

impl Dense {
    pub fn new<R: Rng>(in_features: usize, out_features: usize, rng: &mut R) -> Self {
        let limit = glorot_limit(in_features, out_features);
        let dist = Uniform::new_inclusive(-limit, limit);
        let weight = Array2::from_shape_fn((in_features, out_features), |_| rng.sample(&dist));

        Self {
            weight,
            bias: Array1::zeros(out_features),
        }
    }

    pub fn zeros_like(&self) -> Self {
        Self {
            weight: Array2::zeros(self.weight.raw_dim()),
            bias: Array1::zeros(self.bias.raw_dim()),
        }
    }

    pub fn forward(&self, input: &Array1<f64>) -> Array1<f64> {
        input.dot(&self.weight) + &self.bias
    }

    pub fn backward(
        &self,
        input: &Array1<f64>,
        grad_output: &Array1<f64>,
        grad: &mut Dense,
    ) -> Array1<f64> {
        let outer = input
            .view()
            .insert_axis(Axis(1))
            .dot(&grad_output.view().insert_axis(Axis(0)));
        grad.weight += &outer;
        grad.bias += grad_output;

        self.weight.dot(grad_output)
    }
}

pub fn relu<D: Dimension>(z: &Array<f64, D>) -> Array<f64, D> {
    z.mapv(|v| v.max(0.0))
}

/// Gradient through ReLU given its pre-activation input
pub fn relu_backward<D: Dimension>(z: &Array<f64, D>, grad_output: &Array<f64, D>) -> Array<f64, D> {
    let mut grad = grad_output.clone();
    grad.zip_mut_with(z, |g, &v| {
        if v <= 0.0 {
            *g = 0.0;
        }
    });
    grad
}

pub fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Inverted dropout mask: kept units are scaled by `1 / (1 - rate)` so the
/// expected activation is unchanged. `None` when dropout is disabled.
pub fn dropout_mask<R: Rng>(len: usize, rate: f64, rng: &mut R) -> Option<Array1<f64>> {
    if rate <= 0.0 {
        return None;
    }
    let keep = 1.0 / (1.0 - rate);
    Some(Array1::from_shape_fn(len, |_| {
        if rng.gen::<f64>() >= rate {
            keep
        } else {
            0.0
        }
    }))
}

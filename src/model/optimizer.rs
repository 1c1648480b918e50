//! Adam optimizer (Adaptive Moment Estimation)

use ndarray::{ArrayD, Zip};

use super::network::SquatNet;

/// Adam with per-tensor first and second moment estimates
#[derive(Debug, Clone)]
pub struct Adam {
    pub learning_rate: f64,
    pub beta1: f64,
    pub beta2: f64,
    pub epsilon: f64,
    t: i32,
    first_moments: Vec<ArrayD<f64>>,
    second_moments: Vec<ArrayD<f64>>,
}

impl Adam {
    pub fn new(learning_rate: f64) -> Self {
        Self {
            learning_rate,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-7,
            t: 0,
            first_moments: Vec::new(),
            second_moments: Vec::new(),
        }
    }

    /// Number of updates applied so far
    pub fn steps(&self) -> i32 {
        self.t
    }

    /// Apply one update to `network` from (already batch-averaged) `gradients`.
    pub fn step(&mut self, network: &mut SquatNet, gradients: &SquatNet) {
        let grads = gradients.parameters();
        if self.first_moments.is_empty() {
            self.first_moments = grads.iter().map(|g| ArrayD::zeros(g.raw_dim())).collect();
            self.second_moments = self.first_moments.clone();
        }

        self.t += 1;
        let (lr, beta1, beta2, epsilon) = (self.learning_rate, self.beta1, self.beta2, self.epsilon);
        let correction1 = 1.0 - beta1.powi(self.t);
        let correction2 = 1.0 - beta2.powi(self.t);

        let moments = self.first_moments.iter_mut().zip(self.second_moments.iter_mut());
        for ((mut param, grad), (m, v)) in network.parameters_mut().into_iter().zip(grads).zip(moments) {
            Zip::from(&mut param)
                .and(&grad)
                .and(m)
                .and(v)
                .for_each(|p, &g, m, v| {
                    *m = beta1 * *m + (1.0 - beta1) * g;
                    *v = beta2 * *v + (1.0 - beta2) * g * g;
                    let m_hat = *m / correction1;
                    let v_hat = *v / correction2;
                    *p -= lr * m_hat / (v_hat.sqrt() + epsilon);
                });
        }
    }
}

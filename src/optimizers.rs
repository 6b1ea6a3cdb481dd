use ndarray::{Array2, Zip};
use std::collections::HashMap;

/// Applies one gradient step to a named parameter matrix.
///
/// The id keys any per-parameter state, so a matrix must keep the same id for
/// the whole run.
pub trait Optimizer {
    fn update(&mut self, param_id: &str, param: &mut Array2<f64>, gradient: &Array2<f64>);
    fn reset(&mut self);
    fn learning_rate(&self) -> f64;
}

/// Adam with bias-corrected moment estimates.
///
///   m_t = β₁m_{t-1} + (1-β₁)g_t
///   v_t = β₂v_{t-1} + (1-β₂)g_t²
///   θ_t = θ_{t-1} - η * m̂_t / (√v̂_t + ε)
///
/// Each parameter counts its own steps, so bias correction does not depend on
/// the order parameters are visited in.
#[derive(Debug, Clone)]
pub struct Adam {
    learning_rate: f64,
    betas: (f64, f64),
    epsilon: f64,
    moments: HashMap<String, Moments>,
}

#[derive(Debug, Clone)]
struct Moments {
    step: i32,
    mean: Array2<f64>,
    variance: Array2<f64>,
}

impl Adam {
    pub fn new(learning_rate: f64) -> Self {
        Adam {
            learning_rate,
            betas: (0.9, 0.999),
            epsilon: 1e-8,
            moments: HashMap::new(),
        }
    }

    pub fn with_betas(mut self, beta1: f64, beta2: f64) -> Self {
        self.betas = (beta1, beta2);
        self
    }

    /// Number of parameter matrices with moment state.
    pub fn tracked_parameters(&self) -> usize {
        self.moments.len()
    }
}

impl Optimizer for Adam {
    fn update(&mut self, param_id: &str, param: &mut Array2<f64>, gradient: &Array2<f64>) {
        let (beta1, beta2) = self.betas;
        let (lr, eps) = (self.learning_rate, self.epsilon);

        let moments = self.moments.entry(param_id.to_string()).or_insert_with(|| Moments {
            step: 0,
            mean: Array2::zeros(param.raw_dim()),
            variance: Array2::zeros(param.raw_dim()),
        });
        moments.step += 1;
        moments.mean.zip_mut_with(gradient, |m, &g| *m = beta1 * *m + (1.0 - beta1) * g);
        moments.variance.zip_mut_with(gradient, |v, &g| *v = beta2 * *v + (1.0 - beta2) * g * g);

        let mean_correction = 1.0 - beta1.powi(moments.step);
        let variance_correction = 1.0 - beta2.powi(moments.step);
        Zip::from(param)
            .and(&moments.mean)
            .and(&moments.variance)
            .for_each(|p, &m, &v| {
                *p -= lr * (m / mean_correction) / ((v / variance_correction).sqrt() + eps);
            });
    }

    fn reset(&mut self) {
        self.moments.clear();
    }

    fn learning_rate(&self) -> f64 {
        self.learning_rate
    }
}

use ndarray::{Array2, Axis};
use ndarray_rand::RandomExt;
use rand::Rng;
use rand_distr::Uniform;

use crate::error::{ForecastError, Result};
use crate::optimizers::Optimizer;

/// Gradients of a [`LinearLayer`]'s weight and bias.
#[derive(Clone, Debug)]
pub struct LinearGradients {
    pub weight: Array2<f64>,
    pub bias: Array2<f64>,
}

/// Dense projection from the top LSTM hidden state to the forecast.
///
/// `weight` is `(outputs, inputs)` and `bias` is `(outputs, 1)`. Inputs arrive
/// as `(inputs, batch)` columns and the bias broadcasts across the batch.
#[derive(Clone, Debug)]
pub struct LinearLayer {
    pub weight: Array2<f64>,
    pub bias: Array2<f64>,
}

impl LinearLayer {
    /// Glorot-uniform weights, zero bias.
    pub fn new<R: Rng + ?Sized>(inputs: usize, outputs: usize, rng: &mut R) -> Self {
        let limit = (6.0 / (inputs + outputs) as f64).sqrt();
        LinearLayer {
            weight: Array2::random_using((outputs, inputs), Uniform::new(-limit, limit), rng),
            bias: Array2::zeros((outputs, 1)),
        }
    }

    pub fn from_parts(weight: Array2<f64>, bias: Array2<f64>) -> Result<Self> {
        if bias.dim() != (weight.nrows(), 1) {
            return Err(ForecastError::ShapeMismatch(format!(
                "bias {:?} does not fit weight {:?}",
                bias.dim(),
                weight.dim()
            )));
        }
        Ok(LinearLayer { weight, bias })
    }

    pub fn input_size(&self) -> usize {
        self.weight.ncols()
    }

    pub fn output_size(&self) -> usize {
        self.weight.nrows()
    }

    pub fn forward(&self, input: &Array2<f64>) -> Array2<f64> {
        self.weight.dot(input) + &self.bias
    }

    /// Parameter gradients and ∂loss/∂input for `grad_output` at `input`.
    pub fn backward(&self, input: &Array2<f64>, grad_output: &Array2<f64>) -> (LinearGradients, Array2<f64>) {
        let gradients = LinearGradients {
            weight: grad_output.dot(&input.t()),
            bias: grad_output.sum_axis(Axis(1)).insert_axis(Axis(1)),
        };
        (gradients, self.weight.t().dot(grad_output))
    }

    pub fn update_parameters<O: Optimizer>(&mut self, gradients: &LinearGradients, optimizer: &mut O, prefix: &str) {
        optimizer.update(&format!("{}_weight", prefix), &mut self.weight, &gradients.weight);
        optimizer.update(&format!("{}_bias", prefix), &mut self.bias, &gradients.bias);
    }

    pub fn num_parameters(&self) -> usize {
        self.weight.len() + self.bias.len()
    }
}

use ndarray::{s, Array1, Array2, Array3, Axis};
use rand::Rng;

use crate::error::{ForecastError, Result};
use crate::evaluation::Predictor;
use crate::layers::linear::{LinearGradients, LinearLayer};
use crate::layers::lstm_cell::LSTMCellGradients;
use crate::loss::LossFunction;
use crate::models::lstm_network::LSTMNetwork;
use crate::optimizers::Optimizer;

/// Samples per forward pass when predicting over a large set.
const PREDICT_CHUNK: usize = 256;

/// Gradients for every trainable parameter of a [`Forecaster`].
#[derive(Clone, Debug)]
pub struct ForecasterGradients {
    pub lstm: Vec<LSTMCellGradients>,
    pub head: LinearGradients,
}

impl ForecasterGradients {
    pub fn matrices_mut(&mut self) -> Vec<&mut Array2<f64>> {
        let mut matrices: Vec<&mut Array2<f64>> = Vec::new();
        for layer in self.lstm.iter_mut() {
            matrices.extend(layer.matrices_mut());
        }
        matrices.push(&mut self.head.weight);
        matrices.push(&mut self.head.bias);
        matrices
    }
}

/// Many-to-one temperature model: a stacked LSTM reads the whole window and
/// a dense head maps the last hidden state to one value.
#[derive(Clone, Debug)]
pub struct Forecaster {
    pub network: LSTMNetwork,
    pub head: LinearLayer,
}

impl Forecaster {
    pub fn new<R: Rng + ?Sized>(num_features: usize, hidden_size: usize, num_layers: usize, rng: &mut R) -> Self {
        let network = LSTMNetwork::new(num_features, hidden_size, num_layers, &mut *rng);
        let head = LinearLayer::new(hidden_size, 1, rng);
        Forecaster { network, head }
    }

    pub fn num_features(&self) -> usize {
        self.network.input_size
    }

    pub fn num_parameters(&self) -> usize {
        self.network.num_parameters() + self.head.num_parameters()
    }

    /// Reject windows whose feature count does not match the network.
    pub fn check_input(&self, x: &Array3<f64>) -> Result<()> {
        if x.shape()[2] != self.num_features() {
            return Err(ForecastError::ShapeMismatch(format!(
                "model expects {} features per timestep, got {}",
                self.num_features(),
                x.shape()[2]
            )));
        }
        Ok(())
    }

    /// Predictions for a batch of windows `(batch, lookback, features)`, shaped `(1, batch)`.
    pub fn forward(&self, x: &Array3<f64>) -> Array2<f64> {
        let top = self.network.forward_sequence(&timestep_inputs(x));
        self.head.forward(&top)
    }

    /// Forward and backward pass over one mini-batch.
    ///
    /// Returns the batch loss and the gradients of every parameter.
    pub fn compute_gradients<L: LossFunction>(
        &self,
        x: &Array3<f64>,
        y: &Array1<f64>,
        loss_function: &L,
    ) -> (f64, ForecasterGradients) {
        let inputs = timestep_inputs(x);
        let (top, caches) = self.network.forward_sequence_with_cache(&inputs);
        let predictions = self.head.forward(&top);
        let targets = y.view().insert_axis(Axis(0)).to_owned();

        let loss = loss_function.compute_loss(&predictions, &targets);
        let dpred = loss_function.compute_gradient(&predictions, &targets);

        let (head, dh_last) = self.head.backward(&top, &dpred);
        let lstm = self.network.backward_through_time(&dh_last, &caches);

        (loss, ForecasterGradients { lstm, head })
    }

    pub fn update_parameters<O: Optimizer>(&mut self, gradients: &ForecasterGradients, optimizer: &mut O) {
        self.network.update_parameters(&gradients.lstm, optimizer);
        self.head.update_parameters(&gradients.head, optimizer, "head");
    }

    /// Mean loss over a whole set, evaluated in chunks.
    pub fn evaluate_loss<L: LossFunction>(&self, x: &Array3<f64>, y: &Array1<f64>, loss_function: &L) -> f64 {
        if y.is_empty() {
            return 0.0;
        }
        let predictions = self.predict(x).insert_axis(Axis(0));
        let targets = y.view().insert_axis(Axis(0)).to_owned();
        loss_function.compute_loss(&predictions, &targets)
    }
}

impl Predictor for Forecaster {
    fn predict(&self, x: &Array3<f64>) -> Array1<f64> {
        let samples = x.shape()[0];
        let mut out: Array1<f64> = Array1::zeros(samples);
        let mut start = 0;
        while start < samples {
            let end = (start + PREDICT_CHUNK).min(samples);
            let chunk = x.slice(s![start..end, .., ..]).to_owned();
            let predictions = self.forward(&chunk);
            out.slice_mut(s![start..end]).assign(&predictions.row(0));
            start = end;
        }
        out
    }
}

/// Split `(batch, lookback, features)` into `lookback` matrices of
/// `(features, batch)`, the column-per-sample layout the cells use.
pub fn timestep_inputs(x: &Array3<f64>) -> Vec<Array2<f64>> {
    (0..x.shape()[1])
        .map(|t| x.slice(s![.., t, ..]).t().to_owned())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loss::MSELoss;
    use crate::optimizers::Adam;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn sample_batch() -> (Array3<f64>, Array1<f64>) {
        let x = Array3::from_shape_fn((4, 3, 2), |(b, t, f)| (b as f64 * 0.1) + (t as f64 * 0.2) - f as f64 * 0.3);
        let y = Array1::from(vec![0.1, -0.2, 0.3, 0.0]);
        (x, y)
    }

    #[test]
    fn test_timestep_inputs_layout() {
        let (x, _) = sample_batch();
        let inputs = timestep_inputs(&x);
        assert_eq!(inputs.len(), 3);
        assert_eq!(inputs[0].shape(), &[2, 4]);
        assert_eq!(inputs[1][[1, 2]], x[[2, 1, 1]]);
    }

    #[test]
    fn test_predict_shape() {
        let model = Forecaster::new(2, 5, 2, &mut StdRng::seed_from_u64(11));
        let (x, _) = sample_batch();
        assert_eq!(model.predict(&x).len(), 4);
    }

    #[test]
    fn test_check_input() {
        let model = Forecaster::new(3, 4, 1, &mut StdRng::seed_from_u64(11));
        let (x, _) = sample_batch();
        assert!(matches!(model.check_input(&x), Err(ForecastError::ShapeMismatch(_))));
    }

    #[test]
    fn test_head_gradient_matches_finite_difference() {
        let mut model = Forecaster::new(2, 3, 1, &mut StdRng::seed_from_u64(12));
        let (x, y) = sample_batch();
        let (_, gradients) = model.compute_gradients(&x, &y, &MSELoss);

        let eps = 1e-6;
        let original = model.head.weight[[0, 1]];
        model.head.weight[[0, 1]] = original + eps;
        let plus = model.evaluate_loss(&x, &y, &MSELoss);
        model.head.weight[[0, 1]] = original - eps;
        let minus = model.evaluate_loss(&x, &y, &MSELoss);
        model.head.weight[[0, 1]] = original;

        let numeric = (plus - minus) / (2.0 * eps);
        assert!((numeric - gradients.head.weight[[0, 1]]).abs() < 1e-6);
    }

    #[test]
    fn test_updates_reduce_loss() {
        let mut model = Forecaster::new(2, 4, 1, &mut StdRng::seed_from_u64(13));
        let mut optimizer = Adam::new(0.01);
        let (x, y) = sample_batch();

        let before = model.evaluate_loss(&x, &y, &MSELoss);
        for _ in 0..50 {
            let (_, gradients) = model.compute_gradients(&x, &y, &MSELoss);
            model.update_parameters(&gradients, &mut optimizer);
        }
        let after = model.evaluate_loss(&x, &y, &MSELoss);

        assert!(after < before);
    }
}

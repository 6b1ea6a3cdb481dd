use ndarray::Array2;
use rand::Rng;

use crate::layers::lstm_cell::{LSTMCell, LSTMCellCache, LSTMCellGradients};
use crate::optimizers::Optimizer;

/// Holds cached values for all layers during network forward pass
#[derive(Clone, Debug)]
pub struct LSTMNetworkCache {
    pub cell_caches: Vec<LSTMCellCache>,
}

/// Multi-layer LSTM network for sequence modeling
///
/// Stacks multiple LSTM cells where the output of layer i becomes
/// the input to layer i+1.
#[derive(Clone, Debug)]
pub struct LSTMNetwork {
    cells: Vec<LSTMCell>,
    pub input_size: usize,
    pub hidden_size: usize,
    pub num_layers: usize,
}

impl LSTMNetwork {
    /// Creates a new multi-layer LSTM network
    ///
    /// First layer accepts `input_size` dimensions, subsequent layers
    /// accept `hidden_size` dimensions from the previous layer.
    pub fn new<R: Rng + ?Sized>(input_size: usize, hidden_size: usize, num_layers: usize, rng: &mut R) -> Self {
        let mut cells = Vec::with_capacity(num_layers);
        for i in 0..num_layers {
            let layer_input_size = if i == 0 { input_size } else { hidden_size };
            cells.push(LSTMCell::new(layer_input_size, hidden_size, &mut *rng));
        }

        LSTMNetwork {
            cells,
            input_size,
            hidden_size,
            num_layers,
        }
    }

    /// One timestep through every layer, without caching.
    ///
    /// `hx` and `cx` hold one state per layer and are updated in place.
    pub fn step(&self, input: &Array2<f64>, hx: &mut [Array2<f64>], cx: &mut [Array2<f64>]) -> Array2<f64> {
        let mut current_input = input.clone();
        for (layer, cell) in self.cells.iter().enumerate() {
            let (hy, cy) = cell.forward(&current_input, &hx[layer], &cx[layer]);
            hx[layer] = hy.clone();
            cx[layer] = cy;
            current_input = hy;
        }
        current_input
    }

    /// Run a whole sequence from zero state and return the top layer's final
    /// hidden state.
    pub fn forward_sequence(&self, sequence: &[Array2<f64>]) -> Array2<f64> {
        let batch = sequence.first().map(|x| x.ncols()).unwrap_or(1);
        let mut hx: Vec<Array2<f64>> = vec![Array2::zeros((self.hidden_size, batch)); self.num_layers];
        let mut cx: Vec<Array2<f64>> = vec![Array2::zeros((self.hidden_size, batch)); self.num_layers];

        let mut top: Array2<f64> = Array2::zeros((self.hidden_size, batch));
        for input in sequence {
            top = self.step(input, &mut hx, &mut cx);
        }
        top
    }

    /// Process an entire sequence with caching for training
    ///
    /// Maintains hidden/cell state across time steps within the sequence.
    /// Returns the top layer's final hidden state and one cache per timestep.
    pub fn forward_sequence_with_cache(&self, sequence: &[Array2<f64>]) -> (Array2<f64>, Vec<LSTMNetworkCache>) {
        let batch = sequence.first().map(|x| x.ncols()).unwrap_or(1);
        let mut hx: Vec<Array2<f64>> = vec![Array2::zeros((self.hidden_size, batch)); self.num_layers];
        let mut cx: Vec<Array2<f64>> = vec![Array2::zeros((self.hidden_size, batch)); self.num_layers];
        let mut caches = Vec::with_capacity(sequence.len());
        let mut top: Array2<f64> = Array2::zeros((self.hidden_size, batch));

        for input in sequence {
            let mut current_input = input.clone();
            let mut cell_caches = Vec::with_capacity(self.num_layers);

            for (layer, cell) in self.cells.iter().enumerate() {
                let (hy, cy, cache) = cell.forward_with_cache(&current_input, &hx[layer], &cx[layer]);
                cell_caches.push(cache);
                hx[layer] = hy.clone();
                cx[layer] = cy;
                // Layer i+1 input is layer i hidden output
                current_input = hy;
            }

            caches.push(LSTMNetworkCache { cell_caches });
            top = current_input;
        }

        (top, caches)
    }

    /// Backpropagation through time for a many-to-one loss.
    ///
    /// `dh_last` is the gradient w.r.t. the top layer's hidden state at the
    /// final timestep. Gradients flow backwards through time and down
    /// through the stack; per-layer gradients are summed over timesteps.
    pub fn backward_through_time(&self, dh_last: &Array2<f64>, caches: &[LSTMNetworkCache]) -> Vec<LSTMCellGradients> {
        let mut gradients = self.zero_gradients();
        let mut dh_next: Vec<Array2<f64>> = vec![Array2::zeros(dh_last.raw_dim()); self.num_layers];
        let mut dc_next: Vec<Array2<f64>> = vec![Array2::zeros(dh_last.raw_dim()); self.num_layers];

        for (t, cache) in caches.iter().enumerate().rev() {
            let mut dh_from_above = if t + 1 == caches.len() {
                dh_last.clone()
            } else {
                Array2::zeros(dh_last.raw_dim())
            };

            for (layer, cell) in self.cells.iter().enumerate().rev() {
                let dhy = &dh_from_above + &dh_next[layer];
                let (step_gradients, dx, dhx, dcx) = cell.backward(&dhy, &dc_next[layer], &cache.cell_caches[layer]);

                gradients[layer].accumulate(&step_gradients);
                dh_next[layer] = dhx;
                dc_next[layer] = dcx;
                dh_from_above = dx;
            }
        }

        gradients
    }

    /// Update parameters for all layers using computed gradients
    pub fn update_parameters<O: Optimizer>(&mut self, gradients: &[LSTMCellGradients], optimizer: &mut O) {
        for (i, (cell, cell_gradients)) in self.cells.iter_mut().zip(gradients.iter()).enumerate() {
            let prefix = format!("layer_{}", i);
            cell.update_parameters(cell_gradients, optimizer, &prefix);
        }
    }

    /// Initialize zero gradients for all layers
    pub fn zero_gradients(&self) -> Vec<LSTMCellGradients> {
        self.cells.iter().map(|cell| cell.zero_gradients()).collect()
    }

    pub fn num_parameters(&self) -> usize {
        self.cells.iter().map(LSTMCell::num_parameters).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr2;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_lstm_network_forward() {
        let network = LSTMNetwork::new(3, 2, 2, &mut StdRng::seed_from_u64(3));
        let sequence = vec![arr2(&[[0.5], [0.1], [-0.3]]), arr2(&[[0.2], [0.0], [0.4]])];

        let hy = network.forward_sequence(&sequence);
        assert_eq!(hy.shape(), &[2, 1]);
    }

    #[test]
    fn test_cached_and_plain_forward_agree() {
        let network = LSTMNetwork::new(2, 4, 2, &mut StdRng::seed_from_u64(4));
        let sequence = vec![
            arr2(&[[0.5, 1.0], [0.1, -1.0]]),
            arr2(&[[-0.2, 0.3], [0.7, 0.0]]),
            arr2(&[[0.9, -0.4], [0.2, 0.6]]),
        ];

        let plain = network.forward_sequence(&sequence);
        let (cached, caches) = network.forward_sequence_with_cache(&sequence);

        assert_eq!(caches.len(), 3);
        assert_eq!(caches[0].cell_caches.len(), 2);
        assert!((&plain - &cached).mapv(f64::abs).sum() < 1e-12);
    }

    #[test]
    fn test_bptt_matches_finite_difference() {
        let mut network = LSTMNetwork::new(1, 2, 2, &mut StdRng::seed_from_u64(5));
        let sequence = vec![arr2(&[[0.4]]), arr2(&[[-0.6]]), arr2(&[[0.9]])];

        // Loss = sum of the final top hidden state
        let (top, caches) = network.forward_sequence_with_cache(&sequence);
        let gradients = network.backward_through_time(&Array2::ones(top.raw_dim()), &caches);

        let eps = 1e-6;
        let analytic = gradients[0].w_ih[[0, 0]];
        let original = network.cells[0].w_ih[[0, 0]];

        network.cells[0].w_ih[[0, 0]] = original + eps;
        let plus = network.forward_sequence(&sequence).sum();
        network.cells[0].w_ih[[0, 0]] = original - eps;
        let minus = network.forward_sequence(&sequence).sum();
        network.cells[0].w_ih[[0, 0]] = original;

        let numeric = (plus - minus) / (2.0 * eps);
        assert!((numeric - analytic).abs() < 1e-6, "numeric {} vs analytic {}", numeric, analytic);
    }
}

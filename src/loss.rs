use ndarray::Array2;

/// Training objective over a `(1, batch)` row of forecasts and the matching targets.
pub trait LossFunction {
    fn compute_loss(&self, predictions: &Array2<f64>, targets: &Array2<f64>) -> f64;

    /// ∂loss/∂prediction, same shape as `predictions`.
    fn compute_gradient(&self, predictions: &Array2<f64>, targets: &Array2<f64>) -> Array2<f64>;
}

/// Mean squared error averaged over the batch.
#[derive(Debug, Clone, Copy, Default)]
pub struct MSELoss;

impl LossFunction for MSELoss {
    fn compute_loss(&self, predictions: &Array2<f64>, targets: &Array2<f64>) -> f64 {
        let n = predictions.len().max(1) as f64;
        predictions
            .iter()
            .zip(targets.iter())
            .map(|(p, t)| (p - t).powi(2))
            .sum::<f64>()
            / n
    }

    fn compute_gradient(&self, predictions: &Array2<f64>, targets: &Array2<f64>) -> Array2<f64> {
        let scale = 2.0 / predictions.len().max(1) as f64;
        (predictions - targets).mapv(|d| d * scale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr2;

    #[test]
    fn test_mse_over_batch() {
        let predictions = arr2(&[[1.0, 2.0, 3.0, 4.0]]);
        let targets = arr2(&[[1.5, 2.5, 2.5, 3.5]]);

        assert!((MSELoss.compute_loss(&predictions, &targets) - 0.25).abs() < 1e-12);

        let gradient = MSELoss.compute_gradient(&predictions, &targets);
        assert_eq!(gradient.shape(), &[1, 4]);
        assert!((gradient[[0, 0]] + 0.25).abs() < 1e-12);
        assert!((gradient[[0, 2]] - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_gradient_matches_finite_difference() {
        let targets = arr2(&[[0.3, -1.2]]);
        let mut predictions = arr2(&[[0.1, 0.4]]);
        let analytic = MSELoss.compute_gradient(&predictions, &targets)[[0, 1]];

        let eps = 1e-6;
        predictions[[0, 1]] += eps;
        let plus = MSELoss.compute_loss(&predictions, &targets);
        predictions[[0, 1]] -= 2.0 * eps;
        let minus = MSELoss.compute_loss(&predictions, &targets);

        assert!(((plus - minus) / (2.0 * eps) - analytic).abs() < 1e-6);
    }
}

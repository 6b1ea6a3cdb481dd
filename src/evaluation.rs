use ndarray::{Array1, Array3};
use serde::{Deserialize, Serialize};

use crate::error::{ForecastError, Result};

/// Anything that maps windows `(samples, lookback, features)` to one value per window.
pub trait Predictor {
    fn predict(&self, x: &Array3<f64>) -> Array1<f64>;
}

/// Predicts the same value for every window, e.g. the training-target mean.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstantPredictor {
    pub value: f64,
}

impl ConstantPredictor {
    pub fn new(value: f64) -> Self {
        ConstantPredictor { value }
    }

    /// Baseline that always answers with the mean of `targets`.
    pub fn mean_of(targets: &Array1<f64>) -> Self {
        ConstantPredictor::new(targets.mean().unwrap_or(0.0))
    }
}

impl Predictor for ConstantPredictor {
    fn predict(&self, x: &Array3<f64>) -> Array1<f64> {
        Array1::from_elem(x.shape()[0], self.value)
    }
}

/// Regression accuracy on a held-out set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub mae: f64,
    pub rmse: f64,
    pub r2: f64,
}

/// Score `predictor` on `(x_test, y_test)`.
pub fn evaluate<P: Predictor + ?Sized>(predictor: &P, x_test: &Array3<f64>, y_test: &Array1<f64>) -> Result<Metrics> {
    let predictions = predictor.predict(x_test);
    regression_metrics(y_test, &predictions)
}

/// MAE, RMSE and R² of `y_pred` against `y_true`.
///
/// R² uses the mean of `y_true` as its baseline. When `y_true` is constant,
/// R² is 1.0 for a perfect fit and 0.0 otherwise.
pub fn regression_metrics(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<Metrics> {
    if y_true.is_empty() {
        return Err(ForecastError::EmptyDataset("test set"));
    }
    if y_true.len() != y_pred.len() {
        return Err(ForecastError::ShapeMismatch(format!(
            "{} targets but {} predictions",
            y_true.len(),
            y_pred.len()
        )));
    }

    let n = y_true.len() as f64;
    let diff = y_pred - y_true;
    let mae = diff.mapv(f64::abs).sum() / n;
    let ss_res = diff.mapv(|d| d * d).sum();
    let rmse = (ss_res / n).sqrt();

    let mean = y_true.sum() / n;
    let ss_tot = y_true.mapv(|t| (t - mean).powi(2)).sum();
    let r2 = if ss_tot > 0.0 {
        1.0 - ss_res / ss_tot
    } else if ss_res == 0.0 {
        1.0
    } else {
        0.0
    };

    Ok(Metrics { mae, rmse, r2 })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_perfect_predictions() {
        let y = array![1.0, 2.0, 3.0];
        let metrics = regression_metrics(&y, &y).unwrap();
        assert_eq!(metrics.mae, 0.0);
        assert_eq!(metrics.rmse, 0.0);
        assert_eq!(metrics.r2, 1.0);
    }

    #[test]
    fn test_known_values() {
        let y_true = array![3.0, -0.5, 2.0, 7.0];
        let y_pred = array![2.5, 0.0, 2.0, 8.0];
        let metrics = regression_metrics(&y_true, &y_pred).unwrap();

        assert!((metrics.mae - 0.5).abs() < 1e-12);
        assert!((metrics.rmse - 0.375f64.sqrt()).abs() < 1e-12);
        assert!((metrics.r2 - 0.948_608_137_044_967_9).abs() < 1e-9);
    }

    #[test]
    fn test_mean_baseline_scores_zero() {
        let x = Array3::zeros((4, 2, 1));
        let y_test = array![1.0, 2.0, 3.0, 4.0];
        let metrics = evaluate(&ConstantPredictor::new(2.5), &x, &y_test).unwrap();
        assert!(metrics.r2.abs() < 1e-12);
    }

    #[test]
    fn test_worse_than_mean_is_negative() {
        let x = Array3::zeros((4, 2, 1));
        let y_test = array![1.0, 2.0, 3.0, 4.0];
        let metrics = evaluate(&ConstantPredictor::new(10.0), &x, &y_test).unwrap();
        assert!(metrics.r2 < 0.0);
    }

    #[test]
    fn test_constant_targets() {
        let y = array![2.0, 2.0];
        assert_eq!(regression_metrics(&y, &array![2.0, 2.0]).unwrap().r2, 1.0);
        assert_eq!(regression_metrics(&y, &array![1.0, 3.0]).unwrap().r2, 0.0);
    }

    #[test]
    fn test_empty_and_mismatched() {
        assert!(matches!(
            regression_metrics(&Array1::zeros(0), &Array1::zeros(0)),
            Err(ForecastError::EmptyDataset(_))
        ));
        assert!(matches!(
            regression_metrics(&array![1.0], &array![1.0, 2.0]),
            Err(ForecastError::ShapeMismatch(_))
        ));
    }

    #[test]
    fn test_mean_of() {
        assert_eq!(ConstantPredictor::mean_of(&array![1.0, 3.0]).value, 2.0);
    }
}

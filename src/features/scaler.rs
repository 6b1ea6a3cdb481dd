use serde::{Deserialize, Serialize};

use super::builder::{CleanedRow, FeatureRow};
use super::{Measurement, NUM_MEASUREMENTS};
use crate::error::{ForecastError, Result};
use crate::utils::mean_std;

/// Fitted per-column mean and standard deviation of the measurement columns.
///
/// Fit once on training rows and reuse for every later transform; refitting
/// on validation or test rows leaks their statistics into training.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalerParams {
    pub means: [f64; NUM_MEASUREMENTS],
    pub stds: [f64; NUM_MEASUREMENTS],
}

impl ScalerParams {
    /// Standardize the measurement columns. Time features pass through.
    pub fn apply(&self, rows: &[FeatureRow]) -> Vec<CleanedRow> {
        rows.iter()
            .map(|row| {
                let mut measurements = row.measurements;
                for (i, value) in measurements.iter_mut().enumerate() {
                    *value = (*value - self.means[i]) / self.stds[i];
                }
                CleanedRow {
                    timestamp: row.timestamp,
                    measurements,
                    time: row.time,
                }
            })
            .collect()
    }

    /// Standardize a single value of `measurement`.
    pub fn scale(&self, measurement: Measurement, value: f64) -> f64 {
        let i = measurement.index();
        (value - self.means[i]) / self.stds[i]
    }

    /// Map a standardized value back to physical units.
    pub fn inverse(&self, measurement: Measurement, value: f64) -> f64 {
        let i = measurement.index();
        value * self.stds[i] + self.means[i]
    }
}

/// Z-score scaler over the six measurement columns.
///
/// Uses the population standard deviation. A constant column gets a scale of
/// 1.0 so it maps to zeros instead of NaN.
pub struct StandardScaler;

impl StandardScaler {
    pub fn fit(rows: &[FeatureRow]) -> Result<ScalerParams> {
        if rows.is_empty() {
            return Err(ForecastError::EmptyDataset("scaler fit table"));
        }

        let mut means = [0.0; NUM_MEASUREMENTS];
        let mut stds = [1.0; NUM_MEASUREMENTS];
        for m in Measurement::ALL {
            let column: Vec<f64> = rows.iter().map(|row| row.measurement(m)).collect();
            let (mean, std) = mean_std(&column);
            means[m.index()] = mean;
            stds[m.index()] = if std > f64::EPSILON { std } else { 1.0 };
        }

        Ok(ScalerParams { means, stds })
    }
}

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ForecastError, Result};
use crate::training::TrainingConfig;

/// Which rows the scaler statistics come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalerFit {
    /// Only rows covered by training windows (inputs and targets).
    TrainingRows,
    /// Every row, before splitting. Test statistics leak into the scaler.
    FullDataset,
}

/// End-to-end pipeline settings. Every field has a default, so a partial
/// JSON file (or none at all) is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub lookback: usize,
    /// Share of windows held out for testing.
    pub test_ratio: f64,
    /// Share of the remaining windows held out for validation.
    pub validation_ratio: f64,
    pub scaler_fit: ScalerFit,
    /// Where SVG plots go; `None` disables plotting.
    pub plot_dir: Option<PathBuf>,
    pub training: TrainingConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            lookback: 24,
            test_ratio: 0.2,
            validation_ratio: 0.2,
            scaler_fit: ScalerFit::TrainingRows,
            plot_dir: Some(PathBuf::from("plots")),
            training: TrainingConfig::default(),
        }
    }
}

impl PipelineConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: PipelineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Reject settings that would make a stage meaningless.
    pub fn validate(&self) -> Result<()> {
        let ratio_ok = |r: f64| r > 0.0 && r < 1.0;
        if !ratio_ok(self.test_ratio) {
            return Err(invalid(format!("test_ratio must be in (0, 1), got {}", self.test_ratio)));
        }
        if !ratio_ok(self.validation_ratio) {
            return Err(invalid(format!(
                "validation_ratio must be in (0, 1), got {}",
                self.validation_ratio
            )));
        }

        let counts = [
            ("lookback", self.lookback),
            ("training.epochs", self.training.epochs),
            ("training.batch_size", self.training.batch_size),
            ("training.hidden_size", self.training.hidden_size),
            ("training.num_layers", self.training.num_layers),
        ];
        for (name, value) in counts {
            if value == 0 {
                return Err(invalid(format!("{} must be at least 1", name)));
            }
        }

        if !(self.training.learning_rate > 0.0) {
            return Err(invalid(format!(
                "training.learning_rate must be positive, got {}",
                self.training.learning_rate
            )));
        }
        Ok(())
    }
}

fn invalid(message: String) -> ForecastError {
    ForecastError::InvalidConfig(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::training::EarlyStoppingMetric;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.lookback, 24);
        assert_eq!(config.test_ratio, 0.2);
        assert_eq!(config.validation_ratio, 0.2);
        assert_eq!(config.training.epochs, 50);
        assert_eq!(config.training.batch_size, 32);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = PipelineConfig::from_json_str(
            r#"{
                "lookback": 12,
                "scaler_fit": "full_dataset",
                "plot_dir": null,
                "training": { "epochs": 5, "early_stopping": { "patience": 2, "monitor": "train_loss" } }
            }"#,
        )
        .unwrap();

        assert_eq!(config.lookback, 12);
        assert_eq!(config.scaler_fit, ScalerFit::FullDataset);
        assert_eq!(config.plot_dir, None);
        assert_eq!(config.training.epochs, 5);
        assert_eq!(config.training.batch_size, 32);
        let early = config.training.early_stopping.unwrap();
        assert_eq!(early.patience, 2);
        assert_eq!(early.monitor, EarlyStoppingMetric::TrainLoss);
        assert!(early.restore_best_weights);
    }

    #[test]
    fn test_invalid_values() {
        let err = PipelineConfig::from_json_str(r#"{ "test_ratio": 1.5 }"#).unwrap_err();
        assert!(matches!(err, ForecastError::InvalidConfig(_)));

        let err = PipelineConfig::from_json_str(r#"{ "lookback": 0 }"#).unwrap_err();
        assert!(err.to_string().contains("lookback"));
    }

    #[test]
    fn test_malformed_json() {
        let err = PipelineConfig::from_json_str("{ lookback: ").unwrap_err();
        assert!(matches!(err, ForecastError::Config(_)));
    }
}

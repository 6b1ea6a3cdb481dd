use std::path::Path;

use log::{debug, info, warn};
use ndarray::Array1;

use crate::config::{PipelineConfig, ScalerFit};
use crate::data::{load_csv, RawTable};
use crate::error::{ForecastError, Result};
use crate::evaluation::{evaluate, regression_metrics, ConstantPredictor, Metrics, Predictor};
use crate::features::{feature_names, FeatureBuilder, FeatureColumn, Measurement, ScalerParams};
use crate::models::forecaster::Forecaster;
use crate::report::{plot_loss_curves, plot_predictions};
use crate::sequence::{split_index, windows, SequenceSet};
use crate::training::{create_forecast_trainer, TrainingHistory};

/// Everything a finished run produced.
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub rows: usize,
    pub feature_names: Vec<&'static str>,
    pub train_shape: [usize; 3],
    pub validation_shape: [usize; 3],
    pub test_shape: [usize; 3],
    pub scaler: ScalerParams,
    pub history: TrainingHistory,
    /// Model error on the test windows, standardized units.
    pub metrics: Metrics,
    /// Error of always predicting the training-target mean.
    pub baseline: Metrics,
    /// Test targets in °C.
    pub actual: Array1<f64>,
    /// Model predictions for the test windows in °C.
    pub predicted: Array1<f64>,
    pub model: Forecaster,
}

/// Load `data_path` and run every stage on it.
///
/// A failure after loading prints the error and a dump of the loaded table to
/// stderr before it is returned.
pub fn run<P: AsRef<Path>>(data_path: P, config: &PipelineConfig) -> Result<PipelineReport> {
    config.validate()?;
    let raw = load_csv(data_path)?;
    run_on_table(&raw, config).map_err(|err| {
        eprintln!("Pipeline failed: {}", err);
        eprintln!("{}", raw.describe());
        err
    })
}

/// Run features, windowing, training, evaluation and plotting on a loaded table.
pub fn run_on_table(raw: &RawTable, config: &PipelineConfig) -> Result<PipelineReport> {
    config.validate()?;
    let lookback = config.lookback;

    let rows = FeatureBuilder::prepare(raw)?;
    let total_windows = rows.len().saturating_sub(lookback);
    let train_windows = split_index(
        split_index(total_windows, 1.0 - config.test_ratio),
        1.0 - config.validation_ratio,
    );
    if train_windows == 0 {
        return Err(ForecastError::EmptyDataset("training set"));
    }

    // Training windows read rows [0, n + L), the last of them as a target.
    let fit_rows = match config.scaler_fit {
        ScalerFit::TrainingRows => &rows[..train_windows + lookback],
        ScalerFit::FullDataset => &rows[..],
    };
    debug!("Fitting scaler on {} of {} rows", fit_rows.len(), rows.len());

    let mut builder = FeatureBuilder::new();
    let scaler = builder.fit(fit_rows)?.clone();
    let table = builder.transform(&rows)?;
    info!("Built {} cleaned rows with {} features", table.len(), table.num_features());

    let sequences = windows(&table, FeatureColumn::Temperature, lookback)?;
    let (train_val, test) = sequences.split(1.0 - config.test_ratio);
    let (train, validation) = train_val.split(1.0 - config.validation_ratio);
    info!(
        "Split {} windows into {} train, {} validation, {} test",
        sequences.len(),
        train.len(),
        validation.len(),
        test.len()
    );
    if test.is_empty() {
        return Err(ForecastError::EmptyDataset("test set"));
    }

    let mut trainer = create_forecast_trainer(table.num_features(), config.training.clone());
    trainer.train(&train, Some(&validation))?;
    let (model, history) = trainer.into_parts();

    let predictions = model.predict(&test.x);
    let metrics = regression_metrics(&test.y, &predictions)?;
    let baseline = evaluate(&ConstantPredictor::mean_of(&train.y), &test.x, &test.y)?;
    info!(
        "Test MAE {:.4}, RMSE {:.4}, R² {:.4} (baseline R² {:.4})",
        metrics.mae, metrics.rmse, metrics.r2, baseline.r2
    );

    let to_celsius = |v: f64| scaler.inverse(Measurement::Temperature, v);
    let report = PipelineReport {
        rows: table.len(),
        feature_names: feature_names(),
        train_shape: shape(&train),
        validation_shape: shape(&validation),
        test_shape: shape(&test),
        history,
        metrics,
        baseline,
        actual: test.y.mapv(to_celsius),
        predicted: predictions.mapv(to_celsius),
        scaler: scaler.clone(),
        model,
    };

    if let Some(dir) = &config.plot_dir {
        write_plots(&report, dir);
    }
    Ok(report)
}

/// Plots are diagnostics: a failure is logged and the run still succeeds.
fn write_plots(report: &PipelineReport, dir: &Path) {
    if let Err(err) = std::fs::create_dir_all(dir) {
        warn!("Cannot create plot directory {}: {}", dir.display(), err);
        return;
    }
    if let Err(err) = plot_loss_curves(&report.history, &dir.join("loss_curves.svg")) {
        warn!("Loss curve plot failed: {}", err);
    }
    if let Err(err) = plot_predictions(&report.actual, &report.predicted, &dir.join("predictions.svg")) {
        warn!("Prediction plot failed: {}", err);
    }
}

fn shape(set: &SequenceSet) -> [usize; 3] {
    [set.len(), set.lookback(), set.num_features()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::training::TrainingConfig;

    fn table(rows: usize) -> RawTable {
        let headers = [
            "Formatted Date",
            "Temperature (C)",
            "Humidity",
            "Wind Speed (km/h)",
            "Pressure (millibars)",
            "Wind Bearing (degrees)",
            "Visibility (km)",
        ]
        .iter()
        .map(|h| h.to_string())
        .collect();
        let records = (0..rows)
            .map(|i| {
                let t = (i as f64 * 0.3).sin() * 10.0 + 12.0;
                vec![
                    format!("2016-01-{:02} {:02}:00:00.000 +0100", 1 + i / 24, i % 24),
                    format!("{:.3}", t),
                    "0.8".to_string(),
                    format!("{}", 5 + i % 7),
                    "1012.5".to_string(),
                    format!("{}", (i * 37) % 360),
                    "10.0".to_string(),
                ]
            })
            .collect();
        RawTable::new(headers, records)
    }

    fn quick_config() -> PipelineConfig {
        PipelineConfig {
            lookback: 4,
            plot_dir: None,
            training: TrainingConfig {
                epochs: 3,
                hidden_size: 4,
                num_layers: 1,
                batch_size: 8,
                ..TrainingConfig::default()
            },
            ..PipelineConfig::default()
        }
    }

    #[test]
    fn test_run_on_table_shapes() {
        let report = run_on_table(&table(54), &quick_config()).unwrap();
        // 50 windows -> 40 train+val -> 32 train, 8 validation; 10 test.
        assert_eq!(report.train_shape, [32, 4, 12]);
        assert_eq!(report.validation_shape, [8, 4, 12]);
        assert_eq!(report.test_shape, [10, 4, 12]);
        assert_eq!(report.actual.len(), 10);
        assert_eq!(report.predicted.len(), 10);
        assert_eq!(report.history.epochs.len(), 3);
        assert!(report.metrics.rmse.is_finite());
    }

    #[test]
    fn test_too_few_rows() {
        let err = run_on_table(&table(5), &quick_config()).unwrap_err();
        assert!(matches!(err, ForecastError::EmptyDataset(_)));
    }

    #[test]
    fn test_scaler_fit_modes_differ() {
        let mut config = quick_config();
        config.training.epochs = 1;
        let training_rows = run_on_table(&table(54), &config).unwrap();
        config.scaler_fit = ScalerFit::FullDataset;
        let full = run_on_table(&table(54), &config).unwrap();
        assert_ne!(training_rows.scaler.means[0], full.scaler.means[0]);
    }
}

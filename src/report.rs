use std::fmt::Write as _;
use std::ops::Range;
use std::path::Path;

use log::info;
use ndarray::Array1;
use plotters::prelude::*;

use crate::error::{ForecastError, Result};
use crate::evaluation::Metrics;
use crate::features::{Measurement, ScalerParams};
use crate::pipeline::PipelineReport;
use crate::training::TrainingHistory;

const PLOT_SIZE: (u32, u32) = (800, 600);

/// Convert standardized temperature errors to °C.
///
/// MAE and RMSE scale with the temperature standard deviation; R² is unitless.
pub fn to_celsius(metrics: &Metrics, scaler: &ScalerParams) -> Metrics {
    let std = scaler.stds[Measurement::Temperature.index()];
    Metrics {
        mae: metrics.mae * std,
        rmse: metrics.rmse * std,
        r2: metrics.r2,
    }
}

/// Human-readable run summary: shapes, columns, training outcome and metrics.
pub fn format_summary(report: &PipelineReport) -> String {
    let mut out = String::new();
    let celsius = to_celsius(&report.metrics, &report.scaler);
    let baseline_celsius = to_celsius(&report.baseline, &report.scaler);

    // Writing to a String cannot fail.
    let _ = writeln!(out, "=== Weather LSTM forecast ===");
    let _ = writeln!(out, "Rows: {}  Features: {}", report.rows, report.feature_names.len());
    let _ = writeln!(out, "Columns: {}", report.feature_names.join(", "));
    let _ = writeln!(out, "Train windows:      {}", format_shape(&report.train_shape));
    let _ = writeln!(out, "Validation windows: {}", format_shape(&report.validation_shape));
    let _ = writeln!(out, "Test windows:       {}", format_shape(&report.test_shape));

    let history = &report.history;
    let _ = write!(out, "Epochs run: {}", history.epochs.len());
    if let Some(best) = history.best_epoch {
        let _ = write!(out, "  best epoch: {}", best);
    }
    if let Some(stopped) = history.stopped_epoch {
        let _ = write!(out, "  stopped early at: {}", stopped);
    }
    if history.restored_best_weights {
        let _ = write!(out, "  (best weights restored)");
    }
    let _ = writeln!(out);

    let _ = writeln!(
        out,
        "Test (standardized): MAE {:.4}  RMSE {:.4}  R² {:.4}",
        report.metrics.mae, report.metrics.rmse, report.metrics.r2
    );
    let _ = writeln!(
        out,
        "Test (°C):           MAE {:.3}  RMSE {:.3}",
        celsius.mae, celsius.rmse
    );
    let _ = writeln!(
        out,
        "Baseline, training mean (°C): MAE {:.3}  RMSE {:.3}  R² {:.4}",
        baseline_celsius.mae, baseline_celsius.rmse, report.baseline.r2
    );
    out
}

pub fn print_summary(report: &PipelineReport) {
    print!("{}", format_summary(report));
}

fn format_shape(shape: &[usize; 3]) -> String {
    format!("({}, {}, {})", shape[0], shape[1], shape[2])
}

/// Axis range covering every finite value, padded by 5% on both sides.
///
/// A single distinct value gets ±1 around it. Returns `None` when there is
/// nothing finite to show.
pub fn padded_range<I: IntoIterator<Item = f64>>(values: I) -> Option<Range<f64>> {
    let (min, max) = values
        .into_iter()
        .filter(|v| v.is_finite())
        .fold(None, |acc: Option<(f64, f64)>, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })?;

    if (max - min).abs() < f64::EPSILON {
        return Some((min - 1.0)..(max + 1.0));
    }
    let pad = (max - min) * 0.05;
    Some((min - pad)..(max + pad))
}

/// Training and validation loss per epoch, as an SVG line chart.
pub fn plot_loss_curves(history: &TrainingHistory, path: &Path) -> Result<()> {
    if history.epochs.is_empty() {
        return Ok(());
    }
    let train: Vec<(usize, f64)> = history.epochs.iter().map(|m| (m.epoch, m.train_loss)).collect();
    let validation: Vec<(usize, f64)> = history
        .epochs
        .iter()
        .filter_map(|m| m.validation_loss.map(|v| (m.epoch, v)))
        .collect();

    let y_range = match padded_range(train.iter().chain(validation.iter()).map(|&(_, v)| v)) {
        Some(range) => range,
        None => return Ok(()),
    };
    let last_epoch = history.epochs.iter().map(|m| m.epoch).max().unwrap_or(0);

    let root = SVGBackend::new(path, PLOT_SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(plot_error)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Loss per epoch", ("sans-serif", 30))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(0..last_epoch + 1, y_range)
        .map_err(plot_error)?;
    chart
        .configure_mesh()
        .x_desc("Epoch")
        .y_desc("MSE (standardized)")
        .draw()
        .map_err(plot_error)?;

    chart
        .draw_series(LineSeries::new(train, &BLUE))
        .map_err(plot_error)?
        .label("train")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &BLUE));
    if !validation.is_empty() {
        chart
            .draw_series(LineSeries::new(validation, &RED))
            .map_err(plot_error)?
            .label("validation")
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &RED));
    }
    chart
        .configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()
        .map_err(plot_error)?;

    root.present().map_err(plot_error)?;
    info!("Wrote loss curves to {}", path.display());
    Ok(())
}

/// Predicted against actual temperature, with the y = x line for reference.
pub fn plot_predictions(actual: &Array1<f64>, predicted: &Array1<f64>, path: &Path) -> Result<()> {
    if actual.len() != predicted.len() {
        return Err(ForecastError::ShapeMismatch(format!(
            "{} actual values but {} predictions",
            actual.len(),
            predicted.len()
        )));
    }
    let range = match padded_range(actual.iter().chain(predicted.iter()).copied()) {
        Some(range) => range,
        None => return Ok(()),
    };

    let root = SVGBackend::new(path, PLOT_SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(plot_error)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Predicted vs actual temperature", ("sans-serif", 30))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(range.clone(), range.clone())
        .map_err(plot_error)?;
    chart
        .configure_mesh()
        .x_desc("Actual (°C)")
        .y_desc("Predicted (°C)")
        .draw()
        .map_err(plot_error)?;

    chart
        .draw_series(
            actual
                .iter()
                .zip(predicted.iter())
                .map(|(&a, &p)| Circle::new((a, p), 2, BLUE.mix(0.5).filled())),
        )
        .map_err(plot_error)?
        .label("test window")
        .legend(|(x, y)| Circle::new((x + 10, y), 3, BLUE.filled()));
    chart
        .draw_series(LineSeries::new(vec![(range.start, range.start), (range.end, range.end)], &RED))
        .map_err(plot_error)?
        .label("y = x")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &RED));
    chart
        .configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()
        .map_err(plot_error)?;

    root.present().map_err(plot_error)?;
    info!("Wrote prediction scatter to {}", path.display());
    Ok(())
}

fn plot_error<E: std::fmt::Display>(err: E) -> ForecastError {
    ForecastError::Plot(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_padded_range() {
        let range = padded_range(vec![0.0, 10.0]).unwrap();
        assert!((range.start + 0.5).abs() < 1e-12);
        assert!((range.end - 10.5).abs() < 1e-12);
    }

    #[test]
    fn test_padded_range_degenerate() {
        assert_eq!(padded_range(vec![3.0, 3.0]), Some(2.0..4.0));
        assert_eq!(padded_range(vec![f64::NAN]), None);
        assert_eq!(padded_range(Vec::new()), None);
    }

    #[test]
    fn test_to_celsius_scales_errors_only() {
        let scaler = ScalerParams {
            means: [10.0, 0.0, 0.0, 0.0, 0.0, 0.0],
            stds: [8.0, 1.0, 1.0, 1.0, 1.0, 1.0],
        };
        let metrics = Metrics { mae: 0.5, rmse: 0.25, r2: 0.9 };
        let celsius = to_celsius(&metrics, &scaler);
        assert_eq!(celsius.mae, 4.0);
        assert_eq!(celsius.rmse, 2.0);
        assert_eq!(celsius.r2, 0.9);
    }

    #[test]
    fn test_empty_inputs_are_noops() {
        let path = Path::new("never-written.svg");
        assert!(plot_loss_curves(&TrainingHistory::default(), path).is_ok());
        assert!(plot_predictions(&Array1::zeros(0), &Array1::zeros(0), path).is_ok());
        assert!(!path.exists());
    }

    #[test]
    fn test_prediction_length_mismatch() {
        let err = plot_predictions(&array![1.0, 2.0], &array![1.0], Path::new("unused.svg")).unwrap_err();
        assert!(matches!(err, ForecastError::ShapeMismatch(_)));
    }
}

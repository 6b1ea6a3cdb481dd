//! # Weather LSTM
//!
//! Hourly temperature forecasting with a stacked LSTM, from raw weather
//! observations to test-set metrics and diagnostic plots.
//!
//! ## Core Components
//!
//! - **Data**: CSV loading into a string table with a diagnostic dump
//! - **Features**: timestamp parsing, gap filling, cyclical time encodings and a fit/apply scaler
//! - **Sequences**: overlapping lookback windows with the next-step temperature as target
//! - **Models**: batched LSTM cells stacked into a network with a linear head, trained with full BPTT
//! - **Training**: mini-batch Adam with gradient clipping and early stopping that restores the best weights
//! - **Evaluation**: MAE, RMSE and R² behind a `Predictor` trait, plus SVG loss and prediction plots
//!
//! ## Quick Start
//!
//! ```no_run
//! use weather_lstm::config::PipelineConfig;
//! use weather_lstm::pipeline;
//! use weather_lstm::report::print_summary;
//!
//! let config = PipelineConfig::default();
//! let report = pipeline::run("weatherHistory.csv", &config)?;
//! print_summary(&report);
//! # Ok::<(), weather_lstm::ForecastError>(())
//! ```

pub mod utils;
pub mod error;
pub mod data;
pub mod features;
pub mod sequence;
pub mod layers;
pub mod models;
pub mod loss;
pub mod optimizers;
pub mod training;
pub mod evaluation;
pub mod report;
pub mod config;
pub mod pipeline;

// Re-export commonly used items
pub use config::{PipelineConfig, ScalerFit};
pub use data::{load_csv, RawTable};
pub use error::{DataFormatError, ForecastError, Result};
pub use evaluation::{evaluate, ConstantPredictor, Metrics, Predictor};
pub use features::{CleanedTable, FeatureBuilder, FeatureColumn, ScalerParams};
pub use models::forecaster::Forecaster;
pub use sequence::{windows, SequenceSet};
pub use training::{create_forecast_trainer, EarlyStoppingConfig, ForecastTrainer, TrainingConfig};

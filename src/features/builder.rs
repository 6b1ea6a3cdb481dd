use chrono::{DateTime, Utc};
use log::{debug, info};
use ndarray::Array2;

use super::impute::fill_gaps;
use super::scaler::{ScalerParams, StandardScaler};
use super::timestamp::{parse_timestamps, TimeFeatures};
use super::{FeatureColumn, Measurement, NUM_FEATURES, NUM_MEASUREMENTS, TIMESTAMP_COLUMN};
use crate::data::RawTable;
use crate::error::{DataFormatError, ForecastError, Result};

/// Tokens read as a missing measurement, besides the empty cell.
const MISSING_TOKENS: [&str; 5] = ["nan", "na", "null", "none", "n/a"];

/// A typed input row: parsed instant plus the six selected measurements,
/// any of which may be missing.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub timestamp: DateTime<Utc>,
    pub values: [Option<f64>; NUM_MEASUREMENTS],
}

/// A gap-free row in physical units, with time features attached.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    pub timestamp: DateTime<Utc>,
    pub measurements: [f64; NUM_MEASUREMENTS],
    pub time: TimeFeatures,
}

impl FeatureRow {
    pub fn measurement(&self, measurement: Measurement) -> f64 {
        self.measurements[measurement.index()]
    }
}

/// A model-ready row: standardized measurements plus unscaled time features.
#[derive(Debug, Clone, PartialEq)]
pub struct CleanedRow {
    pub timestamp: DateTime<Utc>,
    pub measurements: [f64; NUM_MEASUREMENTS],
    pub time: TimeFeatures,
}

impl CleanedRow {
    pub fn measurement(&self, measurement: Measurement) -> f64 {
        self.measurements[measurement.index()]
    }

    /// Value of one feature column.
    pub fn feature(&self, column: FeatureColumn) -> f64 {
        self.to_features()[column.index()]
    }

    /// Feature vector in [`FeatureColumn::ALL`] order.
    pub fn to_features(&self) -> [f64; NUM_FEATURES] {
        let mut features = [0.0; NUM_FEATURES];
        features[..NUM_MEASUREMENTS].copy_from_slice(&self.measurements);
        features[NUM_MEASUREMENTS..].copy_from_slice(&self.time.to_array());
        features
    }
}

/// Output of the feature builder, one row per input row.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CleanedTable {
    rows: Vec<CleanedRow>,
}

impl CleanedTable {
    pub fn new(rows: Vec<CleanedRow>) -> Self {
        CleanedTable { rows }
    }

    pub fn rows(&self) -> &[CleanedRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn num_features(&self) -> usize {
        NUM_FEATURES
    }

    pub fn column(&self, column: FeatureColumn) -> Vec<f64> {
        self.rows.iter().map(|row| row.feature(column)).collect()
    }

    /// Dense `(rows, features)` matrix.
    pub fn to_array(&self) -> Array2<f64> {
        let mut data: Array2<f64> = Array2::zeros((self.rows.len(), NUM_FEATURES));
        for (i, row) in self.rows.iter().enumerate() {
            for (j, value) in row.to_features().iter().enumerate() {
                data[[i, j]] = *value;
            }
        }
        data
    }
}

/// Turns a raw observation table into standardized feature rows.
///
/// Owns the fitted scaler. [`FeatureBuilder::fit`] sets it exactly once per
/// fit call; [`FeatureBuilder::transform`] only ever reads it.
#[derive(Debug, Clone, Default)]
pub struct FeatureBuilder {
    scaler: Option<ScalerParams>,
}

impl FeatureBuilder {
    pub fn new() -> Self {
        FeatureBuilder { scaler: None }
    }

    /// Start from previously fitted parameters.
    pub fn with_scaler(scaler: ScalerParams) -> Self {
        FeatureBuilder {
            scaler: Some(scaler),
        }
    }

    pub fn scaler(&self) -> Option<&ScalerParams> {
        self.scaler.as_ref()
    }

    /// Parse timestamps and select the six measurement columns.
    ///
    /// All-or-nothing: a single bad timestamp or a missing column fails the
    /// whole table.
    pub fn observations(raw: &RawTable) -> std::result::Result<Vec<Observation>, DataFormatError> {
        let ts_index = raw
            .column_index(TIMESTAMP_COLUMN)
            .ok_or_else(|| DataFormatError::MissingColumn(TIMESTAMP_COLUMN.to_string()))?;
        let timestamps = parse_timestamps((0..raw.len()).map(|row| raw.cell(row, ts_index).unwrap_or("")))?;

        let mut indices = [0usize; NUM_MEASUREMENTS];
        for m in Measurement::ALL {
            indices[m.index()] = raw
                .column_index(m.source_name())
                .ok_or_else(|| DataFormatError::MissingColumn(m.source_name().to_string()))?;
        }

        timestamps
            .into_iter()
            .enumerate()
            .map(|(row, timestamp)| {
                let mut values = [None; NUM_MEASUREMENTS];
                for m in Measurement::ALL {
                    values[m.index()] = parse_measurement(raw.cell(row, indices[m.index()]), row, m)?;
                }
                Ok(Observation { timestamp, values })
            })
            .collect()
    }

    /// Everything but scaling: parse, select, derive time features, fill gaps.
    pub fn prepare(raw: &RawTable) -> std::result::Result<Vec<FeatureRow>, DataFormatError> {
        let observations = Self::observations(raw)?;
        if observations.is_empty() {
            return Err(DataFormatError::EmptyTable);
        }

        let mut columns: Vec<Vec<f64>> = Vec::with_capacity(NUM_MEASUREMENTS);
        for m in Measurement::ALL {
            let raw_column: Vec<Option<f64>> = observations.iter().map(|o| o.values[m.index()]).collect();
            let missing = raw_column.iter().filter(|v| v.is_none()).count();
            if missing > 0 {
                debug!("Filling {} missing values in '{}'", missing, m.canonical_name());
            }
            let filled = fill_gaps(&raw_column)
                .ok_or_else(|| DataFormatError::EmptyColumn(m.canonical_name().to_string()))?;
            columns.push(filled);
        }

        Ok(observations
            .iter()
            .enumerate()
            .map(|(i, observation)| {
                let mut measurements = [0.0; NUM_MEASUREMENTS];
                for (j, column) in columns.iter().enumerate() {
                    measurements[j] = column[i];
                }
                FeatureRow {
                    timestamp: observation.timestamp,
                    measurements,
                    time: TimeFeatures::from_timestamp(&observation.timestamp),
                }
            })
            .collect())
    }

    /// Fit the scaler on `rows` and keep the parameters.
    pub fn fit(&mut self, rows: &[FeatureRow]) -> Result<&ScalerParams> {
        let params = StandardScaler::fit(rows)?;
        debug!("Fitted scaler on {} rows: {:?}", rows.len(), params);
        Ok(&*self.scaler.insert(params))
    }

    /// Standardize with the already-fitted parameters.
    pub fn transform(&self, rows: &[FeatureRow]) -> Result<CleanedTable> {
        let params = self.scaler.as_ref().ok_or(ForecastError::ScalerNotFitted)?;
        Ok(CleanedTable::new(params.apply(rows)))
    }

    /// Build the cleaned table from a raw table, fitting the scaler on that
    /// same table.
    pub fn fit_transform(&mut self, raw: &RawTable) -> Result<CleanedTable> {
        let rows = Self::prepare(raw)?;
        self.fit(&rows)?;
        let table = self.transform(&rows)?;
        info!("Built {} feature rows x {} columns", table.len(), table.num_features());
        Ok(table)
    }
}

fn parse_measurement(
    cell: Option<&str>,
    row: usize,
    measurement: Measurement,
) -> std::result::Result<Option<f64>, DataFormatError> {
    let text = cell.unwrap_or("").trim();
    if text.is_empty() || MISSING_TOKENS.contains(&text.to_ascii_lowercase().as_str()) {
        return Ok(None);
    }
    match text.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(Some(value)),
        Ok(_) => Ok(None),
        Err(_) => Err(DataFormatError::InvalidValue {
            row,
            column: measurement.source_name().to_string(),
            value: text.to_string(),
        }),
    }
}

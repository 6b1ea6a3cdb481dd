//! Feature engineering: raw observation table to standardized feature rows.
//!
//! The output column order is fixed and the sequence windower relies on it:
//! six standardized measurements, `hour`, `month`, then the four cyclical
//! encodings. See [`FeatureColumn::ALL`].

/// Table cleaning and the fit/transform entry points.
pub mod builder;
/// Forward/backward gap filling.
pub mod impute;
/// Mean/standard-deviation scaling of the measurement columns.
pub mod scaler;
/// Timestamp parsing and time-derived features.
pub mod timestamp;

pub use builder::{CleanedRow, CleanedTable, FeatureBuilder, FeatureRow, Observation};
pub use scaler::{ScalerParams, StandardScaler};
pub use timestamp::TimeFeatures;

use serde::{Deserialize, Serialize};

/// Header of the timestamp column in the input file.
pub const TIMESTAMP_COLUMN: &str = "Formatted Date";

/// Number of measurement columns selected from the input.
pub const NUM_MEASUREMENTS: usize = 6;

/// Number of feature columns in a cleaned row.
pub const NUM_FEATURES: usize = 12;

/// The six measured quantities the pipeline selects from the input file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Measurement {
    Temperature,
    Humidity,
    WindSpeed,
    Pressure,
    WindBearing,
    Visibility,
}

impl Measurement {
    pub const ALL: [Measurement; NUM_MEASUREMENTS] = [
        Measurement::Temperature,
        Measurement::Humidity,
        Measurement::WindSpeed,
        Measurement::Pressure,
        Measurement::WindBearing,
        Measurement::Visibility,
    ];

    /// Header of this column in the input file.
    pub fn source_name(self) -> &'static str {
        match self {
            Measurement::Temperature => "Temperature (C)",
            Measurement::Humidity => "Humidity",
            Measurement::WindSpeed => "Wind Speed (km/h)",
            Measurement::Pressure => "Pressure (millibars)",
            Measurement::WindBearing => "Wind Bearing (degrees)",
            Measurement::Visibility => "Visibility (km)",
        }
    }

    /// Name after renaming.
    pub fn canonical_name(self) -> &'static str {
        self.column().name()
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn column(self) -> FeatureColumn {
        FeatureColumn::ALL[self.index()]
    }
}

/// One column of a cleaned row, in output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureColumn {
    Temperature,
    Humidity,
    WindSpeed,
    Pressure,
    WindBearing,
    Visibility,
    Hour,
    Month,
    HourSin,
    HourCos,
    MonthSin,
    MonthCos,
}

impl FeatureColumn {
    pub const ALL: [FeatureColumn; NUM_FEATURES] = [
        FeatureColumn::Temperature,
        FeatureColumn::Humidity,
        FeatureColumn::WindSpeed,
        FeatureColumn::Pressure,
        FeatureColumn::WindBearing,
        FeatureColumn::Visibility,
        FeatureColumn::Hour,
        FeatureColumn::Month,
        FeatureColumn::HourSin,
        FeatureColumn::HourCos,
        FeatureColumn::MonthSin,
        FeatureColumn::MonthCos,
    ];

    pub fn name(self) -> &'static str {
        match self {
            FeatureColumn::Temperature => "temperature",
            FeatureColumn::Humidity => "humidity",
            FeatureColumn::WindSpeed => "wind_speed",
            FeatureColumn::Pressure => "pressure",
            FeatureColumn::WindBearing => "wind_bearing",
            FeatureColumn::Visibility => "visibility",
            FeatureColumn::Hour => "hour",
            FeatureColumn::Month => "month",
            FeatureColumn::HourSin => "hour_sin",
            FeatureColumn::HourCos => "hour_cos",
            FeatureColumn::MonthSin => "month_sin",
            FeatureColumn::MonthCos => "month_cos",
        }
    }

    /// Position of this column in a feature vector.
    pub fn index(self) -> usize {
        self as usize
    }
}

/// Canonical names of all feature columns, in output order.
pub fn feature_names() -> Vec<&'static str> {
    FeatureColumn::ALL.iter().map(|c| c.name()).collect()
}

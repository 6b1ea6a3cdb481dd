use std::f64::consts::PI;

use chrono::{DateTime, Datelike, NaiveDateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DataFormatError;

/// Offset-carrying formats, tried in order before falling back to naive forms.
const OFFSET_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f %z", "%Y-%m-%d %H:%M:%S%.f%z"];

/// Naive formats are taken as UTC.
const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// Parse one timestamp and normalize it to UTC.
///
/// Accepts `2006-04-01 00:00:00.000 +0200`, RFC 3339, and naive
/// `YYYY-MM-DD HH:MM:SS[.f]` (assumed UTC).
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();

    for format in OFFSET_FORMATS {
        if let Ok(ts) = DateTime::parse_from_str(value, format) {
            return Some(ts.with_timezone(&Utc));
        }
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.with_timezone(&Utc));
    }
    for format in NAIVE_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(value, format) {
            return Some(ts.and_utc());
        }
    }
    None
}

/// Parse a whole column. The first bad value aborts with its row index.
pub fn parse_timestamps<'a, I>(values: I) -> Result<Vec<DateTime<Utc>>, DataFormatError>
where
    I: IntoIterator<Item = &'a str>,
{
    values
        .into_iter()
        .enumerate()
        .map(|(row, value)| {
            parse_timestamp(value).ok_or_else(|| DataFormatError::UnparseableTimestamp {
                row,
                value: value.to_string(),
            })
        })
        .collect()
}

/// Calendar features derived from a UTC instant.
///
/// Hour and month are kept as raw integers and also encoded on the unit
/// circle so that 23:00 sits next to 00:00 and December next to January.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeFeatures {
    pub hour: u32,
    pub month: u32,
    pub hour_sin: f64,
    pub hour_cos: f64,
    pub month_sin: f64,
    pub month_cos: f64,
}

impl TimeFeatures {
    pub fn from_timestamp(timestamp: &DateTime<Utc>) -> Self {
        let hour = timestamp.hour();
        let month = timestamp.month();
        let (hour_sin, hour_cos) = cyclical(hour as f64, 24.0);
        let (month_sin, month_cos) = cyclical(month as f64, 12.0);

        TimeFeatures {
            hour,
            month,
            hour_sin,
            hour_cos,
            month_sin,
            month_cos,
        }
    }

    /// `[hour, month, hour_sin, hour_cos, month_sin, month_cos]`
    pub fn to_array(&self) -> [f64; 6] {
        [
            self.hour as f64,
            self.month as f64,
            self.hour_sin,
            self.hour_cos,
            self.month_sin,
            self.month_cos,
        ]
    }
}

/// `(sin(2π·value/period), cos(2π·value/period))`
pub fn cyclical(value: f64, period: f64) -> (f64, f64) {
    let angle = 2.0 * PI * value / period;
    (angle.sin(), angle.cos())
}

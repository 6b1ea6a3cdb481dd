use thiserror::Error;

/// Problems with the contents of the input table.
///
/// None of these are recoverable within a run; the operator has to fix the
/// input file and start again.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DataFormatError {
    #[error("row {row}: cannot parse timestamp '{value}'")]
    UnparseableTimestamp { row: usize, value: String },

    #[error("expected column '{0}' is missing")]
    MissingColumn(String),

    #[error("row {row}, column '{column}': '{value}' is not a number")]
    InvalidValue {
        row: usize,
        column: String,
        value: String,
    },

    #[error("column '{0}' has no valid values to fill gaps from")]
    EmptyColumn(String),

    #[error("input table has no rows")]
    EmptyTable,
}

/// Every failure the forecasting pipeline can produce.
#[derive(Debug, Error)]
pub enum ForecastError {
    #[error("data format error: {0}")]
    DataFormat(#[from] DataFormatError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("configuration error: {0}")]
    Config(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error("{0} is empty")]
    EmptyDataset(&'static str),

    #[error("scaler has not been fitted; call fit before transform")]
    ScalerNotFitted,

    #[error("plotting error: {0}")]
    Plot(String),
}

pub type Result<T> = std::result::Result<T, ForecastError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_format_error_messages() {
        let err = DataFormatError::UnparseableTimestamp {
            row: 3,
            value: "yesterday".to_string(),
        };
        assert_eq!(err.to_string(), "row 3: cannot parse timestamp 'yesterday'");

        let err = DataFormatError::MissingColumn("Humidity".to_string());
        assert_eq!(err.to_string(), "expected column 'Humidity' is missing");
    }

    #[test]
    fn test_data_format_error_converts() {
        let err: ForecastError = DataFormatError::EmptyTable.into();
        assert!(matches!(err, ForecastError::DataFormat(DataFormatError::EmptyTable)));
    }
}

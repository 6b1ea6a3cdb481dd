use std::io::Read;
use std::path::Path;

use log::{debug, info};

use super::RawTable;
use crate::error::Result;

/// Load a CSV file with a header row into a [`RawTable`].
pub fn load_csv<P: AsRef<Path>>(path: P) -> Result<RawTable> {
    let path = path.as_ref();
    info!("Loading observations from {}", path.display());
    let reader = csv::Reader::from_path(path)?;
    let table = read_records(reader)?;
    info!("Loaded {} rows with {} columns", table.len(), table.headers().len());
    Ok(table)
}

/// Read CSV from any reader. Used by [`load_csv`] and by tests with in-memory input.
pub fn read_csv<R: Read>(input: R) -> Result<RawTable> {
    read_records(csv::Reader::from_reader(input))
}

fn read_records<R: Read>(mut reader: csv::Reader<R>) -> Result<RawTable> {
    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();
    debug!("CSV headers: {:?}", headers);

    let mut records = Vec::new();
    for result in reader.records() {
        let record = result?;
        records.push(record.iter().map(|field| field.to_string()).collect());
    }

    Ok(RawTable::new(headers, records))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ForecastError;

    #[test]
    fn test_read_csv_keeps_all_columns() {
        let input = "Formatted Date,Summary,Temperature (C)\n\
                     2006-04-01 00:00:00.000 +0200,\"Partly Cloudy, Windy\",9.47\n";
        let table = read_csv(input.as_bytes()).unwrap();

        assert_eq!(table.headers().len(), 3);
        assert_eq!(table.len(), 1);
        assert_eq!(table.cell(0, 1), Some("Partly Cloudy, Windy"));
    }

    #[test]
    fn test_ragged_record_is_rejected() {
        let input = "a,b\n1,2\n3\n";
        let result = read_csv(input.as_bytes());
        assert!(matches!(result, Err(ForecastError::Csv(_))));
    }

    #[test]
    fn test_load_missing_file() {
        let result = load_csv("/definitely/not/here.csv");
        assert!(result.is_err());
    }
}

/// CSV ingestion.
pub mod loader;

pub use loader::{load_csv, read_csv};

use std::fmt::Write;

/// Number of records shown by [`RawTable::describe`].
const DESCRIBE_ROWS: usize = 5;

/// Tabular input exactly as read from disk: a header row and string cells.
///
/// Nothing is parsed or validated here; that is the feature builder's job.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    headers: Vec<String>,
    records: Vec<Vec<String>>,
}

impl RawTable {
    pub fn new(headers: Vec<String>, records: Vec<Vec<String>>) -> Self {
        RawTable { headers, records }
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn records(&self) -> &[Vec<String>] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Position of a column by exact header name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Cell at `row`, `column`. Short records yield `None`.
    pub fn cell(&self, row: usize, column: usize) -> Option<&str> {
        self.records
            .get(row)
            .and_then(|record| record.get(column))
            .map(String::as_str)
    }

    /// Structural dump printed on the failure path: headers, row count, and
    /// the first few records.
    pub fn describe(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "rows: {}, columns: {}", self.len(), self.headers.len());
        let _ = writeln!(out, "headers:");
        for (i, header) in self.headers.iter().enumerate() {
            let _ = writeln!(out, "  [{}] {}", i, header);
        }
        let shown = self.records.len().min(DESCRIBE_ROWS);
        let _ = writeln!(out, "first {} rows:", shown);
        for record in self.records.iter().take(shown) {
            let _ = writeln!(out, "  {}", record.join(" | "));
        }
        out
    }
}

use std::io::Cursor;

use calamine::{open_workbook_auto_from_rs, Data, DataType, Reader};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TableError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Could not read workbook: {0}")]
    Workbook(String),
    #[error("Upload has no header row")]
    NoHeader,
    #[error("Invalid date in column '{column}': {value}")]
    InvalidDate { column: String, value: String },
    #[error("Invalid number in column '{column}': {value}")]
    InvalidNumber { column: String, value: String },
}

/// An uploaded sheet: a header row plus string cells.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { headers, rows }
    }

    /// Parse an upload: `.csv` names are read as CSV, anything else as a workbook.
    pub fn from_upload(data: &[u8], file_name: &str) -> Result<Self, TableError> {
        if file_name.to_lowercase().ends_with(".csv") {
            Self::from_csv(data)
        } else {
            Self::from_workbook(data)
        }
    }

    pub fn from_csv(data: &[u8]) -> Result<Self, TableError> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(data);

        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        if headers.iter().all(|h| h.is_empty()) {
            return Err(TableError::NoHeader);
        }

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            if record.iter().all(|c| c.is_empty()) {
                continue;
            }
            rows.push(record.iter().map(str::to_string).collect());
        }
        Ok(Self { headers, rows })
    }

    /// First worksheet of an XLSX/XLS/ODS workbook; its first row is the header.
    pub fn from_workbook(data: &[u8]) -> Result<Self, TableError> {
        let mut workbook = open_workbook_auto_from_rs(Cursor::new(data.to_vec()))
            .map_err(|e| TableError::Workbook(e.to_string()))?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or(TableError::NoHeader)?
            .map_err(|e| TableError::Workbook(e.to_string()))?;

        let mut rows = range.rows();
        let headers: Vec<String> = match rows.next() {
            Some(row) => row.iter().map(|c| cell_text(c).trim().to_string()).collect(),
            None => return Err(TableError::NoHeader),
        };

        let rows = rows
            .filter(|row| row.iter().any(|c| !c.is_empty()))
            .map(|row| row.iter().map(|c| cell_text(c).trim().to_string()).collect())
            .collect();
        Ok(Self { headers, rows })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// First column, in header order, whose lowercased name is one of `names`.
    pub fn find_column(&self, names: &[&str]) -> Option<usize> {
        self.headers
            .iter()
            .position(|h| names.contains(&h.to_lowercase().as_str()))
    }

    /// Column whose header is exactly `name`.
    pub fn exact_column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn header(&self, col: usize) -> &str {
        self.headers.get(col).map_or("", String::as_str)
    }

    /// Cell text; short rows read as empty cells.
    pub fn cell(&self, row: usize, col: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .map_or("", String::as_str)
    }

    /// Parse a cell as a timestamp; `Ok(None)` for an empty cell.
    pub fn datetime(&self, row: usize, col: usize) -> Result<Option<NaiveDateTime>, TableError> {
        let value = self.cell(row, col);
        if value.is_empty() {
            return Ok(None);
        }
        parse_datetime(value).map(Some).ok_or_else(|| TableError::InvalidDate {
            column: self.header(col).to_string(),
            value: value.to_string(),
        })
    }

    /// Parse a cell as a number; `Ok(None)` for an empty cell.
    pub fn number(&self, row: usize, col: usize) -> Result<Option<f64>, TableError> {
        let value = self.cell(row, col);
        if value.is_empty() {
            return Ok(None);
        }
        value
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .map(Some)
            .ok_or_else(|| TableError::InvalidNumber {
                column: self.header(col).to_string(),
                value: value.to_string(),
            })
    }
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::DateTime(_) | Data::DateTimeIso(_) => cell
            .as_datetime()
            .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| cell.to_string()),
        other => other.to_string(),
    }
}

/// Accepts ISO timestamps (with or without offset) and the common date layouts.
pub fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    for fmt in &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    for fmt in &[
        "%Y-%m-%d", "%m/%d/%Y", "%d/%m/%Y", "%Y/%m/%d", "%m-%d-%Y", "%d-%m-%Y",
    ] {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return date.and_hms_opt(0, 0, 0);
        }
    }
    None
}

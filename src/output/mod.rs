//! Table writers
//!
//! Canonical tables are written as CSV, with a fixed column order per metric
//! family, or as a JSON array of row objects.

use chrono::{DateTime, SecondsFormat};
use chrono_tz::Tz;
use serde::Serialize;
use std::path::Path;
use std::str::FromStr;

use crate::table::{Table, TableRecord};
use crate::{FuelMixRecord, ForecastRecord, HourlyLoadRecord, LmpRecord, LoadRecord};

pub mod csv;
pub mod json;

pub use self::csv::CsvTableWriter;

/// Output writer errors
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    /// IO error
    #[error("IO error: {0}")]
    IoError(String),

    /// CSV write error
    #[error("CSV error: {0}")]
    CsvError(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    SerializationError(String),

    /// Row has a different number of values than the header
    #[error("row has {found} values, header has {expected}")]
    ColumnMismatch {
        /// Header width
        expected: usize,
        /// Row width
        found: usize,
    },
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// File format for written tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Comma-separated values with a header row
    #[default]
    Csv,
    /// JSON array of row objects
    Json,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(OutputFormat::Csv),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Invalid output format: {s}. Valid options: csv, json")),
        }
    }
}

/// A record with a flat CSV rendering
pub trait CsvRecord: TableRecord + Serialize {
    /// Header for a table of `rows`. Columns that depend on the data, such as
    /// fuel types, appear in first-seen order.
    fn columns(rows: &[Self]) -> Vec<String>;

    /// This row's values in `columns` order; absent values are empty
    fn values(&self, columns: &[String]) -> Vec<String>;
}

/// Render a timestamp as RFC 3339 with its offset
pub fn format_timestamp(instant: &DateTime<Tz>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Secs, false)
}

fn fixed_columns(names: &[&str]) -> Vec<String> {
    names.iter().map(|c| c.to_string()).collect()
}

impl CsvRecord for LoadRecord {
    fn columns(_rows: &[Self]) -> Vec<String> {
        fixed_columns(&["start", "end", "load"])
    }

    fn values(&self, _columns: &[String]) -> Vec<String> {
        vec![
            format_timestamp(&self.interval.start),
            format_timestamp(&self.interval.end),
            self.load.to_string(),
        ]
    }
}

impl CsvRecord for ForecastRecord {
    fn columns(_rows: &[Self]) -> Vec<String> {
        fixed_columns(&["start", "end", "forecast"])
    }

    fn values(&self, _columns: &[String]) -> Vec<String> {
        vec![
            format_timestamp(&self.interval.start),
            format_timestamp(&self.interval.end),
            self.forecast.to_string(),
        ]
    }
}

impl CsvRecord for HourlyLoadRecord {
    fn columns(_rows: &[Self]) -> Vec<String> {
        fixed_columns(&["start", "end", "forecast", "load"])
    }

    fn values(&self, _columns: &[String]) -> Vec<String> {
        vec![
            format_timestamp(&self.interval.start),
            format_timestamp(&self.interval.end),
            self.forecast.to_string(),
            self.load.to_string(),
        ]
    }
}

impl CsvRecord for FuelMixRecord {
    fn columns(rows: &[Self]) -> Vec<String> {
        let mut columns = fixed_columns(&["start", "end"]);
        for row in rows {
            for fuel in row.fuels.keys() {
                if !columns[2..].contains(fuel) {
                    columns.push(fuel.clone());
                }
            }
        }
        columns.push("other".to_string());
        columns.push("total".to_string());
        columns
    }

    fn values(&self, columns: &[String]) -> Vec<String> {
        columns
            .iter()
            .map(|column| match column.as_str() {
                "start" => format_timestamp(&self.interval.start),
                "end" => format_timestamp(&self.interval.end),
                "other" => self.other.map(|v| v.to_string()).unwrap_or_default(),
                "total" => self.total.to_string(),
                fuel => self
                    .fuels
                    .get(fuel)
                    .map(|v| v.to_string())
                    .unwrap_or_default(),
            })
            .collect()
    }
}

impl CsvRecord for LmpRecord {
    fn columns(_rows: &[Self]) -> Vec<String> {
        fixed_columns(&["start", "end", "node", "lmp", "mlc", "mcc"])
    }

    fn values(&self, _columns: &[String]) -> Vec<String> {
        vec![
            format_timestamp(&self.interval.start),
            format_timestamp(&self.interval.end),
            self.node.to_string(),
            self.lmp.to_string(),
            self.mlc.to_string(),
            self.mcc.to_string(),
        ]
    }
}

/// Write `table` in `format` to any writer, returning the number of rows written
pub fn write_table<R: CsvRecord, W: std::io::Write>(
    table: &Table<R>,
    format: OutputFormat,
    writer: W,
) -> OutputResult<u64> {
    match format {
        OutputFormat::Csv => csv::write_csv(table, writer),
        OutputFormat::Json => json::write_json(table, writer),
    }
}

/// Write `table` in `format` to a file, creating parent directories
pub fn write_table_file<R: CsvRecord, P: AsRef<Path>>(
    table: &Table<R>,
    format: OutputFormat,
    path: P,
) -> OutputResult<u64> {
    match format {
        OutputFormat::Csv => csv::write_csv_file(table, path),
        OutputFormat::Json => json::write_json_file(table, path),
    }
}

pub(crate) fn create_output_file(path: &Path) -> OutputResult<std::fs::File> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .map_err(|e| OutputError::IoError(format!("Failed to create directory: {e}")))?;
        }
    }
    std::fs::File::create(path)
        .map_err(|e| OutputError::IoError(format!("Failed to create file: {e}")))
}

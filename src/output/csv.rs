//! CSV table writer

use csv::Writer;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::{debug, info};

use super::{create_output_file, CsvRecord, OutputError, OutputResult};
use crate::table::Table;

const DEFAULT_BUFFER_SIZE: usize = 8192; // 8KB buffer

/// Streams rows under a fixed header
pub struct CsvTableWriter<W: Write> {
    writer: Writer<W>,
    width: usize,
    rows_written: u64,
}

impl<W: Write> CsvTableWriter<W> {
    /// Create a writer and emit the header row
    pub fn new(inner: W, columns: &[String]) -> OutputResult<Self> {
        let mut writer = Writer::from_writer(inner);
        writer
            .write_record(columns)
            .map_err(|e| OutputError::CsvError(format!("Failed to write header: {e}")))?;

        Ok(Self {
            writer,
            width: columns.len(),
            rows_written: 0,
        })
    }

    /// Write one row of values
    pub fn write_row(&mut self, values: &[String]) -> OutputResult<()> {
        if values.len() != self.width {
            return Err(OutputError::ColumnMismatch {
                expected: self.width,
                found: values.len(),
            });
        }
        self.writer
            .write_record(values)
            .map_err(|e| OutputError::CsvError(format!("Failed to write row: {e}")))?;

        self.rows_written += 1;
        Ok(())
    }

    /// Number of data rows written so far
    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    /// Flush and return the inner writer
    pub fn finish(mut self) -> OutputResult<W> {
        self.writer
            .flush()
            .map_err(|e| OutputError::IoError(format!("Failed to flush: {e}")))?;
        debug!("CSV writer finished: {} rows written", self.rows_written);
        self.writer
            .into_inner()
            .map_err(|e| OutputError::IoError(format!("Failed to get inner writer: {e}")))
    }
}

/// Write `table` as CSV, returning the number of data rows
pub fn write_csv<R: CsvRecord, W: Write>(table: &Table<R>, inner: W) -> OutputResult<u64> {
    let columns = R::columns(table.rows());
    let mut writer = CsvTableWriter::new(inner, &columns)?;
    for row in table {
        writer.write_row(&row.values(&columns))?;
    }
    let written = writer.rows_written();
    writer.finish()?;
    Ok(written)
}

/// Write `table` as CSV to `path`, creating parent directories
pub fn write_csv_file<R: CsvRecord, P: AsRef<Path>>(
    table: &Table<R>,
    path: P,
) -> OutputResult<u64> {
    let path = path.as_ref();
    info!("Writing CSV: path={}", path.display());

    let file = create_output_file(path)?;
    let columns = R::columns(table.rows());
    let mut writer =
        CsvTableWriter::new(BufWriter::with_capacity(DEFAULT_BUFFER_SIZE, file), &columns)?;
    for row in table {
        writer.write_row(&row.values(&columns))?;
    }
    let written = writer.rows_written();

    let buf_writer = writer.finish()?;
    let file: File = buf_writer
        .into_inner()
        .map_err(|e| OutputError::IoError(format!("Failed to get file handle: {e}")))?;
    file.sync_all()
        .map_err(|e| OutputError::IoError(format!("Failed to sync file: {e}")))?;

    info!("CSV written: {} rows to {}", written, path.display());
    Ok(written)
}

//! JSON table writer

use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::info;

use super::{create_output_file, CsvRecord, OutputError, OutputResult};
use crate::table::Table;

/// Write `table` as a pretty-printed JSON array of row objects
pub fn write_json<R: CsvRecord, W: Write>(table: &Table<R>, mut inner: W) -> OutputResult<u64> {
    serde_json::to_writer_pretty(&mut inner, table.rows())
        .map_err(|e| OutputError::SerializationError(e.to_string()))?;
    writeln!(inner).map_err(|e| OutputError::IoError(e.to_string()))?;
    inner
        .flush()
        .map_err(|e| OutputError::IoError(format!("Failed to flush: {e}")))?;
    Ok(table.len() as u64)
}

/// Write `table` as JSON to `path`, creating parent directories
pub fn write_json_file<R: CsvRecord, P: AsRef<Path>>(
    table: &Table<R>,
    path: P,
) -> OutputResult<u64> {
    let path = path.as_ref();
    let file = create_output_file(path)?;
    let written = write_json(table, BufWriter::new(file))?;
    info!("JSON written: {} rows to {}", written, path.display());
    Ok(written)
}

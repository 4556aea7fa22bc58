//! Spreadsheet grid
//!
//! Report workbooks (`.xls` and `.xlsx`) are read with `calamine` into a
//! [`Sheet`]: a dense grid of [`Cell`]s indexed by absolute sheet position, so
//! header rows can be located by content rather than by fixed offsets.

use calamine::{open_workbook_auto_from_rs, Data, DataType, Reader};
use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use std::io::Cursor;

use super::{invalid, parse_decimal, parse_timestamp_text, round_metric, ParseError, ParseResult};
use crate::timezone::Timestamp;

/// One spreadsheet cell
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    /// Blank
    Empty,
    /// Text
    Text(String),
    /// Any numeric value
    Number(f64),
    /// Date or date-time
    DateTime(NaiveDateTime),
    /// Boolean
    Bool(bool),
}

impl Cell {
    /// Whether the cell is blank or whitespace
    pub fn is_empty(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Trimmed text content, for text cells
    pub fn text(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s.trim()),
            _ => None,
        }
    }

    /// Whether the cell is text equal to `value` after trimming
    pub fn is_text(&self, value: &str) -> bool {
        self.text() == Some(value)
    }

    /// Numeric value rounded to 2 decimals
    pub fn decimal(&self, field: &str) -> ParseResult<Decimal> {
        match self {
            Cell::Number(n) => Decimal::try_from(*n)
                .map(round_metric)
                .map_err(|_| invalid(field, n)),
            Cell::Text(s) => parse_decimal(s, field),
            Cell::Empty => Err(ParseError::MissingField(field.to_string())),
            other => Err(invalid(field, format!("{other:?}"))),
        }
    }

    /// Whole-number value, such as an hour-ending
    pub fn integer(&self, field: &str) -> ParseResult<i64> {
        match self {
            Cell::Number(n) if n.fract() == 0.0 => Ok(*n as i64),
            Cell::Text(s) => s.trim().parse().map_err(|_| invalid(field, s)),
            Cell::Empty => Err(ParseError::MissingField(field.to_string())),
            other => Err(invalid(field, format!("{other:?}"))),
        }
    }

    /// Timestamp value: a date cell or text in a known layout
    pub fn timestamp(&self, field: &str) -> ParseResult<Timestamp> {
        match self {
            Cell::DateTime(dt) => Ok(Timestamp::Naive(*dt)),
            Cell::Text(s) => parse_timestamp_text(s, field),
            Cell::Empty => Err(ParseError::MissingField(field.to_string())),
            other => Err(invalid(field, format!("{other:?}"))),
        }
    }

    /// Calendar date: a date cell or `YYYY-MM-DD` / `MM/DD/YYYY` text
    pub fn date(&self, field: &str) -> ParseResult<NaiveDate> {
        match self {
            Cell::DateTime(dt) => Ok(dt.date()),
            Cell::Text(s) => {
                let s = s.trim();
                NaiveDate::parse_from_str(s, "%Y-%m-%d")
                    .or_else(|_| NaiveDate::parse_from_str(s, "%m/%d/%Y"))
                    .or_else(|_| {
                        parse_timestamp_text(s, field).and_then(|t| match t {
                            Timestamp::Naive(n) => Ok(n.date()),
                            Timestamp::Aware(a) => Ok(a.date_naive()),
                        })
                    })
                    .map_err(|_| invalid(field, s))
            }
            Cell::Empty => Err(ParseError::MissingField(field.to_string())),
            other => Err(invalid(field, format!("{other:?}"))),
        }
    }
}

impl From<&Data> for Cell {
    fn from(data: &Data) -> Self {
        match data {
            Data::Empty | Data::Error(_) => Cell::Empty,
            Data::String(s) => Cell::Text(s.clone()),
            Data::Int(i) => Cell::Number(*i as f64),
            Data::Float(f) => Cell::Number(*f),
            Data::Bool(b) => Cell::Bool(*b),
            Data::DateTime(_) | Data::DateTimeIso(_) => data
                .as_datetime()
                .map(Cell::DateTime)
                .unwrap_or_else(|| Cell::Text(data.to_string())),
            Data::DurationIso(s) => Cell::Text(s.clone()),
        }
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        if value.is_empty() {
            Cell::Empty
        } else {
            Cell::Text(value.to_string())
        }
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Cell::Number(value)
    }
}

impl From<NaiveDateTime> for Cell {
    fn from(value: NaiveDateTime) -> Self {
        Cell::DateTime(value)
    }
}

static EMPTY: Cell = Cell::Empty;

/// Dense grid of cells
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sheet {
    rows: Vec<Vec<Cell>>,
}

impl Sheet {
    /// Build from rows
    pub fn from_rows(rows: Vec<Vec<Cell>>) -> Self {
        Self { rows }
    }

    /// Open a workbook and read one sheet, or the first sheet when `name` is `None`.
    ///
    /// Row and column indices match the sheet: leading blank rows and columns
    /// are kept as empty cells.
    pub fn from_workbook(bytes: &[u8], name: Option<&str>) -> ParseResult<Self> {
        let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))
            .map_err(|e| ParseError::Spreadsheet(e.to_string()))?;

        let range = match name {
            Some(name) => workbook
                .worksheet_range(name)
                .map_err(|e| ParseError::Spreadsheet(format!("sheet {name:?}: {e}")))?,
            None => workbook
                .worksheet_range_at(0)
                .ok_or_else(|| ParseError::Spreadsheet("workbook has no sheets".to_string()))?
                .map_err(|e| ParseError::Spreadsheet(e.to_string()))?,
        };

        let (row_offset, col_offset) = range
            .start()
            .map(|(r, c)| (r as usize, c as usize))
            .unwrap_or((0, 0));

        let mut rows: Vec<Vec<Cell>> = vec![Vec::new(); row_offset];
        for source in range.rows() {
            let mut row = vec![Cell::Empty; col_offset];
            row.extend(source.iter().map(Cell::from));
            rows.push(row);
        }

        Ok(Self { rows })
    }

    /// Number of rows
    pub fn height(&self) -> usize {
        self.rows.len()
    }

    /// Row by index, empty past the end
    pub fn row(&self, index: usize) -> &[Cell] {
        self.rows.get(index).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Cell by position, empty past the edges
    pub fn cell(&self, row: usize, col: usize) -> &Cell {
        self.row(row).get(col).unwrap_or(&EMPTY)
    }

    /// First row containing a text cell equal to every one of `labels`
    pub fn find_header_row(&self, labels: &[&str]) -> Option<usize> {
        self.rows
            .iter()
            .position(|row| labels.iter().all(|label| row.iter().any(|c| c.is_text(label))))
    }

    /// Column of the text cell equal to `label` in `row`
    pub fn column_of(&self, row: usize, label: &str) -> ParseResult<usize> {
        self.row(row)
            .iter()
            .position(|c| c.is_text(label))
            .ok_or_else(|| ParseError::MissingField(label.to_string()))
    }

    /// First text cell starting with `prefix`, anywhere in the sheet
    pub fn find_text_with_prefix(&self, prefix: &str) -> Option<&str> {
        self.rows
            .iter()
            .flatten()
            .filter_map(Cell::text)
            .find(|text| text.starts_with(prefix))
    }
}

//! Canonical tables
//!
//! Every operation returns a [`Table`]: rows sorted ascending by `(start[, node])`
//! with at most one row per natural key. History retrievals wrap the table in a
//! [`Retrieval`] that also carries non-fatal gaps as [`RetrievalWarning`]s.

use chrono::NaiveDate;
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;

use crate::{
    FuelMixRecord, ForecastRecord, HourlyLoadRecord, Hub, LmpRecord, LoadRecord, TimeInterval,
};

/// A row of a canonical table
pub trait TableRecord: Clone + Send + 'static {
    /// Interval the row describes
    fn interval(&self) -> &TimeInterval;

    /// Pricing node, for locational records
    fn node(&self) -> Option<Hub> {
        None
    }

    /// Ordering of the metric columns, used to break ties after the key columns
    fn cmp_values(&self, _other: &Self) -> Ordering {
        Ordering::Equal
    }

    /// Natural key ordering: `(start, node)`
    fn cmp_key(&self, other: &Self) -> Ordering {
        self.interval()
            .start
            .cmp(&other.interval().start)
            .then_with(|| self.node().cmp(&other.node()))
    }

    /// Full column ordering
    fn cmp_row(&self, other: &Self) -> Ordering {
        self.cmp_key(other)
            .then_with(|| self.interval().end.cmp(&other.interval().end))
            .then_with(|| self.cmp_values(other))
    }
}

impl TableRecord for LoadRecord {
    fn interval(&self) -> &TimeInterval {
        &self.interval
    }

    fn cmp_values(&self, other: &Self) -> Ordering {
        self.load.cmp(&other.load)
    }
}

impl TableRecord for ForecastRecord {
    fn interval(&self) -> &TimeInterval {
        &self.interval
    }

    fn cmp_values(&self, other: &Self) -> Ordering {
        self.forecast.cmp(&other.forecast)
    }
}

impl TableRecord for HourlyLoadRecord {
    fn interval(&self) -> &TimeInterval {
        &self.interval
    }

    fn cmp_values(&self, other: &Self) -> Ordering {
        self.forecast
            .cmp(&other.forecast)
            .then_with(|| self.load.cmp(&other.load))
    }
}

impl TableRecord for FuelMixRecord {
    fn interval(&self) -> &TimeInterval {
        &self.interval
    }

    fn cmp_values(&self, other: &Self) -> Ordering {
        self.fuels
            .values()
            .cmp(other.fuels.values())
            .then_with(|| self.other.cmp(&other.other))
            .then_with(|| self.total.cmp(&other.total))
    }
}

impl TableRecord for LmpRecord {
    fn interval(&self) -> &TimeInterval {
        &self.interval
    }

    fn node(&self) -> Option<Hub> {
        Some(self.node)
    }

    fn cmp_values(&self, other: &Self) -> Ordering {
        self.lmp
            .cmp(&other.lmp)
            .then_with(|| self.mlc.cmp(&other.mlc))
            .then_with(|| self.mcc.cmp(&other.mcc))
    }
}

/// Sorted, key-unique sequence of records
#[derive(Debug, Clone, PartialEq)]
pub struct Table<R> {
    rows: Vec<R>,
}

impl<R> Default for Table<R> {
    fn default() -> Self {
        Self { rows: Vec::new() }
    }
}

impl<R: TableRecord> Table<R> {
    /// Build a table from rows in any order.
    ///
    /// Rows are sorted by all columns; rows sharing a natural key keep only the
    /// first in that order.
    pub fn new(mut rows: Vec<R>) -> Self {
        rows.sort_by(|a, b| a.cmp_row(b));
        rows.dedup_by(|later, earlier| later.cmp_key(earlier) == Ordering::Equal);
        Self { rows }
    }

    /// Concatenate tables and restore ordering
    pub fn concat(tables: impl IntoIterator<Item = Table<R>>) -> Self {
        Self::new(tables.into_iter().flat_map(|t| t.rows).collect())
    }

    /// Rows in order
    pub fn rows(&self) -> &[R] {
        &self.rows
    }

    /// Consume into rows
    pub fn into_rows(self) -> Vec<R> {
        self.rows
    }

    /// Iterate rows
    pub fn iter(&self) -> std::slice::Iter<'_, R> {
        self.rows.iter()
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// First row
    pub fn first(&self) -> Option<&R> {
        self.rows.first()
    }

    /// Last row
    pub fn last(&self) -> Option<&R> {
        self.rows.last()
    }

    /// Keep only rows matching the predicate
    pub fn filter(self, mut keep: impl FnMut(&R) -> bool) -> Self {
        Self {
            rows: self.rows.into_iter().filter(|r| keep(r)).collect(),
        }
    }

    /// Keep only the last row
    pub fn into_last(self) -> Self {
        Self {
            rows: self.rows.into_iter().last().into_iter().collect(),
        }
    }

    /// Keep rows whose market date is one of `dates`
    pub fn restrict_to_dates(self, dates: &BTreeSet<NaiveDate>) -> Self {
        self.filter(|r| dates.contains(&r.interval().market_date()))
    }

    /// Project every row onto another record type
    pub fn map<S: TableRecord>(self, f: impl FnMut(&R) -> S) -> Table<S> {
        Table::new(self.rows.iter().map(f).collect())
    }
}

impl<'a, R> IntoIterator for &'a Table<R> {
    type Item = &'a R;
    type IntoIter = std::slice::Iter<'a, R>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

/// A non-fatal gap in a history retrieval
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetrievalWarning {
    /// No report exists under either candidate name for these market dates
    MissingDates(Vec<NaiveDate>),
    /// A report was located but these files were not in its payload
    UnretrievedFiles(Vec<String>),
}

impl fmt::Display for RetrievalWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetrievalWarning::MissingDates(dates) => {
                let dates: Vec<String> = dates.iter().map(|d| d.to_string()).collect();
                write!(f, "No report found for dates: {}", dates.join(", "))
            }
            RetrievalWarning::UnretrievedFiles(files) => {
                write!(f, "Files not retrieved: {}", files.join(", "))
            }
        }
    }
}

/// A table plus the gaps encountered while building it
#[derive(Debug, Clone, PartialEq)]
pub struct Retrieval<R> {
    /// Retrieved rows
    pub table: Table<R>,
    /// Non-fatal gaps
    pub warnings: Vec<RetrievalWarning>,
}

impl<R: TableRecord> Retrieval<R> {
    /// Retrieval without gaps
    pub fn complete(table: Table<R>) -> Self {
        Self {
            table,
            warnings: Vec::new(),
        }
    }

    /// Whether any gap was recorded
    pub fn is_partial(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Apply a transformation to the table, keeping the warnings
    pub fn map_table<S>(self, f: impl FnOnce(Table<R>) -> Table<S>) -> Retrieval<S> {
        Retrieval {
            table: f(self.table),
            warnings: self.warnings,
        }
    }
}

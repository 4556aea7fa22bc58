//! Payload and report parsers
//!
//! One pure function per (report kind, source) pair turns raw bytes into a
//! canonical [`Table`](crate::table::Table). Shared contract:
//!
//! - timestamps are localized through [`MarketTimezone`]
//! - metric values are rounded to 2 decimal places
//! - only the eight pricing hubs survive LMP parsing
//! - output is sorted by `(start[, node])`
//!
//! | Source | Parser |
//! |---|---|
//! | live load JSON | [`load::parse_load_api`] |
//! | live forecast JSON | [`load::parse_forecast_api`] |
//! | `df_al.xls` | [`load::parse_forecast_and_load_report`] |
//! | live fuel-mix JSON | [`fuel_mix::parse_fuel_mix_api`] |
//! | `sr_gfm.xlsx` | [`fuel_mix::parse_fuel_mix_report`] |
//! | live real-time LMP CSV | [`lmp::parse_realtime_lmp_api`] |
//! | `5min_exante_lmp.xlsx` | [`lmp::parse_realtime_lmp_report`] |
//! | `da_ex*_lmp.csv` | [`lmp::parse_dayahead_lmp_report`] |

use chrono::{DateTime, NaiveDateTime};
use rust_decimal::Decimal;
use std::str::FromStr;

use crate::timezone::{MarketTimezone, Timestamp, TimezoneError};

pub mod fuel_mix;
pub mod lmp;
pub mod load;
pub mod refid;
pub mod sheet;

pub use refid::parse_reference_id;
pub use sheet::{Cell, Sheet};

/// Parse errors
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// Live-API reference id does not follow `DD-Mon-YYYY - Interval HH:MM EST`
    #[error("malformed reference id: {0:?}")]
    MalformedReferenceId(String),

    /// JSON payload could not be decoded
    #[error("invalid JSON payload: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV payload could not be decoded
    #[error("invalid CSV payload: {0}")]
    Csv(#[from] csv::Error),

    /// Spreadsheet could not be opened or lacks the expected sheet
    #[error("invalid spreadsheet: {0}")]
    Spreadsheet(String),

    /// Payload is not UTF-8 text
    #[error("payload is not valid UTF-8: {0}")]
    Encoding(#[from] std::str::Utf8Error),

    /// Required field, column or header is absent
    #[error("missing field: {0}")]
    MissingField(String),

    /// Field is present but cannot be interpreted
    #[error("invalid value for {field}: {value:?}")]
    InvalidValue {
        /// Field name
        field: String,
        /// Raw value
        value: String,
    },

    /// Timestamp does not map into the market timezone
    #[error("invalid timestamp: {0}")]
    Timestamp(#[from] TimezoneError),

    /// An entry's own timestamp disagrees with the payload's interval
    #[error("entry timestamp {found} does not match payload interval {expected}")]
    InconsistentInterval {
        /// Interval start from the reference id
        expected: String,
        /// Timestamp carried by the entry
        found: String,
    },
}

/// Result type for parsers
pub type ParseResult<T> = Result<T, ParseError>;

/// Round a metric to 2 decimal places, ties to even
pub fn round_metric(value: Decimal) -> Decimal {
    value.round_dp(2)
}

pub(crate) fn invalid(field: &str, value: impl ToString) -> ParseError {
    ParseError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
    }
}

/// Parse a decimal from text, accepting thousands separators and exponents.
pub fn parse_decimal(text: &str, field: &str) -> ParseResult<Decimal> {
    let cleaned: String = text.trim().chars().filter(|c| *c != ',').collect();
    if cleaned.is_empty() {
        return Err(ParseError::MissingField(field.to_string()));
    }
    Decimal::from_str(&cleaned)
        .or_else(|_| Decimal::from_scientific(&cleaned))
        .map(round_metric)
        .map_err(|_| invalid(field, text))
}

/// Parse a decimal from a JSON number or numeric string
pub fn decimal_from_json(value: &serde_json::Value, field: &str) -> ParseResult<Decimal> {
    match value {
        serde_json::Value::Number(n) => parse_decimal(&n.to_string(), field),
        serde_json::Value::String(s) => parse_decimal(s, field),
        serde_json::Value::Null => Err(ParseError::MissingField(field.to_string())),
        other => Err(invalid(field, other)),
    }
}

/// Parse an integer from a JSON number or numeric string
pub fn integer_from_json(value: &serde_json::Value, field: &str) -> ParseResult<i64> {
    match value {
        serde_json::Value::Number(n) => n.as_i64().ok_or_else(|| invalid(field, n)),
        serde_json::Value::String(s) => s.trim().parse().map_err(|_| invalid(field, s)),
        other => Err(invalid(field, other)),
    }
}

const NAIVE_FORMATS: [&str; 8] = [
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%d %I:%M:%S %p",
    "%m/%d/%Y %I:%M:%S %p",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

/// Parse timestamp text in any of the layouts MISO publishes, keeping an
/// explicit offset when one is present.
pub fn parse_timestamp_text(text: &str, field: &str) -> ParseResult<Timestamp> {
    let text = text.trim();
    if let Ok(aware) = DateTime::parse_from_rfc3339(text) {
        return Ok(Timestamp::Aware(aware));
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .map(Timestamp::Naive)
        .ok_or_else(|| invalid(field, text))
}

/// Parse timestamp text and normalize it into the market zone
pub fn localize_text(
    tz: &MarketTimezone,
    text: &str,
    field: &str,
) -> ParseResult<DateTime<chrono_tz::Tz>> {
    Ok(tz.normalize(parse_timestamp_text(text, field)?)?)
}

/// Lowercase a column or category name and replace whitespace with underscores
pub fn normalize_name(name: &str) -> String {
    name.trim()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .to_lowercase()
}

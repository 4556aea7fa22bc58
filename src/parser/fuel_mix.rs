//! Fuel-mix parsers
//!
//! Both provenances produce the same columns: fuel names lowercase with
//! underscores, `"Gas"` as `natural_gas`, a separate `other` and the
//! system-wide `total`.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use indexmap::IndexMap;
use rust_decimal::Decimal;
use serde::Deserialize;

use super::refid::parse_reference_id;
use super::sheet::Sheet;
use super::{decimal_from_json, invalid, normalize_name, ParseError, ParseResult};
use crate::table::Table;
use crate::timezone::MarketTimezone;
use crate::{FuelMixRecord, Granularity, TimeInterval};

const OTHER: &str = "other";

/// Column name for a fuel category
fn fuel_column(category: &str) -> String {
    match category.trim() {
        "Gas" => "natural_gas".to_string(),
        other => normalize_name(other),
    }
}

#[derive(Debug, Deserialize)]
struct FuelMixPayload {
    #[serde(rename = "RefId")]
    ref_id: String,
    #[serde(rename = "TotalMW")]
    total_mw: serde_json::Value,
    #[serde(rename = "Fuel")]
    fuel: FuelList,
}

#[derive(Debug, Deserialize)]
struct FuelList {
    #[serde(rename = "Type")]
    types: Vec<FuelEntry>,
}

#[derive(Debug, Deserialize)]
struct FuelEntry {
    #[serde(rename = "INTERVALEST")]
    interval_est: String,
    #[serde(rename = "CATEGORY")]
    category: String,
    #[serde(rename = "ACT")]
    act: serde_json::Value,
}

const INTERVAL_EST_FORMAT: &str = "%Y-%m-%d %I:%M:%S %p";

/// Parse the live fuel-mix payload into a single 5-minute row.
///
/// Every entry's own timestamp must equal the interval named by the reference id.
pub fn parse_fuel_mix_api(json: &[u8], tz: &MarketTimezone) -> ParseResult<Table<FuelMixRecord>> {
    let payload: FuelMixPayload = serde_json::from_slice(json)?;
    let start = parse_reference_id(&payload.ref_id, tz)?;

    let mut fuels = IndexMap::new();
    let mut other = None;
    for entry in &payload.fuel.types {
        let naive = NaiveDateTime::parse_from_str(entry.interval_est.trim(), INTERVAL_EST_FORMAT)
            .map_err(|_| invalid("INTERVALEST", &entry.interval_est))?;
        let stamped = tz.localize(naive)?;
        if stamped != start {
            return Err(ParseError::InconsistentInterval {
                expected: start.to_rfc3339(),
                found: stamped.to_rfc3339(),
            });
        }

        let column = fuel_column(&entry.category);
        let mw = decimal_from_json(&entry.act, &format!("ACT[{}]", entry.category))?;
        if column == OTHER {
            other = Some(mw);
        } else {
            fuels.insert(column, mw);
        }
    }

    let record = FuelMixRecord {
        interval: TimeInterval::new(start, Granularity::FiveMinutes),
        fuels,
        other,
        total: decimal_from_json(&payload.total_mw, "TotalMW")?,
    };
    record
        .validate()
        .map_err(|reason| invalid("Fuel.Type", reason))?;

    Ok(Table::new(vec![record]))
}

const FUEL_MIX_SHEET: &str = "RT Generation Fuel Mix";
const MARKET_DATE_PREFIX: &str = "Market Date:";
const HOUR_ENDING: &str = "HE";
const SYSTEM_TOTAL: &str = "MISO";

enum Column {
    Fuel(String),
    Other,
    Total,
}

/// Parse a real-time generation fuel-mix workbook (`sr_gfm.xlsx`).
pub fn parse_fuel_mix_report(
    workbook: &[u8],
    tz: &MarketTimezone,
) -> ParseResult<Table<FuelMixRecord>> {
    fuel_mix_from_sheet(&Sheet::from_workbook(workbook, Some(FUEL_MIX_SHEET))?, tz)
}

/// Parse the fuel-mix grid.
///
/// Regional columns sit left of the `HE` column and are dropped; the `MISO`
/// column is the system total.
pub fn fuel_mix_from_sheet(sheet: &Sheet, tz: &MarketTimezone) -> ParseResult<Table<FuelMixRecord>> {
    let date_text = sheet
        .find_text_with_prefix(MARKET_DATE_PREFIX)
        .ok_or_else(|| ParseError::MissingField(MARKET_DATE_PREFIX.to_string()))?;
    let date_value = date_text[MARKET_DATE_PREFIX.len()..].trim();
    let date = NaiveDate::parse_from_str(date_value, "%Y-%m-%d")
        .map_err(|_| invalid("Market Date", date_value))?;
    let midnight = tz.start_of_day(date)?;

    let header = sheet
        .find_header_row(&[HOUR_ENDING])
        .ok_or_else(|| ParseError::MissingField(format!("{HOUR_ENDING} header")))?;
    let he_col = sheet.column_of(header, HOUR_ENDING)?;

    let columns: Vec<(usize, Column)> = sheet
        .row(header)
        .iter()
        .enumerate()
        .skip(he_col + 1)
        .filter_map(|(i, cell)| cell.text().filter(|t| !t.is_empty()).map(|t| (i, t)))
        .map(|(i, name)| {
            let column = match name {
                SYSTEM_TOTAL => Column::Total,
                _ => match fuel_column(name) {
                    n if n == OTHER => Column::Other,
                    n => Column::Fuel(n),
                },
            };
            (i, column)
        })
        .collect();
    if !columns.iter().any(|(_, c)| matches!(c, Column::Total)) {
        return Err(ParseError::MissingField(SYSTEM_TOTAL.to_string()));
    }

    let mut rows = Vec::new();
    for r in (header + 1..sheet.height()).take(24) {
        let he_cell = sheet.cell(r, he_col);
        if he_cell.is_empty() {
            break;
        }
        let hour_ending = he_cell.integer(HOUR_ENDING)?;
        if !(1..=24).contains(&hour_ending) {
            return Err(invalid(HOUR_ENDING, hour_ending));
        }
        let start = midnight + Duration::hours(hour_ending - 1);

        let mut fuels = IndexMap::new();
        let mut other = None;
        let mut total = Decimal::ZERO;
        for (c, column) in &columns {
            let cell = sheet.cell(r, *c);
            match column {
                Column::Fuel(name) => {
                    fuels.insert(name.clone(), cell.decimal(name)?);
                }
                Column::Other => other = Some(cell.decimal(OTHER)?),
                Column::Total => total = cell.decimal(SYSTEM_TOTAL)?,
            }
        }

        rows.push(FuelMixRecord {
            interval: TimeInterval::new(start, Granularity::OneHour),
            fuels,
            other,
            total,
        });
    }

    Ok(Table::new(rows))
}

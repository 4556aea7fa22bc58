//! LMP parsers
//!
//! Only rows for the eight pricing hubs are kept. Real-time prices are
//! 5-minute intervals, day-ahead prices hourly.

use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;
use std::collections::BTreeMap;

use super::sheet::Sheet;
use super::{invalid, localize_text, parse_decimal, ParseError, ParseResult};
use crate::table::Table;
use crate::timezone::MarketTimezone;
use crate::{Granularity, Hub, LmpRecord, TimeInterval};

fn header_index(headers: &csv::StringRecord, name: &str) -> ParseResult<usize> {
    headers
        .iter()
        .position(|h| h.trim() == name)
        .ok_or_else(|| ParseError::MissingField(name.to_string()))
}

/// Parse the live real-time LMP CSV (current interval or rolling market day).
pub fn parse_realtime_lmp_api(csv_data: &[u8], tz: &MarketTimezone) -> ParseResult<Table<LmpRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(csv_data);
    let headers = reader.headers()?.clone();
    let interval_col = header_index(&headers, "INTERVAL")?;
    let node_col = header_index(&headers, "CPNODE")?;
    let lmp_col = header_index(&headers, "LMP")?;
    let mlc_col = header_index(&headers, "MLC")?;
    let mcc_col = header_index(&headers, "MCC")?;

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let Some(node) = record.get(node_col).and_then(Hub::from_node) else {
            continue;
        };
        let field = |col: usize, name: &str| {
            record
                .get(col)
                .ok_or_else(|| ParseError::MissingField(name.to_string()))
        };

        let start = localize_text(tz, field(interval_col, "INTERVAL")?, "INTERVAL")?;
        rows.push(LmpRecord {
            interval: TimeInterval::new(start, Granularity::FiveMinutes),
            node,
            lmp: parse_decimal(field(lmp_col, "LMP")?, "LMP")?,
            mlc: parse_decimal(field(mlc_col, "MLC")?, "MLC")?,
            mcc: parse_decimal(field(mcc_col, "MCC")?, "MCC")?,
        });
    }

    Ok(Table::new(rows))
}

const RT_TIME: &str = "Time (EST)";
const RT_NODE: &str = "CP Node";
const RT_LMP: &str = "RT Ex-Ante LMP";
const RT_MLC: &str = "RT Ex-Ante MLC";
const RT_MCC: &str = "RT Ex-Ante MCC";

/// Parse a real-time 5-minute ex-ante LMP workbook (`5min_exante_lmp.xlsx`).
pub fn parse_realtime_lmp_report(
    workbook: &[u8],
    tz: &MarketTimezone,
) -> ParseResult<Table<LmpRecord>> {
    realtime_lmp_from_sheet(&Sheet::from_workbook(workbook, None)?, tz)
}

/// Parse the real-time LMP grid. Title rows above the header and the
/// disclaimer footer carry no hub name and are skipped.
pub fn realtime_lmp_from_sheet(sheet: &Sheet, tz: &MarketTimezone) -> ParseResult<Table<LmpRecord>> {
    let header = sheet
        .find_header_row(&[RT_TIME, RT_NODE])
        .ok_or_else(|| ParseError::MissingField(format!("{RT_TIME}/{RT_NODE} header")))?;
    let time_col = sheet.column_of(header, RT_TIME)?;
    let node_col = sheet.column_of(header, RT_NODE)?;
    let lmp_col = sheet.column_of(header, RT_LMP)?;
    let mlc_col = sheet.column_of(header, RT_MLC)?;
    let mcc_col = sheet.column_of(header, RT_MCC)?;

    let mut rows = Vec::new();
    for r in header + 1..sheet.height() {
        let Some(node) = sheet.cell(r, node_col).text().and_then(Hub::from_node) else {
            continue;
        };
        let start = tz.normalize(sheet.cell(r, time_col).timestamp(RT_TIME)?)?;
        rows.push(LmpRecord {
            interval: TimeInterval::new(start, Granularity::FiveMinutes),
            node,
            lmp: sheet.cell(r, lmp_col).decimal(RT_LMP)?,
            mlc: sheet.cell(r, mlc_col).decimal(RT_MLC)?,
            mcc: sheet.cell(r, mcc_col).decimal(RT_MCC)?,
        });
    }

    Ok(Table::new(rows))
}

/// Lines before the column header: title, market date, two description lines
const DA_PREAMBLE_LINES: usize = 4;
const DA_DATE_LINE: usize = 1;

#[derive(Default)]
struct Components {
    lmp: Option<Decimal>,
    mlc: Option<Decimal>,
    mcc: Option<Decimal>,
}

/// Parse a day-ahead LMP report (`da_exante_lmp.csv` / `da_expost_lmp.csv`).
///
/// The file is wide: one row per `(node, value type)` and one column per
/// hour-ending `HE 1..HE 24`. It is reshaped into one row per `(start, node)`
/// carrying `lmp`, `mlc` and `mcc`.
pub fn parse_dayahead_lmp_report(
    csv_data: &[u8],
    tz: &MarketTimezone,
) -> ParseResult<Table<LmpRecord>> {
    let text = std::str::from_utf8(csv_data)?;
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    let mut lines = text.splitn(DA_PREAMBLE_LINES + 1, '\n');
    let preamble: Vec<&str> = lines.by_ref().take(DA_PREAMBLE_LINES).collect();
    let body = lines
        .next()
        .ok_or_else(|| ParseError::MissingField("column header".to_string()))?;

    let date_text = preamble
        .get(DA_DATE_LINE)
        .map(|line| line.trim().trim_end_matches(',').trim())
        .ok_or_else(|| ParseError::MissingField("market date".to_string()))?;
    let date = NaiveDate::parse_from_str(date_text, "%m/%d/%Y")
        .map_err(|_| invalid("market date", date_text))?;
    let midnight = tz.start_of_day(date)?;

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(body.as_bytes());
    let headers = reader.headers()?.clone();
    let node_col = header_index(&headers, "Node")?;
    let value_col = header_index(&headers, "Value")?;
    let hour_cols = (1..=24)
        .map(|he| header_index(&headers, &format!("HE {he}")).map(|col| (he, col)))
        .collect::<ParseResult<Vec<_>>>()?;

    let mut melted: BTreeMap<(i64, Hub), Components> = BTreeMap::new();
    for record in reader.records() {
        let record = record?;
        let Some(node) = record.get(node_col).and_then(Hub::from_node) else {
            continue;
        };
        let kind = record.get(value_col).unwrap_or_default().trim();

        for &(he, col) in &hour_cols {
            let field = format!("{node} {kind} HE {he}");
            let price = parse_decimal(record.get(col).unwrap_or_default(), &field)?;
            let entry = melted.entry((he, node)).or_default();
            let slot = match kind {
                "LMP" => &mut entry.lmp,
                "MLC" => &mut entry.mlc,
                "MCC" => &mut entry.mcc,
                _ => return Err(invalid("Value", kind)),
            };
            *slot = Some(price);
        }
    }

    let rows = melted
        .into_iter()
        .map(|((he, node), c)| {
            let missing = |name: &str| ParseError::MissingField(format!("{node} {name} HE {he}"));
            Ok(LmpRecord {
                interval: TimeInterval::new(midnight + Duration::hours(he - 1), Granularity::OneHour),
                node,
                lmp: c.lmp.ok_or_else(|| missing("LMP"))?,
                mlc: c.mlc.ok_or_else(|| missing("MLC"))?,
                mcc: c.mcc.ok_or_else(|| missing("MCC"))?,
            })
        })
        .collect::<ParseResult<Vec<_>>>()?;

    Ok(Table::new(rows))
}

//! Load and forecast parsers

use chrono::{Duration, NaiveTime};
use serde::Deserialize;

use super::refid::parse_reference_id;
use super::sheet::Sheet;
use super::{decimal_from_json, integer_from_json, invalid, ParseError, ParseResult};
use crate::table::Table;
use crate::timezone::MarketTimezone;
use crate::{ForecastRecord, Granularity, HourlyLoadRecord, LoadRecord, TimeInterval};

#[derive(Debug, Deserialize)]
struct LoadPayload {
    #[serde(rename = "LoadInfo")]
    load_info: LoadInfo,
}

#[derive(Debug, Deserialize)]
struct LoadInfo {
    #[serde(rename = "RefId")]
    ref_id: String,
    #[serde(rename = "FiveMinTotalLoad")]
    five_min_total_load: Option<Vec<FiveMinEntry>>,
    #[serde(rename = "MediumTermLoadForecast")]
    medium_term_load_forecast: Option<Vec<ForecastEntry>>,
}

#[derive(Debug, Deserialize)]
struct FiveMinEntry {
    #[serde(rename = "Load")]
    load: FiveMinLoad,
}

#[derive(Debug, Deserialize)]
struct FiveMinLoad {
    #[serde(rename = "Time")]
    time: String,
    #[serde(rename = "Value")]
    value: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ForecastEntry {
    #[serde(rename = "Forecast")]
    forecast: HourlyForecast,
}

#[derive(Debug, Deserialize)]
struct HourlyForecast {
    #[serde(rename = "HourEnding")]
    hour_ending: serde_json::Value,
    #[serde(rename = "LoadForecast")]
    load_forecast: serde_json::Value,
}

/// Hour-ending 1..=24 to the hour offset of the interval start
fn hour_ending_offset(hour_ending: i64) -> ParseResult<Duration> {
    if !(1..=24).contains(&hour_ending) {
        return Err(invalid("HourEnding", hour_ending));
    }
    Ok(Duration::hours(hour_ending - 1))
}

/// Parse the live total-load payload into 5-minute load rows.
///
/// The reference id supplies the market day; each entry's `"HH:MM"` is the
/// interval start within that day.
pub fn parse_load_api(json: &[u8], tz: &MarketTimezone) -> ParseResult<Table<LoadRecord>> {
    let payload: LoadPayload = serde_json::from_slice(json)?;
    let day = parse_reference_id(&payload.load_info.ref_id, tz)?.date_naive();
    let entries = payload
        .load_info
        .five_min_total_load
        .ok_or_else(|| ParseError::MissingField("LoadInfo.FiveMinTotalLoad".to_string()))?;

    let rows = entries
        .iter()
        .map(|entry| {
            let time = NaiveTime::parse_from_str(entry.load.time.trim(), "%H:%M")
                .map_err(|_| invalid("Load.Time", &entry.load.time))?;
            let start = tz.localize(day.and_time(time))?;
            Ok(LoadRecord {
                interval: TimeInterval::new(start, Granularity::FiveMinutes),
                load: decimal_from_json(&entry.load.value, "Load.Value")?,
            })
        })
        .collect::<ParseResult<Vec<_>>>()?;

    Ok(Table::new(rows))
}

/// Parse the live total-load payload into hourly forecast rows.
pub fn parse_forecast_api(json: &[u8], tz: &MarketTimezone) -> ParseResult<Table<ForecastRecord>> {
    let payload: LoadPayload = serde_json::from_slice(json)?;
    let day = parse_reference_id(&payload.load_info.ref_id, tz)?.date_naive();
    let midnight = tz.start_of_day(day)?;
    let entries = payload
        .load_info
        .medium_term_load_forecast
        .ok_or_else(|| ParseError::MissingField("LoadInfo.MediumTermLoadForecast".to_string()))?;

    let rows = entries
        .iter()
        .map(|entry| {
            let hour_ending = integer_from_json(&entry.forecast.hour_ending, "Forecast.HourEnding")?;
            let start = midnight + hour_ending_offset(hour_ending)?;
            Ok(ForecastRecord {
                interval: TimeInterval::new(start, Granularity::OneHour),
                forecast: decimal_from_json(&entry.forecast.load_forecast, "Forecast.LoadForecast")?,
            })
        })
        .collect::<ParseResult<Vec<_>>>()?;

    Ok(Table::new(rows))
}

const MARKET_DAY: &str = "Market Day";
const HOUR_ENDING: &str = "HourEnding";
const FORECAST: &str = "MISO MTLF (MWh)";
const ACTUAL_LOAD: &str = "MISO ActualLoad (MWh)";

/// Rows of the current market day; later rows hold future forecasts.
const HOURS_PER_DAY: usize = 24;

/// Parse a daily forecast-and-actual-load workbook (`df_al.xls`).
pub fn parse_forecast_and_load_report(
    workbook: &[u8],
    tz: &MarketTimezone,
) -> ParseResult<Table<HourlyLoadRecord>> {
    forecast_and_load_from_sheet(&Sheet::from_workbook(workbook, None)?, tz)
}

/// Parse the forecast-and-actual-load grid.
///
/// The header row is followed by one units row and then the 24 hours of the
/// market day.
pub fn forecast_and_load_from_sheet(
    sheet: &Sheet,
    tz: &MarketTimezone,
) -> ParseResult<Table<HourlyLoadRecord>> {
    let header = sheet
        .find_header_row(&[MARKET_DAY, HOUR_ENDING])
        .ok_or_else(|| ParseError::MissingField(format!("{MARKET_DAY}/{HOUR_ENDING} header")))?;
    let day_col = sheet.column_of(header, MARKET_DAY)?;
    let he_col = sheet.column_of(header, HOUR_ENDING)?;
    let forecast_col = sheet.column_of(header, FORECAST)?;
    let load_col = sheet.column_of(header, ACTUAL_LOAD)?;

    let first = header + 2;
    let rows = (first..first + HOURS_PER_DAY)
        .map(|r| {
            let day = sheet.cell(r, day_col).date(MARKET_DAY)?;
            let hour_ending = sheet.cell(r, he_col).integer(HOUR_ENDING)?;
            let start = tz.start_of_day(day)? + hour_ending_offset(hour_ending)?;
            Ok(HourlyLoadRecord {
                interval: TimeInterval::new(start, Granularity::OneHour),
                forecast: sheet.cell(r, forecast_col).decimal(FORECAST)?,
                load: sheet.cell(r, load_col).decimal(ACTUAL_LOAD)?,
            })
        })
        .collect::<ParseResult<Vec<_>>>()?;

    Ok(Table::new(rows))
}

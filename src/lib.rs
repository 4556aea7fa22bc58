//! # MISO Data Downloader Library
//!
//! Retrieves and normalizes MISO electricity-market data: system load, load
//! forecast, fuel-mix generation, and locational marginal prices at the eight
//! MISO pricing hubs.
//!
//! ## Features
//!
//! - **Uniform Output**: live JSON/CSV APIs and daily/monthly report files collapse
//!   into one canonical, sorted [`table::Table`] per metric family
//! - **Archive Resolution**: report files are located whether they are published
//!   individually or bundled into monthly zip archives
//! - **Bounded Concurrency**: a shared permit caps in-flight requests per client
//! - **Retry**: connection failures are retried on a fixed schedule, missing
//!   resources are never retried
//! - **Exact Normalization**: fixed EST offset, 2-decimal rounding with
//!   [`rust_decimal`]
//!
//! ## Quick Start
//!
//! ```no_run
//! use miso_data_downloader::{client::MisoClient, config::ClientConfig, DateRequest};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = MisoClient::new(ClientConfig::miso())?;
//!
//! let latest = client.get_load(&DateRequest::Latest).await?;
//! println!("latest load: {:?}", latest.table.last());
//!
//! let history = client
//!     .get_realtime_lmp(&DateRequest::range(
//!         "2021-01-01".parse()?,
//!         "2021-01-07".parse()?,
//!     )?)
//!     .await?;
//! for warning in &history.warnings {
//!     eprintln!("{warning}");
//! }
//!
//! client.close().await;
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`transport`] - HTTP fetching with concurrency permits and retry
//! - [`report`] - Market report naming and archived/unarchived resolution
//! - [`batch`] - Multi-date report retrieval and zip reconciliation
//! - [`parser`] - Format-specific parsers into canonical records
//! - [`client`] - One operation per metric family
//! - [`output`] - CSV and JSON writers for canonical tables

#![warn(missing_docs)]
#![warn(clippy::all)]

use chrono::{DateTime, Duration, NaiveDate};
use chrono_tz::Tz;
use indexmap::IndexMap;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::str::FromStr;

/// Multi-date report retrieval
pub mod batch;

/// CLI command implementations
pub mod cli;

/// Metric-family facade
pub mod client;

/// Client configuration
pub mod config;

/// Request and retry metrics
pub mod metrics;

/// Table writers
pub mod output;

/// Payload and report parsers
pub mod parser;

/// Market report naming and resolution
pub mod report;

/// Canonical tables
pub mod table;

/// Market timezone helpers
pub mod timezone;

/// HTTP transport
pub mod transport;

pub use table::{Retrieval, RetrievalWarning, Table, TableRecord};

/// Interval length of a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Granularity {
    /// Real-time data
    #[serde(rename = "5min")]
    FiveMinutes,
    /// Hourly data
    #[serde(rename = "1h")]
    OneHour,
}

impl Granularity {
    /// Interval length
    pub fn duration(&self) -> Duration {
        match self {
            Granularity::FiveMinutes => Duration::minutes(5),
            Granularity::OneHour => Duration::hours(1),
        }
    }
}

/// A `[start, end)` interval in the market timezone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct TimeInterval {
    /// Interval start
    pub start: DateTime<Tz>,
    /// Interval end
    pub end: DateTime<Tz>,
}

impl TimeInterval {
    /// Interval beginning at `start` and spanning one `granularity`
    pub fn new(start: DateTime<Tz>, granularity: Granularity) -> Self {
        Self {
            start,
            end: start + granularity.duration(),
        }
    }

    /// Length of the interval
    pub fn length(&self) -> Duration {
        self.end - self.start
    }

    /// Market day the interval belongs to
    pub fn market_date(&self) -> NaiveDate {
        self.start.date_naive()
    }

    /// Validate that the interval spans exactly one supported granularity
    pub fn validate(&self) -> Result<(), String> {
        let length = self.length();
        if length != Granularity::FiveMinutes.duration() && length != Granularity::OneHour.duration()
        {
            return Err(format!(
                "Interval {} - {} is {} minutes long, expected 5 or 60",
                self.start,
                self.end,
                length.num_minutes()
            ));
        }
        Ok(())
    }
}

impl PartialOrd for TimeInterval {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TimeInterval {
    fn cmp(&self, other: &Self) -> Ordering {
        self.start
            .cmp(&other.start)
            .then_with(|| self.end.cmp(&other.end))
    }
}

/// MISO pricing hubs
///
/// Variant order matches the lexical order of the hub names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Hub {
    /// ARKANSAS.HUB
    #[serde(rename = "ARKANSAS.HUB")]
    Arkansas,
    /// ILLINOIS.HUB
    #[serde(rename = "ILLINOIS.HUB")]
    Illinois,
    /// INDIANA.HUB
    #[serde(rename = "INDIANA.HUB")]
    Indiana,
    /// LOUISIANA.HUB
    #[serde(rename = "LOUISIANA.HUB")]
    Louisiana,
    /// MICHIGAN.HUB
    #[serde(rename = "MICHIGAN.HUB")]
    Michigan,
    /// MINN.HUB
    #[serde(rename = "MINN.HUB")]
    Minnesota,
    /// MS.HUB
    #[serde(rename = "MS.HUB")]
    Mississippi,
    /// TEXAS.HUB
    #[serde(rename = "TEXAS.HUB")]
    Texas,
}

impl Hub {
    /// All hubs in lexical order
    pub const ALL: [Hub; 8] = [
        Hub::Arkansas,
        Hub::Illinois,
        Hub::Indiana,
        Hub::Louisiana,
        Hub::Michigan,
        Hub::Minnesota,
        Hub::Mississippi,
        Hub::Texas,
    ];

    /// Node name as published by MISO
    pub fn as_str(&self) -> &'static str {
        match self {
            Hub::Arkansas => "ARKANSAS.HUB",
            Hub::Illinois => "ILLINOIS.HUB",
            Hub::Indiana => "INDIANA.HUB",
            Hub::Louisiana => "LOUISIANA.HUB",
            Hub::Michigan => "MICHIGAN.HUB",
            Hub::Minnesota => "MINN.HUB",
            Hub::Mississippi => "MS.HUB",
            Hub::Texas => "TEXAS.HUB",
        }
    }

    /// Look up a node name, returning `None` for anything that is not a hub
    pub fn from_node(node: &str) -> Option<Hub> {
        Hub::ALL.into_iter().find(|hub| hub.as_str() == node.trim())
    }
}

impl std::fmt::Display for Hub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Hub {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Hub::from_node(s).ok_or_else(|| format!("Invalid hub: {s}"))
    }
}

/// System load for one interval
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoadRecord {
    /// Interval
    #[serde(flatten)]
    pub interval: TimeInterval,
    /// Load (MW)
    pub load: Decimal,
}

/// Load forecast for one hour
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastRecord {
    /// Interval
    #[serde(flatten)]
    pub interval: TimeInterval,
    /// Forecast load (MW)
    pub forecast: Decimal,
}

/// Combined row of the hourly forecast-and-actual-load report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HourlyLoadRecord {
    /// Interval
    #[serde(flatten)]
    pub interval: TimeInterval,
    /// Forecast load (MW)
    pub forecast: Decimal,
    /// Actual load (MW)
    pub load: Decimal,
}

impl HourlyLoadRecord {
    /// Project onto the load columns
    pub fn to_load(&self) -> LoadRecord {
        LoadRecord {
            interval: self.interval,
            load: self.load,
        }
    }

    /// Project onto the forecast columns
    pub fn to_forecast(&self) -> ForecastRecord {
        ForecastRecord {
            interval: self.interval,
            forecast: self.forecast,
        }
    }
}

/// Generation by fuel type for one interval
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FuelMixRecord {
    /// Interval
    #[serde(flatten)]
    pub interval: TimeInterval,
    /// MW per fuel type, keyed by lowercase underscored fuel name, in source order
    #[serde(flatten)]
    pub fuels: IndexMap<String, Decimal>,
    /// Generation not attributed to a named fuel (MW)
    pub other: Option<Decimal>,
    /// Total generation (MW)
    pub total: Decimal,
}

impl FuelMixRecord {
    /// Validate fuel names are normalized and not reserved
    pub fn validate(&self) -> Result<(), String> {
        for name in self.fuels.keys() {
            if name.is_empty() {
                return Err("Fuel name cannot be empty".to_string());
            }
            if matches!(name.as_str(), "start" | "end" | "other" | "total") {
                return Err(format!("Fuel name '{name}' collides with a fixed column"));
            }
            if name.chars().any(|c| c.is_uppercase() || c.is_whitespace()) {
                return Err(format!("Fuel name '{name}' is not normalized"));
            }
        }
        Ok(())
    }
}

/// Locational marginal price at a hub for one interval
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LmpRecord {
    /// Interval
    #[serde(flatten)]
    pub interval: TimeInterval,
    /// Pricing hub
    pub node: Hub,
    /// Locational marginal price ($/MWh)
    pub lmp: Decimal,
    /// Marginal loss component ($/MWh)
    pub mlc: Decimal,
    /// Marginal congestion component ($/MWh)
    pub mcc: Decimal,
}

impl LmpRecord {
    /// Validate the interval
    pub fn validate(&self) -> Result<(), String> {
        self.interval.validate()
    }
}

/// Day-ahead pricing methodology
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PriceMethod {
    /// Original method, priced before the extended-LMP adjustment
    #[serde(rename = "ex-ante")]
    ExAnte,
    /// Extended LMP (MISO's newer method)
    #[default]
    #[serde(rename = "ex-post")]
    ExPost,
}

impl std::fmt::Display for PriceMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PriceMethod::ExAnte => write!(f, "ex-ante"),
            PriceMethod::ExPost => write!(f, "ex-post"),
        }
    }
}

impl FromStr for PriceMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ex-ante" | "exante" => Ok(PriceMethod::ExAnte),
            "ex-post" | "expost" => Ok(PriceMethod::ExPost),
            _ => Err(format!("Invalid price method: {s}")),
        }
    }
}

/// Which data a request asks for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateRequest {
    /// Most recent single record from the live API
    Latest,
    /// Full current-day series from the live API
    Today,
    /// Market report files for each listed market date
    History(Vec<NaiveDate>),
}

impl DateRequest {
    /// Inclusive range of market dates
    pub fn range(start: NaiveDate, end: NaiveDate) -> Result<Self, String> {
        if end < start {
            return Err(format!("End date {end} is before start date {start}"));
        }
        Ok(DateRequest::History(
            start.iter_days().take_while(|d| *d <= end).collect(),
        ))
    }

    /// Short name of the request mode
    pub fn mode(&self) -> &'static str {
        match self {
            DateRequest::Latest => "latest",
            DateRequest::Today => "today",
            DateRequest::History(_) => "history",
        }
    }
}

impl FromStr for DateRequest {
    type Err = String;

    /// Accepts `latest`, `today`, `YYYY-MM-DD..YYYY-MM-DD`, or comma-separated dates
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s.to_lowercase().as_str() {
            "latest" => return Ok(DateRequest::Latest),
            "today" => return Ok(DateRequest::Today),
            "" => return Err("Empty date request".to_string()),
            _ => {}
        }

        let parse_date = |d: &str| {
            NaiveDate::parse_from_str(d.trim(), "%Y-%m-%d")
                .map_err(|e| format!("Invalid date '{}': {e}", d.trim()))
        };

        if let Some((start, end)) = s.split_once("..") {
            return DateRequest::range(parse_date(start)?, parse_date(end)?);
        }

        let dates = s
            .split(',')
            .map(parse_date)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(DateRequest::History(dates))
    }
}

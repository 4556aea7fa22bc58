//! Report kinds and their naming metadata
//!
//! Differences between report kinds are data, not branching: each variant maps
//! to one [`ReportNaming`] constant.

use crate::{Granularity, PriceMethod};

/// Filename metadata of a report kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportNaming {
    /// Human-readable report title
    pub title: &'static str,
    /// Filename suffix after the date
    pub suffix: &'static str,
    /// File extension of the daily report
    pub extension: &'static str,
    /// File is named by the day after the market date
    pub named_by_publish_date: bool,
    /// Interval length of the report's rows
    pub granularity: Granularity,
}

/// Daily forecast and actual load, hourly
pub const FORECAST_AND_LOAD: ReportNaming = ReportNaming {
    title: "Daily Forecast and Actual Load",
    suffix: "df_al",
    extension: "xls",
    named_by_publish_date: true,
    granularity: Granularity::OneHour,
};

/// Real-time generation fuel mix, hourly
pub const GENERATION_FUEL_MIX: ReportNaming = ReportNaming {
    title: "Real-Time Generation Fuel Mix",
    suffix: "sr_gfm",
    extension: "xlsx",
    named_by_publish_date: true,
    granularity: Granularity::OneHour,
};

/// Day-ahead ex-ante LMP, hourly
pub const DAYAHEAD_EXANTE_LMP: ReportNaming = ReportNaming {
    title: "Day-Ahead Ex-Ante LMP",
    suffix: "da_exante_lmp",
    extension: "csv",
    named_by_publish_date: false,
    granularity: Granularity::OneHour,
};

/// Day-ahead ex-post LMP, hourly
pub const DAYAHEAD_EXPOST_LMP: ReportNaming = ReportNaming {
    title: "Day-Ahead Ex-Post LMP",
    suffix: "da_expost_lmp",
    extension: "csv",
    named_by_publish_date: false,
    granularity: Granularity::OneHour,
};

/// Real-time 5-minute ex-ante LMP
pub const REALTIME_EXANTE_LMP: ReportNaming = ReportNaming {
    title: "Real-Time 5-Minute Ex-Ante LMP",
    suffix: "5min_exante_lmp",
    extension: "xlsx",
    named_by_publish_date: true,
    granularity: Granularity::FiveMinutes,
};

/// Market report kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportKind {
    /// `df_al.xls`
    ForecastAndLoad,
    /// `sr_gfm.xlsx`
    GenerationFuelMix,
    /// `da_exante_lmp.csv`
    DayAheadExAnteLmp,
    /// `da_expost_lmp.csv`
    DayAheadExPostLmp,
    /// `5min_exante_lmp.xlsx`
    RealTimeExAnteLmp,
}

impl ReportKind {
    /// Every kind
    pub const ALL: [ReportKind; 5] = [
        ReportKind::ForecastAndLoad,
        ReportKind::GenerationFuelMix,
        ReportKind::DayAheadExAnteLmp,
        ReportKind::DayAheadExPostLmp,
        ReportKind::RealTimeExAnteLmp,
    ];

    /// Naming metadata
    pub const fn naming(&self) -> &'static ReportNaming {
        match self {
            ReportKind::ForecastAndLoad => &FORECAST_AND_LOAD,
            ReportKind::GenerationFuelMix => &GENERATION_FUEL_MIX,
            ReportKind::DayAheadExAnteLmp => &DAYAHEAD_EXANTE_LMP,
            ReportKind::DayAheadExPostLmp => &DAYAHEAD_EXPOST_LMP,
            ReportKind::RealTimeExAnteLmp => &REALTIME_EXANTE_LMP,
        }
    }

    /// Day-ahead LMP report for a pricing method
    pub fn day_ahead(method: PriceMethod) -> Self {
        match method {
            PriceMethod::ExAnte => ReportKind::DayAheadExAnteLmp,
            PriceMethod::ExPost => ReportKind::DayAheadExPostLmp,
        }
    }

    /// Filename suffix, also used as a metrics label
    pub fn suffix(&self) -> &'static str {
        self.naming().suffix
    }
}

impl std::fmt::Display for ReportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.naming().title)
    }
}

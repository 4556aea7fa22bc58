//! Metric-family facade
//!
//! [`MisoClient`] exposes one operation per metric family. Each dispatches on
//! the [`DateRequest`]:
//!
//! | Operation | `Latest` | `Today` | `History` |
//! |---|---|---|---|
//! | [`get_load`](MisoClient::get_load) | live, last row | live | `df_al.xls` |
//! | [`get_forecast`](MisoClient::get_forecast) | live, current hour | live | `df_al.xls` |
//! | [`get_fuel_mix`](MisoClient::get_fuel_mix) | live | unsupported | `sr_gfm.xlsx` |
//! | [`get_realtime_lmp`](MisoClient::get_realtime_lmp) | live current interval | live rolling day | `5min_exante_lmp.xlsx` |
//! | [`get_dayahead_lmp`](MisoClient::get_dayahead_lmp) | today's report, current hour | today's report | `da_ex*_lmp.csv` |
//!
//! Every path returns the same columns for a family, so callers never branch
//! on where the data came from.

use chrono::NaiveDate;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::info;

use crate::batch::{BatchError, BatchOrchestrator};
use crate::config::{ClientConfig, ConfigError};
use crate::parser::{fuel_mix, lmp, load, ParseError};
use crate::report::{ReportKind, ReportLocator};
use crate::table::{Retrieval, Table, TableRecord};
use crate::timezone::MarketTimezone;
use crate::transport::{HttpTransport, Transport, TransportError};
use crate::{
    DateRequest, ForecastRecord, FuelMixRecord, HourlyLoadRecord, LmpRecord, LoadRecord,
    PriceMethod,
};

/// Client errors
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Configuration failed validation
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The date request is malformed
    #[error("invalid date specification: {0}")]
    InvalidDateSpecification(String),

    /// The request mode is valid but not offered for this metric family
    #[error("{mode} data is not available for {operation}; use latest or a date range")]
    UnsupportedMode {
        /// Metric family
        operation: &'static str,
        /// Requested mode
        mode: &'static str,
    },

    /// Live-API fetch failed
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Live-API payload could not be parsed
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// Report retrieval failed
    #[error(transparent)]
    Batch(#[from] BatchError),
}

/// Result type for client operations
pub type ClientResult<T> = Result<T, ClientError>;

/// MISO data client
pub struct MisoClient<T: Transport + ?Sized = HttpTransport> {
    config: ClientConfig,
    timezone: MarketTimezone,
    transport: Arc<T>,
    reports: BatchOrchestrator<T>,
}

impl MisoClient<HttpTransport> {
    /// Build a client with the production HTTP transport.
    ///
    /// Fails if the configuration is invalid, including an unknown timezone.
    pub fn new(config: ClientConfig) -> ClientResult<Self> {
        let timezone = config.validate()?;
        let transport = Arc::new(HttpTransport::from_config(&config)?);
        Ok(Self::assemble(config, timezone, transport))
    }
}

impl<T: Transport + ?Sized> MisoClient<T> {
    /// Build a client over any transport
    pub fn with_transport(config: ClientConfig, transport: Arc<T>) -> ClientResult<Self> {
        let timezone = config.validate()?;
        Ok(Self::assemble(config, timezone, transport))
    }

    fn assemble(config: ClientConfig, timezone: MarketTimezone, transport: Arc<T>) -> Self {
        let reports = BatchOrchestrator::new(
            transport.clone(),
            ReportLocator::new(config.endpoints.market_reports.clone()),
        )
        .with_progress(config.show_progress);

        info!(
            "{} client ready (timezone {}, concurrency {})",
            config.name,
            timezone.name(),
            config.concurrent_limit
        );

        Self {
            config,
            timezone,
            transport,
            reports,
        }
    }

    /// Configuration the client was built with
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Market timezone
    pub fn timezone(&self) -> &MarketTimezone {
        &self.timezone
    }

    /// Release the connection pool. Later operations fail with a closed-transport error.
    pub async fn close(&self) {
        self.transport.close().await;
        info!("{} client closed", self.config.name);
    }

    /// System load. Live data is 5-minute, report data hourly.
    pub async fn get_load(&self, request: &DateRequest) -> ClientResult<Retrieval<LoadRecord>> {
        info!("Fetching {} load", request.mode());
        match request {
            DateRequest::Latest | DateRequest::Today => {
                let body = self.fetch_data_broker("gettotalload").await?;
                let table = load::parse_load_api(&body, &self.timezone)?;
                Ok(Retrieval::complete(match request {
                    DateRequest::Latest => table.into_last(),
                    _ => table,
                }))
            }
            DateRequest::History(dates) => Ok(self
                .hourly_load_reports(dates)
                .await?
                .map_table(|t| t.map(HourlyLoadRecord::to_load))),
        }
    }

    /// Load forecast, hourly.
    pub async fn get_forecast(&self, request: &DateRequest) -> ClientResult<Retrieval<ForecastRecord>> {
        info!("Fetching {} forecast", request.mode());
        match request {
            DateRequest::Latest | DateRequest::Today => {
                let body = self.fetch_data_broker("gettotalload").await?;
                let table = load::parse_forecast_api(&body, &self.timezone)?;
                Ok(Retrieval::complete(match request {
                    DateRequest::Latest => self.current_hour_only(table),
                    _ => table,
                }))
            }
            DateRequest::History(dates) => Ok(self
                .hourly_load_reports(dates)
                .await?
                .map_table(|t| t.map(HourlyLoadRecord::to_forecast))),
        }
    }

    /// Generation by fuel type. Live data is a single 5-minute row; there is no
    /// live source for the whole current day.
    pub async fn get_fuel_mix(&self, request: &DateRequest) -> ClientResult<Retrieval<FuelMixRecord>> {
        match request {
            DateRequest::Today => Err(ClientError::UnsupportedMode {
                operation: "fuel mix",
                mode: "today",
            }),
            DateRequest::Latest => {
                info!("Fetching latest fuel mix");
                let body = self.fetch_data_broker("getfuelmix").await?;
                Ok(Retrieval::complete(fuel_mix::parse_fuel_mix_api(&body, &self.timezone)?))
            }
            DateRequest::History(dates) => {
                info!("Fetching history fuel mix");
                let tz = self.timezone;
                self.history(dates, ReportKind::GenerationFuelMix, move |b| {
                    fuel_mix::parse_fuel_mix_report(b, &tz)
                })
                .await
            }
        }
    }

    /// Real-time LMP at the pricing hubs, 5-minute intervals.
    ///
    /// Live data is priced ex-post, report data ex-ante.
    pub async fn get_realtime_lmp(&self, request: &DateRequest) -> ClientResult<Retrieval<LmpRecord>> {
        info!("Fetching {} real-time LMP", request.mode());
        match request {
            DateRequest::Latest | DateRequest::Today => {
                let message_type = match request {
                    DateRequest::Latest => "currentinterval",
                    _ => "rollingmarketday",
                };
                let body = self
                    .transport
                    .fetch(
                        &self.config.endpoints.bi_reporter,
                        &[
                            ("messageType", message_type.to_string()),
                            ("returnType", "csv".to_string()),
                        ],
                    )
                    .await?;
                Ok(Retrieval::complete(lmp::parse_realtime_lmp_api(&body, &self.timezone)?))
            }
            DateRequest::History(dates) => {
                let tz = self.timezone;
                self.history(dates, ReportKind::RealTimeExAnteLmp, move |b| {
                    lmp::parse_realtime_lmp_report(b, &tz)
                })
                .await
            }
        }
    }

    /// Day-ahead LMP at the pricing hubs, hourly. Always read from report
    /// files; `Latest` and `Today` read today's report.
    pub async fn get_dayahead_lmp(
        &self,
        request: &DateRequest,
        method: PriceMethod,
    ) -> ClientResult<Retrieval<LmpRecord>> {
        info!("Fetching {} day-ahead {} LMP", request.mode(), method);
        let kind = ReportKind::day_ahead(method);
        let tz = self.timezone;
        let parse = move |b: &[u8]| lmp::parse_dayahead_lmp_report(b, &tz);

        match request {
            DateRequest::Latest => {
                let today = self.history(&[self.timezone.today()], kind, parse).await?;
                Ok(today.map_table(|t| self.current_hour_only(t)))
            }
            DateRequest::Today => self.history(&[self.timezone.today()], kind, parse).await,
            DateRequest::History(dates) => self.history(dates, kind, parse).await,
        }
    }

    async fn fetch_data_broker(&self, message_type: &str) -> ClientResult<bytes::Bytes> {
        Ok(self
            .transport
            .fetch(
                &self.config.endpoints.data_broker,
                &[
                    ("messageType", message_type.to_string()),
                    ("returnType", "json".to_string()),
                ],
            )
            .await?)
    }

    async fn hourly_load_reports(
        &self,
        dates: &[NaiveDate],
    ) -> ClientResult<Retrieval<HourlyLoadRecord>> {
        let tz = self.timezone;
        self.history(dates, ReportKind::ForecastAndLoad, move |b| {
            load::parse_forecast_and_load_report(b, &tz)
        })
        .await
    }

    /// Retrieve reports for `dates` and keep only rows on those market days.
    async fn history<R, F>(
        &self,
        dates: &[NaiveDate],
        kind: ReportKind,
        parse: F,
    ) -> ClientResult<Retrieval<R>>
    where
        R: TableRecord,
        F: Fn(&[u8]) -> Result<Table<R>, ParseError> + Sync,
    {
        if dates.is_empty() {
            return Err(ClientError::InvalidDateSpecification(
                "history request must name at least one date".to_string(),
            ));
        }
        let requested: BTreeSet<NaiveDate> = dates.iter().copied().collect();

        let retrieval = self.reports.retrieve(dates, kind, parse).await?;
        Ok(retrieval.map_table(|t| t.restrict_to_dates(&requested)))
    }

    fn current_hour_only<R: TableRecord>(&self, table: Table<R>) -> Table<R> {
        let current_hour = self.timezone.current_hour();
        table.filter(|r| r.interval().start == current_hour)
    }
}

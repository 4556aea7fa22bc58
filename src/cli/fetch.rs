//! Metric retrieval commands

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

use super::{CliError, ReportsCommand};
use crate::client::{ClientError, MisoClient};
use crate::config::{
    ClientConfig, Endpoints, DEFAULT_CONCURRENT_LIMIT, MAX_ATTEMPTS, MISO_CONCURRENT_LIMIT,
    MISO_TIMEZONE, RETRY_WAIT_SECS,
};
use crate::metrics;
use crate::output::{write_table, write_table_file, CsvRecord, OutputFormat};
use crate::table::Retrieval;
use crate::{DateRequest, PriceMethod};

/// Parse and validate concurrency value
fn parse_concurrency(s: &str) -> Result<usize, String> {
    let value: usize = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid number"))?;

    if value == 0 {
        return Err("concurrency must be at least 1".to_string());
    }
    if value > DEFAULT_CONCURRENT_LIMIT {
        return Err(format!(
            "concurrency {value} exceeds maximum of {DEFAULT_CONCURRENT_LIMIT}"
        ));
    }
    Ok(value)
}

/// MISO Data Downloader CLI
#[derive(Parser, Debug)]
#[command(name = "miso-data-downloader")]
#[command(about = "Retrieve MISO load, forecast, fuel-mix and LMP data", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Maximum in-flight requests
    ///
    /// MISO resets connections well below the library default, so the
    /// operator preset is used unless overridden.
    #[arg(long, global = true, default_value_t = MISO_CONCURRENT_LIMIT, value_parser = parse_concurrency)]
    pub concurrency: usize,

    /// Per-request timeout in seconds (default: unbounded)
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// Attempts per request, first included (range: 1-20)
    #[arg(long, global = true, default_value_t = MAX_ATTEMPTS, value_parser = clap::value_parser!(u32).range(1..=20))]
    pub max_attempts: u32,

    /// Seconds to wait between attempts
    #[arg(long, global = true, default_value_t = RETRY_WAIT_SECS)]
    pub retry_wait: u64,

    /// Market timezone identifier
    #[arg(long, global = true, default_value = MISO_TIMEZONE)]
    pub timezone: String,

    /// Serve every endpoint from this base URL instead of MISO's hosts
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Expose Prometheus metrics on this address
    #[arg(long, global = true)]
    pub metrics_addr: Option<SocketAddr>,

    /// Show a progress bar while retrieving report files
    #[arg(long, global = true, default_value_t = false)]
    pub progress: bool,

    /// Output format (csv or json)
    #[arg(long, global = true, default_value = "csv")]
    pub format: OutputFormat,

    /// Write to this file instead of stdout
    #[arg(long, global = true)]
    pub output: Option<PathBuf>,
}

/// CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// System load
    Load(DateArgs),

    /// Hourly load forecast
    Forecast(DateArgs),

    /// Generation by fuel type
    FuelMix(DateArgs),

    /// Real-time LMP at the pricing hubs
    RealtimeLmp(DateArgs),

    /// Day-ahead LMP at the pricing hubs
    DayaheadLmp(DayAheadArgs),

    /// List report files for a market date
    Reports(ReportsCommand),
}

/// Which dates to retrieve
#[derive(Args, Debug, Clone, Default)]
pub struct DateArgs {
    /// Most recent record
    #[arg(long, conflicts_with_all = ["today", "start", "end", "dates"])]
    pub latest: bool,

    /// Current market day
    #[arg(long, conflicts_with_all = ["start", "end", "dates"])]
    pub today: bool,

    /// First market date of a range (YYYY-MM-DD)
    #[arg(long, requires = "end", conflicts_with = "dates")]
    pub start: Option<NaiveDate>,

    /// Last market date of a range, inclusive (YYYY-MM-DD)
    #[arg(long, requires = "start")]
    pub end: Option<NaiveDate>,

    /// Comma-separated market dates, or `A..B`
    #[arg(long)]
    pub dates: Option<String>,
}

impl DateArgs {
    /// Build the date request
    pub fn request(&self) -> Result<DateRequest, CliError> {
        let invalid = |reason: String| CliError::ClientError(ClientError::InvalidDateSpecification(reason));

        if self.latest {
            return Ok(DateRequest::Latest);
        }
        if self.today {
            return Ok(DateRequest::Today);
        }
        match (self.start, self.end, &self.dates) {
            (Some(start), Some(end), _) => DateRequest::range(start, end).map_err(invalid),
            (_, _, Some(dates)) => dates.parse().map_err(invalid),
            _ => Err(invalid(
                "one of --latest, --today, --start/--end or --dates is required".to_string(),
            )),
        }
    }
}

/// Day-ahead LMP arguments
#[derive(Args, Debug, Clone)]
pub struct DayAheadArgs {
    /// Which dates to retrieve
    #[command(flatten)]
    pub dates: DateArgs,

    /// Pricing method: ex-post or ex-ante
    #[arg(long, default_value = "ex-post")]
    pub price_method: PriceMethod,
}

impl Cli {
    /// Client configuration from the global flags
    pub fn client_config(&self) -> ClientConfig {
        let mut config = ClientConfig::miso()
            .with_concurrent_limit(self.concurrency)
            .with_request_timeout(self.timeout.map(Duration::from_secs))
            .with_retry(self.max_attempts, Duration::from_secs(self.retry_wait))
            .with_progress(self.progress);
        config.timezone = self.timezone.clone();
        if let Some(base_url) = &self.base_url {
            config = config.with_endpoints(Endpoints::single_host(base_url));
        }
        config
    }

    /// Run the command, returning the number of rows written
    pub async fn execute(&self) -> Result<u64, CliError> {
        if let Some(addr) = self.metrics_addr {
            metrics::init_metrics(addr)?;
        }

        let client = MisoClient::new(self.client_config())?;
        let result = self.run(&client).await;
        client.close().await;
        result
    }

    async fn run(&self, client: &MisoClient) -> Result<u64, CliError> {
        match &self.command {
            Commands::Load(args) => self.emit(client.get_load(&args.request()?).await?),
            Commands::Forecast(args) => self.emit(client.get_forecast(&args.request()?).await?),
            Commands::FuelMix(args) => self.emit(client.get_fuel_mix(&args.request()?).await?),
            Commands::RealtimeLmp(args) => {
                self.emit(client.get_realtime_lmp(&args.request()?).await?)
            }
            Commands::DayaheadLmp(args) => self.emit(
                client
                    .get_dayahead_lmp(&args.dates.request()?, args.price_method)
                    .await?,
            ),
            Commands::Reports(command) => command.execute(client.config(), self.format).await,
        }
    }

    fn emit<R: CsvRecord>(&self, retrieval: Retrieval<R>) -> Result<u64, CliError> {
        for warning in &retrieval.warnings {
            eprintln!("warning: {warning}");
        }

        let written = match &self.output {
            Some(path) => write_table_file(&retrieval.table, self.format, path)?,
            None => write_table(&retrieval.table, self.format, std::io::stdout().lock())?,
        };
        info!(
            "Wrote {} rows{}",
            written,
            if retrieval.is_partial() { " (partial)" } else { "" }
        );
        Ok(written)
    }
}

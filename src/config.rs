//! Client configuration
//!
//! The grid operator's identity, timezone and tuning knobs are an explicit
//! value validated when a client is constructed, not attributes discovered at
//! runtime. [`ClientConfig::miso`] carries the production presets.

use std::time::Duration;

use crate::timezone::{MarketTimezone, TimezoneError};

/// Default concurrency limit for any market client.
pub const DEFAULT_CONCURRENT_LIMIT: usize = 100;

/// Concurrency limit tuned for MISO's servers.
/// Higher values trigger connection resets from the report host.
pub const MISO_CONCURRENT_LIMIT: usize = 25;

/// Maximum number of attempts per request, first attempt included.
pub const MAX_ATTEMPTS: u32 = 10;

/// Fixed wait between attempts, in seconds.
pub const RETRY_WAIT_SECS: u64 = 10;

/// MISO publishes in Eastern Standard Time all year.
pub const MISO_TIMEZONE: &str = "EST";

/// Live load, forecast and fuel-mix service
pub const MISO_DATA_BROKER_URL: &str =
    "https://api.misoenergy.org/MISORTWDDataBroker/DataBrokerServices.asmx";

/// Live real-time LMP service
pub const MISO_BI_REPORTER_URL: &str =
    "https://api.misoenergy.org/MISORTWDBIReporter/Reporter.asmx";

/// Market report files
pub const MISO_MARKET_REPORTS_URL: &str = "https://docs.misoenergy.org/marketreports";

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Timezone identifier is not valid
    #[error("invalid timezone: {0}")]
    Timezone(#[from] TimezoneError),

    /// A field has an unusable value
    #[error("invalid configuration: {field}: {reason}")]
    Invalid {
        /// Field name
        field: &'static str,
        /// What is wrong
        reason: String,
    },
}

/// Service URLs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    /// Live load, forecast and fuel-mix service
    pub data_broker: String,
    /// Live real-time LMP service
    pub bi_reporter: String,
    /// Base URL that report filenames are appended to
    pub market_reports: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            data_broker: MISO_DATA_BROKER_URL.to_string(),
            bi_reporter: MISO_BI_REPORTER_URL.to_string(),
            market_reports: MISO_MARKET_REPORTS_URL.to_string(),
        }
    }
}

impl Endpoints {
    /// Point every service at one host, as used against local test servers.
    pub fn single_host(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            data_broker: format!("{base}/DataBrokerServices.asmx"),
            bi_reporter: format!("{base}/Reporter.asmx"),
            market_reports: format!("{base}/marketreports"),
        }
    }
}

/// Client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Operator name used in logs
    pub name: String,
    /// tz database identifier of the market's local zone
    pub timezone: String,
    /// Maximum in-flight requests per client
    pub concurrent_limit: usize,
    /// Per-request timeout, `None` for unbounded
    pub request_timeout: Option<Duration>,
    /// Attempts per request, first included
    pub max_attempts: u32,
    /// Wait between attempts
    pub retry_wait: Duration,
    /// Service URLs
    pub endpoints: Endpoints,
    /// Draw a progress bar during batch retrievals
    pub show_progress: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            name: "MISO".to_string(),
            timezone: MISO_TIMEZONE.to_string(),
            concurrent_limit: DEFAULT_CONCURRENT_LIMIT,
            request_timeout: None,
            max_attempts: MAX_ATTEMPTS,
            retry_wait: Duration::from_secs(RETRY_WAIT_SECS),
            endpoints: Endpoints::default(),
            show_progress: false,
        }
    }
}

impl ClientConfig {
    /// Production preset for MISO
    pub fn miso() -> Self {
        Self {
            concurrent_limit: MISO_CONCURRENT_LIMIT,
            ..Self::default()
        }
    }

    /// Set the concurrency limit
    pub fn with_concurrent_limit(mut self, limit: usize) -> Self {
        self.concurrent_limit = limit;
        self
    }

    /// Set the per-request timeout
    pub fn with_request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the retry schedule
    pub fn with_retry(mut self, max_attempts: u32, wait: Duration) -> Self {
        self.max_attempts = max_attempts;
        self.retry_wait = wait;
        self
    }

    /// Set the service URLs
    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    /// Enable or disable the batch progress bar
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Check every field, returning the parsed market timezone.
    pub fn validate(&self) -> Result<MarketTimezone, ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "name",
                reason: "must not be empty".to_string(),
            });
        }
        if self.concurrent_limit == 0 {
            return Err(ConfigError::Invalid {
                field: "concurrent_limit",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.max_attempts == 0 {
            return Err(ConfigError::Invalid {
                field: "max_attempts",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.request_timeout == Some(Duration::ZERO) {
            return Err(ConfigError::Invalid {
                field: "request_timeout",
                reason: "must be positive when set".to_string(),
            });
        }
        for (field, url) in [
            ("endpoints.data_broker", &self.endpoints.data_broker),
            ("endpoints.bi_reporter", &self.endpoints.bi_reporter),
            ("endpoints.market_reports", &self.endpoints.market_reports),
        ] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::Invalid {
                    field,
                    reason: format!("not an http(s) URL: {url}"),
                });
            }
        }
        Ok(MarketTimezone::parse(&self.timezone)?)
    }
}

//! Request and retrieval metrics
//!
//! Counters and histograms are emitted through the `metrics` facade and are
//! no-ops until a recorder is installed. [`init_metrics`] installs the
//! Prometheus exporter when the binary is started with `--metrics-addr`.
//!
//! ## Metrics
//!
//! - `http_requests_total{endpoint,status}` - one per completed attempt
//! - `http_request_duration_seconds{endpoint}` - attempt latency
//! - `http_retries_total{attempt}` - retries scheduled
//! - `partial_retrievals_total{report}` - history retrievals with gaps

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

static METRICS_INITIALIZED: AtomicBool = AtomicBool::new(false);

static CORRELATION_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Metrics setup errors
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    /// Exporter could not be installed
    #[error("failed to install Prometheus exporter: {0}")]
    Install(String),
}

/// Install the Prometheus exporter on `addr`.
///
/// Calling this more than once is a no-op.
pub fn init_metrics(addr: SocketAddr) -> Result<(), MetricsError> {
    if METRICS_INITIALIZED.swap(true, Ordering::SeqCst) {
        debug!("Metrics already initialized, skipping");
        return Ok(());
    }

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| {
            METRICS_INITIALIZED.store(false, Ordering::SeqCst);
            MetricsError::Install(e.to_string())
        })?;

    describe_counter!(
        "http_requests_total",
        Unit::Count,
        "Total number of HTTP request attempts made to MISO"
    );
    describe_histogram!(
        "http_request_duration_seconds",
        Unit::Seconds,
        "HTTP request attempt duration in seconds"
    );
    describe_counter!(
        "http_retries_total",
        Unit::Count,
        "Total number of retries scheduled"
    );
    describe_counter!(
        "partial_retrievals_total",
        Unit::Count,
        "History retrievals that completed with missing dates or files"
    );

    info!("Metrics exporter listening on {}", addr);
    Ok(())
}

/// Whether [`init_metrics`] has installed an exporter
pub fn is_initialized() -> bool {
    METRICS_INITIALIZED.load(Ordering::SeqCst)
}

fn next_correlation_id() -> String {
    let id = CORRELATION_COUNTER.fetch_add(1, Ordering::Relaxed) + 1;
    format!("req-{id:08x}")
}

/// Metric label for a request URL: host and directory, without the file name.
///
/// Every dated report under one base URL shares a single series.
pub fn endpoint_label(url: &str) -> String {
    let without_query = url.split('?').next().unwrap_or(url);
    let without_scheme = without_query
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(without_query);
    match without_scheme.split_once('/') {
        Some((host, path)) => match path.rsplit_once('/') {
            Some((dir, _)) => format!("{host}/{dir}"),
            None => host.to_string(),
        },
        None => without_scheme.to_string(),
    }
}

/// Timing and outcome of a single request attempt
pub struct HttpRequestMetrics {
    endpoint: String,
    label: String,
    start_time: Instant,
    correlation_id: String,
}

impl HttpRequestMetrics {
    /// Start timing a request to `url`; the query string is not recorded
    pub fn start(url: &str) -> Self {
        let endpoint = url.split('?').next().unwrap_or(url).to_string();
        let label = endpoint_label(&endpoint);
        let correlation_id = next_correlation_id();

        debug!(
            correlation_id = %correlation_id,
            endpoint = %endpoint,
            "HTTP request started"
        );

        Self {
            endpoint,
            label,
            start_time: Instant::now(),
            correlation_id,
        }
    }

    /// Record a response with a status code
    pub fn record_complete(&self, status_code: u16) {
        self.record(status_code.to_string());

        debug!(
            correlation_id = %self.correlation_id,
            endpoint = %self.endpoint,
            status = status_code,
            duration_ms = self.start_time.elapsed().as_millis(),
            "HTTP request completed"
        );
    }

    /// Record a failure before any status was received
    pub fn record_network_error(&self) {
        self.record("network_error".to_string());

        warn!(
            correlation_id = %self.correlation_id,
            endpoint = %self.endpoint,
            duration_ms = self.start_time.elapsed().as_millis(),
            "HTTP request failed without a response"
        );
    }

    /// Correlation ID attached to this attempt's log lines
    pub fn correlation_id(&self) -> &str {
        &self.correlation_id
    }

    fn record(&self, status: String) {
        counter!(
            "http_requests_total",
            "endpoint" => self.label.clone(),
            "status" => status,
        )
        .increment(1);

        histogram!(
            "http_request_duration_seconds",
            "endpoint" => self.label.clone(),
        )
        .record(self.start_time.elapsed().as_secs_f64());
    }
}

/// Record a scheduled retry
pub fn record_retry(wait: Duration, attempt: u32) {
    counter!(
        "http_retries_total",
        "attempt" => attempt.to_string(),
    )
    .increment(1);

    debug!(attempt = attempt, wait_ms = wait.as_millis(), "Retry scheduled");
}

/// Record a history retrieval that returned with gaps
pub fn record_partial_retrieval(report: &'static str) {
    counter!("partial_retrievals_total", "report" => report).increment(1);
}

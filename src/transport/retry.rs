//! Retry policy
//!
//! A [`RetryPolicy`] is composed around the call site rather than baked into it:
//! it owns the attempt budget, the fixed wait between attempts, and the
//! predicate that classifies an error as retryable. The wait happens outside
//! the operation, so no concurrency permit is held while sleeping.

use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

use super::{TransportError, TransportResult};
use crate::config::{MAX_ATTEMPTS, RETRY_WAIT_SECS};
use crate::metrics;

/// Fixed-wait retry schedule with a retryability predicate
#[derive(Clone, Copy)]
pub struct RetryPolicy {
    max_attempts: u32,
    wait: Duration,
    predicate: fn(&TransportError) -> bool,
}

impl std::fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_attempts", &self.max_attempts)
            .field("wait", &self.wait)
            .finish_non_exhaustive()
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(MAX_ATTEMPTS, Duration::from_secs(RETRY_WAIT_SECS))
    }
}

impl RetryPolicy {
    /// Retry connection-level failures up to `max_attempts` attempts in total
    pub fn new(max_attempts: u32, wait: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            wait,
            predicate: TransportError::is_retryable,
        }
    }

    /// Replace the retryability predicate
    pub fn with_predicate(mut self, predicate: fn(&TransportError) -> bool) -> Self {
        self.predicate = predicate;
        self
    }

    /// Attempt budget
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Wait between attempts
    pub fn wait(&self) -> Duration {
        self.wait
    }

    /// Whether a failure on `attempt` (1-based) should be followed by another attempt
    pub fn should_retry(&self, error: &TransportError, attempt: u32) -> bool {
        attempt < self.max_attempts && (self.predicate)(error)
    }

    /// Run `operation` until it succeeds, fails terminally, or exhausts the budget.
    ///
    /// The operation receives the 1-based attempt number. The last error is
    /// returned unchanged.
    pub async fn run<T, F, Fut>(&self, url: &str, mut operation: F) -> TransportResult<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = TransportResult<T>>,
    {
        let mut attempt = 1;
        loop {
            match operation(attempt).await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!("Request to {} succeeded on attempt {}", url, attempt);
                    }
                    return Ok(value);
                }
                Err(error) if self.should_retry(&error, attempt) => {
                    let context = RetryContext::new(attempt, self.max_attempts, self.wait, url, &error);
                    warn!("{}", context.format_retry());
                    metrics::record_retry(self.wait, attempt);
                    tokio::time::sleep(self.wait).await;
                    attempt += 1;
                }
                Err(error) => {
                    if (self.predicate)(&error) {
                        let context = RetryContext::new(attempt, self.max_attempts, self.wait, url, &error);
                        warn!("{}", context.format_exhausted());
                    }
                    return Err(error);
                }
            }
        }
    }
}

/// Context for retry log messages
#[derive(Debug, Clone)]
pub struct RetryContext {
    /// Attempt that just failed (1-based)
    pub attempt: u32,
    /// Attempt budget
    pub max_attempts: u32,
    /// Wait before the next attempt
    pub wait: Duration,
    /// Requested URL
    pub endpoint: String,
    /// Short classification of the failure
    pub reason: &'static str,
    /// Full error message
    pub error_message: String,
}

impl RetryContext {
    /// Capture the context of a failed attempt
    pub fn new(
        attempt: u32,
        max_attempts: u32,
        wait: Duration,
        endpoint: &str,
        error: &TransportError,
    ) -> Self {
        Self {
            attempt,
            max_attempts,
            wait,
            endpoint: endpoint.to_string(),
            reason: error.description(),
            error_message: error.to_string(),
        }
    }

    /// Message logged before waiting for the next attempt
    pub fn format_retry(&self) -> String {
        format!(
            "Retrying (attempt {}/{}) after {} - waiting {:.1} seconds... [{}]",
            self.attempt + 1,
            self.max_attempts,
            self.reason,
            self.wait.as_secs_f64(),
            self.endpoint
        )
    }

    /// Message logged when the budget is spent
    pub fn format_exhausted(&self) -> String {
        format!(
            "Giving up on {} after {} attempts: {}",
            self.endpoint, self.attempt, self.error_message
        )
    }
}

//! Production transport over `reqwest`

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Response, StatusCode};
use std::error::Error as StdError;
use tracing::debug;

use super::{
    ConcurrencyLimiter, ConnectionPool, RetryPolicy, Transport, TransportError, TransportResult,
};
use crate::config::ClientConfig;
use crate::metrics::HttpRequestMetrics;

/// HTTP transport with bounded concurrency and retry
#[derive(Debug)]
pub struct HttpTransport {
    pool: ConnectionPool,
    limiter: ConcurrencyLimiter,
    retry: RetryPolicy,
}

impl HttpTransport {
    /// Compose a transport from its parts
    pub fn new(pool: ConnectionPool, limiter: ConcurrencyLimiter, retry: RetryPolicy) -> Self {
        Self {
            pool,
            limiter,
            retry,
        }
    }

    /// Build a transport from client configuration
    pub fn from_config(config: &ClientConfig) -> TransportResult<Self> {
        Ok(Self::new(
            ConnectionPool::new(config.request_timeout)?,
            ConcurrencyLimiter::new(config.concurrent_limit),
            RetryPolicy::new(config.max_attempts, config.retry_wait),
        ))
    }

    /// Concurrency limiter shared by every request of this transport
    pub fn limiter(&self) -> &ConcurrencyLimiter {
        &self.limiter
    }

    /// One attempt: hold a permit while connecting and reading the body.
    async fn fetch_once(&self, url: &str, params: &[(&str, String)]) -> TransportResult<Bytes> {
        let _permit = self.limiter.acquire().await?;
        let response = self.send(url, params).await?;

        let body = response.bytes().await.map_err(|e| classify(url, e))?;
        debug!("Fetched {} bytes from {}", body.len(), url);
        Ok(body)
    }

    /// One existence check: the status line decides, the body is never read.
    async fn check_once(&self, url: &str) -> TransportResult<bool> {
        let _permit = self.limiter.acquire().await?;
        match self.send(url, &[]).await {
            Ok(_response) => {
                debug!("Found {}", url);
                Ok(true)
            }
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Send a GET and check the status. The caller holds the permit.
    async fn send(&self, url: &str, params: &[(&str, String)]) -> TransportResult<Response> {
        let client = self.pool.acquire().await?;

        let request_metrics = HttpRequestMetrics::start(url);
        let response = match client.get(url).query(params).send().await {
            Ok(response) => response,
            Err(e) => {
                request_metrics.record_network_error();
                return Err(classify(url, e));
            }
        };

        let status = response.status();
        request_metrics.record_complete(status.as_u16());

        if status == StatusCode::NOT_FOUND {
            return Err(TransportError::NotFound {
                url: url.to_string(),
            });
        }
        if !status.is_success() {
            return Err(TransportError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn fetch(&self, url: &str, params: &[(&str, String)]) -> TransportResult<Bytes> {
        self.retry
            .run(url, |_| self.fetch_once(url, params))
            .await
    }

    async fn exists_at(&self, url: &str) -> TransportResult<bool> {
        self.retry.run(url, |_| self.check_once(url)).await
    }

    async fn close(&self) {
        self.limiter.close();
        self.pool.close().await;
    }
}

/// Map a `reqwest` error onto the retryable/terminal taxonomy.
///
/// Send errors count as connection failures only when an I/O error caused them.
fn classify(url: &str, error: reqwest::Error) -> TransportError {
    let message = error.to_string();
    if error.is_connect() || error.is_timeout() || (error.is_request() && caused_by_io(&error)) {
        TransportError::Connection {
            url: url.to_string(),
            message,
        }
    } else if error.is_body() || error.is_decode() {
        TransportError::Body {
            url: url.to_string(),
            message,
        }
    } else {
        TransportError::Client(message)
    }
}

fn caused_by_io(error: &(dyn StdError + 'static)) -> bool {
    let mut source = error.source();
    while let Some(cause) = source {
        if cause.is::<std::io::Error>() {
            return true;
        }
        source = cause.source();
    }
    false
}

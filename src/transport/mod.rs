//! HTTP transport
//!
//! Every network call in the crate goes through a [`Transport`]. The production
//! implementation, [`HttpTransport`], composes:
//!
//! - a [`ConnectionPool`] owning the shared `reqwest::Client`, released by `close`
//! - a [`ConcurrencyLimiter`] capping in-flight requests per client
//! - a [`RetryPolicy`] retrying connection failures on a fixed schedule
//!
//! A missing resource (HTTP 404) is reported as [`TransportError::NotFound`] on
//! the first occurrence and never retried. Existence checks read the status
//! line only.

use async_trait::async_trait;
use bytes::Bytes;

pub mod http;
pub mod limiter;
pub mod pool;
pub mod retry;

pub use http::HttpTransport;
pub use limiter::ConcurrencyLimiter;
pub use pool::ConnectionPool;
pub use retry::{RetryContext, RetryPolicy};

/// Transport errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    /// Connection-level failure: refused, reset, timed out
    #[error("connection to {url} failed: {message}")]
    Connection {
        /// Requested URL
        url: String,
        /// Underlying error
        message: String,
    },

    /// HTTP 404
    #[error("resource not found: {url}")]
    NotFound {
        /// Requested URL
        url: String,
    },

    /// Any other non-success status
    #[error("HTTP {status} from {url}")]
    Status {
        /// Requested URL
        url: String,
        /// Status code
        status: u16,
    },

    /// Response body could not be read
    #[error("failed to read response body from {url}: {message}")]
    Body {
        /// Requested URL
        url: String,
        /// Underlying error
        message: String,
    },

    /// Transport was closed by its owner
    #[error("transport is closed")]
    Closed,

    /// HTTP client could not be built or the request was malformed
    #[error("HTTP client error: {0}")]
    Client(String),
}

impl TransportError {
    /// Connection-level failures, including a connection dropped mid-body,
    /// are worth another attempt
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            TransportError::Connection { .. } | TransportError::Body { .. }
        )
    }

    /// Whether the resource does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, TransportError::NotFound { .. })
    }

    /// Short classification used in retry log lines
    pub fn description(&self) -> &'static str {
        match self {
            TransportError::Connection { .. } => "connection failed",
            TransportError::NotFound { .. } => "resource not found",
            TransportError::Status { status, .. } if *status >= 500 => "server error",
            TransportError::Status { .. } => "client error",
            TransportError::Body { .. } => "incomplete response body",
            TransportError::Closed => "transport closed",
            TransportError::Client(_) => "client error",
        }
    }
}

/// Result type for transport operations
pub type TransportResult<T> = Result<T, TransportError>;

/// Fetches raw payloads by URL
#[async_trait]
pub trait Transport: Send + Sync {
    /// GET `url` with query `params` and return the body.
    async fn fetch(&self, url: &str, params: &[(&str, String)]) -> TransportResult<Bytes>;

    /// Whether a resource exists: `false` on 404, `true` on success, other errors propagate.
    async fn exists_at(&self, url: &str) -> TransportResult<bool> {
        match self.fetch(url, &[]).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Release pooled resources. Later fetches fail with [`TransportError::Closed`].
    async fn close(&self) {}
}

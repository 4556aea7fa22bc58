//! Connection pool ownership
//!
//! The `reqwest::Client` keeps its own connection pool. [`ConnectionPool`] owns
//! the one client a transport uses and drops it on [`ConnectionPool::close`], so
//! idle connections are released when the owner decides and not at process exit.

use reqwest::Client;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::{TransportError, TransportResult};

/// Time allowed to establish a TCP connection
const HTTP_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Owner of the shared HTTP client
#[derive(Debug)]
pub struct ConnectionPool {
    client: RwLock<Option<Client>>,
}

impl ConnectionPool {
    /// Build the client. `request_timeout` bounds each whole request; `None` leaves it unbounded.
    pub fn new(request_timeout: Option<Duration>) -> TransportResult<Self> {
        let mut builder =
            Client::builder().connect_timeout(Duration::from_secs(HTTP_CONNECT_TIMEOUT_SECS));
        if let Some(timeout) = request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| TransportError::Client(e.to_string()))?;

        Ok(Self::from_client(client))
    }

    /// Wrap an existing client
    pub fn from_client(client: Client) -> Self {
        Self {
            client: RwLock::new(Some(client)),
        }
    }

    /// Handle to the client for one request; dropping it releases nothing but the handle.
    pub async fn acquire(&self) -> TransportResult<Client> {
        self.client
            .read()
            .await
            .as_ref()
            .cloned()
            .ok_or(TransportError::Closed)
    }

    /// Drop the client. Idempotent.
    pub async fn close(&self) {
        if self.client.write().await.take().is_some() {
            info!("HTTP connection pool closed");
        } else {
            debug!("HTTP connection pool already closed");
        }
    }

    /// Whether `close` has run
    pub async fn is_closed(&self) -> bool {
        self.client.read().await.is_none()
    }
}

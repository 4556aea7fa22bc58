//! Concurrency limiting
//!
//! One counting permit per client instance bounds the number of requests in
//! flight. A permit is held for the duration of one attempt and released when
//! the returned guard drops, including on error paths.

use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use super::{TransportError, TransportResult};

/// Shared counting permit
#[derive(Debug, Clone)]
pub struct ConcurrencyLimiter {
    semaphore: Arc<Semaphore>,
    limit: usize,
}

impl ConcurrencyLimiter {
    /// Create a limiter allowing `limit` concurrent holders
    pub fn new(limit: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(limit)),
            limit,
        }
    }

    /// Configured limit
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Permits not currently held
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Wait for a permit
    pub async fn acquire(&self) -> TransportResult<OwnedSemaphorePermit> {
        self.semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| TransportError::Closed)
    }

    /// Stop handing out permits; waiters and later callers get `Closed`
    pub fn close(&self) {
        self.semaphore.close();
    }
}

//! CLI error types and conversions

use crate::client::ClientError;
use crate::metrics::MetricsError;
use crate::output::OutputError;
use crate::transport::TransportError;

/// CLI errors
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Client error
    #[error(transparent)]
    ClientError(#[from] ClientError),

    /// Transport error outside a client operation
    #[error("transport error: {0}")]
    TransportError(#[from] TransportError),

    /// Output error
    #[error("output error: {0}")]
    OutputError(#[from] OutputError),

    /// Metrics exporter error
    #[error(transparent)]
    MetricsError(#[from] MetricsError),

    /// Invalid argument
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

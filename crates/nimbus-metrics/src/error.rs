//! Metrics error types

use thiserror::Error;

/// Result type alias for metrics operations
pub type MetricsResult<T> = Result<T, MetricsError>;

#[derive(Error, Debug)]
pub enum MetricsError {
    /// Family construction, registration or encoding failed
    #[error("prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),

    /// Encoded exposition was not valid UTF-8
    #[error("failed to encode metrics: {0}")]
    Encoding(String),

    /// The exposition listener could not be bound
    #[error("failed to bind metrics listener on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("metrics server error: {0}")]
    Serve(#[from] std::io::Error),
}

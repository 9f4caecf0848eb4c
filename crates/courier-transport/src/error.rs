//! Error types for transport operations.

use thiserror::Error;

/// Errors that can occur in transport operations.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// Binding the listener failed.
    #[error("failed to bind listener on {addr}: {reason}")]
    BindFailed {
        /// The address that failed to bind.
        addr: String,
        /// Reason for failure.
        reason: String,
    },

    /// Pulling an update batch failed.
    #[error("failed to pull updates: {0}")]
    PullFailed(String),

    /// An outbound HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Request(String),

    /// Invalid configuration.
    #[error("invalid transport configuration: {0}")]
    InvalidConfig(String),

    /// The event sink was closed by the consumer.
    #[error("event sink closed")]
    SinkClosed,

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// A webhook payload could not be decoded into events.
#[derive(Debug, Clone, Error)]
#[error("failed to decode update payload: {reason}")]
pub struct DecodeError {
    /// Reason for failure.
    pub reason: String,
}

impl DecodeError {
    /// Creates a decode error.
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

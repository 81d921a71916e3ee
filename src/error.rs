//! Error types for natslink.

use std::time::Duration;

use thiserror::Error;

/// Main error type for all natslink operations.
#[derive(Debug, Error)]
pub enum NatsError {
    /// Server URL is malformed or lacks a host/port.
    #[error("invalid server url: {0}")]
    InvalidServerUrl(String),

    /// No INFO frame arrived within the handshake deadline.
    #[error("handshake timed out: waited {0:?} for INFO but never got it")]
    HandshakeTimeout(Duration),

    /// Server answered the connect attempt with an -ERR frame.
    #[error("server rejected connection: {0}")]
    ServerRejected(String),

    /// Server requires authentication but the connected URL carries no
    /// credentials (neither `user:pass` nor a query token).
    #[error("server authentication requires a url with credentials")]
    AuthConfigurationMissing,

    /// I/O error from the underlying transport.
    #[error("transport failure: {0}")]
    Transport(#[from] std::io::Error),

    /// JSON serialization/deserialization error (INFO and CONNECT payloads).
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Connection closed while frames were still queued.
    #[error("connection closed")]
    ConnectionClosed,
}

/// Result type alias using NatsError.
pub type Result<T> = std::result::Result<T, NatsError>;

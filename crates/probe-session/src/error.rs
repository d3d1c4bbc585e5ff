//! Error types for the telemetry session

use probe_protocol::EndpointError;
use thiserror::Error;

/// Errors from [`connect`](crate::TelemetrySession::connect)
#[derive(Debug, Error)]
pub enum ConnectError {
    /// The `host:port` string is malformed
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(#[from] EndpointError),

    /// Socket creation or bind failed
    #[error("transport error: {0}; check the address and retry connect")]
    Transport(#[from] std::io::Error),

    /// The session task has shut down
    #[error("session task is not running")]
    SessionClosed,
}

/// Errors from test commands
#[derive(Debug, Error)]
pub enum TestError {
    /// No successful connect yet
    #[error("not connected to a test device; connect to <a.b.c.d>:<port> first")]
    NotConnected,

    /// Duration or rate is not a positive integer
    #[error("invalid {field} '{value}': expected a positive whole number")]
    InvalidParameters {
        /// Which parameter was rejected
        field: &'static str,
        /// The raw user input
        value: String,
    },

    /// Sending the command datagram failed
    #[error("failed to send command: {0}")]
    Transport(#[from] std::io::Error),

    /// The session task has shut down
    #[error("session task is not running")]
    SessionClosed,
}

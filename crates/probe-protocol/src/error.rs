//! Error types for endpoint parsing and frame decoding

use thiserror::Error;

/// Errors that can occur while parsing a `host:port` endpoint string
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EndpointError {
    /// No `:` separator in the input
    #[error("missing port in '{0}': expected <a.b.c.d>:<port>, e.g. 127.0.0.1:49181")]
    MissingPort(String),

    /// Host part is not a dotted-quad IPv4 address
    #[error("invalid host '{0}': expected four dot-separated octets in 0-255, e.g. 127.0.0.1")]
    InvalidHost(String),

    /// Port part is not a number in 0-65535
    #[error("invalid port '{0}': expected a number in 0-65535")]
    InvalidPort(String),
}

/// Reason a decoded frame was not accepted as a telemetry sample
///
/// This is not a failure: frames that are not samples are ignored for
/// sampling and only logged.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeSkip {
    /// One of `TIME`, `MV`, `MA` is absent
    #[error("missing field {0}")]
    MissingField(&'static str),

    /// Field value does not parse as a finite decimal number
    #[error("field {field} is not a number: '{value}'")]
    InvalidNumber { field: &'static str, value: String },

    /// Time offsets are never negative
    #[error("negative time offset: {0}")]
    NegativeTime(i64),
}

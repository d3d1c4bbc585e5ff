//! Test Device Protocol Library
//!
//! This crate provides parsing and encoding for the request/telemetry
//! protocol spoken by the remote test device over UDP.
//!
//! # Format
//!
//! Every datagram is ISO-8859-1 text made of `;`-terminated segments:
//!
//! - A leading tag without `=` names the message family (`TEST`, `STATUS`)
//! - Every other segment is a `KEY=VALUE` field
//!
//! Commands (client → device):
//! - `TEST;CMD=START;DURATION=<secs>;RATE=<ms>;`
//! - `TEST;CMD=STOP;`
//!
//! Telemetry and replies (device → client):
//! - `STATUS;TIME=<ms>;MV=<mv>;MA=<ma>;`
//! - `STATUS;STATE=IDLE;`
//! - `TEST;RESULT=STARTED;` / `TEST;RESULT=STOPPED;` / `TEST;RESULT=ERROR;MSG=<reason>`
//!
//! # Architecture
//!
//! - [`Frame`] is the flat key/value view of one datagram. Decoding is total:
//!   malformed input produces an empty or partial frame, never an error.
//! - [`Sample`] is the numeric view of a telemetry frame.
//! - [`TestCommand`] and [`DeviceMessage`] are the typed views of each direction.
//!
//! # Example
//!
//! ```rust
//! use probe_protocol::{DeviceMessage, Frame, Sample};
//!
//! let frame = Frame::decode(b"STATUS;TIME=250.0;MV=5;MA=2;");
//! assert!(frame.is_sample());
//! assert_eq!(
//!     DeviceMessage::from_frame(&frame),
//!     DeviceMessage::Status(Sample::new(250, 5, 2))
//! );
//! ```

pub mod command;
pub mod endpoint;
pub mod error;
pub mod frame;
pub mod message;
pub mod sample;

pub use command::TestCommand;
pub use endpoint::Endpoint;
pub use error::{DecodeSkip, EndpointError};
pub use frame::{encode_command, Frame};
pub use message::DeviceMessage;
pub use sample::Sample;

/// Maximum datagram payload read from the device in one receive
pub const MAX_DATAGRAM_LEN: usize = 1024;

/// Trait for commands that can be encoded to bytes
pub trait EncodeCommand {
    /// Encode this command to its wire format
    fn encode(&self) -> Vec<u8>;
}

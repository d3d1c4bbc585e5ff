//! Event stream for session observers
//!
//! The session task emits everything the display, report and log sides
//! care about through a single broadcast channel, in arrival order.

use probe_protocol::{Endpoint, Frame, Sample};

/// Session activity
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    // -------------------------------------------------------------------------
    // Command results
    // -------------------------------------------------------------------------
    /// A socket is bound for the device
    Connected {
        /// Device endpoint
        endpoint: Endpoint,
    },

    /// START was sent and the buffers were cleared
    TestStarted {
        /// Run length in seconds, as entered
        duration_secs: String,
        /// Sample interval in milliseconds, as entered
        rate_ms: String,
    },

    /// STOP was sent
    StopRequested,

    /// Buffers were cleared without a command
    Cleared,

    // -------------------------------------------------------------------------
    // Device traffic
    // -------------------------------------------------------------------------
    /// A datagram was decoded
    FrameReceived(Frame),

    /// A telemetry sample was appended to the buffers
    SampleReceived(Sample),

    /// The device reported the end of the run
    TestFinished,

    /// The device refused a command
    DeviceRejected {
        /// Reason given by the device
        message: String,
    },
}

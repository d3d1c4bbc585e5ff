//! Device → client messages

use crate::frame::Frame;
use crate::sample::Sample;

/// Message family tag for telemetry and state reports
pub const STATUS_TAG: &str = "STATUS";

/// Typed view of an inbound frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceMessage {
    /// Telemetry reading
    Status(Sample),
    /// Final status after a run ends: `STATUS;STATE=IDLE;`
    Idle,
    /// Start acknowledged: `TEST;RESULT=STARTED;`
    Started,
    /// Stop acknowledged: `TEST;RESULT=STOPPED;`
    Stopped,
    /// Command refused: `TEST;RESULT=ERROR;MSG=<reason>`
    Rejected {
        /// Reason given by the device (empty if absent)
        message: String,
    },
    /// Anything else
    Other(Frame),
}

impl DeviceMessage {
    /// Classify a decoded frame
    ///
    /// Telemetry is recognized by its fields alone, whatever the frame kind.
    pub fn from_frame(frame: &Frame) -> Self {
        if let Ok(sample) = frame.sample() {
            return DeviceMessage::Status(sample);
        }

        if let Some(state) = frame.get("STATE") {
            if state.eq_ignore_ascii_case("IDLE") {
                return DeviceMessage::Idle;
            }
        }

        match frame.get("RESULT") {
            Some(r) if r.eq_ignore_ascii_case("STARTED") => DeviceMessage::Started,
            Some(r) if r.eq_ignore_ascii_case("STOPPED") => DeviceMessage::Stopped,
            Some(r) if r.eq_ignore_ascii_case("ERROR") => DeviceMessage::Rejected {
                message: frame.get("MSG").unwrap_or_default().to_string(),
            },
            _ => DeviceMessage::Other(frame.clone()),
        }
    }

    /// Decode and classify a raw payload
    pub fn decode(payload: &[u8]) -> Self {
        Self::from_frame(&Frame::decode(payload))
    }
}

//! Client → device test commands

use crate::frame::{encode_command, latin1_decode, TERMINATOR};
use crate::EncodeCommand;

/// Command family tag
pub const TEST_TAG: &str = "TEST";

/// Command sent to the test device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestCommand {
    /// Start a run: `TEST;CMD=START;DURATION=<secs>;RATE=<ms>;`
    Start {
        /// Run length in seconds
        duration_secs: u32,
        /// Interval between status frames in milliseconds
        rate_ms: u32,
    },
    /// Stop the current run: `TEST;CMD=STOP;`
    Stop,
}

impl TestCommand {
    /// Parse a datagram as a command
    ///
    /// Only the exact wire shapes are accepted; anything else is `None`.
    pub fn decode(payload: &[u8]) -> Option<Self> {
        let text = latin1_decode(payload);
        let body = text.strip_suffix(TERMINATOR)?;
        let segments: Vec<&str> = body.split(TERMINATOR).collect();

        match segments.as_slice() {
            [TEST_TAG, "CMD=STOP"] => Some(TestCommand::Stop),
            [TEST_TAG, "CMD=START", duration, rate] => Some(TestCommand::Start {
                duration_secs: parse_digits(duration.strip_prefix("DURATION=")?)?,
                rate_ms: parse_digits(rate.strip_prefix("RATE=")?)?,
            }),
            _ => None,
        }
    }
}

impl EncodeCommand for TestCommand {
    fn encode(&self) -> Vec<u8> {
        match self {
            TestCommand::Start {
                duration_secs,
                rate_ms,
            } => {
                let duration = duration_secs.to_string();
                let rate = rate_ms.to_string();
                encode_command(
                    TEST_TAG,
                    &[("CMD", "START"), ("DURATION", &duration), ("RATE", &rate)],
                )
            }
            TestCommand::Stop => encode_command(TEST_TAG, &[("CMD", "STOP")]),
        }
    }
}

fn parse_digits(s: &str) -> Option<u32> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Frame;

    #[test]
    fn test_encode_start() {
        let cmd = TestCommand::Start {
            duration_secs: 3,
            rate_ms: 100,
        };
        assert_eq!(cmd.encode(), b"TEST;CMD=START;DURATION=3;RATE=100;");
    }

    #[test]
    fn test_encode_stop() {
        assert_eq!(TestCommand::Stop.encode(), b"TEST;CMD=STOP;");
    }

    #[test]
    fn test_start_decodes_as_frame() {
        let encoded = TestCommand::Start {
            duration_secs: 3,
            rate_ms: 100,
        }
        .encode();
        let frame = Frame::decode(&encoded);
        assert_eq!(frame.get("CMD"), Some("START"));
        assert_eq!(frame.get("DURATION"), Some("3"));
        assert_eq!(frame.get("RATE"), Some("100"));
    }

    #[test]
    fn test_decode_commands() {
        assert_eq!(
            TestCommand::decode(b"TEST;CMD=START;DURATION=10;RATE=250;"),
            Some(TestCommand::Start {
                duration_secs: 10,
                rate_ms: 250
            })
        );
        assert_eq!(TestCommand::decode(b"TEST;CMD=STOP;"), Some(TestCommand::Stop));
    }

    #[test]
    fn test_decode_rejects_other_shapes() {
        let payloads: [&[u8]; 6] = [
            b"TEST;CMD=STOP",
            b"TEST;CMD=START;RATE=250;DURATION=10;",
            b"TEST;CMD=START;DURATION=1.5;RATE=250;",
            b"TEST;CMD=START;DURATION=;RATE=250;",
            b"STATUS;TIME=0;MV=1;MA=1;",
            b"",
        ];
        for payload in payloads {
            assert_eq!(TestCommand::decode(payload), None, "{:?}", payload);
        }
    }
}

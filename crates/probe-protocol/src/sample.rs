//! Telemetry samples
//!
//! The device sometimes emits fractional strings (`TIME=250.0`), so each
//! field is parsed as a decimal and then truncated to an integer.

use crate::error::DecodeSkip;
use crate::frame::Frame;

/// Time offset field, milliseconds since test start
pub const FIELD_TIME: &str = "TIME";
/// Voltage field, millivolts
pub const FIELD_MV: &str = "MV";
/// Current field, milliamps
pub const FIELD_MA: &str = "MA";

/// One numeric telemetry reading
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Sample {
    /// Milliseconds since the start of the test
    pub time_ms: u64,
    /// Measured voltage in millivolts
    pub millivolts: i64,
    /// Measured current in milliamps
    pub milliamps: i64,
}

impl Sample {
    /// Create a sample
    pub fn new(time_ms: u64, millivolts: i64, milliamps: i64) -> Self {
        Self {
            time_ms,
            millivolts,
            milliamps,
        }
    }

    /// Same reading at a different time offset
    pub fn with_time(self, time_ms: u64) -> Self {
        Self { time_ms, ..self }
    }
}

impl TryFrom<&Frame> for Sample {
    type Error = DecodeSkip;

    fn try_from(frame: &Frame) -> Result<Self, Self::Error> {
        let time = numeric_field(frame, FIELD_TIME)?;
        let millivolts = numeric_field(frame, FIELD_MV)?;
        let milliamps = numeric_field(frame, FIELD_MA)?;

        let time_ms = u64::try_from(time).map_err(|_| DecodeSkip::NegativeTime(time))?;

        Ok(Self {
            time_ms,
            millivolts,
            milliamps,
        })
    }
}

fn numeric_field(frame: &Frame, field: &'static str) -> Result<i64, DecodeSkip> {
    let raw = frame.get(field).ok_or(DecodeSkip::MissingField(field))?;
    coerce(raw).ok_or_else(|| DecodeSkip::InvalidNumber {
        field,
        value: raw.to_string(),
    })
}

/// Parse as a decimal, then truncate toward zero
fn coerce(raw: &str) -> Option<i64> {
    let value = raw.trim().parse::<f64>().ok()?;
    if !value.is_finite() {
        return None;
    }
    Some(value as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fractional_time() {
        let frame = Frame::decode(b"TIME=250.0;MV=5;MA=2;");
        assert_eq!(Sample::try_from(&frame), Ok(Sample::new(250, 5, 2)));
    }

    #[test]
    fn test_truncates_toward_zero() {
        let frame = Frame::decode(b"TIME=99.9;MV=-4.7;MA=3.2;");
        assert_eq!(frame.sample(), Ok(Sample::new(99, -4, 3)));
    }

    #[test]
    fn test_missing_field() {
        let frame = Frame::decode(b"TIME=250;MV=5;");
        assert!(!frame.is_sample());
        assert_eq!(frame.sample(), Err(DecodeSkip::MissingField("MA")));
    }

    #[test]
    fn test_extra_fields_and_order_tolerated() {
        let frame = Frame::decode(b"STATUS;MA=2;SEQ=9;MV=5;TIME=10;");
        assert_eq!(frame.sample(), Ok(Sample::new(10, 5, 2)));
    }

    #[test]
    fn test_invalid_numbers() {
        let payloads: [&[u8]; 4] = [
            b"TIME=abc;MV=1;MA=1;",
            b"TIME=1;MV=;MA=1;",
            b"TIME=1;MV=1;MA=inf;",
            b"TIME=NaN;MV=1;MA=1;",
        ];
        for payload in payloads {
            let frame = Frame::decode(payload);
            assert!(
                matches!(frame.sample(), Err(DecodeSkip::InvalidNumber { .. })),
                "{:?}",
                frame
            );
        }
    }

    #[test]
    fn test_negative_time_rejected() {
        let frame = Frame::decode(b"TIME=-5;MV=1;MA=1;");
        assert_eq!(frame.sample(), Err(DecodeSkip::NegativeTime(-5)));
    }

    #[test]
    fn test_whitespace_tolerated() {
        let frame = Frame::decode(b"TIME= 12 ;MV=1;MA=1;");
        assert_eq!(frame.sample(), Ok(Sample::new(12, 1, 1)));
    }

    #[test]
    fn test_with_time() {
        assert_eq!(Sample::new(837, 3, 4).with_time(0), Sample::new(0, 3, 4));
    }
}

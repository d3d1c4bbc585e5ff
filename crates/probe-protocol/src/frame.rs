//! Frame decoding and command encoding
//!
//! A frame is the flat `KEY=VALUE` view of one datagram. Payload bytes are
//! mapped one-to-one onto characters (ISO-8859-1), so any byte the device
//! emits survives decoding.

use tracing::trace;

use crate::error::DecodeSkip;
use crate::sample::Sample;

/// Segment terminator
pub const TERMINATOR: char = ';';

/// One decoded protocol message
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Frame {
    /// Leading segment without `=`, e.g. `TEST` or `STATUS`
    kind: Option<String>,
    /// Fields in first-seen order; a repeated key keeps its position
    fields: Vec<(String, String)>,
}

impl Frame {
    /// Create an empty frame
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode a raw payload
    ///
    /// Never fails: segments without `=` are skipped (the first one is kept
    /// as the frame kind), empty segments are ignored, and a key repeated
    /// later in the payload overwrites the earlier value.
    pub fn decode(payload: &[u8]) -> Self {
        let text = latin1_decode(payload);
        let mut frame = Self::new();

        for (index, segment) in text.split(TERMINATOR).enumerate() {
            if segment.is_empty() {
                continue;
            }
            match segment.split_once('=') {
                Some((key, value)) => frame.insert(key, value),
                None if index == 0 => frame.kind = Some(segment.to_string()),
                None => trace!("Skipping segment without '=': {:?}", segment),
            }
        }

        frame
    }

    /// Insert or replace a field
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((key, value)),
        }
    }

    /// Frame kind tag, if the payload started with one
    pub fn kind(&self) -> Option<&str> {
        self.kind.as_deref()
    }

    /// Raw value for a field
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Iterate over fields in payload order
    pub fn fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the frame has no fields
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// True iff the frame carries numeric TIME, MV and MA fields
    pub fn is_sample(&self) -> bool {
        self.sample().is_ok()
    }

    /// Extract the telemetry sample, or the reason there is none
    pub fn sample(&self) -> Result<Sample, DecodeSkip> {
        Sample::try_from(self)
    }

    /// Render the frame as protocol text, e.g. `STATUS;TIME=0;MV=1;MA=1;`
    pub fn to_text(&self) -> String {
        let mut text = String::new();
        if let Some(kind) = &self.kind {
            text.push_str(kind);
            text.push(TERMINATOR);
        }
        for (key, value) in &self.fields {
            text.push_str(key);
            text.push('=');
            text.push_str(value);
            text.push(TERMINATOR);
        }
        text
    }
}

/// Build a command datagram: `<NAME>;KEY=VALUE;...`
///
/// Fields are written in the order given; every command places `CMD` first.
pub fn encode_command(name: &str, fields: &[(&str, &str)]) -> Vec<u8> {
    let mut text = String::with_capacity(64);
    text.push_str(name);
    text.push(TERMINATOR);
    for (key, value) in fields {
        text.push_str(key);
        text.push('=');
        text.push_str(value);
        text.push(TERMINATOR);
    }
    latin1_encode(&text)
}

/// Map each byte to the character with the same code point
pub fn latin1_decode(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

/// Map each character to one byte; characters above U+00FF become `?`
pub fn latin1_encode(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
        .collect()
}

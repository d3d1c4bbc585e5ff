//! Custom tracing layer that renders log events as status lines
//!
//! Every event becomes one append-only line with a severity prefix, e.g.
//! `[INFO]: Session: Connected to test device at 127.0.0.1:49181`.

use std::io::Write;
use std::sync::mpsc::Sender;

use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::Layer;

/// A log event captured from tracing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    /// Optional `source` field of the event
    pub source: Option<String>,
    /// Severity level
    pub level: Level,
    /// Log message
    pub message: String,
}

impl LogLine {
    /// Render as `[LEVEL]: [source: ]message`
    pub fn render(&self) -> String {
        match &self.source {
            Some(source) => format!("[{}]: {}: {}", severity_tag(self.level), source, self.message),
            None => format!("[{}]: {}", severity_tag(self.level), self.message),
        }
    }
}

fn severity_tag(level: Level) -> &'static str {
    match level {
        Level::ERROR => "ERROR",
        Level::WARN => "WARN",
        Level::INFO => "INFO",
        Level::DEBUG => "DEBUG",
        Level::TRACE => "TRACE",
    }
}

/// Destination for rendered log lines
pub trait LogSink: Send + Sync + 'static {
    /// Append one line
    fn append(&self, line: LogLine);
}

impl LogSink for Sender<LogLine> {
    fn append(&self, line: LogLine) {
        // Ignore errors if receiver is dropped
        let _ = self.send(line);
    }
}

/// Writes each line to stdout as it arrives
#[derive(Debug, Default)]
pub struct StdoutSink;

impl LogSink for StdoutSink {
    fn append(&self, line: LogLine) {
        let mut out = std::io::stdout().lock();
        let _ = writeln!(out, "{}", line.render());
        let _ = out.flush();
    }
}

/// Tracing layer forwarding every event to a [`LogSink`]
pub struct LogSinkLayer<K> {
    sink: K,
}

impl<K: LogSink> LogSinkLayer<K> {
    /// Create a layer writing to the given sink
    pub fn new(sink: K) -> Self {
        Self { sink }
    }
}

impl<S: Subscriber, K: LogSink> Layer<S> for LogSinkLayer<K> {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        // Filtering is handled by the EnvFilter on the registry
        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);

        self.sink.append(LogLine {
            source: visitor.source,
            level: *event.metadata().level(),
            message: visitor.message.unwrap_or_default(),
        });
    }
}

/// Visitor to extract message and optional source from tracing fields
#[derive(Default)]
struct MessageVisitor {
    message: Option<String>,
    source: Option<String>,
}

impl Visit for MessageVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        match field.name() {
            "message" => self.message = Some(value.to_string()),
            "source" => self.source = Some(value.to_string()),
            _ => {}
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        match field.name() {
            "message" => self.message = Some(format!("{:?}", value)),
            "source" => self.source = Some(format!("{:?}", value)),
            _ => {}
        }
    }
}

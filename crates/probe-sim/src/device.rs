//! Simulated test device
//!
//! Answers START/STOP commands the way the hardware does and generates
//! status frames while a run is active. The device has no I/O of its own:
//! replies and status frames are queued and drained with [`SimDevice::take_output`].

use std::collections::VecDeque;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use probe_protocol::frame::latin1_encode;
use probe_protocol::TestCommand;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Reply to START while idle
pub const REPLY_STARTED: &[u8] = b"TEST;RESULT=STARTED;";
/// Reply to STOP while running
pub const REPLY_STOPPED: &[u8] = b"TEST;RESULT=STOPPED;";
/// Reply to START while running
pub const REPLY_ALREADY_RUNNING: &[u8] =
    b"TEST;RESULT=ERROR;MSG=TEST ALREADY RUNNING. STOP CURRENT TEST FIRST.";
/// Reply to STOP while idle
pub const REPLY_NOT_RUNNING: &[u8] = b"TEST;RESULT=ERROR;MSG=NO TEST CURRENTLY RUNNING.";
/// Final status after a run ends
pub const STATUS_IDLE: &[u8] = b"STATUS;STATE=IDLE;";

/// Source of simulated millivolt/milliamp readings
pub trait ReadingSource: Send {
    /// Next (millivolts, milliamps) pair
    fn next_reading(&mut self) -> (i64, i64);
}

/// Pseudo-random readings in [-10, 9], like the hardware's test load
#[derive(Debug, Clone)]
pub struct RandomReadings {
    state: u64,
}

impl RandomReadings {
    /// Create a generator with a fixed seed
    pub fn with_seed(seed: u64) -> Self {
        // xorshift must never hold zero
        Self {
            state: seed.max(1),
        }
    }

    /// Create a generator seeded from the system clock
    pub fn from_clock() -> Self {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0x9E37_79B9_7F4A_7C15);
        Self::with_seed(nanos)
    }

    fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }
}

impl ReadingSource for RandomReadings {
    fn next_reading(&mut self) -> (i64, i64) {
        let mv = (self.next_u64() % 20) as i64 - 10;
        let ma = (self.next_u64() % 20) as i64 - 10;
        (mv, ma)
    }
}

/// Replays a fixed list of readings, cycling when exhausted
#[derive(Debug, Clone)]
pub struct FixedReadings {
    readings: Vec<(i64, i64)>,
    next: usize,
}

impl FixedReadings {
    /// Create from a list; an empty list yields zeros
    pub fn new(readings: Vec<(i64, i64)>) -> Self {
        Self { readings, next: 0 }
    }
}

impl ReadingSource for FixedReadings {
    fn next_reading(&mut self) -> (i64, i64) {
        if self.readings.is_empty() {
            return (0, 0);
        }
        let reading = self.readings[self.next % self.readings.len()];
        self.next = self.next.wrapping_add(1);
        reading
    }
}

/// Configuration for creating a simulated device
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SimDeviceConfig {
    /// Display name/identifier
    pub id: String,
    /// Seed for the reading generator; `None` seeds from the clock
    #[serde(default)]
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Copy)]
struct Run {
    started: Instant,
    duration: Duration,
    rate: Duration,
}

/// A simulated test device
pub struct SimDevice {
    id: String,
    run: Option<Run>,
    readings: Box<dyn ReadingSource>,
    pending_output: VecDeque<Vec<u8>>,
}

impl std::fmt::Debug for SimDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimDevice")
            .field("id", &self.id)
            .field("run", &self.run)
            .field("pending_output", &self.pending_output.len())
            .finish()
    }
}

impl SimDevice {
    /// Create a device with clock-seeded random readings
    pub fn new(id: impl Into<String>) -> Self {
        Self::with_readings(id, RandomReadings::from_clock())
    }

    /// Create a device with a custom reading source
    pub fn with_readings(id: impl Into<String>, readings: impl ReadingSource + 'static) -> Self {
        Self {
            id: id.into(),
            run: None,
            readings: Box::new(readings),
            pending_output: VecDeque::new(),
        }
    }

    /// Create a device from configuration
    pub fn from_config(config: SimDeviceConfig) -> Self {
        match config.seed {
            Some(seed) => Self::with_readings(config.id, RandomReadings::with_seed(seed)),
            None => Self::new(config.id),
        }
    }

    /// Device identifier
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Whether a run is in progress
    pub fn is_running(&self) -> bool {
        self.run.is_some()
    }

    /// Interval between status frames of the current run
    pub fn rate(&self) -> Option<Duration> {
        self.run.map(|r| r.rate)
    }

    /// Handle one inbound datagram, queueing any reply
    ///
    /// Unknown datagrams are ignored.
    pub fn handle_command(&mut self, payload: &[u8], now: Instant) {
        match TestCommand::decode(payload) {
            Some(TestCommand::Start {
                duration_secs,
                rate_ms,
            }) => {
                if self.run.is_some() {
                    self.queue(REPLY_ALREADY_RUNNING.to_vec());
                    return;
                }
                self.run = Some(Run {
                    started: now,
                    duration: Duration::from_secs(u64::from(duration_secs)),
                    rate: Duration::from_millis(u64::from(rate_ms.max(1))),
                });
                info!(
                    "Sim device {} starting test: {} s at {} ms",
                    self.id, duration_secs, rate_ms
                );
                self.queue(REPLY_STARTED.to_vec());
            }
            Some(TestCommand::Stop) => {
                if self.run.take().is_some() {
                    info!("Sim device {} stopping test", self.id);
                    self.queue(REPLY_STOPPED.to_vec());
                    self.queue(STATUS_IDLE.to_vec());
                } else {
                    self.queue(REPLY_NOT_RUNNING.to_vec());
                }
            }
            None => {
                debug!(
                    "Sim device {} ignoring datagram: {:?}",
                    self.id,
                    String::from_utf8_lossy(payload)
                );
            }
        }
    }

    /// Emit one status frame for the current run
    ///
    /// Once the run duration has elapsed the final idle status is queued and
    /// the device returns to idle.
    pub fn tick(&mut self, now: Instant) {
        let Some(run) = self.run else {
            return;
        };

        let elapsed = now.saturating_duration_since(run.started);
        let frame = self.status_frame(elapsed.as_millis() as u64);
        self.queue(frame);

        if elapsed >= run.duration {
            info!("Sim device {} test complete", self.id);
            self.run = None;
            self.queue(STATUS_IDLE.to_vec());
        }
    }

    /// Build `STATUS;TIME=<ms>;MV=<mv>;MA=<ma>;` with the next reading
    pub fn status_frame(&mut self, elapsed_ms: u64) -> Vec<u8> {
        let (mv, ma) = self.readings.next_reading();
        latin1_encode(&format!(
            "STATUS;TIME={};MV={};MA={};",
            elapsed_ms, mv, ma
        ))
    }

    fn queue(&mut self, data: Vec<u8>) {
        self.pending_output.push_back(data);
    }

    /// Take the next pending datagram
    pub fn take_output(&mut self) -> Option<Vec<u8>> {
        self.pending_output.pop_front()
    }

    /// Whether output is pending
    pub fn has_output(&self) -> bool {
        !self.pending_output.is_empty()
    }
}

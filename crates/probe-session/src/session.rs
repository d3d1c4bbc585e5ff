//! Telemetry session
//!
//! Owns the datagram socket, the device endpoint and the connection/test
//! state. The session is pull based: the caller drives [`TelemetrySession::poll`]
//! from whatever scheduler it likes (interval task, event loop tick).
//!
//! # State machine
//!
//! - `Disconnected` → `connect` → `Connected`
//! - `Connected` → `connect` → `Connected` (previous socket dropped first)
//! - `Idle` → `start_test` → `Running`
//! - `Running` → device reports `STATE=IDLE` → `Idle`
//!
//! `stop_test` only asks the device to stop; the device decides when the
//! run is over, and polling continues so trailing samples are kept.

use std::io::ErrorKind;
use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use probe_protocol::frame::latin1_decode;
use probe_protocol::{
    DeviceMessage, EncodeCommand, Endpoint, Frame, Sample, TestCommand, MAX_DATAGRAM_LEN,
};
use serde::{Deserialize, Serialize};
use tokio::net::UdpSocket;
use tracing::{debug, error, info, warn};

use crate::buffer::{SampleBuffer, DEFAULT_WINDOW_SIZE};
use crate::error::{ConnectError, TestError};

/// Session tuning
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionConfig {
    /// Display window capacity
    #[serde(default = "default_window_size")]
    pub window_size: usize,
    /// Longest time a single poll waits for a datagram
    #[serde(default = "default_poll_timeout_ms")]
    pub poll_timeout_ms: u64,
    /// Largest datagram read per poll; longer datagrams are truncated
    #[serde(default = "default_recv_buffer_size")]
    pub recv_buffer_size: usize,
}

fn default_window_size() -> usize {
    DEFAULT_WINDOW_SIZE
}

fn default_poll_timeout_ms() -> u64 {
    1
}

fn default_recv_buffer_size() -> usize {
    MAX_DATAGRAM_LEN
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            window_size: default_window_size(),
            poll_timeout_ms: default_poll_timeout_ms(),
            recv_buffer_size: default_recv_buffer_size(),
        }
    }
}

impl SessionConfig {
    /// Poll timeout as a duration
    pub fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.poll_timeout_ms)
    }
}

/// Whether a socket is bound to a device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connected,
}

/// Whether the device is running a test, as far as the client knows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TestState {
    #[default]
    Idle,
    Running,
}

/// Point-in-time summary of a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStatus {
    /// Device endpoint, once connected
    pub endpoint: Option<Endpoint>,
    /// Connection state
    pub connection: ConnectionState,
    /// Test state
    pub test: TestState,
    /// Samples collected in the current run
    pub run_samples: usize,
}

/// Client side of one device session
#[derive(Debug)]
pub struct TelemetrySession {
    config: SessionConfig,
    endpoint: Option<Endpoint>,
    socket: Option<UdpSocket>,
    test_state: TestState,
    buffer: SampleBuffer,
    recv_buf: Vec<u8>,
}

impl TelemetrySession {
    /// Create a disconnected session with default settings
    pub fn new() -> Self {
        Self::with_config(SessionConfig::default())
    }

    /// Create a disconnected session
    pub fn with_config(config: SessionConfig) -> Self {
        let buffer = SampleBuffer::with_window_size(config.window_size);
        let recv_buf = vec![0u8; config.recv_buffer_size.max(1)];
        Self {
            config,
            endpoint: None,
            socket: None,
            test_state: TestState::Idle,
            buffer,
            recv_buf,
        }
    }

    /// Session configuration
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Device endpoint, once connected
    pub fn endpoint(&self) -> Option<Endpoint> {
        self.endpoint
    }

    /// Current connection state
    pub fn connection_state(&self) -> ConnectionState {
        if self.socket.is_some() {
            ConnectionState::Connected
        } else {
            ConnectionState::Disconnected
        }
    }

    /// Current test state
    pub fn test_state(&self) -> TestState {
        self.test_state
    }

    /// Local address of the bound socket
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.socket.as_ref().and_then(|s| s.local_addr().ok())
    }

    /// Summary for status displays
    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            endpoint: self.endpoint,
            connection: self.connection_state(),
            test: self.test_state,
            run_samples: self.buffer.run_len(),
        }
    }

    /// Copy of the display window
    pub fn snapshot_display(&self) -> Vec<Sample> {
        self.buffer.snapshot_display()
    }

    /// Copy of the current run
    pub fn snapshot_run(&self) -> Vec<Sample> {
        self.buffer.snapshot_run()
    }

    /// Bind a socket for the device at `host:port`
    ///
    /// A previous socket is released before the new one is bound. An invalid
    /// endpoint leaves the current connection untouched; a bind failure
    /// leaves the session disconnected.
    pub async fn connect(&mut self, input: &str) -> Result<Endpoint, ConnectError> {
        let result = self.try_connect(input).await;
        match &result {
            Ok(endpoint) => info!(source = "Session", "Connected to test device at {}", endpoint),
            Err(e) => error!(source = "Session", "Connect failed: {}", e),
        }
        result
    }

    async fn try_connect(&mut self, input: &str) -> Result<Endpoint, ConnectError> {
        let endpoint = Endpoint::parse(input)?;

        if let Some(previous) = self.socket.take() {
            debug!(
                "Releasing socket {:?} for {:?}",
                previous.local_addr().ok(),
                self.endpoint
            );
            drop(previous);
        }
        self.endpoint = None;
        self.test_state = TestState::Idle;

        let socket = UdpSocket::bind(SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0))).await?;
        socket.connect(endpoint.socket_addr()).await?;
        debug!("Bound {:?} for device {}", socket.local_addr().ok(), endpoint);

        self.socket = Some(socket);
        self.endpoint = Some(endpoint);
        Ok(endpoint)
    }

    /// Clear the buffers and ask the device to start a run
    ///
    /// Both values are raw user input and must be positive whole numbers.
    pub async fn start_test(&mut self, duration_secs: &str, rate_ms: &str) -> Result<(), TestError> {
        let result = self.try_start_test(duration_secs, rate_ms).await;
        if let Err(e) = &result {
            error!(source = "Session", "Start failed: {}", e);
        }
        result
    }

    async fn try_start_test(&mut self, duration_secs: &str, rate_ms: &str) -> Result<(), TestError> {
        if self.socket.is_none() {
            return Err(TestError::NotConnected);
        }
        let duration_secs = parse_positive("duration", duration_secs)?;
        let rate_ms = parse_positive("rate", rate_ms)?;

        self.buffer.clear();
        self.send(TestCommand::Start {
            duration_secs,
            rate_ms,
        })
        .await?;
        self.test_state = TestState::Running;

        info!(
            source = "Session",
            "Started test: {} s at {} ms per sample", duration_secs, rate_ms
        );
        Ok(())
    }

    /// Ask the device to stop the current run
    ///
    /// Buffers are kept so a partial run can still be exported.
    pub async fn stop_test(&mut self) -> Result<(), TestError> {
        let result = self.try_stop_test().await;
        match &result {
            Ok(()) => info!(source = "Session", "Sent stop request"),
            Err(e) => error!(source = "Session", "Stop failed: {}", e),
        }
        result
    }

    async fn try_stop_test(&mut self) -> Result<(), TestError> {
        if self.socket.is_none() {
            return Err(TestError::NotConnected);
        }
        self.send(TestCommand::Stop).await
    }

    /// Reset both buffer views without telling the device
    pub fn clear_test(&mut self) {
        self.buffer.clear();
        info!(source = "Session", "Cleared test data");
    }

    async fn send(&self, command: TestCommand) -> Result<(), TestError> {
        let socket = self.socket.as_ref().ok_or(TestError::NotConnected)?;
        let payload = command.encode();
        socket.send(&payload).await?;
        debug!("Sent {}", latin1_decode(&payload));
        Ok(())
    }

    /// Read at most one datagram from the device
    ///
    /// Waits no longer than the configured poll timeout. Returns the decoded
    /// frame, or nothing when disconnected, idle, or on a receive error.
    /// Samples are appended to both buffer views.
    /// Buffering does not depend on the test state.
    pub async fn poll(&mut self) -> Vec<Frame> {
        let Some(socket) = self.socket.as_ref() else {
            return Vec::new();
        };

        match tokio::time::timeout(self.config.poll_timeout(), socket.readable()).await {
            Err(_) => return Vec::new(),
            Ok(Err(e)) => {
                warn!("Socket readiness check failed: {}", e);
                return Vec::new();
            }
            Ok(Ok(())) => {}
        }

        let len = match socket.try_recv(&mut self.recv_buf) {
            Ok(len) => len,
            Err(e) if e.kind() == ErrorKind::WouldBlock => return Vec::new(),
            Err(e) => {
                warn!("Receive from device failed: {}", e);
                return Vec::new();
            }
        };

        let payload = &self.recv_buf[..len];
        info!(source = "Device", "{}", latin1_decode(payload));
        let frame = Frame::decode(payload);
        self.apply(&frame);

        vec![frame]
    }

    fn apply(&mut self, frame: &Frame) {
        match DeviceMessage::from_frame(frame) {
            DeviceMessage::Status(sample) => {
                self.buffer.push(sample);
            }
            DeviceMessage::Idle => {
                if self.test_state == TestState::Running {
                    info!(source = "Session", "Device reports test finished");
                }
                self.test_state = TestState::Idle;
            }
            DeviceMessage::Started => {
                self.test_state = TestState::Running;
            }
            DeviceMessage::Stopped => {
                debug!("Device acknowledged stop");
            }
            DeviceMessage::Rejected { message } => {
                error!(source = "Device", "Device rejected command: {}", message);
            }
            DeviceMessage::Other(frame) => {
                if let Err(reason) = frame.sample() {
                    debug!("Frame is not a sample: {}", reason);
                }
            }
        }
    }
}

impl Default for TelemetrySession {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_positive(field: &'static str, value: &str) -> Result<u32, TestError> {
    let invalid = || TestError::InvalidParameters {
        field,
        value: value.to_string(),
    };
    let trimmed = value.trim();
    if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    match trimmed.parse::<u32>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(invalid()),
    }
}

//! Telemetry Session Engine
//!
//! This crate drives a remote test device over UDP: it binds the session
//! socket, issues START/STOP commands, and decodes inbound telemetry into
//! a rolling sample buffer for live display and report export.
//!
//! # Architecture
//!
//! - [`SampleBuffer`] holds a fixed-size display window and the unbounded
//!   accumulation of the current run
//! - [`TelemetrySession`] owns the socket and the connection/test state and
//!   exposes a pull-based, non-blocking [`TelemetrySession::poll`]
//! - [`run_session_task`] / [`SessionHandle`] run a session on its own task,
//!   publishing [`SessionEvent`]s and display snapshots through channels
//!
//! # Example
//!
//! ```rust,no_run
//! use probe_session::TelemetrySession;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let mut session = TelemetrySession::new();
//! session.connect("127.0.0.1:49181").await?;
//! session.start_test("3", "100").await?;
//!
//! loop {
//!     for frame in session.poll().await {
//!         println!("{}", frame.to_text());
//!     }
//!     tokio::time::sleep(std::time::Duration::from_millis(1)).await;
//! }
//! # }
//! ```

pub mod buffer;
pub mod error;
pub mod events;
pub mod session;
pub mod task;

pub use buffer::{SampleBuffer, DEFAULT_WINDOW_SIZE};
pub use error::{ConnectError, TestError};
pub use events::SessionEvent;
pub use session::{ConnectionState, SessionConfig, SessionStatus, TelemetrySession, TestState};
pub use task::{run_session_task, SessionCommand, SessionHandle};

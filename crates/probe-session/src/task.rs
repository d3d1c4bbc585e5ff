//! Session actor task
//!
//! Runs a [`TelemetrySession`] on its own task so decode latency never
//! couples to the UI. The task selects over:
//! - commands from a [`SessionHandle`]
//! - a fixed-period poll tick
//!
//! Events go out on a broadcast channel. The display window is published on
//! a watch channel after every applied sample or clear, so a reader always
//! sees a whole window.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use probe_session::{SessionHandle, TelemetrySession};
//!
//! # async fn run() {
//! let (handle, _task) = SessionHandle::spawn(TelemetrySession::new(), Duration::from_millis(1));
//! handle.connect("127.0.0.1:49181").await.ok();
//! handle.start_test("3", "100").await.ok();
//! let window = handle.display().borrow().clone();
//! # }
//! ```

use std::time::Duration;

use probe_protocol::{DeviceMessage, Endpoint, Sample};
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

use crate::error::{ConnectError, TestError};
use crate::events::SessionEvent;
use crate::session::{SessionStatus, TelemetrySession, TestState};

/// Capacity of the command channel
const COMMAND_CHANNEL_SIZE: usize = 64;

/// Capacity of the event channel; slow subscribers see `Lagged`
const EVENT_CHANNEL_SIZE: usize = 1024;

/// Commands sent to the session task
#[derive(Debug)]
pub enum SessionCommand {
    /// Bind a socket for `host:port`
    Connect {
        endpoint: String,
        response: oneshot::Sender<Result<Endpoint, ConnectError>>,
    },
    /// Clear buffers and send START
    StartTest {
        duration_secs: String,
        rate_ms: String,
        response: oneshot::Sender<Result<(), TestError>>,
    },
    /// Send STOP
    StopTest {
        response: oneshot::Sender<Result<(), TestError>>,
    },
    /// Clear buffers without sending anything
    ClearTest,
    /// Copy of the current run for export
    SnapshotRun {
        response: oneshot::Sender<Vec<Sample>>,
    },
    /// Session summary
    Status {
        response: oneshot::Sender<SessionStatus>,
    },
    /// Stop the task
    Shutdown,
}

/// Run the session task until shutdown or until every handle is dropped
pub async fn run_session_task(
    mut session: TelemetrySession,
    mut cmd_rx: mpsc::Receiver<SessionCommand>,
    event_tx: broadcast::Sender<SessionEvent>,
    display_tx: watch::Sender<Vec<Sample>>,
    poll_period: Duration,
) {
    info!("Session task started");
    display_tx.send_replace(session.snapshot_display());

    let mut ticker = interval(poll_period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => {
                let Some(cmd) = cmd else {
                    debug!("Session command channel closed");
                    break;
                };
                match cmd {
                    SessionCommand::Connect { endpoint, response } => {
                        let result = session.connect(&endpoint).await;
                        if let Ok(endpoint) = &result {
                            let _ = event_tx.send(SessionEvent::Connected { endpoint: *endpoint });
                        }
                        let _ = response.send(result);
                    }
                    SessionCommand::StartTest { duration_secs, rate_ms, response } => {
                        let result = session.start_test(&duration_secs, &rate_ms).await;
                        if result.is_ok() {
                            display_tx.send_replace(session.snapshot_display());
                            let _ = event_tx.send(SessionEvent::TestStarted { duration_secs, rate_ms });
                        }
                        let _ = response.send(result);
                    }
                    SessionCommand::StopTest { response } => {
                        let result = session.stop_test().await;
                        if result.is_ok() {
                            let _ = event_tx.send(SessionEvent::StopRequested);
                        }
                        let _ = response.send(result);
                    }
                    SessionCommand::ClearTest => {
                        session.clear_test();
                        display_tx.send_replace(session.snapshot_display());
                        let _ = event_tx.send(SessionEvent::Cleared);
                    }
                    SessionCommand::SnapshotRun { response } => {
                        let _ = response.send(session.snapshot_run());
                    }
                    SessionCommand::Status { response } => {
                        let _ = response.send(session.status());
                    }
                    SessionCommand::Shutdown => {
                        info!("Shutdown requested for session task");
                        break;
                    }
                }
            }

            _ = ticker.tick() => {
                let was_running = session.test_state() == TestState::Running;
                let mut window_changed = false;

                for frame in session.poll().await {
                    match DeviceMessage::from_frame(&frame) {
                        DeviceMessage::Status(sample) => {
                            window_changed = true;
                            let _ = event_tx.send(SessionEvent::SampleReceived(sample));
                        }
                        DeviceMessage::Rejected { message } => {
                            let _ = event_tx.send(SessionEvent::DeviceRejected { message });
                        }
                        _ => {}
                    }
                    let _ = event_tx.send(SessionEvent::FrameReceived(frame));
                }

                if window_changed {
                    display_tx.send_replace(session.snapshot_display());
                }
                if was_running && session.test_state() == TestState::Idle {
                    let _ = event_tx.send(SessionEvent::TestFinished);
                }
            }
        }
    }

    info!("Session task ended");
}

/// Cloneable handle to a running session task
#[derive(Debug, Clone)]
pub struct SessionHandle {
    cmd_tx: mpsc::Sender<SessionCommand>,
    event_tx: broadcast::Sender<SessionEvent>,
    display_rx: watch::Receiver<Vec<Sample>>,
}

impl SessionHandle {
    /// Spawn a session task polling every `poll_period`
    pub fn spawn(session: TelemetrySession, poll_period: Duration) -> (Self, JoinHandle<()>) {
        let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_CHANNEL_SIZE);
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_SIZE);
        let (display_tx, display_rx) = watch::channel(session.snapshot_display());

        let task = tokio::spawn(run_session_task(
            session,
            cmd_rx,
            event_tx.clone(),
            display_tx,
            poll_period,
        ));

        (
            Self {
                cmd_tx,
                event_tx,
                display_rx,
            },
            task,
        )
    }

    /// Subscribe to session events
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.event_tx.subscribe()
    }

    /// Latest display window
    pub fn display(&self) -> watch::Receiver<Vec<Sample>> {
        self.display_rx.clone()
    }

    /// Connect to `host:port`
    pub async fn connect(&self, endpoint: &str) -> Result<Endpoint, ConnectError> {
        let (response, rx) = oneshot::channel();
        self.cmd_tx
            .send(SessionCommand::Connect {
                endpoint: endpoint.to_string(),
                response,
            })
            .await
            .map_err(|_| ConnectError::SessionClosed)?;
        rx.await.map_err(|_| ConnectError::SessionClosed)?
    }

    /// Start a run
    pub async fn start_test(&self, duration_secs: &str, rate_ms: &str) -> Result<(), TestError> {
        let (response, rx) = oneshot::channel();
        self.cmd_tx
            .send(SessionCommand::StartTest {
                duration_secs: duration_secs.to_string(),
                rate_ms: rate_ms.to_string(),
                response,
            })
            .await
            .map_err(|_| TestError::SessionClosed)?;
        rx.await.map_err(|_| TestError::SessionClosed)?
    }

    /// Ask the device to stop
    pub async fn stop_test(&self) -> Result<(), TestError> {
        let (response, rx) = oneshot::channel();
        self.cmd_tx
            .send(SessionCommand::StopTest { response })
            .await
            .map_err(|_| TestError::SessionClosed)?;
        rx.await.map_err(|_| TestError::SessionClosed)?
    }

    /// Clear both buffer views
    pub async fn clear_test(&self) {
        let _ = self.cmd_tx.send(SessionCommand::ClearTest).await;
    }

    /// Copy of the current run, empty if the task is gone
    pub async fn snapshot_run(&self) -> Vec<Sample> {
        let (response, rx) = oneshot::channel();
        if self
            .cmd_tx
            .send(SessionCommand::SnapshotRun { response })
            .await
            .is_err()
        {
            return Vec::new();
        }
        rx.await.unwrap_or_default()
    }

    /// Session summary, `None` if the task is gone
    pub async fn status(&self) -> Option<SessionStatus> {
        let (response, rx) = oneshot::channel();
        self.cmd_tx
            .send(SessionCommand::Status { response })
            .await
            .ok()?;
        rx.await.ok()
    }

    /// Stop the task
    pub async fn shutdown(&self) {
        let _ = self.cmd_tx.send(SessionCommand::Shutdown).await;
    }
}

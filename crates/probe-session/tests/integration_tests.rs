//! Integration tests for the telemetry session
//!
//! These tests verify end-to-end behavior over loopback UDP:
//! - START/STOP commands reaching a raw peer socket
//! - Telemetry decoding into the run accumulation in arrival order
//! - A full run against the simulated device, including the final idle report

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use probe_protocol::{Frame, Sample};
use probe_session::{ConnectionState, SessionEvent, SessionHandle, TelemetrySession, TestState};
use probe_sim::{bind_device_socket, run_sim_device_task, FixedReadings, SimDevice, SimDeviceCommand};
use tokio::net::UdpSocket;
use tokio::sync::mpsc;

// ============================================================================
// Helper Functions
// ============================================================================

mod helpers {
    use super::*;

    /// Poll until one frame arrives, failing after two seconds
    pub async fn poll_one(session: &mut TelemetrySession) -> Vec<Frame> {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        while tokio::time::Instant::now() < deadline {
            let frames = session.poll().await;
            if !frames.is_empty() {
                return frames;
            }
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        panic!("timed out waiting for a frame");
    }

    /// Poll until the session reports the run has ended
    pub async fn poll_until_idle(session: &mut TelemetrySession) {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        while session.test_state() == TestState::Running {
            assert!(tokio::time::Instant::now() < deadline, "run never ended");
            session.poll().await;
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    }

    /// Spawn a simulated device on an ephemeral loopback port
    pub async fn spawn_sim(
        readings: Vec<(i64, i64)>,
    ) -> (String, mpsc::Sender<SimDeviceCommand>) {
        let socket = bind_device_socket(0).await.unwrap();
        let addr = socket.local_addr().unwrap().to_string();
        let device = SimDevice::with_readings("Test Device", FixedReadings::new(readings));
        let (cmd_tx, cmd_rx) = mpsc::channel(8);
        tokio::spawn(run_sim_device_task(socket, device, cmd_rx));
        (addr, cmd_tx)
    }
}

// ============================================================================
// Raw peer
// ============================================================================

#[tokio::test]
async fn test_two_samples_from_peer() {
    let peer = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let endpoint = peer.local_addr().unwrap().to_string();

    let mut session = TelemetrySession::new();
    session.connect(&endpoint).await.unwrap();
    assert_eq!(session.connection_state(), ConnectionState::Connected);
    session.start_test("3", "100").await.unwrap();

    let mut buf = [0u8; 128];
    let (len, from) = peer.recv_from(&mut buf).await.unwrap();
    assert_eq!(&buf[..len], b"TEST;CMD=START;DURATION=3;RATE=100;");
    let client = SocketAddr::from((Ipv4Addr::LOCALHOST, from.port()));

    peer.send_to(b"TIME=0;MV=1;MA=1;", client).await.unwrap();
    let first = helpers::poll_one(&mut session).await;
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].sample(), Ok(Sample::new(0, 1, 1)));

    peer.send_to(b"TIME=100;MV=2;MA=2;", client).await.unwrap();
    let second = helpers::poll_one(&mut session).await;
    assert_eq!(second.len(), 1);
    assert_eq!(second[0].sample(), Ok(Sample::new(100, 2, 2)));

    assert_eq!(
        session.snapshot_run(),
        vec![Sample::new(0, 1, 1), Sample::new(100, 2, 2)]
    );
}

#[tokio::test]
async fn test_stop_keeps_partial_run() {
    let peer = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let endpoint = peer.local_addr().unwrap().to_string();

    let mut session = TelemetrySession::new();
    session.connect(&endpoint).await.unwrap();
    session.start_test("10", "50").await.unwrap();

    let mut buf = [0u8; 128];
    let (_, from) = peer.recv_from(&mut buf).await.unwrap();
    let client = SocketAddr::from((Ipv4Addr::LOCALHOST, from.port()));

    peer.send_to(b"STATUS;TIME=837;MV=3;MA=4;", client).await.unwrap();
    helpers::poll_one(&mut session).await;

    session.stop_test().await.unwrap();
    let (len, _) = peer.recv_from(&mut buf).await.unwrap();
    assert_eq!(&buf[..len], b"TEST;CMD=STOP;");

    // Samples arriving after STOP are still collected
    peer.send_to(b"STATUS;TIME=1090;MV=5;MA=6;", client).await.unwrap();
    helpers::poll_one(&mut session).await;

    assert_eq!(
        session.snapshot_run(),
        vec![Sample::new(0, 3, 4), Sample::new(1090, 5, 6)]
    );
    assert_eq!(session.test_state(), TestState::Running);
}

#[tokio::test]
async fn test_restart_clears_previous_run() {
    let peer = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let endpoint = peer.local_addr().unwrap().to_string();

    let mut session = TelemetrySession::new();
    session.connect(&endpoint).await.unwrap();
    session.start_test("1", "10").await.unwrap();

    let mut buf = [0u8; 128];
    let (_, from) = peer.recv_from(&mut buf).await.unwrap();
    let client = SocketAddr::from((Ipv4Addr::LOCALHOST, from.port()));
    peer.send_to(b"STATUS;TIME=5;MV=1;MA=1;", client).await.unwrap();
    helpers::poll_one(&mut session).await;
    assert_eq!(session.snapshot_run().len(), 1);

    session.start_test("1", "10").await.unwrap();
    assert!(session.snapshot_run().is_empty());
    assert!(session
        .snapshot_display()
        .iter()
        .all(|s| *s == Sample::default()));
}

// ============================================================================
// Simulated device
// ============================================================================

#[tokio::test]
async fn test_full_run_against_sim_device() {
    let (endpoint, sim_tx) = helpers::spawn_sim(vec![(5, 2), (6, 3)]).await;

    let mut session = TelemetrySession::new();
    session.connect(&endpoint).await.unwrap();
    session.start_test("1", "100").await.unwrap();

    helpers::poll_until_idle(&mut session).await;

    let run = session.snapshot_run();
    assert!(run.len() >= 2, "expected several samples, got {}", run.len());
    assert_eq!(run[0].time_ms, 0);
    assert!(run.windows(2).all(|w| w[0].time_ms <= w[1].time_ms));
    assert!(run
        .iter()
        .all(|s| (s.millivolts, s.milliamps) == (5, 2) || (s.millivolts, s.milliamps) == (6, 3)));

    sim_tx.send(SimDeviceCommand::Shutdown).await.unwrap();
}

#[tokio::test]
async fn test_stop_against_sim_device_ends_run() {
    let (endpoint, sim_tx) = helpers::spawn_sim(vec![(1, 1)]).await;

    let mut session = TelemetrySession::new();
    session.connect(&endpoint).await.unwrap();
    session.start_test("60", "20").await.unwrap();

    helpers::poll_one(&mut session).await;
    session.stop_test().await.unwrap();
    helpers::poll_until_idle(&mut session).await;

    assert_eq!(session.test_state(), TestState::Idle);
    sim_tx.send(SimDeviceCommand::Shutdown).await.unwrap();
}

#[tokio::test]
async fn test_session_task_against_sim_device() {
    let (endpoint, sim_tx) = helpers::spawn_sim(vec![(7, 8)]).await;

    let (handle, task) = SessionHandle::spawn(TelemetrySession::new(), Duration::from_millis(1));
    let mut events = handle.subscribe();

    handle.connect(&endpoint).await.unwrap();
    handle.start_test("1", "100").await.unwrap();

    let finished = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if let Ok(SessionEvent::TestFinished) = events.recv().await {
                break;
            }
        }
    })
    .await;
    assert!(finished.is_ok(), "no TestFinished event");

    let run = handle.snapshot_run().await;
    assert!(!run.is_empty());
    assert_eq!(run[0], Sample::new(0, 7, 8));
    assert_eq!(handle.status().await.unwrap().test, TestState::Idle);

    handle.shutdown().await;
    task.await.unwrap();
    sim_tx.send(SimDeviceCommand::Shutdown).await.unwrap();
}

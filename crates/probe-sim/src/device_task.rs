//! Simulated device actor task
//!
//! Owns a [`SimDevice`] and a UDP socket. The task uses a select! loop to:
//! - Read command datagrams and reply to their sender
//! - Stream status frames at the run rate while a test is active
//! - Handle shutdown commands from a channel

use std::io;
use std::net::{Ipv4Addr, SocketAddr};
use std::time::{Duration, Instant};

use probe_protocol::MAX_DATAGRAM_LEN;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::time::{interval, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::device::SimDevice;
use crate::error::SimError;

/// Commands that can be sent to a simulated device task
#[derive(Debug, Clone)]
pub enum SimDeviceCommand {
    /// Shutdown the simulated device task
    Shutdown,
}

/// Bind the device socket on the loopback interface
pub async fn bind_device_socket(port: u16) -> Result<UdpSocket, SimError> {
    UdpSocket::bind(SocketAddr::from((Ipv4Addr::LOCALHOST, port)))
        .await
        .map_err(|source| SimError::Bind { port, source })
}

/// Run the simulated device task
///
/// Replies and status frames go to the sender of the most recent command.
pub async fn run_sim_device_task(
    socket: UdpSocket,
    mut device: SimDevice,
    mut cmd_rx: mpsc::Receiver<SimDeviceCommand>,
) -> io::Result<()> {
    let mut buf = [0u8; MAX_DATAGRAM_LEN];
    let mut peer: Option<SocketAddr> = None;
    let mut status_timer = status_interval(Duration::from_secs(1));

    info!(
        "Starting simulated device {} on {}",
        device.id(),
        socket.local_addr()?
    );

    loop {
        tokio::select! {
            result = socket.recv_from(&mut buf) => {
                match result {
                    Ok((n, from)) => {
                        debug!("Sim device {} received {} bytes from {}", device.id(), n, from);
                        let was_running = device.is_running();
                        peer = Some(from);
                        device.handle_command(&buf[..n], Instant::now());

                        if !was_running {
                            if let Some(rate) = device.rate() {
                                status_timer = status_interval(rate);
                            }
                        }
                    }
                    Err(e) => {
                        // ICMP errors from an earlier send surface here; keep serving
                        warn!("Sim device {} receive error: {}", device.id(), e);
                    }
                }
            }

            _ = status_timer.tick(), if device.is_running() => {
                device.tick(Instant::now());
            }

            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(SimDeviceCommand::Shutdown) => {
                        info!("Shutdown requested for simulated device {}", device.id());
                        break;
                    }
                    None => {
                        debug!("Command channel closed for simulated device {}", device.id());
                        break;
                    }
                }
            }
        }

        if let Some(to) = peer {
            while let Some(out) = device.take_output() {
                if let Err(e) = socket.send_to(&out, to).await {
                    warn!("Sim device {} failed to send to {}: {}", device.id(), to, e);
                }
            }
        }
    }

    info!("Simulated device task ended for {}", device.id());
    Ok(())
}

fn status_interval(period: Duration) -> Interval {
    let mut timer = interval(period);
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
    timer
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{FixedReadings, REPLY_NOT_RUNNING, REPLY_STARTED, STATUS_IDLE};
    use probe_protocol::{DeviceMessage, EncodeCommand, TestCommand};

    async fn recv(client: &UdpSocket) -> Vec<u8> {
        let mut buf = [0u8; MAX_DATAGRAM_LEN];
        let n = tokio::time::timeout(Duration::from_secs(2), client.recv(&mut buf))
            .await
            .unwrap()
            .unwrap();
        buf[..n].to_vec()
    }

    async fn spawn_device() -> (
        UdpSocket,
        mpsc::Sender<SimDeviceCommand>,
        tokio::task::JoinHandle<io::Result<()>>,
    ) {
        let socket = bind_device_socket(0).await.unwrap();
        let addr = socket.local_addr().unwrap();
        let device = SimDevice::with_readings("Test", FixedReadings::new(vec![(5, 2)]));
        let (cmd_tx, cmd_rx) = mpsc::channel(8);
        let task = tokio::spawn(run_sim_device_task(socket, device, cmd_rx));

        let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        client.connect(addr).await.unwrap();
        (client, cmd_tx, task)
    }

    #[tokio::test]
    async fn test_run_streams_status_then_idle() {
        let (client, cmd_tx, task) = spawn_device().await;

        let start = TestCommand::Start {
            duration_secs: 0,
            rate_ms: 10,
        };
        client.send(&start.encode()).await.unwrap();

        assert_eq!(recv(&client).await, REPLY_STARTED.to_vec());
        assert!(matches!(
            DeviceMessage::decode(&recv(&client).await),
            DeviceMessage::Status(s) if s.millivolts == 5 && s.milliamps == 2
        ));
        assert_eq!(recv(&client).await, STATUS_IDLE.to_vec());

        cmd_tx.send(SimDeviceCommand::Shutdown).await.unwrap();
        task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_stop_while_idle() {
        let (client, cmd_tx, task) = spawn_device().await;

        client.send(&TestCommand::Stop.encode()).await.unwrap();
        assert_eq!(recv(&client).await, REPLY_NOT_RUNNING.to_vec());

        drop(cmd_tx);
        task.await.unwrap().unwrap();
    }
}

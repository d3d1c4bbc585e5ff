//! Test Device Simulation Library
//!
//! This crate provides a simulated test device for exercising the telemetry
//! session without hardware. It includes:
//!
//! - **SimDevice**: the device state machine (START/STOP replies, status frames)
//! - **run_sim_device_task**: an async task serving a `SimDevice` over UDP
//!
//! # Example
//!
//! ```rust
//! use std::time::Instant;
//! use probe_protocol::{EncodeCommand, TestCommand};
//! use probe_sim::SimDevice;
//!
//! let mut device = SimDevice::new("bench-1");
//! let start = TestCommand::Start { duration_secs: 3, rate_ms: 100 };
//! device.handle_command(&start.encode(), Instant::now());
//!
//! while let Some(reply) = device.take_output() {
//!     println!("Device output: {}", String::from_utf8_lossy(&reply));
//! }
//! ```

pub mod device;
pub mod device_task;
pub mod error;

pub use device::{FixedReadings, RandomReadings, ReadingSource, SimDevice, SimDeviceConfig};
pub use device_task::{bind_device_socket, run_sim_device_task, SimDeviceCommand};
pub use error::{parse_port_arg, SimError};

//! Probekit - Remote Test Device Console
//!
//! Drives a test device over UDP: connect, start and stop runs, watch the
//! live display window and export runs as CSV. The `device` subcommand runs
//! a simulated device for bench work without hardware.

mod commands;
mod console;
mod log_layer;
mod report;
mod settings;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use log_layer::{LogSinkLayer, StdoutSink};
use probe_sim::{
    bind_device_socket, parse_port_arg, run_sim_device_task, SimDevice, SimDeviceCommand,
    SimDeviceConfig,
};
use settings::Settings;
use tokio::sync::mpsc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "probekit", version, about = "Remote test device console")]
struct Cli {
    /// Settings file (default: $XDG_CONFIG_HOME/probekit/settings.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Interactive console (default)
    Console {
        /// Connect to this `host:port` on startup
        #[arg(long)]
        endpoint: Option<String>,
    },
    /// Run a simulated device on 127.0.0.1
    Device {
        /// UDP port to listen on
        port: String,
        /// Seed for repeatable readings (default: seeded from the clock)
        #[arg(long)]
        seed: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    // Include all our crates in the default filter
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "probekit=info,probe_protocol=info,probe_session=info,probe_sim=info".into()
            }),
        )
        .with(LogSinkLayer::new(StdoutSink))
        .init();

    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Console { endpoint: None }) {
        Commands::Console { endpoint } => {
            let settings = Settings::load(cli.config.as_deref());
            console::run_console(settings, cli.config, endpoint).await;
            ExitCode::SUCCESS
        }
        Commands::Device { port, seed } => run_device(&port, seed).await,
    }
}

async fn run_device(port_arg: &str, seed: Option<u64>) -> ExitCode {
    let port = match parse_port_arg(port_arg) {
        Ok(port) => port,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let socket = match bind_device_socket(port).await {
        Ok(socket) => socket,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    info!("Successful setup; Listening on port: {}", port);

    let (cmd_tx, cmd_rx) = mpsc::channel(4);
    let device = SimDevice::from_config(SimDeviceConfig {
        id: format!("sim-{}", port),
        seed,
    });
    let task = tokio::spawn(run_sim_device_task(socket, device, cmd_rx));

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for Ctrl-C: {}", e);
    }
    let _ = cmd_tx.send(SimDeviceCommand::Shutdown).await;

    match task.await {
        Ok(Ok(())) => ExitCode::SUCCESS,
        Ok(Err(e)) => {
            error!("Simulated device failed: {}", e);
            ExitCode::FAILURE
        }
        Err(e) => {
            error!("Simulated device task panicked: {}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_seed_flag() {
        let cli = Cli::try_parse_from(["probekit", "device", "49181", "--seed", "7"]).unwrap();
        match cli.command {
            Some(Commands::Device { port, seed }) => {
                assert_eq!(port, "49181");
                assert_eq!(seed, Some(7));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_no_subcommand_defaults_to_console() {
        let cli = Cli::try_parse_from(["probekit", "--config", "/tmp/probekit.json"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/probekit.json")));
    }
}

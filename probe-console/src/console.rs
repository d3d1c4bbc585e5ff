//! Interactive console
//!
//! Reads commands from stdin and forwards them to a [`SessionHandle`]. The
//! select! loop also redraws the display window on a fixed period and keeps
//! the parameters of the current run for reports.

use std::path::PathBuf;
use std::time::Duration;

use probe_protocol::{Endpoint, Sample};
use probe_session::{SessionEvent, SessionHandle, TelemetrySession};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::commands::{ConsoleCommand, HELP};
use crate::report::{default_report_path, write_report, ReportInfo};
use crate::settings::Settings;

/// Console state outside the session
struct Console {
    handle: SessionHandle,
    settings: Settings,
    settings_path: Option<PathBuf>,
    report_info: ReportInfo,
}

impl Console {
    /// Handle one command; returns false on quit
    async fn execute(&mut self, command: ConsoleCommand) -> bool {
        match command {
            ConsoleCommand::Connect(endpoint) => {
                let endpoint = endpoint.unwrap_or_else(|| self.settings.endpoint.clone());
                // The session logs the outcome itself
                if let Ok(connected) = self.handle.connect(&endpoint).await {
                    self.remember_endpoint(connected);
                }
            }
            ConsoleCommand::Start {
                duration_secs,
                rate_ms,
            } => {
                let duration_secs =
                    duration_secs.unwrap_or_else(|| self.settings.default_duration_secs.to_string());
                let rate_ms = rate_ms.unwrap_or_else(|| self.settings.default_rate_ms.to_string());
                let _ = self.handle.start_test(&duration_secs, &rate_ms).await;
            }
            ConsoleCommand::Stop => {
                let _ = self.handle.stop_test().await;
            }
            ConsoleCommand::Clear => self.handle.clear_test().await,
            ConsoleCommand::Status => match self.handle.status().await {
                Some(status) => {
                    let endpoint = status
                        .endpoint
                        .map(|e| e.to_string())
                        .unwrap_or_else(|| "-".to_string());
                    println!(
                        "endpoint: {}  connection: {:?}  test: {:?}  samples: {}",
                        endpoint, status.connection, status.test, status.run_samples
                    );
                }
                None => error!("Session is no longer running"),
            },
            ConsoleCommand::Show => {
                let window = self.handle.display().borrow().clone();
                println!("{}", render_window(&window));
            }
            ConsoleCommand::Report(path) => self.export_report(path).await,
            ConsoleCommand::Help => println!("{}", HELP),
            ConsoleCommand::Quit => return false,
        }
        true
    }

    fn remember_endpoint(&mut self, endpoint: Endpoint) {
        self.report_info.endpoint = Some(endpoint);

        let endpoint = endpoint.to_string();
        if self.settings.endpoint == endpoint {
            return;
        }
        self.settings.endpoint = endpoint;
        match self.settings.save(self.settings_path.as_deref()) {
            Ok(path) => debug!("Saved settings to {}", path.display()),
            Err(e) => warn!("Failed to save settings: {}", e),
        }
    }

    async fn export_report(&self, path: Option<PathBuf>) {
        let path = path.unwrap_or_else(|| default_report_path(&self.settings.report_dir));
        let samples = self.handle.snapshot_run().await;
        match write_report(&path, &self.report_info, &samples) {
            Ok(path) => info!(
                "Report with {} samples written to {}",
                samples.len(),
                path.display()
            ),
            Err(e) => error!("{}", e),
        }
    }

    fn observe(&mut self, event: SessionEvent) {
        if let SessionEvent::TestStarted {
            duration_secs,
            rate_ms,
        } = event
        {
            self.report_info.duration_secs = Some(duration_secs);
            self.report_info.rate_ms = Some(rate_ms);
        }
    }
}

/// Render the display window as one line of `mV/mA` pairs
pub fn render_window(window: &[Sample]) -> String {
    let readings: Vec<String> = window
        .iter()
        .map(|s| format!("{}/{}", s.millivolts, s.milliamps))
        .collect();
    format!("mV/mA [{}]", readings.join(" "))
}

/// Run the console until `quit` or end of input
pub async fn run_console(settings: Settings, settings_path: Option<PathBuf>, endpoint: Option<String>) {
    let session = TelemetrySession::with_config(settings.session.clone());
    let poll_period = Duration::from_millis(settings.poll_period_ms.max(1));
    let (handle, task) = SessionHandle::spawn(session, poll_period);

    let mut events = handle.subscribe();
    let mut display = handle.display();
    let mut redraw = interval(Duration::from_millis(settings.display_refresh_ms.max(1)));
    redraw.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut console = Console {
        handle: handle.clone(),
        settings,
        settings_path,
        report_info: ReportInfo::default(),
    };

    info!("Type 'help' for a list of commands");

    if let Some(endpoint) = endpoint {
        console.execute(ConsoleCommand::Connect(Some(endpoint))).await;
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let line = match line {
                    Ok(Some(line)) => line,
                    Ok(None) => break,
                    Err(e) => {
                        error!("Failed to read input: {}", e);
                        break;
                    }
                };
                match ConsoleCommand::parse(&line) {
                    Ok(Some(command)) => {
                        if !console.execute(command).await {
                            break;
                        }
                    }
                    Ok(None) => {}
                    Err(e) => error!("{}", e),
                }
            }

            event = events.recv() => {
                match event {
                    Ok(event) => console.observe(event),
                    Err(RecvError::Lagged(n)) => debug!("Console skipped {} session events", n),
                    Err(RecvError::Closed) => break,
                }
            }

            _ = redraw.tick() => {
                if display.has_changed().unwrap_or(false) {
                    let window = display.borrow_and_update().clone();
                    println!("{}", render_window(&window));
                }
            }
        }
    }

    handle.shutdown().await;
    if let Err(e) = task.await {
        error!("Session task failed: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_window() {
        let window = [Sample::default(), Sample::new(100, 5, -2)];
        assert_eq!(render_window(&window), "mV/mA [0/0 5/-2]");
    }
}

//! Console command parsing

use std::path::PathBuf;

use thiserror::Error;

/// Help text printed by `help`
pub const HELP: &str = "\
commands:
  connect [host:port]   connect to a device (default: configured endpoint)
  start [secs] [ms]     start a test run
  stop                  ask the device to stop the run
  clear                 clear the display window and run
  status                show connection and test state
  show                  print the display window
  report [path]         export the run as CSV
  help                  show this text
  quit                  exit";

/// Errors from parsing a console line
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("unknown command '{0}'; type 'help' for a list of commands")]
    Unknown(String),

    #[error("'{command}' takes at most {max} argument(s); type 'help' for usage")]
    TooManyArguments { command: &'static str, max: usize },
}

/// A command entered at the console
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Connect(Option<String>),
    /// Raw duration and rate strings; the session validates them
    Start {
        duration_secs: Option<String>,
        rate_ms: Option<String>,
    },
    Stop,
    Clear,
    Status,
    Show,
    Report(Option<PathBuf>),
    Help,
    Quit,
}

impl ConsoleCommand {
    /// Parse one input line; blank lines yield `None`
    pub fn parse(line: &str) -> Result<Option<Self>, CommandError> {
        let mut words = line.split_whitespace();
        let Some(name) = words.next() else {
            return Ok(None);
        };
        let args: Vec<&str> = words.collect();

        let command = match name.to_ascii_lowercase().as_str() {
            "connect" => {
                check_arity("connect", &args, 1)?;
                Self::Connect(args.first().map(|s| s.to_string()))
            }
            "start" => {
                check_arity("start", &args, 2)?;
                Self::Start {
                    duration_secs: args.first().map(|s| s.to_string()),
                    rate_ms: args.get(1).map(|s| s.to_string()),
                }
            }
            "stop" => bare("stop", &args, Self::Stop)?,
            "clear" => bare("clear", &args, Self::Clear)?,
            "status" => bare("status", &args, Self::Status)?,
            "show" => bare("show", &args, Self::Show)?,
            "report" => {
                check_arity("report", &args, 1)?;
                Self::Report(args.first().map(PathBuf::from))
            }
            "help" | "?" => Self::Help,
            "quit" | "exit" => Self::Quit,
            _ => return Err(CommandError::Unknown(name.to_string())),
        };

        Ok(Some(command))
    }
}

fn check_arity(command: &'static str, args: &[&str], max: usize) -> Result<(), CommandError> {
    if args.len() > max {
        return Err(CommandError::TooManyArguments { command, max });
    }
    Ok(())
}

fn bare(
    command: &'static str,
    args: &[&str],
    parsed: ConsoleCommand,
) -> Result<ConsoleCommand, CommandError> {
    check_arity(command, args, 0)?;
    Ok(parsed)
}

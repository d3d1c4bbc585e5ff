//! Error types for the simulated device

use thiserror::Error;

/// Errors that can occur while setting up a simulated device
#[derive(Debug, Error)]
pub enum SimError {
    /// Port argument has no leading number
    #[error("incorrect input UDP port number - invalid number: {0}")]
    InvalidNumber(String),

    /// Port argument has characters after the number
    #[error("incorrect input; trailing characters after number: {0}")]
    TrailingCharacters(String),

    /// Port argument is outside 0-65535
    #[error("incorrect input UDP port number - number out of range: {0}")]
    OutOfRange(String),

    /// Socket bind failed
    #[error("failed to bind UDP port {port}: {source}")]
    Bind {
        port: u16,
        #[source]
        source: std::io::Error,
    },
}

/// Parse a UDP port command-line argument
pub fn parse_port_arg(arg: &str) -> Result<u16, SimError> {
    let trimmed = arg.trim_start();
    let sign_len = usize::from(trimmed.starts_with(['+', '-']));
    let digits_len = trimmed[sign_len..]
        .bytes()
        .take_while(|b| b.is_ascii_digit())
        .count();
    if digits_len == 0 {
        return Err(SimError::InvalidNumber(arg.to_string()));
    }

    let number_end = sign_len + digits_len;
    if number_end < trimmed.len() {
        return Err(SimError::TrailingCharacters(arg.to_string()));
    }

    trimmed[..number_end]
        .parse::<i64>()
        .ok()
        .and_then(|n| u16::try_from(n).ok())
        .ok_or_else(|| SimError::OutOfRange(arg.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_port_arg() {
        assert_eq!(parse_port_arg("49181").unwrap(), 49181);
        assert_eq!(parse_port_arg("+80").unwrap(), 80);
        assert!(matches!(parse_port_arg("abc"), Err(SimError::InvalidNumber(_))));
        assert!(matches!(parse_port_arg(""), Err(SimError::InvalidNumber(_))));
        assert!(matches!(
            parse_port_arg("80x"),
            Err(SimError::TrailingCharacters(_))
        ));
        assert!(matches!(parse_port_arg("70000"), Err(SimError::OutOfRange(_))));
        assert!(matches!(parse_port_arg("-1"), Err(SimError::OutOfRange(_))));
        assert!(matches!(
            parse_port_arg("99999999999999999999999"),
            Err(SimError::OutOfRange(_))
        ));
    }
}

//! Device endpoint parsing
//!
//! The user enters the device address as a single `host:port` string. The
//! host must be a strict dotted-quad IPv4 address; hostnames are not resolved.

use std::fmt;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::str::FromStr;

use crate::error::EndpointError;

/// Network address of the test device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Endpoint {
    /// Device IPv4 address
    pub host: Ipv4Addr,
    /// Device UDP port
    pub port: u16,
}

impl Endpoint {
    /// Create an endpoint from its parts
    pub fn new(host: Ipv4Addr, port: u16) -> Self {
        Self { host, port }
    }

    /// Parse a `host:port` string, splitting once on the first `:`
    pub fn parse(input: &str) -> Result<Self, EndpointError> {
        let input = input.trim();
        let (host, port) = input
            .split_once(':')
            .ok_or_else(|| EndpointError::MissingPort(input.to_string()))?;

        Ok(Self {
            host: parse_host(host)?,
            port: parse_port(port)?,
        })
    }

    /// Socket address for this endpoint
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::V4(SocketAddrV4::new(self.host, self.port))
    }
}

impl FromStr for Endpoint {
    type Err = EndpointError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

fn parse_host(host: &str) -> Result<Ipv4Addr, EndpointError> {
    let invalid = || EndpointError::InvalidHost(host.to_string());

    let mut octets = [0u8; 4];
    let mut parts = host.split('.');
    for octet in octets.iter_mut() {
        let part = parts.next().ok_or_else(invalid)?;
        if part.is_empty() || part.len() > 3 || !part.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        // Leading zeros read as octal in some parsers
        if part.len() > 1 && part.starts_with('0') {
            return Err(invalid());
        }
        // At most three digits, so this only fails above 255
        *octet = part.parse::<u8>().map_err(|_| invalid())?;
    }
    if parts.next().is_some() {
        return Err(invalid());
    }

    Ok(Ipv4Addr::from(octets))
}

fn parse_port(port: &str) -> Result<u16, EndpointError> {
    if port.is_empty() || !port.bytes().all(|b| b.is_ascii_digit()) {
        return Err(EndpointError::InvalidPort(port.to_string()));
    }
    port.parse::<u16>()
        .map_err(|_| EndpointError::InvalidPort(port.to_string()))
}

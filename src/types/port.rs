//! Port types with validation and parsing.
//!
//! The `Port` newtype ensures values are always valid port numbers (1-65535).
//! `PortList` parses port lists: strict comma-separated numbers for scan
//! requests, and a richer syntax with ranges for the command line.

use crate::error::RequestError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// Ports probed when a request does not name any.
pub const DEFAULT_PORTS: &str = "21,22,23,80,443,445,3389";

/// A validated network port number (1-65535).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub struct Port(u16);

impl Port {
    /// Minimum valid port number.
    pub const MIN: u16 = 1;
    /// Maximum valid port number.
    pub const MAX: u16 = 65535;

    /// Create a new Port from a u16, returning None if invalid.
    #[inline]
    pub const fn new(port: u16) -> Option<Self> {
        if port >= Self::MIN {
            Some(Self(port))
        } else {
            None
        }
    }

    /// Get the raw port number.
    #[inline]
    pub const fn as_u16(self) -> u16 {
        self.0
    }
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<u16> for Port {
    type Error = RequestError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        Self::new(value).ok_or(RequestError::PortOutOfRange(value as u32))
    }
}

impl TryFrom<u32> for Port {
    type Error = RequestError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        u16::try_from(value)
            .ok()
            .and_then(Self::new)
            .ok_or(RequestError::PortOutOfRange(value))
    }
}

impl From<Port> for u16 {
    fn from(port: Port) -> Self {
        port.0
    }
}

/// A deduplicated list of ports to probe, in the order they were given.
///
/// `FromStr` supports formats like:
/// - Single port: "80"
/// - Comma-separated: "21,22,80,443"
/// - Range: "8000-8010"
/// - Mixed: "22,80,443,8000-9000"
///
/// [`PortList::parse_request`] accepts only comma-separated numbers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PortList {
    ports: Vec<Port>,
}

impl PortList {
    /// Build a list from already validated ports, keeping the first
    /// occurrence of each.
    pub fn from_ports(ports: impl IntoIterator<Item = Port>) -> Self {
        let mut seen = HashSet::new();
        let ports = ports.into_iter().filter(|p| seen.insert(*p)).collect();
        Self { ports }
    }

    /// Parse the port field of a scan request: comma-separated integers
    /// only. Any other token (including a range) is a format error.
    pub fn parse_request(s: &str) -> Result<Self, RequestError> {
        let ports = s
            .trim()
            .split(',')
            .map(|part| Port::try_from(parse_number(part)?))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::from_ports(ports))
    }

    /// The ports, in request order.
    pub fn as_slice(&self) -> &[Port] {
        &self.ports
    }

    /// Number of ports in the list.
    pub fn len(&self) -> usize {
        self.ports.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.ports.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Port> + '_ {
        self.ports.iter().copied()
    }
}

fn parse_number(token: &str) -> Result<u32, RequestError> {
    let token = token.trim();
    if token.is_empty() || !token.chars().all(|c| c.is_ascii_digit()) {
        return Err(RequestError::InvalidPortFormat(token.to_string()));
    }
    token
        .parse()
        .map_err(|_| RequestError::InvalidPortFormat(token.to_string()))
}

impl FromStr for PortList {
    type Err = RequestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut ports = Vec::new();

        for part in s.trim().split(',') {
            let part = part.trim();
            if let Some((start, end)) = part.split_once('-') {
                let start = Port::try_from(parse_number(start)?)?;
                let end = Port::try_from(parse_number(end)?)?;
                if start > end {
                    return Err(RequestError::InvalidPortFormat(part.to_string()));
                }
                ports.extend((start.as_u16()..=end.as_u16()).filter_map(Port::new));
            } else {
                ports.push(Port::try_from(parse_number(part)?)?);
            }
        }

        Ok(Self::from_ports(ports))
    }
}

impl fmt::Display for PortList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.ports.iter().map(|p| p.to_string()).collect();
        write!(f, "{}", parts.join(","))
    }
}

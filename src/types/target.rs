//! Target specification types with CIDR and dash-range support.
//!
//! Provides target parsing supporting:
//! - Single IP addresses (IPv4 and IPv6)
//! - CIDR notation (192.168.1.0/24)
//! - Trailing-octet ranges (192.168.1.10-20)
//! - Full IPv4 ranges (192.168.1.10-192.168.1.20)

use crate::error::{RangeError, RangeResult};
use ipnetwork::IpNetwork;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

/// Maximum number of hosts a target may expand to unless configured otherwise.
pub const DEFAULT_MAX_HOSTS: u128 = 65536; // /16 for IPv4

/// A parsed target specification, before expansion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetSpec {
    /// A single IP address.
    Single(IpAddr),
    /// A CIDR network range.
    Cidr(IpNetwork),
    /// An inclusive IPv4 span from a dash range.
    Span { start: Ipv4Addr, end: Ipv4Addr },
}

impl TargetSpec {
    /// Parse a target specification from a string.
    pub fn parse(s: &str) -> RangeResult<Self> {
        let s = s.trim();
        let invalid = || RangeError::InvalidRange(s.to_string());

        if let Ok(ip) = s.parse::<IpAddr>() {
            return Ok(Self::Single(ip));
        }

        if s.contains('/') {
            let network: IpNetwork = s.parse().map_err(|_| invalid())?;
            return Ok(Self::Cidr(network));
        }

        if let Some((start, end)) = s.split_once('-') {
            let start: Ipv4Addr = start.trim().parse().map_err(|_| invalid())?;
            let end = end.trim();

            let end = if let Ok(full) = end.parse::<Ipv4Addr>() {
                full
            } else {
                let last: u8 = end.parse().map_err(|_| invalid())?;
                let [a, b, c, _] = start.octets();
                Ipv4Addr::new(a, b, c, last)
            };

            if end < start {
                return Err(invalid());
            }
            return Ok(Self::Span { start, end });
        }

        Err(invalid())
    }

    /// Number of host addresses this specification expands to.
    pub fn host_count(&self) -> u128 {
        match self {
            Self::Single(_) => 1,
            Self::Cidr(IpNetwork::V4(net)) => {
                let size = 1u128 << (32 - net.prefix() as u32);
                if net.prefix() < 31 {
                    size - 2
                } else {
                    size
                }
            }
            Self::Cidr(IpNetwork::V6(net)) => {
                let size = 1u128
                    .checked_shl(128 - net.prefix() as u32)
                    .unwrap_or(u128::MAX);
                if net.prefix() < 127 {
                    size - 1
                } else {
                    size
                }
            }
            Self::Span { start, end } => (u32::from(*end) - u32::from(*start)) as u128 + 1,
        }
    }

    /// Expand into host addresses, ascending.
    ///
    /// IPv4 CIDR blocks drop the network and broadcast addresses (except
    /// for /31 and /32); IPv6 blocks drop the subnet-router address.
    fn expand(&self) -> Vec<IpAddr> {
        match self {
            Self::Single(ip) => vec![*ip],
            Self::Cidr(IpNetwork::V4(net)) => {
                let mut first = u32::from(net.network());
                let mut last = u32::from(net.broadcast());
                if net.prefix() < 31 {
                    first += 1;
                    last -= 1;
                }
                (first..=last)
                    .map(|n| IpAddr::V4(Ipv4Addr::from(n)))
                    .collect()
            }
            Self::Cidr(IpNetwork::V6(net)) => {
                let base = u128::from(net.network());
                let count = self.host_count();
                let skip = u128::from(net.prefix() < 127);
                (0..count)
                    .map(|offset| IpAddr::V6(Ipv6Addr::from(base + skip + offset)))
                    .collect()
            }
            Self::Span { start, end } => (u32::from(*start)..=u32::from(*end))
                .map(|n| IpAddr::V4(Ipv4Addr::from(n)))
                .collect(),
        }
    }
}

impl FromStr for TargetSpec {
    type Err = RangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for TargetSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single(ip) => write!(f, "{}", ip),
            Self::Cidr(network) => write!(f, "{}", network),
            Self::Span { start, end } => write!(f, "{}-{}", start, end),
        }
    }
}

/// An expanded, ordered set of candidate host addresses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressRange {
    addresses: Vec<IpAddr>,
}

impl AddressRange {
    /// Parse and expand a target, refusing more than [`DEFAULT_MAX_HOSTS`].
    pub fn parse(s: &str) -> RangeResult<Self> {
        Self::parse_with_limit(s, DEFAULT_MAX_HOSTS)
    }

    /// Parse and expand a target, refusing more than `max_hosts` addresses.
    pub fn parse_with_limit(s: &str, max_hosts: u128) -> RangeResult<Self> {
        let spec = TargetSpec::parse(s)?;

        let count = spec.host_count();
        if count > max_hosts {
            return Err(RangeError::RangeTooLarge {
                count,
                max: max_hosts,
            });
        }

        let addresses = spec.expand();
        Ok(Self { addresses })
    }

    pub fn addresses(&self) -> &[IpAddr] {
        &self.addresses
    }

    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }
}

impl FromStr for AddressRange {
    type Err = RangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

//! Port prober trait abstraction.
//!
//! Defines the interface the scan pipeline uses to test a single port,
//! so the fan-out logic and the orchestrator can run against mock probers.

use crate::error::ProbeResult;
use crate::types::Port;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;

/// Status of a probed port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortStatus {
    /// Connection accepted.
    Open,
    /// Connection refused or reset.
    Closed,
    /// No answer within the timeout, or the host was unreachable.
    Filtered,
}

impl PortStatus {
    pub fn is_open(self) -> bool {
        self == Self::Open
    }
}

impl fmt::Display for PortStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => write!(f, "open"),
            Self::Closed => write!(f, "closed"),
            Self::Filtered => write!(f, "filtered"),
        }
    }
}

/// Trait for single-port probe implementations.
///
/// Implementations must bound their own running time; a negative answer is
/// `Ok(Closed | Filtered)`, and `Err` is reserved for faults of the probe
/// itself (for example running out of sockets).
#[async_trait]
pub trait PortProber: Send + Sync {
    /// Probe one port on `target`.
    async fn probe(&self, target: IpAddr, port: Port) -> ProbeResult<PortStatus>;
}

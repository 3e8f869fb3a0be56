//! Host discovery - which candidate addresses are live on the segment.
//!
//! Silence is not a fault: a candidate that never answers is simply absent
//! from the result. Errors are reserved for sweeps that could not run.

pub mod arp;

use crate::error::DiscoveryResult;
use async_trait::async_trait;
use pnet::util::MacAddr;
use std::net::IpAddr;
use std::time::Duration;

pub use arp::ArpDiscoverer;

/// A host that answered the discovery probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DiscoveredHost {
    pub ip: IpAddr,
    pub mac: MacAddr,
}

/// Trait for link-layer discovery implementations.
#[async_trait]
pub trait HostDiscoverer: Send + Sync {
    /// Probe `candidates` and return those that answered within `timeout`,
    /// in candidate order.
    async fn discover(
        &self,
        candidates: &[IpAddr],
        timeout: Duration,
    ) -> DiscoveryResult<Vec<DiscoveredHost>>;
}

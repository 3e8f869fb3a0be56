//! Error types for lanscout.
//!
//! Uses `thiserror` for ergonomic error definitions. Negative scan results
//! (no ARP reply, refused connection, missing PTR record) are not errors and
//! have no variants here.

use std::path::PathBuf;
use thiserror::Error;

/// Errors from expanding a target specification into addresses.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RangeError {
    #[error("invalid target range: {0}")]
    InvalidRange(String),

    #[error("target range too large: {count} addresses (max: {max})")]
    RangeTooLarge { count: u128, max: u128 },
}

/// Errors from validating a scan request before anything starts.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RequestError {
    #[error("Target IP range is required")]
    TargetRequired,

    #[error("Invalid port format")]
    InvalidPortFormat(String),

    #[error("port {0} is out of valid range (1-65535)")]
    PortOutOfRange(u32),

    #[error("no ports specified")]
    NoPorts,

    #[error(transparent)]
    Range(#[from] RangeError),
}

/// Probe-level faults unrelated to the port's state.
///
/// A refused, reset or timed out connection is a closed port, not a
/// `ProbeError`.
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("probe infrastructure failure on {target}:{port}: {source}")]
    ProbeInfrastructure {
        target: String,
        port: u16,
        #[source]
        source: std::io::Error,
    },
}

/// Faults that prevent the discovery sweep from running at all.
#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("interface not found: {0}")]
    InterfaceNotFound(String),

    #[error("interface {0} has no IPv4 address")]
    NoIpv4Address(String),

    #[error("interface {0} has no hardware address")]
    NoHardwareAddress(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("datalink channel error: {0}")]
    Channel(String),

    #[error("invalid packet: {0}")]
    InvalidPacket(String),

    #[error("discovery task failed: {0}")]
    Task(String),
}

/// Reverse lookup failures. Callers normally map these to `"Unknown"`.
#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("lookup for {0} timed out")]
    Timeout(std::net::IpAddr),

    #[error("no PTR record for {0}")]
    NoRecord(std::net::IpAddr),

    #[error("lookup failed: {0}")]
    Lookup(String),
}

/// Errors surfaced by the scan orchestrator.
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("a scan is already in progress")]
    ScanInProgress,

    #[error(transparent)]
    InvalidRequest(#[from] RequestError),

    #[error("host discovery failed: {0}")]
    Discovery(#[from] DiscoveryError),

    #[error("scan cancelled")]
    Cancelled,

    #[error("scan task failed: {0}")]
    Task(String),
}

impl From<RangeError> for ScanError {
    fn from(err: RangeError) -> Self {
        Self::InvalidRequest(RequestError::Range(err))
    }
}

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not determine configuration directory")]
    DirectoryNotFound,

    #[error("failed to read {path}: {reason}")]
    ReadFailed { path: PathBuf, reason: String },

    #[error("invalid configuration format: {0}")]
    InvalidFormat(String),

    #[error("invalid setting: {0}")]
    InvalidValue(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for range parsing.
pub type RangeResult<T> = Result<T, RangeError>;

/// Result type alias for probes.
pub type ProbeResult<T> = Result<T, ProbeError>;

/// Result type alias for discovery.
pub type DiscoveryResult<T> = Result<T, DiscoveryError>;

/// Result type alias for orchestrator operations.
pub type ScanResult<T> = Result<T, ScanError>;

/// Result type alias for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

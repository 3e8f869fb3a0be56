//! The scan-state record and the values it aggregates.
//!
//! The JSON shape of [`ScanState`] is the status contract read by clients:
//! `{status, progress, target, ports, devices, results, error?}`.

use crate::discovery::DiscoveredHost;
use crate::resolver::UNKNOWN_HOSTNAME;
use crate::types::{Port, PortList, ScanId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;

/// Phase of a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanStatus {
    #[default]
    Idle,
    Discovering,
    PortScanning,
    Completed,
    Error,
}

impl ScanStatus {
    /// Completed and error scans never change again.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }
}

impl fmt::Display for ScanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Discovering => write!(f, "discovering"),
            Self::PortScanning => write!(f, "port_scanning"),
            Self::Completed => write!(f, "completed"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// A live host found during discovery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub ip: IpAddr,
    pub mac: String,
    pub hostname: String,
}

impl From<&DiscoveredHost> for Device {
    fn from(host: &DiscoveredHost) -> Self {
        Self {
            ip: host.ip,
            mac: host.mac.to_string(),
            hostname: UNKNOWN_HOSTNAME.to_string(),
        }
    }
}

/// An open port and its service label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortResult {
    pub port: Port,
    pub service: String,
}

/// Open ports found on one device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceResult {
    pub ip: IpAddr,
    pub open_ports: Vec<PortResult>,
}

/// Snapshot of an in-progress or finished scan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scan_id: Option<ScanId>,
    pub status: ScanStatus,
    pub progress: u8,
    #[serde(default)]
    pub target: String,
    #[serde(default)]
    pub ports: PortList,
    #[serde(default)]
    pub devices: Vec<Device>,
    #[serde(default)]
    pub results: Vec<DeviceResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl ScanState {
    /// Fresh `idle` record for a newly accepted scan.
    pub(crate) fn begin(scan_id: ScanId, target: &str, ports: PortList) -> Self {
        Self {
            scan_id: Some(scan_id),
            target: target.to_string(),
            ports,
            started_at: Some(Utc::now()),
            ..Self::default()
        }
    }

    /// Raise progress to `progress`; never lowers it.
    pub(crate) fn advance(&mut self, progress: u8) {
        self.progress = self.progress.max(progress.min(100));
    }

    /// Move to a non-terminal phase.
    pub(crate) fn enter(&mut self, status: ScanStatus, progress: u8) {
        debug_assert!(!status.is_terminal());
        if !self.status.is_terminal() {
            self.status = status;
            self.advance(progress);
        }
    }

    /// Terminal transition to `completed`. Returns false if already terminal.
    pub(crate) fn complete(&mut self) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = ScanStatus::Completed;
        self.progress = 100;
        self.finished_at = Some(Utc::now());
        true
    }

    /// Terminal transition to `error`, keeping progress where it was.
    /// Returns false if already terminal.
    pub(crate) fn fail(&mut self, message: impl Into<String>) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = ScanStatus::Error;
        self.error = Some(message.into());
        self.finished_at = Some(Utc::now());
        true
    }

    /// Total open ports across all devices.
    pub fn open_port_count(&self) -> usize {
        self.results.iter().map(|r| r.open_ports.len()).sum()
    }
}

/// Progress after `done` of `total` devices finished port scanning.
pub(crate) fn device_progress(done: usize, total: usize) -> u8 {
    if total == 0 {
        return 99;
    }
    let pct = 50 + (50 * done.min(total)) / total;
    pct.min(99) as u8
}

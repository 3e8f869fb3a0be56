//! # lanscout - LAN Device Discovery and Port Scanning
//!
//! lanscout finds the live hosts on a local network segment with an ARP
//! sweep, resolves their hostnames, and checks a list of TCP ports on each
//! one. A scan runs in the background and publishes a pollable
//! [`orchestrator::ScanState`] as it moves through its phases.
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! use lanscout::config::ScanSettings;
//! use lanscout::orchestrator::ScanOrchestrator;
//!
//! #[tokio::main]
//! async fn main() {
//!     let orchestrator = ScanOrchestrator::new(ScanSettings::default());
//!     let ports = "22,80,443".parse().unwrap();
//!
//!     orchestrator.start_scan("192.168.1.0/24", ports).unwrap();
//!     orchestrator.wait().await;
//!
//!     for result in orchestrator.status().results {
//!         println!("{}: {} open", result.ip, result.open_ports.len());
//!     }
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`types`] - Ports, port lists, target ranges and scan ids
//! - [`discovery`] - ARP host discovery
//! - [`resolver`] - Reverse hostname lookups
//! - [`scanner`] - TCP connect probes with bounded concurrency
//! - [`services`] - Port to service-name labels
//! - [`orchestrator`] - Scan pipeline, state and history
//! - [`api`] - Request/response contract for an HTTP front end
//! - [`config`] - User settings
//! - [`error`] - Error types
//! - [`output`] - Output formatting utilities

pub mod api;
pub mod cli;
pub mod config;
pub mod discovery;
pub mod error;
pub mod orchestrator;
pub mod output;
pub mod resolver;
pub mod scanner;
pub mod services;
pub mod types;

// Re-export commonly used types
pub use error::{RangeError, RequestError, ScanError};
pub use orchestrator::{ScanOrchestrator, ScanState, ScanStatus};
pub use scanner::{PortProber, PortStatus};
pub use types::{AddressRange, Port, PortList, ScanId, TargetSpec};

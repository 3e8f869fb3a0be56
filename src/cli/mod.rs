//! CLI subcommand definitions and handlers.
//!
//! - `lanscout scan <target>` - Discover devices and probe their ports
//! - `lanscout service <port>...` - Look up service labels

mod scan;
mod service;

pub use scan::ScanCommand;
pub use service::ServiceCommand;

use crate::config::ScanSettings;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// lanscout - LAN device discovery and port scanning.
///
/// Finds live hosts on a local network with an ARP sweep, resolves their
/// hostnames and checks a list of TCP ports on each.
#[derive(Parser, Debug)]
#[command(name = "lanscout")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Discover LAN devices and their open ports", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Path to a settings file
    #[arg(long, global = true, value_name = "PATH", env = "LANSCOUT_CONFIG")]
    pub config: Option<PathBuf>,
}

impl Cli {
    /// Settings from `--config`, or the user's settings file if one exists.
    pub fn settings(&self) -> crate::error::ConfigResult<ScanSettings> {
        match &self.config {
            Some(path) => ScanSettings::load_from(path),
            None => ScanSettings::load(),
        }
    }

    /// Default log filter for the `-v` count.
    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Discover devices in a range and scan their ports
    #[command(alias = "s")]
    Scan(ScanCommand),

    /// Print the service label for ports
    Service(ServiceCommand),
}

/// Output format for results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable plain text
    #[default]
    Plain,
    /// JSON in the status endpoint's shape
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Plain => write!(f, "plain"),
            Self::Json => write!(f, "json"),
        }
    }
}

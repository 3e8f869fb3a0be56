//! Scan subcommand implementation.
//!
//! Handles the `lanscout scan <target>` command: runs one scan through the
//! orchestrator and renders the final state.

use crate::cli::OutputFormat;
use crate::config::ScanSettings;
use crate::orchestrator::{ScanOrchestrator, ScanStatus};
use crate::output;
use crate::types::{AddressRange, PortList};
use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

/// Discover devices in a range and scan their ports.
#[derive(Parser, Debug)]
pub struct ScanCommand {
    /// Range to scan
    ///
    /// Examples:
    ///   192.168.1.10         Single IP address
    ///   192.168.1.0/24       CIDR range
    ///   192.168.1.1-50       Last-octet range
    #[arg(value_name = "TARGET")]
    pub target: String,

    /// Ports to probe (e.g. "22,80,443" or "1-1024"); defaults to the
    /// configured default ports
    #[arg(short, long)]
    pub ports: Option<String>,

    /// Output format for results
    #[arg(short, long, value_enum, default_value = "plain")]
    pub output: OutputFormat,

    /// Network interface used for discovery
    #[arg(short = 'i', long)]
    pub interface: Option<String>,

    /// Per-port connect timeout in milliseconds
    #[arg(short = 't', long)]
    pub timeout: Option<u64>,

    /// Maximum concurrent port probes
    #[arg(short = 'c', long)]
    pub concurrency: Option<usize>,
}

impl ScanCommand {
    /// Apply command-line overrides on top of loaded settings.
    pub fn apply(&self, mut settings: ScanSettings) -> ScanSettings {
        if let Some(interface) = &self.interface {
            settings.interface = Some(interface.clone());
        }
        if let Some(timeout) = self.timeout {
            settings.port_timeout_ms = timeout.max(1);
        }
        if let Some(concurrency) = self.concurrency {
            settings.max_concurrent_probes = concurrency.max(1);
        }
        settings
    }

    /// Execute the scan command.
    pub async fn execute(&self, settings: ScanSettings) -> Result<()> {
        let settings = self.apply(settings);

        let ports: PortList = self
            .ports
            .as_deref()
            .unwrap_or(&settings.default_ports)
            .parse()
            .context("invalid port list")?;

        if !is_root() {
            output::print_warning("ARP discovery requires root/sudo privileges for raw socket access.");
        }

        let plain = self.output == OutputFormat::Plain;
        if plain {
            // Range errors are reported by start_scan below.
            if let Ok(range) = AddressRange::parse_with_limit(&self.target, u128::from(settings.max_hosts)) {
                output::print_scan_header(self.target.trim(), range.len(), ports.len());
            }
        }

        let orchestrator = ScanOrchestrator::new(settings);
        let mut updates = orchestrator.subscribe();
        let scan_id = orchestrator.start_scan(&self.target, ports)?;
        info!(%scan_id, "scan started");

        let pb = if plain {
            ProgressBar::new(100)
        } else {
            ProgressBar::hidden()
        };
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}% {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );

        while updates.changed().await.is_ok() {
            let snapshot = updates.borrow_and_update().clone();
            pb.set_position(u64::from(snapshot.progress));
            pb.set_message(snapshot.status.to_string());
            if snapshot.status.is_terminal() {
                break;
            }
        }
        orchestrator.wait().await;
        pb.finish_and_clear();

        let state = orchestrator.status();
        output::format_results(&state, self.output)?;

        if state.status == ScanStatus::Error {
            anyhow::bail!(state.error.unwrap_or_else(|| "scan failed".to_string()));
        }
        Ok(())
    }
}

/// Check if running with root/admin privileges.
fn is_root() -> bool {
    #[cfg(unix)]
    {
        unsafe { libc::geteuid() == 0 }
    }
    #[cfg(not(unix))]
    {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command(args: &[&str]) -> ScanCommand {
        let mut full = vec!["scan"];
        full.extend_from_slice(args);
        ScanCommand::parse_from(full)
    }

    #[test]
    fn test_overrides_apply() {
        let cmd = command(&["10.0.0.0/24", "-i", "eth1", "-t", "250", "-c", "0"]);
        let settings = cmd.apply(ScanSettings::default());
        assert_eq!(settings.interface.as_deref(), Some("eth1"));
        assert_eq!(settings.port_timeout_ms, 250);
        assert_eq!(settings.max_concurrent_probes, 1);
    }

    #[test]
    fn test_defaults_keep_settings() {
        let cmd = command(&["10.0.0.1"]);
        let settings = cmd.apply(ScanSettings::default());
        assert_eq!(settings, ScanSettings::default());
        assert!(cmd.ports.is_none());
    }
}

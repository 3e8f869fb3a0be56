//! Plain text output formatting.
//!
//! Produces human-readable output with colors and formatting.

use crate::orchestrator::{ScanState, ScanStatus};
use console::style;
use std::io::{self, Write};

const RULE: &str = "═══════════════════════════════════════════════════════════════";
const THIN_RULE: &str = "───────────────────────────────────────────────────────────────";

/// Print a scan summary to stdout.
pub fn print_plain(state: &ScanState) -> io::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    write_plain(&mut out, state)
}

/// Write a scan summary: devices first, then open ports per device.
pub fn write_plain<W: Write>(out: &mut W, state: &ScanState) -> io::Result<()> {
    // Header
    writeln!(out)?;
    writeln!(out, "{}", style(RULE).cyan())?;
    writeln!(
        out,
        "                    {} Scan Results",
        style("lanscout").cyan().bold()
    )?;
    writeln!(out, "{}", style(RULE).cyan())?;
    writeln!(out)?;

    // Scan info
    writeln!(out, "  {} {}", style("Target:").bold(), state.target)?;
    writeln!(out, "  {} {}", style("Ports:").bold(), state.ports)?;
    if let Some(id) = state.scan_id {
        writeln!(out, "  {} {}", style("Scan ID:").bold(), style(id).dim())?;
    }
    let status = match state.status {
        ScanStatus::Completed => style(state.status.to_string()).green().bold(),
        ScanStatus::Error => style(state.status.to_string()).red().bold(),
        _ => style(state.status.to_string()).yellow(),
    };
    writeln!(out, "  {} {}", style("Status:").bold(), status)?;
    if let Some(error) = &state.error {
        writeln!(out, "  {} {}", style("Error:").red().bold(), error)?;
    }
    if let (Some(start), Some(end)) = (state.started_at, state.finished_at) {
        let secs = (end - start).num_milliseconds() as f64 / 1000.0;
        writeln!(out, "  {} {:.2}s", style("Duration:").bold(), secs)?;
    }
    writeln!(out)?;

    // Statistics
    writeln!(
        out,
        "  {} {} devices, {} open ports",
        style("Statistics:").bold(),
        style(state.devices.len()).white().bold(),
        style(state.open_port_count()).green().bold()
    )?;
    writeln!(out)?;

    if state.devices.is_empty() {
        writeln!(out, "  {}", style("No devices found.").dim())?;
    } else {
        writeln!(out, "  {}", style(THIN_RULE).dim())?;
        writeln!(
            out,
            "  {:<16}  {:<17}  {}",
            style("IP").bold(),
            style("MAC").bold(),
            style("HOSTNAME").bold()
        )?;
        writeln!(out, "  {}", style(THIN_RULE).dim())?;
        for device in &state.devices {
            writeln!(
                out,
                "  {:<16}  {:<17}  {}",
                device.ip.to_string(),
                style(&device.mac).dim(),
                truncate_string(&device.hostname, 40)
            )?;
        }
        writeln!(out, "  {}", style(THIN_RULE).dim())?;
    }

    for result in &state.results {
        writeln!(out)?;
        writeln!(out, "  {}", style(result.ip).white().bold())?;
        if result.open_ports.is_empty() {
            writeln!(out, "    {}", style("no open ports").dim())?;
            continue;
        }
        for open in &result.open_ports {
            writeln!(
                out,
                "    {:>6}  {:<6}  {}",
                open.port,
                style("open").green().bold(),
                open.service
            )?;
        }
    }

    writeln!(out)?;
    writeln!(out, "{}", style(RULE).cyan())?;
    writeln!(out)?;

    Ok(())
}

/// Print a scan header before scanning begins.
pub fn print_scan_header(target: &str, candidates: usize, ports: usize) {
    println!();
    println!(
        "{} {} v{}",
        style("Starting").cyan(),
        style("lanscout").cyan().bold(),
        env!("CARGO_PKG_VERSION")
    );
    println!(
        "{} Target: {} ({} addresses)",
        style("•").dim(),
        style(target).white().bold(),
        candidates
    );
    println!(
        "{} Probing {} ports per device...",
        style("•").dim(),
        style(ports).white().bold()
    );
    println!();
}

/// Print an error message.
pub fn print_error(msg: &str) {
    eprintln!("{} {}", style("Error:").red().bold(), msg);
}

/// Print a warning message.
pub fn print_warning(msg: &str) {
    eprintln!("{} {}", style("Warning:").yellow().bold(), msg);
}

/// Truncate a string to a maximum length, adding ellipsis if truncated.
fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::{Device, DeviceResult, PortResult};
    use crate::types::Port;

    #[test]
    fn test_truncate_string() {
        assert_eq!(truncate_string("hello", 10), "hello");
        assert_eq!(truncate_string("hello world", 8), "hello...");
    }

    #[test]
    fn test_plain_lists_devices_and_ports() {
        let state = ScanState {
            status: ScanStatus::Completed,
            progress: 100,
            target: "192.168.1.0/24".to_string(),
            ports: "22,80".parse().unwrap(),
            devices: vec![Device {
                ip: "192.168.1.1".parse().unwrap(),
                mac: "aa:bb:cc:dd:ee:ff".to_string(),
                hostname: "router.lan".to_string(),
            }],
            results: vec![DeviceResult {
                ip: "192.168.1.1".parse().unwrap(),
                open_ports: vec![PortResult {
                    port: Port::new(22).unwrap(),
                    service: "SSH".to_string(),
                }],
            }],
            ..ScanState::default()
        };

        let mut buf = Vec::new();
        write_plain(&mut buf, &state).unwrap();
        let text = String::from_utf8(buf).unwrap();

        assert!(text.contains("192.168.1.0/24"));
        assert!(text.contains("aa:bb:cc:dd:ee:ff"));
        assert!(text.contains("router.lan"));
        assert!(text.contains("SSH"));
        assert!(text.contains("completed"));
    }

    #[test]
    fn test_plain_reports_error() {
        let state = ScanState {
            status: ScanStatus::Error,
            error: Some("permission denied".to_string()),
            ..ScanState::default()
        };

        let mut buf = Vec::new();
        write_plain(&mut buf, &state).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("permission denied"));
        assert!(text.contains("No devices found."));
    }
}

//! JSON output formatting.

use crate::orchestrator::ScanState;
use std::io;

/// Print a scan state in the same JSON shape the status endpoint returns.
pub fn print_json(state: &ScanState) -> io::Result<()> {
    let json = serde_json::to_string_pretty(state).map_err(io::Error::other)?;
    println!("{}", json);
    Ok(())
}

//! Output formatting module.
//!
//! Provides formatters for plain text and JSON output of scan results.

mod json_format;
mod plain;

pub use json_format::print_json;
pub use plain::{print_error, print_plain, print_scan_header, print_warning, write_plain};

use crate::cli::OutputFormat;
use crate::orchestrator::ScanState;
use std::io;

/// Format and print scan results according to the specified format.
pub fn format_results(state: &ScanState, format: OutputFormat) -> io::Result<()> {
    match format {
        OutputFormat::Plain => plain::print_plain(state),
        OutputFormat::Json => json_format::print_json(state),
    }
}

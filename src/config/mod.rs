//! Configuration management for lanscout.
//!
//! Provides XDG-compliant settings storage for scan timeouts and limits.

mod settings;

pub use settings::{Paths, ScanSettings};

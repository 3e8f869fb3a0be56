//! Identifiers for scans.
//!
//! A `ScanId` is the index the scan will occupy in the in-memory history,
//! handed out when the scan is accepted.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Position of a scan in the history log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScanId(usize);

impl ScanId {
    pub const fn new(index: usize) -> Self {
        Self(index)
    }
}

impl fmt::Display for ScanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

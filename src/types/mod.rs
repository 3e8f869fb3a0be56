//! Core type definitions using newtype patterns for type safety.
//!
//! These types prevent common logic errors by making invalid states unrepresentable
//! at compile time.

mod port;
mod scan_id;
mod target;

pub use port::{Port, PortList, DEFAULT_PORTS};
pub use scan_id::ScanId;
pub use target::{AddressRange, TargetSpec, DEFAULT_MAX_HOSTS};

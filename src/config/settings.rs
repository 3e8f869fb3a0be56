//! Scan settings and paths.
//!
//! Settings live in an XDG-compliant configuration directory and fall back to
//! defaults when no file exists.

use crate::error::{ConfigError, ConfigResult};
use crate::types::DEFAULT_PORTS;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application directory paths following XDG Base Directory Specification.
#[derive(Debug, Clone)]
pub struct Paths {
    /// Configuration directory (~/.config/lanscout)
    pub config_dir: PathBuf,
}

impl Paths {
    /// Resolve paths using XDG directories.
    pub fn resolve() -> ConfigResult<Self> {
        let project = ProjectDirs::from("com", "lanscout", "lanscout")
            .ok_or(ConfigError::DirectoryNotFound)?;

        Ok(Self {
            config_dir: project.config_dir().to_path_buf(),
        })
    }

    /// Get the path to the settings file.
    pub fn settings_file(&self) -> PathBuf {
        self.config_dir.join("settings.json")
    }
}

/// Tunables for discovery, probing and lookups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanSettings {
    /// How long one ARP sweep listens for replies, in milliseconds.
    pub discovery_timeout_ms: u64,
    /// Connect timeout per port, in milliseconds.
    pub port_timeout_ms: u64,
    /// Timeout per reverse hostname lookup, in milliseconds.
    pub lookup_timeout_ms: u64,
    /// Concurrent TCP probes across the whole scan.
    pub max_concurrent_probes: usize,
    /// Devices port-scanned at the same time.
    pub max_parallel_hosts: usize,
    /// Largest number of addresses a target may expand to.
    pub max_hosts: u64,
    /// Interface used for discovery. Picked automatically when unset.
    pub interface: Option<String>,
    /// Ports used when a request names none.
    pub default_ports: String,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            discovery_timeout_ms: 2000,
            port_timeout_ms: 500,
            lookup_timeout_ms: 1000,
            max_concurrent_probes: 50,
            max_parallel_hosts: 8,
            max_hosts: 65536,
            interface: None,
            default_ports: DEFAULT_PORTS.to_string(),
        }
    }
}

impl ScanSettings {
    /// Load settings from the default location, or defaults if absent.
    pub fn load() -> ConfigResult<Self> {
        let file = Paths::resolve()?.settings_file();

        if !file.exists() {
            return Ok(Self::default());
        }

        Self::load_from(&file)
    }

    /// Load settings from a specific file.
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let settings: Self =
            serde_json::from_str(&content).map_err(|e| ConfigError::InvalidFormat(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reject settings that would make a scan unbounded or impossible.
    pub fn validate(&self) -> ConfigResult<()> {
        let non_zero = [
            ("discovery_timeout_ms", self.discovery_timeout_ms),
            ("port_timeout_ms", self.port_timeout_ms),
            ("lookup_timeout_ms", self.lookup_timeout_ms),
            ("max_concurrent_probes", self.max_concurrent_probes as u64),
            ("max_parallel_hosts", self.max_parallel_hosts as u64),
            ("max_hosts", self.max_hosts),
        ];

        for (name, value) in non_zero {
            if value == 0 {
                return Err(ConfigError::InvalidValue(format!("{} must be > 0", name)));
            }
        }

        self.default_ports
            .parse::<crate::types::PortList>()
            .map_err(|e| ConfigError::InvalidValue(format!("default_ports: {}", e)))?;

        Ok(())
    }

    pub fn discovery_timeout(&self) -> Duration {
        Duration::from_millis(self.discovery_timeout_ms)
    }

    pub fn port_timeout(&self) -> Duration {
        Duration::from_millis(self.port_timeout_ms)
    }

    pub fn lookup_timeout(&self) -> Duration {
        Duration::from_millis(self.lookup_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_settings() {
        let settings = ScanSettings::default();
        assert_eq!(settings.discovery_timeout(), Duration::from_secs(2));
        assert_eq!(settings.port_timeout(), Duration::from_millis(500));
        assert_eq!(settings.max_concurrent_probes, 50);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_load_partial_file_uses_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"port_timeout_ms": 250, "interface": "eth1"}}"#).unwrap();

        let settings = ScanSettings::load_from(file.path()).unwrap();
        assert_eq!(settings.port_timeout_ms, 250);
        assert_eq!(settings.interface.as_deref(), Some("eth1"));
        assert_eq!(settings.max_concurrent_probes, 50);
    }

    #[test]
    fn test_load_rejects_zero_concurrency() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"max_concurrent_probes": 0}}"#).unwrap();

        let result = ScanSettings::load_from(file.path());
        assert!(matches!(result, Err(ConfigError::InvalidValue(_))));
    }

    #[test]
    fn test_load_rejects_malformed_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();

        let result = ScanSettings::load_from(file.path());
        assert!(matches!(result, Err(ConfigError::InvalidFormat(_))));
    }
}

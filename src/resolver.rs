//! Reverse hostname resolution for discovered hosts.
//!
//! `lookup` is a typed fallible operation; `hostname` maps every failure to
//! [`UNKNOWN_HOSTNAME`] so one bad lookup never fails a scan.

use crate::error::ResolveError;
use async_trait::async_trait;
use std::net::IpAddr;
use std::time::Duration;
use tokio::time::timeout;
use tracing::debug;
use trust_dns_resolver::config::{ResolverConfig, ResolverOpts};
use trust_dns_resolver::error::ResolveErrorKind;
use trust_dns_resolver::TokioAsyncResolver;

/// Hostname reported when a lookup fails.
pub const UNKNOWN_HOSTNAME: &str = "Unknown";

/// Trait for reverse lookup implementations.
#[async_trait]
pub trait NameResolver: Send + Sync {
    /// Resolve the name registered for `ip`.
    async fn lookup(&self, ip: IpAddr) -> Result<String, ResolveError>;

    /// Resolve a name for `ip`, or [`UNKNOWN_HOSTNAME`].
    async fn hostname(&self, ip: IpAddr) -> String {
        match self.lookup(ip).await {
            Ok(name) => name,
            Err(e) => {
                debug!(%ip, reason = %e, "no hostname");
                UNKNOWN_HOSTNAME.to_string()
            }
        }
    }
}

/// PTR lookups through the system's configured DNS servers.
pub struct DnsNameResolver {
    resolver: TokioAsyncResolver,
    timeout: Duration,
}

impl DnsNameResolver {
    /// Create a resolver from the system configuration (falling back to
    /// public defaults) with a per-lookup `timeout`.
    pub fn new(timeout: Duration) -> Self {
        let (config, mut opts) = trust_dns_resolver::system_conf::read_system_conf()
            .unwrap_or_else(|e| {
                debug!(error = %e, "no system resolver config, using defaults");
                (ResolverConfig::default(), ResolverOpts::default())
            });
        opts.timeout = timeout;
        opts.attempts = 1;

        Self {
            resolver: TokioAsyncResolver::tokio(config, opts),
            timeout,
        }
    }
}

#[async_trait]
impl NameResolver for DnsNameResolver {
    async fn lookup(&self, ip: IpAddr) -> Result<String, ResolveError> {
        let response = match timeout(self.timeout, self.resolver.reverse_lookup(ip)).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                return Err(match e.kind() {
                    ResolveErrorKind::NoRecordsFound { .. } => ResolveError::NoRecord(ip),
                    _ => ResolveError::Lookup(e.to_string()),
                })
            }
            Err(_) => return Err(ResolveError::Timeout(ip)),
        };

        response
            .iter()
            .map(|ptr| normalize_name(&ptr.to_string()))
            .find(|name| !name.is_empty())
            .ok_or(ResolveError::NoRecord(ip))
    }
}

/// Strip the trailing root label from a fully-qualified name.
fn normalize_name(name: &str) -> String {
    name.trim().trim_end_matches('.').to_string()
}

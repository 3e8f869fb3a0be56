//! Scanner module - bounded-concurrency port probing.
//!
//! A [`ProbePool`] fans probes for a host's ports out over a shared
//! semaphore, so probing N ports costs about `ceil(N / cap)` timeouts and
//! the whole scan never holds more than `cap` sockets at once.

pub mod tcp;
pub mod traits;

use crate::types::Port;
use futures::stream::{self, StreamExt};
use std::net::IpAddr;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

pub use tcp::TcpConnectProber;
pub use traits::{PortProber, PortStatus};

/// A prober plus the permit pool that bounds its concurrency.
///
/// Cloning shares the same permits.
#[derive(Clone)]
pub struct ProbePool {
    prober: Arc<dyn PortProber>,
    permits: Arc<Semaphore>,
}

impl ProbePool {
    /// Create a pool allowing at most `max_concurrent` probes in flight.
    pub fn new(prober: Arc<dyn PortProber>, max_concurrent: usize) -> Self {
        Self {
            prober,
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
        }
    }

    /// Probe `ports` on `target` and return the open ones, in input order.
    ///
    /// A probe fault degrades that port to closed. Once `cancel` fires, ports
    /// not yet probed are skipped.
    pub async fn open_ports(
        &self,
        target: IpAddr,
        ports: &[Port],
        cancel: &CancellationToken,
    ) -> Vec<Port> {
        let results: Vec<(Port, bool)> = stream::iter(ports.iter().copied())
            .map(|port| {
                let prober = Arc::clone(&self.prober);
                let permits = Arc::clone(&self.permits);
                let cancel = cancel.clone();

                async move {
                    // Semaphore permit
                    let Ok(_permit) = permits.acquire().await else {
                        return (port, false);
                    };
                    if cancel.is_cancelled() {
                        return (port, false);
                    }

                    match prober.probe(target, port).await {
                        Ok(status) => (port, status.is_open()),
                        Err(e) => {
                            warn!(%target, %port, error = %e, "probe failed, assuming closed");
                            (port, false)
                        }
                    }
                }
            })
            // Ordered buffering keeps results in input order; the semaphore
            // controls actual concurrency.
            .buffered(ports.len().max(1))
            .collect()
            .await;

        let open: Vec<Port> = results
            .into_iter()
            .filter_map(|(port, open)| open.then_some(port))
            .collect();

        debug!(%target, probed = ports.len(), open = open.len(), "host probe complete");
        open
    }
}

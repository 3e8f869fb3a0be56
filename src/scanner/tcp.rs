//! TCP Connect prober implementation.
//!
//! Performs standard TCP connect probes using the operating system's
//! socket API. Completes the full handshake and closes immediately.

use crate::error::{ProbeError, ProbeResult};
use crate::scanner::traits::{PortProber, PortStatus};
use crate::types::Port;
use async_trait::async_trait;
use std::io;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;

/// TCP Connect prober.
///
/// Does not require elevated privileges.
#[derive(Debug, Clone)]
pub struct TcpConnectProber {
    timeout: Duration,
}

impl TcpConnectProber {
    /// Create a new TCP connect prober with a per-port connect timeout.
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl PortProber for TcpConnectProber {
    async fn probe(&self, target: IpAddr, port: Port) -> ProbeResult<PortStatus> {
        let addr = SocketAddr::new(target, port.as_u16());

        match timeout(self.timeout, TcpStream::connect(addr)).await {
            Ok(Ok(stream)) => {
                drop(stream);
                Ok(PortStatus::Open)
            }
            Ok(Err(e)) => classify_connect_error(addr, e),
            Err(_) => Ok(PortStatus::Filtered),
        }
    }
}

/// Map a failed connect to a port status, or to a probe fault when the
/// failure says nothing about the port.
fn classify_connect_error(addr: SocketAddr, e: io::Error) -> ProbeResult<PortStatus> {
    match e.kind() {
        io::ErrorKind::ConnectionRefused
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::ConnectionAborted => Ok(PortStatus::Closed),
        io::ErrorKind::TimedOut => Ok(PortStatus::Filtered),
        _ if is_unreachable(&e) => Ok(PortStatus::Filtered),
        _ => Err(ProbeError::ProbeInfrastructure {
            target: addr.ip().to_string(),
            port: addr.port(),
            source: e,
        }),
    }
}

#[cfg(unix)]
fn is_unreachable(e: &io::Error) -> bool {
    matches!(
        e.raw_os_error(),
        Some(libc::EHOSTUNREACH | libc::ENETUNREACH | libc::EHOSTDOWN | libc::ENETDOWN)
    )
}

#[cfg(not(unix))]
fn is_unreachable(e: &io::Error) -> bool {
    e.to_string().to_lowercase().contains("unreachable")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;
    use tokio::net::TcpListener;

    fn localhost() -> IpAddr {
        IpAddr::V4(Ipv4Addr::LOCALHOST)
    }

    #[tokio::test]
    async fn test_probe_listening_port_is_open() {
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
        let port = Port::new(listener.local_addr().unwrap().port()).unwrap();

        let prober = TcpConnectProber::new(Duration::from_millis(500));
        let status = prober.probe(localhost(), port).await.unwrap();
        assert_eq!(status, PortStatus::Open);
    }

    #[tokio::test]
    async fn test_probe_released_port_is_not_open() {
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
        let port = Port::new(listener.local_addr().unwrap().port()).unwrap();
        drop(listener);

        let prober = TcpConnectProber::new(Duration::from_millis(200));
        let status = prober.probe(localhost(), port).await.unwrap();
        assert!(!status.is_open());
    }

    #[test]
    fn test_refused_is_closed_not_error() {
        let addr = SocketAddr::new(localhost(), 80);
        let err = io::Error::from(io::ErrorKind::ConnectionRefused);
        assert_eq!(classify_connect_error(addr, err).unwrap(), PortStatus::Closed);

        let err = io::Error::from(io::ErrorKind::ConnectionReset);
        assert_eq!(classify_connect_error(addr, err).unwrap(), PortStatus::Closed);
    }

    #[cfg(unix)]
    #[test]
    fn test_unreachable_is_filtered() {
        let addr = SocketAddr::new(localhost(), 80);
        let err = io::Error::from_raw_os_error(libc::EHOSTUNREACH);
        assert_eq!(classify_connect_error(addr, err).unwrap(), PortStatus::Filtered);
    }

    #[cfg(unix)]
    #[test]
    fn test_fd_exhaustion_is_infrastructure_error() {
        let addr = SocketAddr::new(localhost(), 80);
        let err = io::Error::from_raw_os_error(libc::EMFILE);
        assert!(matches!(
            classify_connect_error(addr, err),
            Err(ProbeError::ProbeInfrastructure { port: 80, .. })
        ));
    }
}

//! Scan orchestration - sequences discovery, name resolution and port
//! probing into one observable scan.
//!
//! A scan moves `idle → discovering → port_scanning → completed`, or to
//! `error` on a fault. The state record is published through a
//! [`tokio::sync::watch`] channel: the pipeline swaps in whole updated
//! records and readers clone the latest one, so a reader never sees a
//! half-applied update and never waits on scan work.
//!
//! Each scan runs as a worker task under a supervisor task. Whatever the
//! worker does (return, fail, panic), the supervisor performs exactly one
//! terminal transition and one history append.

mod history;
pub mod state;

pub use history::ScanHistory;
pub use state::{Device, DeviceResult, PortResult, ScanState, ScanStatus};

use crate::config::ScanSettings;
use crate::discovery::{ArpDiscoverer, HostDiscoverer};
use crate::error::{RequestError, ScanError, ScanResult};
use crate::resolver::{DnsNameResolver, NameResolver};
use crate::scanner::{PortProber, ProbePool, TcpConnectProber};
use crate::services::service_name;
use crate::types::{AddressRange, Port, PortList, ScanId};
use futures::stream::{self, StreamExt};
use state::device_progress;
use std::net::IpAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Runs scans one at a time and answers status/history queries.
///
/// Starting a scan while one is running is rejected with
/// [`ScanError::ScanInProgress`]. Dropping the orchestrator cancels a
/// running scan.
pub struct ScanOrchestrator {
    shared: Arc<Shared>,
}

struct Shared {
    settings: ScanSettings,
    discoverer: Arc<dyn HostDiscoverer>,
    resolver: Arc<dyn NameResolver>,
    prober: Arc<dyn PortProber>,
    state: watch::Sender<ScanState>,
    history: Mutex<ScanHistory>,
    running: AtomicBool,
    supervisor: Mutex<Option<JoinHandle<()>>>,
    cancel: Mutex<CancellationToken>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ScanOrchestrator {
    /// Create an orchestrator using ARP discovery, DNS reverse lookups and
    /// TCP connect probes configured from `settings`.
    pub fn new(settings: ScanSettings) -> Self {
        let discoverer = Arc::new(ArpDiscoverer::new(settings.interface.clone()));
        let resolver = Arc::new(DnsNameResolver::new(settings.lookup_timeout()));
        let prober = Arc::new(TcpConnectProber::new(settings.port_timeout()));
        Self::with_components(settings, discoverer, resolver, prober)
    }

    /// Create an orchestrator from explicit pipeline components.
    pub fn with_components(
        settings: ScanSettings,
        discoverer: Arc<dyn HostDiscoverer>,
        resolver: Arc<dyn NameResolver>,
        prober: Arc<dyn PortProber>,
    ) -> Self {
        let (state, _) = watch::channel(ScanState::default());

        Self {
            shared: Arc::new(Shared {
                settings,
                discoverer,
                resolver,
                prober,
                state,
                history: Mutex::new(ScanHistory::new()),
                running: AtomicBool::new(false),
                supervisor: Mutex::new(None),
                cancel: Mutex::new(CancellationToken::new()),
            }),
        }
    }

    pub fn settings(&self) -> &ScanSettings {
        &self.shared.settings
    }

    /// Validate a request and launch the scan in the background.
    ///
    /// Returns the id the scan will have in the history. Input errors and
    /// [`ScanError::ScanInProgress`] are returned before any state changes.
    pub fn start_scan(&self, target: &str, ports: PortList) -> ScanResult<ScanId> {
        let target = target.trim();
        if target.is_empty() {
            return Err(RequestError::TargetRequired.into());
        }
        if ports.is_empty() {
            return Err(RequestError::NoPorts.into());
        }
        let range =
            AddressRange::parse_with_limit(target, u128::from(self.shared.settings.max_hosts))?;

        if self
            .shared
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(ScanError::ScanInProgress);
        }

        let scan_id = lock(&self.shared.history).next_id();
        let cancel = CancellationToken::new();
        *lock(&self.shared.cancel) = cancel.clone();

        self.shared
            .state
            .send_replace(ScanState::begin(scan_id, target, ports.clone()));

        info!(
            %scan_id,
            range = target,
            candidates = range.len(),
            ports = ports.len(),
            "scan accepted"
        );

        let handle = tokio::spawn(supervise(Arc::clone(&self.shared), range, ports, cancel));
        *lock(&self.shared.supervisor) = Some(handle);

        Ok(scan_id)
    }

    /// Snapshot of the current (or last) scan.
    pub fn status(&self) -> ScanState {
        self.shared.state.borrow().clone()
    }

    /// Every finished scan, in completion order.
    pub fn history(&self) -> Vec<ScanState> {
        lock(&self.shared.history).entries().to_vec()
    }

    /// A receiver that is notified of every published state change.
    pub fn subscribe(&self) -> watch::Receiver<ScanState> {
        self.shared.state.subscribe()
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }

    /// Wait until the running scan (if any) has reached a terminal state
    /// and been appended to the history.
    pub async fn wait(&self) {
        let handle = lock(&self.shared.supervisor).take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                error!(error = %e, "scan supervisor failed");
            }
        }
    }
}

impl Drop for ScanOrchestrator {
    fn drop(&mut self) {
        lock(&self.shared.cancel).cancel();
    }
}

impl Shared {
    fn update(&self, f: impl FnOnce(&mut ScanState)) {
        self.state.send_modify(f);
    }

    /// The single terminal transition of a scan.
    ///
    /// The snapshot is appended to the history before it is published, so a
    /// reader that sees a terminal status also finds it in the history.
    fn finish(&self, outcome: Result<(), String>) {
        let mut terminal = self.state.borrow().clone();
        let transitioned = match outcome {
            Ok(()) => terminal.complete(),
            Err(message) => terminal.fail(message),
        };

        if transitioned {
            info!(
                scan_id = ?terminal.scan_id,
                status = %terminal.status,
                devices = terminal.devices.len(),
                open_ports = terminal.open_port_count(),
                "scan finished"
            );
            lock(&self.history).push(terminal.clone());
            self.state.send_replace(terminal);
        } else {
            warn!("scan already terminal, ignoring second transition");
        }

        self.running.store(false, Ordering::Release);
    }
}

/// Run the pipeline as a child task and record its outcome.
async fn supervise(
    shared: Arc<Shared>,
    range: AddressRange,
    ports: PortList,
    cancel: CancellationToken,
) {
    let worker = tokio::spawn(run_pipeline(Arc::clone(&shared), range, ports, cancel));

    let outcome = match worker.await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => {
            error!(error = %e, "scan failed");
            Err(e.to_string())
        }
        Err(e) => {
            error!(error = %e, "scan task aborted");
            Err(ScanError::Task(e.to_string()).to_string())
        }
    };

    shared.finish(outcome);
}

async fn run_pipeline(
    shared: Arc<Shared>,
    range: AddressRange,
    ports: PortList,
    cancel: CancellationToken,
) -> ScanResult<()> {
    let settings = &shared.settings;

    shared.update(|s| s.enter(ScanStatus::Discovering, 10));
    debug!(candidates = range.len(), "discovering hosts");

    let found = shared
        .discoverer
        .discover(range.addresses(), settings.discovery_timeout())
        .await?;
    let mut devices: Vec<Device> = found.iter().map(Device::from).collect();

    info!(devices = devices.len(), "discovery complete");
    shared.update(|s| {
        s.devices = devices.clone();
        s.advance(40);
    });

    if devices.is_empty() {
        return Ok(());
    }
    if cancel.is_cancelled() {
        return Err(ScanError::Cancelled);
    }

    let addresses: Vec<IpAddr> = devices.iter().map(|d| d.ip).collect();
    let parallel = settings.max_parallel_hosts.max(1);

    let hostnames: Vec<String> = stream::iter(addresses.clone())
        .map(|ip| {
            let resolver = Arc::clone(&shared.resolver);
            async move { resolver.hostname(ip).await }
        })
        .buffered(parallel)
        .collect()
        .await;
    for (device, hostname) in devices.iter_mut().zip(hostnames) {
        device.hostname = hostname;
    }

    shared.update(|s| {
        s.devices = devices.clone();
        s.enter(ScanStatus::PortScanning, 50);
    });

    let pool = ProbePool::new(Arc::clone(&shared.prober), settings.max_concurrent_probes);
    let total = devices.len();
    let finished = Arc::new(AtomicUsize::new(0));
    let ports: Arc<[Port]> = ports.as_slice().into();

    let results: Vec<DeviceResult> = stream::iter(addresses)
        .map(|ip| {
            let pool = pool.clone();
            let finished = Arc::clone(&finished);
            let shared = Arc::clone(&shared);
            let cancel = cancel.clone();
            let ports = Arc::clone(&ports);

            async move {
                let open = pool.open_ports(ip, &ports, &cancel).await;

                let done = finished.fetch_add(1, Ordering::AcqRel) + 1;
                shared.update(|s| s.advance(device_progress(done, total)));
                debug!(%ip, open = open.len(), done, total, "device scanned");

                DeviceResult {
                    ip,
                    open_ports: open
                        .into_iter()
                        .map(|port| PortResult {
                            port,
                            service: service_name(port.as_u16()),
                        })
                        .collect(),
                }
            }
        })
        // Ordered buffering: results follow discovery order.
        .buffered(parallel)
        .collect()
        .await;

    if cancel.is_cancelled() {
        return Err(ScanError::Cancelled);
    }

    shared.update(|s| s.results = results);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::DiscoveredHost;
    use crate::error::{DiscoveryError, DiscoveryResult, ProbeResult, ResolveError};
    use crate::scanner::PortStatus;
    use async_trait::async_trait;
    use pnet::util::MacAddr;
    use std::collections::HashSet;
    use std::time::Duration;

    enum Discovery {
        Hosts(Vec<DiscoveredHost>),
        Fail,
    }

    struct MockDiscoverer(Discovery);

    #[async_trait]
    impl HostDiscoverer for MockDiscoverer {
        async fn discover(
            &self,
            candidates: &[IpAddr],
            _timeout: Duration,
        ) -> DiscoveryResult<Vec<DiscoveredHost>> {
            match &self.0 {
                Discovery::Hosts(hosts) => Ok(hosts
                    .iter()
                    .filter(|h| candidates.contains(&h.ip))
                    .copied()
                    .collect()),
                Discovery::Fail => Err(DiscoveryError::PermissionDenied(
                    "opening eth0 requires root/sudo privileges".to_string(),
                )),
            }
        }
    }

    struct MockResolver;

    #[async_trait]
    impl NameResolver for MockResolver {
        async fn lookup(&self, ip: IpAddr) -> Result<String, ResolveError> {
            match ip.to_string().as_str() {
                "10.0.0.1" => Ok("router.lan".to_string()),
                _ => Err(ResolveError::NoRecord(ip)),
            }
        }
    }

    struct MockProber {
        open: HashSet<(IpAddr, u16)>,
        delay: Duration,
        panic_on: Option<u16>,
    }

    #[async_trait]
    impl PortProber for MockProber {
        async fn probe(&self, target: IpAddr, port: Port) -> ProbeResult<PortStatus> {
            tokio::time::sleep(self.delay).await;
            if self.panic_on == Some(port.as_u16()) {
                panic!("prober exploded");
            }
            if self.open.contains(&(target, port.as_u16())) {
                Ok(PortStatus::Open)
            } else {
                Ok(PortStatus::Closed)
            }
        }
    }

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    fn host(addr: &str, last: u8) -> DiscoveredHost {
        DiscoveredHost {
            ip: ip(addr),
            mac: MacAddr::new(0x02, 0, 0, 0, 0, last),
        }
    }

    fn lan() -> Vec<DiscoveredHost> {
        vec![host("10.0.0.1", 1), host("10.0.0.2", 2), host("10.0.0.5", 5)]
    }

    fn prober(delay: Duration) -> MockProber {
        MockProber {
            open: [
                (ip("10.0.0.1"), 22),
                (ip("10.0.0.1"), 80),
                (ip("10.0.0.5"), 443),
            ]
            .into_iter()
            .collect(),
            delay,
            panic_on: None,
        }
    }

    fn orchestrator(discovery: Discovery, prober: MockProber) -> ScanOrchestrator {
        ScanOrchestrator::with_components(
            ScanSettings::default(),
            Arc::new(MockDiscoverer(discovery)),
            Arc::new(MockResolver),
            Arc::new(prober),
        )
    }

    fn ports(spec: &str) -> PortList {
        spec.parse().unwrap()
    }

    #[tokio::test]
    async fn test_initial_state_is_idle() {
        let orch = orchestrator(Discovery::Hosts(vec![]), prober(Duration::ZERO));
        let status = orch.status();
        assert_eq!(status.status, ScanStatus::Idle);
        assert_eq!(status.progress, 0);
        assert!(orch.history().is_empty());
        assert!(!orch.is_running());
    }

    #[tokio::test]
    async fn test_empty_discovery_completes_without_port_scan() {
        let orch = orchestrator(Discovery::Hosts(vec![]), prober(Duration::ZERO));
        let id = orch.start_scan("10.0.0.0/24", ports("22,80")).unwrap();
        assert_eq!(id, ScanId::new(0));
        assert!(orch.is_running());
        orch.wait().await;

        let status = orch.status();
        assert_eq!(status.status, ScanStatus::Completed);
        assert_eq!(status.progress, 100);
        assert!(status.devices.is_empty());
        assert!(status.results.is_empty());
        assert!(status.finished_at.is_some());
        assert_eq!(orch.history().len(), 1);
        assert!(!orch.is_running());
    }

    #[tokio::test]
    async fn test_full_scan_results_and_monotonic_progress() {
        let orch = orchestrator(Discovery::Hosts(lan()), prober(Duration::from_millis(5)));
        let mut rx = orch.subscribe();

        orch.start_scan("10.0.0.1-10", ports("443,80,22")).unwrap();

        let mut observed = Vec::new();
        loop {
            rx.changed().await.unwrap();
            let snapshot = rx.borrow_and_update().clone();
            observed.push(snapshot.progress);
            if snapshot.status.is_terminal() {
                break;
            }
        }
        orch.wait().await;

        assert!(observed.windows(2).all(|w| w[0] <= w[1]), "{:?}", observed);
        assert_eq!(observed.last(), Some(&100));

        let status = orch.status();
        assert_eq!(status.status, ScanStatus::Completed);
        assert_eq!(status.target, "10.0.0.1-10");

        let hostnames: Vec<&str> = status.devices.iter().map(|d| d.hostname.as_str()).collect();
        assert_eq!(hostnames, vec!["router.lan", "Unknown", "Unknown"]);
        assert_eq!(status.devices[0].mac, "02:00:00:00:00:01");

        let ips: Vec<IpAddr> = status.results.iter().map(|r| r.ip).collect();
        assert_eq!(ips, vec![ip("10.0.0.1"), ip("10.0.0.2"), ip("10.0.0.5")]);

        let router: Vec<(u16, &str)> = status.results[0]
            .open_ports
            .iter()
            .map(|p| (p.port.as_u16(), p.service.as_str()))
            .collect();
        assert_eq!(router, vec![(80, "HTTP"), (22, "SSH")]);
        assert!(status.results[1].open_ports.is_empty());
        assert_eq!(status.results[2].open_ports[0].service, "HTTPS");
    }

    #[tokio::test]
    async fn test_concurrent_start_is_rejected() {
        let orch = orchestrator(Discovery::Hosts(lan()), prober(Duration::from_millis(100)));

        orch.start_scan("10.0.0.0/29", ports("22")).unwrap();
        let second = orch.start_scan("192.168.50.0/24", ports("80"));
        assert!(matches!(second, Err(ScanError::ScanInProgress)));

        let status = orch.status();
        assert_eq!(status.target, "10.0.0.0/29");
        assert_eq!(status.scan_id, Some(ScanId::new(0)));

        orch.wait().await;
        assert_eq!(orch.history().len(), 1);
        assert_eq!(orch.history()[0].target, "10.0.0.0/29");
    }

    #[tokio::test]
    async fn test_invalid_input_never_starts() {
        let orch = orchestrator(Discovery::Hosts(lan()), prober(Duration::ZERO));

        assert!(matches!(
            orch.start_scan("  ", ports("22")),
            Err(ScanError::InvalidRequest(RequestError::TargetRequired))
        ));
        assert!(matches!(
            orch.start_scan("not-an-ip", ports("22")),
            Err(ScanError::InvalidRequest(RequestError::Range(_)))
        ));
        assert!(matches!(
            orch.start_scan("10.0.0.0/8", ports("22")),
            Err(ScanError::InvalidRequest(RequestError::Range(_)))
        ));
        assert!(matches!(
            orch.start_scan("10.0.0.1", PortList::default()),
            Err(ScanError::InvalidRequest(RequestError::NoPorts))
        ));

        assert_eq!(orch.status().status, ScanStatus::Idle);
        assert!(!orch.is_running());
        assert!(orch.history().is_empty());
    }

    #[tokio::test]
    async fn test_discovery_fault_ends_in_error() {
        let orch = orchestrator(Discovery::Fail, prober(Duration::ZERO));

        orch.start_scan("10.0.0.0/24", ports("22")).unwrap();
        orch.wait().await;

        let status = orch.status();
        assert_eq!(status.status, ScanStatus::Error);
        assert_eq!(status.progress, 10);
        assert!(status.error.as_deref().unwrap().contains("root/sudo"));

        let history = orch.history();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].status, ScanStatus::Error);
        assert!(!orch.is_running());
    }

    #[tokio::test]
    async fn test_worker_panic_is_recorded_once() {
        let mut bad = prober(Duration::ZERO);
        bad.panic_on = Some(80);
        let orch = orchestrator(Discovery::Hosts(lan()), bad);

        orch.start_scan("10.0.0.0/24", ports("22,80")).unwrap();
        orch.wait().await;

        let status = orch.status();
        assert_eq!(status.status, ScanStatus::Error);
        assert!(status.progress >= 50 && status.progress < 100);
        assert_eq!(orch.history().len(), 1);
    }

    #[tokio::test]
    async fn test_history_in_completion_order() {
        let orch = orchestrator(Discovery::Hosts(lan()), prober(Duration::ZERO));

        let first = orch.start_scan("10.0.0.1", ports("22")).unwrap();
        orch.wait().await;
        let second = orch.start_scan("10.0.0.5", ports("443")).unwrap();
        orch.wait().await;

        assert_eq!(first, ScanId::new(0));
        assert_eq!(second, ScanId::new(1));

        let history = orch.history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].target, "10.0.0.1");
        assert_eq!(history[1].target, "10.0.0.5");
        assert!(history.iter().all(|s| s.status == ScanStatus::Completed));
        assert_eq!(history[1].results[0].open_ports[0].port, Port::new(443).unwrap());
    }

    /// Sleeps on every lookup and records how many ran at once.
    #[derive(Default)]
    struct CountingResolver {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl NameResolver for CountingResolver {
        async fn lookup(&self, ip: IpAddr) -> Result<String, ResolveError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(10)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Err(ResolveError::NoRecord(ip))
        }
    }

    #[tokio::test]
    async fn test_hostname_lookups_are_bounded() {
        let hosts: Vec<DiscoveredHost> = (1..=12)
            .map(|last| host(&format!("10.0.0.{}", last), last))
            .collect();
        let resolver = Arc::new(CountingResolver::default());
        let settings = ScanSettings {
            max_parallel_hosts: 3,
            ..ScanSettings::default()
        };
        let orch = ScanOrchestrator::with_components(
            settings,
            Arc::new(MockDiscoverer(Discovery::Hosts(hosts))),
            resolver.clone(),
            Arc::new(prober(Duration::ZERO)),
        );

        orch.start_scan("10.0.0.0/24", ports("22")).unwrap();
        orch.wait().await;

        assert_eq!(orch.status().status, ScanStatus::Completed);
        assert_eq!(orch.status().devices.len(), 12);
        let peak = resolver.peak.load(Ordering::SeqCst);
        assert!(peak <= 3 && peak > 1, "peak lookups: {}", peak);
    }

    #[tokio::test]
    async fn test_terminal_status_is_already_in_history() {
        let orch = orchestrator(Discovery::Hosts(lan()), prober(Duration::from_millis(2)));
        let mut rx = orch.subscribe();

        orch.start_scan("10.0.0.0/29", ports("22")).unwrap();
        loop {
            rx.changed().await.unwrap();
            if rx.borrow_and_update().status.is_terminal() {
                break;
            }
        }
        assert_eq!(orch.history().len(), 1);
        orch.wait().await;
    }
}

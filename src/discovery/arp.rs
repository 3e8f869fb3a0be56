//! ARP sweep over a raw datalink channel.
//!
//! Broadcasts one ARP request per candidate and collects replies until
//! every candidate has answered or the sweep timeout expires.
//!
//! # Privileges Required
//!
//! Opening the datalink channel requires root/administrator privileges
//! (or `CAP_NET_RAW` on Linux).

use super::{DiscoveredHost, HostDiscoverer};
use crate::error::{DiscoveryError, DiscoveryResult};
use async_trait::async_trait;
use pnet::datalink::{self, Channel, DataLinkReceiver, DataLinkSender, NetworkInterface};
use pnet::ipnetwork::IpNetwork;
use pnet::packet::arp::{ArpHardwareTypes, ArpOperations, ArpPacket, MutableArpPacket};
use pnet::packet::ethernet::{EtherTypes, EthernetPacket, MutableEthernetPacket};
use pnet::packet::Packet;
use pnet::util::MacAddr;
use std::collections::{HashMap, HashSet};
use std::io;
use std::net::{IpAddr, Ipv4Addr};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

const ETH_HDR_LEN: usize = 14;
const ARP_LEN: usize = 28;
/// Minimum Ethernet frame size without the frame check sequence.
const MIN_ETH_FRAME_NO_FCS: usize = 60;
/// How long one blocking read waits before the deadline is rechecked.
const READ_POLL: Duration = Duration::from_millis(50);

/// Host discoverer that sends ARP who-has broadcasts.
#[derive(Debug, Clone, Default)]
pub struct ArpDiscoverer {
    interface: Option<String>,
}

impl ArpDiscoverer {
    /// Create a discoverer. With no interface name, the interface on the
    /// targets' network is used.
    pub fn new(interface: Option<String>) -> Self {
        Self { interface }
    }
}

#[async_trait]
impl HostDiscoverer for ArpDiscoverer {
    async fn discover(
        &self,
        candidates: &[IpAddr],
        timeout: Duration,
    ) -> DiscoveryResult<Vec<DiscoveredHost>> {
        let targets: Vec<Ipv4Addr> = candidates
            .iter()
            .filter_map(|ip| match ip {
                IpAddr::V4(v4) => Some(*v4),
                IpAddr::V6(_) => None,
            })
            .collect();

        let skipped = candidates.len() - targets.len();
        if skipped > 0 {
            debug!(skipped, "IPv6 candidates cannot be ARP'd, skipping");
        }
        if targets.is_empty() {
            return Ok(Vec::new());
        }

        let interface = self.interface.clone();
        tokio::task::spawn_blocking(move || sweep(interface.as_deref(), &targets, timeout))
            .await
            .map_err(|e| DiscoveryError::Task(e.to_string()))?
    }
}

/// Run one blocking sweep.
fn sweep(
    interface_name: Option<&str>,
    targets: &[Ipv4Addr],
    timeout: Duration,
) -> DiscoveryResult<Vec<DiscoveredHost>> {
    // The timeout bounds the whole sweep, sends included.
    let deadline = Instant::now() + timeout;

    let (interface, source_ip) = select_interface(datalink::interfaces(), interface_name, targets)?;
    let source_mac = interface
        .mac
        .ok_or_else(|| DiscoveryError::NoHardwareAddress(interface.name.clone()))?;

    let config = datalink::Config {
        read_timeout: Some(READ_POLL),
        ..Default::default()
    };
    let (tx, rx) = open_channel(&interface, config, datalink::channel)?;

    debug!(
        interface = %interface.name,
        %source_ip,
        targets = targets.len(),
        ?timeout,
        "starting ARP sweep"
    );

    exchange(tx, rx, source_mac, source_ip, targets, deadline)
}

/// Send one request per target, then collect replies until `deadline` or
/// until every target has answered.
fn exchange(
    mut tx: Box<dyn DataLinkSender>,
    mut rx: Box<dyn DataLinkReceiver>,
    source_mac: MacAddr,
    source_ip: Ipv4Addr,
    targets: &[Ipv4Addr],
    deadline: Instant,
) -> DiscoveryResult<Vec<DiscoveredHost>> {
    let mut failed_sends = 0usize;
    let mut sent = 0usize;
    for &target in targets {
        if Instant::now() >= deadline {
            break;
        }
        let packet = build_request(source_mac, source_ip, target)?;
        if let Some(Err(e)) = tx.send_to(&packet, None) {
            failed_sends += 1;
            debug!(%target, error = %e, "failed to send ARP request");
        }
        sent += 1;
    }
    if failed_sends > 0 {
        warn!(failed_sends, "some ARP requests could not be sent");
    }
    if sent < targets.len() {
        warn!(sent, targets = targets.len(), "discovery timeout reached while sending");
    }

    let mut collector = ReplyCollector::new(targets);
    while Instant::now() < deadline && !collector.is_complete() {
        // Read errors are the poll timeout expiring; keep listening.
        if let Ok(frame) = rx.next() {
            collector.observe(frame);
        }
    }

    Ok(collector.into_hosts())
}

/// Open an Ethernet channel on `interface`.
fn open_channel<F>(
    interface: &NetworkInterface,
    config: datalink::Config,
    opener: F,
) -> DiscoveryResult<(Box<dyn DataLinkSender>, Box<dyn DataLinkReceiver>)>
where
    F: FnOnce(&NetworkInterface, datalink::Config) -> io::Result<Channel>,
{
    match opener(interface, config) {
        Ok(Channel::Ethernet(tx, rx)) => Ok((tx, rx)),
        Ok(_) => Err(DiscoveryError::Channel(format!(
            "non-ethernet channel for {}",
            interface.name
        ))),
        Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
            Err(DiscoveryError::PermissionDenied(format!(
                "opening {} requires root/sudo privileges",
                interface.name
            )))
        }
        Err(e) => Err(DiscoveryError::Channel(format!(
            "opening on {}: {}",
            interface.name, e
        ))),
    }
}

/// Pick the interface and source address for a sweep over `targets`.
///
/// A named interface is used as given. Otherwise the interface whose IPv4
/// network contains the first target wins, with its address on that network
/// as the source. Failing that, the first up, non-loopback interface with an
/// IPv4 address is used.
fn select_interface(
    interfaces: Vec<NetworkInterface>,
    name: Option<&str>,
    targets: &[Ipv4Addr],
) -> DiscoveryResult<(NetworkInterface, Ipv4Addr)> {
    let first = targets.first().copied().map(IpAddr::V4);

    let interface = if let Some(name) = name {
        interfaces
            .into_iter()
            .find(|iface| iface.name == name)
            .ok_or_else(|| DiscoveryError::InterfaceNotFound(name.to_string()))?
    } else {
        let usable: Vec<NetworkInterface> = interfaces
            .into_iter()
            .filter(|iface| {
                !iface.is_loopback()
                    && iface.is_up()
                    && iface.mac.is_some()
                    && iface.ips.iter().any(|ip| ip.is_ipv4())
            })
            .collect();

        let on_link = first.and_then(|target| {
            usable
                .iter()
                .position(|iface| iface.ips.iter().any(|net| net.is_ipv4() && net.contains(target)))
        });
        let chosen = match on_link {
            Some(index) => usable.into_iter().nth(index),
            None => {
                if let Some(target) = first {
                    debug!(%target, "no interface on the target's network, using the first usable one");
                }
                usable.into_iter().next()
            }
        };
        chosen.ok_or_else(|| {
            DiscoveryError::InterfaceNotFound("no suitable network interface found".to_string())
        })?
    };

    let source_ip = interface_ipv4(&interface, first)?;
    Ok((interface, source_ip))
}

/// The interface's IPv4 address on the network containing `target`, or its
/// first non-loopback IPv4 address.
fn interface_ipv4(interface: &NetworkInterface, target: Option<IpAddr>) -> DiscoveryResult<Ipv4Addr> {
    let v4 = |net: &IpNetwork| match net.ip() {
        IpAddr::V4(addr) if !addr.is_loopback() => Some(addr),
        _ => None,
    };

    target
        .and_then(|target| {
            interface
                .ips
                .iter()
                .filter(|net| net.contains(target))
                .find_map(v4)
        })
        .or_else(|| interface.ips.iter().find_map(v4))
        .ok_or_else(|| DiscoveryError::NoIpv4Address(interface.name.clone()))
}

/// Build a broadcast ARP who-has frame for `target`.
pub fn build_request(
    source_mac: MacAddr,
    source_ip: Ipv4Addr,
    target: Ipv4Addr,
) -> DiscoveryResult<Vec<u8>> {
    let mut buffer = vec![0u8; MIN_ETH_FRAME_NO_FCS];

    {
        let mut eth = MutableEthernetPacket::new(&mut buffer[..ETH_HDR_LEN + ARP_LEN])
            .ok_or_else(|| DiscoveryError::InvalidPacket("ethernet header".to_string()))?;
        eth.set_destination(MacAddr::broadcast());
        eth.set_source(source_mac);
        eth.set_ethertype(EtherTypes::Arp);
    }

    {
        let mut arp = MutableArpPacket::new(&mut buffer[ETH_HDR_LEN..ETH_HDR_LEN + ARP_LEN])
            .ok_or_else(|| DiscoveryError::InvalidPacket("ARP payload".to_string()))?;
        arp.set_hardware_type(ArpHardwareTypes::Ethernet);
        arp.set_protocol_type(EtherTypes::Ipv4);
        arp.set_hw_addr_len(6);
        arp.set_proto_addr_len(4);
        arp.set_operation(ArpOperations::Request);
        arp.set_sender_hw_addr(source_mac);
        arp.set_sender_proto_addr(source_ip);
        arp.set_target_hw_addr(MacAddr::zero());
        arp.set_target_proto_addr(target);
    }

    Ok(buffer)
}

/// Extract `(sender ip, sender mac)` from an ARP reply frame.
pub fn parse_reply(frame: &[u8]) -> Option<(Ipv4Addr, MacAddr)> {
    let eth = EthernetPacket::new(frame)?;
    if eth.get_ethertype() != EtherTypes::Arp {
        return None;
    }

    let arp = ArpPacket::new(eth.payload())?;
    if arp.get_operation() != ArpOperations::Reply {
        return None;
    }

    Some((arp.get_sender_proto_addr(), arp.get_sender_hw_addr()))
}

/// Accumulates replies for a fixed candidate set.
struct ReplyCollector {
    order: Vec<Ipv4Addr>,
    wanted: HashSet<Ipv4Addr>,
    seen: HashMap<Ipv4Addr, MacAddr>,
}

impl ReplyCollector {
    fn new(targets: &[Ipv4Addr]) -> Self {
        let mut wanted = HashSet::with_capacity(targets.len());
        let order: Vec<Ipv4Addr> = targets.iter().copied().filter(|ip| wanted.insert(*ip)).collect();

        Self {
            order,
            wanted,
            seen: HashMap::new(),
        }
    }

    /// Record a frame. Replies from outside the candidate set and repeat
    /// replies are ignored; the first MAC seen for an address wins.
    fn observe(&mut self, frame: &[u8]) {
        if let Some((ip, mac)) = parse_reply(frame) {
            if self.wanted.contains(&ip) {
                self.seen.entry(ip).or_insert(mac);
            }
        }
    }

    fn is_complete(&self) -> bool {
        self.seen.len() == self.wanted.len()
    }

    /// Responding hosts, in candidate order.
    fn into_hosts(self) -> Vec<DiscoveredHost> {
        let seen = self.seen;
        self.order
            .into_iter()
            .filter_map(|ip| {
                seen.get(&ip).map(|mac| DiscoveredHost {
                    ip: IpAddr::V4(ip),
                    mac: *mac,
                })
            })
            .collect()
    }
}

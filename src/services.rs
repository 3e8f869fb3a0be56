//! Service naming for open ports.
//!
//! Labels come from a static table of well-known ports, then from the
//! system service database (`/etc/services`), then fall back to
//! [`UNKNOWN_SERVICE`]. Lookups never fail.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

/// Label used when no source knows the port.
pub const UNKNOWN_SERVICE: &str = "Unknown";

/// Location of the system service database.
pub const SYSTEM_SERVICES_PATH: &str = "/etc/services";

/// Static map of well-known ports to service labels.
static PORT_SERVICES: LazyLock<HashMap<u16, &'static str>> = LazyLock::new(|| {
    let mut m = HashMap::new();

    m.insert(20, "FTP-Data");
    m.insert(21, "FTP");
    m.insert(22, "SSH");
    m.insert(23, "Telnet");
    m.insert(25, "SMTP");
    m.insert(53, "DNS");
    m.insert(67, "DHCP");
    m.insert(69, "TFTP");
    m.insert(80, "HTTP");
    m.insert(88, "Kerberos");
    m.insert(110, "POP3");
    m.insert(111, "RPCBind");
    m.insert(123, "NTP");
    m.insert(135, "MSRPC");
    m.insert(139, "NetBIOS");
    m.insert(143, "IMAP");
    m.insert(161, "SNMP");
    m.insert(389, "LDAP");
    m.insert(443, "HTTPS");
    m.insert(445, "SMB");
    m.insert(465, "SMTPS");
    m.insert(514, "Syslog");
    m.insert(515, "LPD");
    m.insert(548, "AFP");
    m.insert(554, "RTSP");
    m.insert(587, "Submission");
    m.insert(631, "IPP");
    m.insert(636, "LDAPS");
    m.insert(873, "Rsync");
    m.insert(993, "IMAPS");
    m.insert(995, "POP3S");
    m.insert(1080, "SOCKS");
    m.insert(1194, "OpenVPN");
    m.insert(1433, "MSSQL");
    m.insert(1521, "Oracle");
    m.insert(1723, "PPTP");
    m.insert(1883, "MQTT");
    m.insert(1900, "UPnP");
    m.insert(2049, "NFS");
    m.insert(2375, "Docker");
    m.insert(3000, "Grafana");
    m.insert(3128, "Squid");
    m.insert(3306, "MySQL");
    m.insert(3389, "RDP");
    m.insert(5000, "UPnP");
    m.insert(5060, "SIP");
    m.insert(5353, "mDNS");
    m.insert(5432, "PostgreSQL");
    m.insert(5672, "AMQP");
    m.insert(5900, "VNC");
    m.insert(6379, "Redis");
    m.insert(8000, "HTTP-Alt");
    m.insert(8080, "HTTP-Proxy");
    m.insert(8443, "HTTPS-Alt");
    m.insert(8888, "HTTP-Alt");
    m.insert(9000, "CSlistener");
    m.insert(9100, "JetDirect");
    m.insert(9200, "Elasticsearch");
    m.insert(11211, "Memcached");
    m.insert(27017, "MongoDB");

    m
});

static SYSTEM_SERVICES: LazyLock<ServiceDatabase> =
    LazyLock::new(|| ServiceDatabase::load(Path::new(SYSTEM_SERVICES_PATH)));

/// TCP entries of a `services(5)` style database.
#[derive(Debug, Clone, Default)]
pub struct ServiceDatabase {
    tcp: HashMap<u16, String>,
}

impl ServiceDatabase {
    /// Parse database text. Malformed lines are skipped; the first name
    /// listed for a port wins.
    pub fn parse(content: &str) -> Self {
        let mut tcp = HashMap::new();

        for line in content.lines() {
            let line = line.split('#').next().unwrap_or_default();
            let mut fields = line.split_whitespace();
            let (Some(name), Some(port_proto)) = (fields.next(), fields.next()) else {
                continue;
            };
            let Some((port, proto)) = port_proto.split_once('/') else {
                continue;
            };
            if proto != "tcp" {
                continue;
            }
            if let Ok(port) = port.parse::<u16>() {
                tcp.entry(port).or_insert_with(|| name.to_string());
            }
        }

        Self { tcp }
    }

    /// Load a database file. A missing or unreadable file is an empty database.
    pub fn load(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(content) => Self::parse(&content),
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "service database unavailable");
                Self::default()
            }
        }
    }

    pub fn lookup(&self, port: u16) -> Option<&str> {
        self.tcp.get(&port).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.tcp.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tcp.is_empty()
    }
}

/// Look up the well-known label for a port in the static table.
pub fn get_service_name(port: u16) -> Option<&'static str> {
    PORT_SERVICES.get(&port).copied()
}

/// Resolve a label for a port: static table, then system database, then
/// [`UNKNOWN_SERVICE`].
pub fn service_name(port: u16) -> String {
    service_name_with(&SYSTEM_SERVICES, port)
}

/// Resolve a label using `db` as the fallback database.
pub fn service_name_with(db: &ServiceDatabase, port: u16) -> String {
    get_service_name(port)
        .or_else(|| db.lookup(port))
        .unwrap_or(UNKNOWN_SERVICE)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_common_ports() {
        assert_eq!(service_name(22), "SSH");
        assert_eq!(service_name(80), "HTTP");
        assert_eq!(service_name(443), "HTTPS");
        assert_eq!(service_name(3389), "RDP");
    }

    #[test]
    fn test_unknown_port_falls_back() {
        let empty = ServiceDatabase::default();
        assert_eq!(service_name_with(&empty, 65000), "Unknown");
        assert_eq!(service_name_with(&empty, 22), "SSH");
    }

    #[test]
    fn test_database_fills_gaps_in_static_table() {
        let db = ServiceDatabase::parse("custom-app      65000/tcp\nssh-alt         22/tcp\n");
        assert_eq!(service_name_with(&db, 65000), "custom-app");
        assert_eq!(service_name_with(&db, 22), "SSH");
    }

    #[test]
    fn test_parse_service_database() {
        let db = ServiceDatabase::parse(
            "# Network services\n\
             ssh             22/tcp                          # SSH Remote Login Protocol\n\
             domain          53/udp\n\
             http            80/tcp          www             # WorldWideWeb HTTP\n\
             broken line\n\
             webcache        8080/tcp\n\
             http-alt        8080/tcp\n",
        );

        assert_eq!(db.lookup(22), Some("ssh"));
        assert_eq!(db.lookup(80), Some("http"));
        assert_eq!(db.lookup(53), None);
        assert_eq!(db.lookup(8080), Some("webcache"));
        assert_eq!(db.len(), 3);
    }

    #[test]
    fn test_missing_database_is_empty() {
        let db = ServiceDatabase::load(Path::new("/nonexistent/lanscout/services"));
        assert!(db.is_empty());
    }
}

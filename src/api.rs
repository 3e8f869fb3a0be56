//! Request/response contract for an HTTP front end.
//!
//! Maps orchestrator calls onto the JSON bodies and status codes a web
//! client expects, without binding to any particular server crate:
//!
//! | Route                    | Handler          |
//! |--------------------------|------------------|
//! | `POST /api/scan`         | [`start_scan`]   |
//! | `GET /api/scan/status`   | [`scan_status`]  |
//! | `GET /api/scan/history`  | [`scan_history`] |

use crate::error::{RequestError, ScanError};
use crate::orchestrator::ScanOrchestrator;
use crate::types::{PortList, ScanId};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::warn;

pub const STATUS_OK: u16 = 200;
pub const STATUS_ACCEPTED: u16 = 202;
pub const STATUS_BAD_REQUEST: u16 = 400;
pub const STATUS_CONFLICT: u16 = 409;

/// Body of `POST /api/scan`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanRequest {
    #[serde(default)]
    pub target: String,
    #[serde(default)]
    pub ports: Option<String>,
}

impl ScanRequest {
    /// Check the request and parse its port list, using the configured
    /// `default_ports` when none was given. Request ports must be plain
    /// comma-separated numbers.
    pub fn validate(&self, default_ports: &str) -> Result<(String, PortList), RequestError> {
        let target = self.target.trim();
        if target.is_empty() {
            return Err(RequestError::TargetRequired);
        }
        let ports = match self.ports.as_deref() {
            Some(ports) => PortList::parse_request(ports)?,
            None => default_ports.parse()?,
        };
        Ok((target.to_string(), ports))
    }
}

/// Body of a successful `POST /api/scan`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanAccepted {
    pub message: String,
    pub scan_id: ScanId,
}

/// Body of every rejected request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

/// A status code plus JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub status: u16,
    pub body: Value,
}

impl Reply {
    fn json<T: Serialize>(status: u16, body: &T) -> Self {
        match serde_json::to_value(body) {
            Ok(body) => Self { status, body },
            Err(e) => {
                warn!(error = %e, "failed to serialize reply body");
                Self {
                    status: 500,
                    body: json!({ "error": "internal error" }),
                }
            }
        }
    }

    fn error(status: u16, message: impl Into<String>) -> Self {
        Self::json(
            status,
            &ErrorBody {
                error: message.into(),
            },
        )
    }
}

/// `POST /api/scan`
pub fn start_scan(orchestrator: &ScanOrchestrator, request: &ScanRequest) -> Reply {
    let (target, ports) = match request.validate(&orchestrator.settings().default_ports) {
        Ok(parsed) => parsed,
        Err(e) => return Reply::error(STATUS_BAD_REQUEST, e.to_string()),
    };

    match orchestrator.start_scan(&target, ports) {
        Ok(scan_id) => Reply::json(
            STATUS_ACCEPTED,
            &ScanAccepted {
                message: "Scan started".to_string(),
                scan_id,
            },
        ),
        Err(e @ ScanError::ScanInProgress) => Reply::error(STATUS_CONFLICT, e.to_string()),
        Err(e @ ScanError::InvalidRequest(_)) => Reply::error(STATUS_BAD_REQUEST, e.to_string()),
        Err(e) => Reply::error(500, e.to_string()),
    }
}

/// `GET /api/scan/status`
pub fn scan_status(orchestrator: &ScanOrchestrator) -> Reply {
    Reply::json(STATUS_OK, &orchestrator.status())
}

/// `GET /api/scan/history`
pub fn scan_history(orchestrator: &ScanOrchestrator) -> Reply {
    Reply::json(STATUS_OK, &orchestrator.history())
}

//! Unified error type definition

use serde::Serialize;
use thiserror::Error;

use crate::types::ResponseCode;

/// Errors surfaced by the query engine.
///
/// Input problems and transport failures are returned to the caller as typed
/// values. DNS-level failures of the primary query (`NXDOMAIN`, `SERVFAIL`,
/// `REFUSED`) are reported as [`ProtocolStatus`](Self::ProtocolStatus), which is
/// distinct from transport failures.
#[derive(Error, Debug, Clone, Serialize)]
#[serde(tag = "code", content = "details")]
pub enum DigError {
    /// Generic input validation error
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Input is not a domain name, IPv4 or IPv6 literal
    #[error("Invalid domain or IP address: \"{input}\"")]
    InvalidDomain { input: String },

    /// Upstream answered with a non-2xx HTTP status
    #[error("{endpoint} error: HTTP {status}")]
    UpstreamHttp { endpoint: String, status: u16 },

    /// Upstream could not be reached (connect failure, timeout, body read)
    #[error("{endpoint} unreachable: {detail}")]
    Network { endpoint: String, detail: String },

    /// Upstream body could not be decoded
    #[error("{endpoint} returned an unreadable response: {detail}")]
    Parse { endpoint: String, detail: String },

    /// The DoH envelope itself reported a terminal DNS status
    #[error("{}", protocol_message(*code, domain))]
    ProtocolStatus { code: ResponseCode, domain: String },
}

impl DigError {
    /// Whether this error came from the network rather than from the input.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            Self::UpstreamHttp { .. } | Self::Network { .. } | Self::Parse { .. }
        )
    }
}

fn protocol_message(code: ResponseCode, domain: &str) -> String {
    match code {
        ResponseCode::NxDomain => format!("Domain \"{domain}\" not found (NXDOMAIN)"),
        ResponseCode::Refused => "Query refused by server (REFUSED)".to_string(),
        ResponseCode::ServFail => "Server failure (SERVFAIL)".to_string(),
        other => format!("DNS query for \"{domain}\" failed ({other})"),
    }
}

/// Result alias used throughout the crate
pub type DigResult<T> = std::result::Result<T, DigError>;

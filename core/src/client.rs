//! # Clients
//!
//! Request/response helpers on top of the event loop. Every query resolves
//! to a value or a [`QueryError`] telling the caller whether the request
//! never left, went unanswered or was refused by the agent.

pub mod ntp;
pub mod snmp;

use rnms_common::Config;
use thiserror::Error;

use crate::network::event_loop::TransportHandle;
use crate::network::tcp::TcpProber;

pub use ntp::NtpClient;
pub use snmp::SnmpClient;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    /// Nothing was sent: no credentials, unresolvable address or the event
    /// loop is gone.
    #[error("request not issued")]
    NotIssued,

    /// Timed out, or the reply could not be decoded.
    #[error("no response")]
    NoResponse,

    #[error("agent reported error {status} at index {index}")]
    Agent { status: i64, index: i64 },

    #[error("peer answered with an error response")]
    Rejected,
}

impl QueryError {
    /// The host did not answer at all.
    pub fn is_unreachable(&self) -> bool {
        matches!(self, QueryError::NoResponse)
    }
}

/// Everything a poller or discovery rule may talk to.
#[derive(Clone)]
pub struct Clients {
    pub ntp: NtpClient,
    pub snmp: SnmpClient,
    pub tcp: TcpProber,
}

impl Clients {
    pub fn new(transport: TransportHandle, cfg: &Config) -> Self {
        Self {
            ntp: NtpClient::new(transport.clone()),
            snmp: SnmpClient::new(transport),
            tcp: TcpProber::new(cfg.tcp_connect_timeout),
        }
    }
}

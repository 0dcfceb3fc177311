use std::net::SocketAddr;

use thiserror::Error;

/// Socket level failures of a dispatcher.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to bind {addr}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to send request to {peer}")]
    Send {
        peer: SocketAddr,
        #[source]
        source: std::io::Error,
    },
}

/// Problems found while wiring pollers, backends and chains together.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unknown poller '{0}'")]
    UnknownPoller(String),

    #[error("unknown backend '{0}'")]
    UnknownBackend(String),

    #[error("poller '{0}' registered twice")]
    DuplicatePoller(String),

    #[error("invalid parameters for poller '{poller}': {reason}")]
    InvalidParameter { poller: String, reason: String },
}

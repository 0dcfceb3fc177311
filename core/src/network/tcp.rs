use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::trace;

/// Result of a single connect attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortState {
    /// The handshake completed.
    Open,
    /// The host answered with a reset or the connect failed outright.
    Refused,
    /// No answer before the connect timeout.
    Filtered,
}

/// Connect probes with a fixed timeout.
#[derive(Debug, Clone, Copy)]
pub struct TcpProber {
    connect_timeout: Duration,
}

impl TcpProber {
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }

    pub async fn probe(self, addr: SocketAddr) -> PortState {
        handshake_probe(addr, self.connect_timeout).await
    }
}

pub async fn handshake_probe(addr: SocketAddr, connect_timeout: Duration) -> PortState {
    let state = match timeout(connect_timeout, TcpStream::connect(addr)).await {
        Ok(Ok(_stream)) => PortState::Open,
        Ok(Err(_)) => PortState::Refused,
        Err(_elapsed) => PortState::Filtered,
    };
    trace!(%addr, ?state, "tcp probe");
    state
}

/// Probes every port in order and keeps the ones that are open.
pub async fn open_ports<F, Fut>(ports: &[u16], mut prober: F) -> Vec<u16>
where
    F: FnMut(u16) -> Fut,
    Fut: Future<Output = PortState>,
{
    let mut open: Vec<u16> = Vec::new();
    for &port in ports {
        if prober(port).await == PortState::Open {
            open.push(port);
        }
    }
    open
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝

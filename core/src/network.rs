//! # Network
//!
//! UDP dispatchers for the query protocols, the event loop that owns them
//! and TCP reachability probes.

pub mod codec;
pub mod dispatcher;
pub mod event_loop;
pub mod tcp;

use std::net::{IpAddr, SocketAddr};

use tokio::net::lookup_host;
use tracing::debug;

/// Address family a dispatcher is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressFamily {
    V4,
    V6,
}

impl AddressFamily {
    pub fn of(addr: &SocketAddr) -> Self {
        match addr {
            SocketAddr::V4(_) => AddressFamily::V4,
            SocketAddr::V6(_) => AddressFamily::V6,
        }
    }
}

/// Turns a management address into a socket address.
///
/// IP literals are used as is. Anything else goes through the runtime's
/// resolver and the first answer wins. Returns `None` when nothing resolves.
pub async fn resolve(address: &str, port: u16) -> Option<SocketAddr> {
    let address = address.trim();
    if let Ok(ip) = address.parse::<IpAddr>() {
        return Some(SocketAddr::new(ip, port));
    }
    if address.is_empty() {
        return None;
    }

    match lookup_host((address, port)).await {
        Ok(mut found) => found.next(),
        Err(e) => {
            debug!(address, error = %e, "address did not resolve");
            None
        }
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝

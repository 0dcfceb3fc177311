//! Synchronisation state of an NTP server, read over mode 6 control queries.

use async_trait::async_trait;
use rnms_protocols::ntp::{ControlMessage, selection};
use tracing::debug;

use crate::client::QueryError;
use crate::poller::{PollBuffer, PollContext, PollOutcome, Poller};

/// Stratum reported for a server that has not selected a peer.
pub const UNSYNCHRONISED_STRATUM: f64 = 16.0;

pub struct NtpStatus;

/// `[synchronised, stratum, offset]` from the variables of the system peer.
pub fn peer_status(peer: &ControlMessage) -> Option<[f64; 3]> {
    let number = |key: &str| peer.assoc_data.get(key)?.parse::<f64>().ok();
    Some([1.0, number("stratum")?, number("offset").unwrap_or(0.0)])
}

fn outcome_of(error: QueryError) -> PollOutcome {
    if error.is_unreachable() {
        PollOutcome::Unreachable
    } else {
        PollOutcome::NoValue
    }
}

#[async_trait]
impl Poller for NtpStatus {
    fn name(&self) -> &'static str {
        "ntp_client"
    }

    async fn poll(&self, _buffer: &mut PollBuffer, _params: &str, ctx: &PollContext<'_>) -> PollOutcome {
        let peers = match ctx.clients.ntp.get_peers(ctx.host).await {
            Ok(peers) => peers,
            Err(e) => return outcome_of(e),
        };

        let Some(sys_peer) = peers
            .peers
            .iter()
            .find(|peer| peer.selection() == selection::SYS_PEER)
        else {
            debug!(host = %ctx.host.display_name, peers = peers.peers.len(), "no system peer");
            return PollOutcome::tuple(vec![0.0, UNSYNCHRONISED_STRATUM, 0.0]);
        };

        let variables = match ctx.clients.ntp.get_peer_by_id(ctx.host, sys_peer.assoc_id).await {
            Ok(variables) => variables,
            Err(e) => return outcome_of(e),
        };

        match peer_status(&variables) {
            Some(status) => PollOutcome::tuple(status.to_vec()),
            None => PollOutcome::NoValue,
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

use async_trait::async_trait;
use tracing::{debug, error};

use crate::network::resolve;
use crate::network::tcp::PortState;
use crate::poller::{PollBuffer, PollContext, PollOutcome, Poller};

/// Connects to a TCP port: 1 when it accepts, 0 when refused. A connect
/// timeout marks the attribute unreachable.
pub struct TcpStatus;

#[async_trait]
impl Poller for TcpStatus {
    fn name(&self) -> &'static str {
        "tcp_status"
    }

    async fn poll(&self, _buffer: &mut PollBuffer, params: &str, ctx: &PollContext<'_>) -> PollOutcome {
        let text = match params.trim() {
            "" => ctx.attribute.index.as_str(),
            port => port,
        };
        let Ok(port) = text.parse::<u16>() else {
            error!(attribute = ctx.attribute.id, port = text, "bad poller parameters");
            return PollOutcome::NoValue;
        };

        let Some(addr) = resolve(&ctx.host.mgmt_address, port).await else {
            debug!(host = %ctx.host.display_name, "address did not resolve");
            return PollOutcome::NoValue;
        };

        match ctx.clients.tcp.probe(addr).await {
            PortState::Open => PollOutcome::number(1.0),
            PortState::Refused => PollOutcome::number(0.0),
            PortState::Filtered => PollOutcome::Unreachable,
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

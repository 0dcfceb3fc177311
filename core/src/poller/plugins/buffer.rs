use async_trait::async_trait;
use tracing::debug;

use crate::poller::{PollBuffer, PollContext, PollOutcome, Poller};

/// Re-reads a number an earlier step of the chain stored in the buffer.
pub struct BufferValue;

#[async_trait]
impl Poller for BufferValue {
    fn name(&self) -> &'static str {
        "buffer"
    }

    async fn poll(&self, buffer: &mut PollBuffer, params: &str, ctx: &PollContext<'_>) -> PollOutcome {
        let key = params.trim();
        match buffer.get(key).and_then(|text| text.trim().parse::<f64>().ok()) {
            Some(number) => PollOutcome::number(number),
            None => {
                debug!(attribute = ctx.attribute.id, key, "nothing usable in buffer");
                PollOutcome::NoValue
            }
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

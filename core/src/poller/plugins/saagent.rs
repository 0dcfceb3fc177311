//! Cisco IP SLA (SA agent) statistics.
//!
//! One GET of four counters from the latest-jitter-stats table, turned into
//! a jitter figure or a packet-loss tuple.

use async_trait::async_trait;
use rnms_common::ConfigError;
use rnms_protocols::Oid;
use rnms_protocols::snmp::VarBind;
use tracing::{debug, error};

use super::split_params;
use crate::poller::{PollBuffer, PollContext, PollOutcome, Poller};

/// rttMonLatestJitterOperEntry
const JITTER_ENTRY: [u32; 13] = [1, 3, 6, 1, 4, 1, 9, 9, 42, 1, 5, 2, 1];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryType {
    ForwardJitter,
    BackwardJitter,
    PacketLoss,
}

impl QueryType {
    pub fn parse(text: &str) -> Option<Self> {
        match text {
            "fwd_jitter" => Some(QueryType::ForwardJitter),
            "bwd_jitter" => Some(QueryType::BackwardJitter),
            "packetloss" => Some(QueryType::PacketLoss),
            _ => None,
        }
    }

    fn columns(self) -> [u32; 4] {
        match self {
            // min/max positive, min/max negative
            QueryType::ForwardJitter => [8, 9, 13, 14],
            QueryType::BackwardJitter => [18, 19, 23, 24],
            // num of RTT, RTT sum, loss src->dst, loss dst->src
            QueryType::PacketLoss => [1, 2, 26, 27],
        }
    }

    /// The four objects to fetch for SLA operation `index`.
    pub fn oids(self, index: u32) -> Vec<Oid> {
        let entry = Oid::from_slice(&JITTER_ENTRY);
        self.columns()
            .iter()
            .map(|&column| entry.extend(&[column, index]))
            .collect()
    }
}

/// `(b + d) / (a + c)`, or 0 when the divisor is 0.
pub fn jitter(values: [f64; 4]) -> f64 {
    let [a, b, c, d] = values;
    let divisor = a + c;
    if divisor == 0.0 { 0.0 } else { (b + d) / divisor }
}

/// `[forward %, backward %, average RTT]` from
/// `[num_rtt, rtt_sum, forward_loss, backward_loss]`.
pub fn packet_loss(values: [f64; 4]) -> [f64; 3] {
    let [num_rtt, rtt_sum, forward, backward] = values;
    if num_rtt == 0.0 {
        return [0.0, 0.0, 0.0];
    }
    [
        forward / (forward + num_rtt) * 100.0,
        backward / (backward + num_rtt) * 100.0,
        rtt_sum / num_rtt,
    ]
}

pub struct CiscoSaAgent;

impl CiscoSaAgent {
    fn parse(params: &str) -> Result<(u32, QueryType), ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidParameter {
            poller: "cisco_saagent".to_string(),
            reason,
        };
        let [index, qtype] = split_params::<2>("cisco_saagent", params)?;
        let index = index
            .parse::<u32>()
            .map_err(|_| invalid(format!("index '{index}' is not a number")))?;
        let qtype = QueryType::parse(qtype).ok_or_else(|| invalid(format!("unknown query type '{qtype}'")))?;
        Ok((index, qtype))
    }
}

fn four_numbers(varbinds: &[VarBind]) -> Option<[f64; 4]> {
    let numbers: Vec<f64> = varbinds
        .iter()
        .map(|varbind| varbind.value.as_f64())
        .collect::<Option<Vec<f64>>>()?;
    <[f64; 4]>::try_from(numbers).ok()
}

#[async_trait]
impl Poller for CiscoSaAgent {
    fn name(&self) -> &'static str {
        "cisco_saagent"
    }

    async fn poll(&self, _buffer: &mut PollBuffer, params: &str, ctx: &PollContext<'_>) -> PollOutcome {
        let (index, qtype) = match Self::parse(params) {
            Ok(parsed) => parsed,
            Err(e) => {
                error!(attribute = ctx.attribute.id, error = %e, "bad poller parameters");
                return PollOutcome::NoValue;
            }
        };

        let varbinds = match ctx.clients.snmp.get_list(ctx.host, &qtype.oids(index)).await {
            Ok(varbinds) => varbinds,
            Err(e) if e.is_unreachable() => return PollOutcome::Unreachable,
            Err(e) => {
                debug!(attribute = ctx.attribute.id, error = %e, "sa agent query failed");
                return PollOutcome::NoValue;
            }
        };

        let Some(values) = four_numbers(&varbinds) else {
            debug!(attribute = ctx.attribute.id, got = varbinds.len(), "sa agent reply unusable");
            return PollOutcome::NoValue;
        };

        match qtype {
            QueryType::ForwardJitter | QueryType::BackwardJitter => PollOutcome::number(jitter(values)),
            QueryType::PacketLoss => PollOutcome::tuple(packet_loss(values).to_vec()),
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

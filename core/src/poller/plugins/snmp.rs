use async_trait::async_trait;
use rnms_common::ConfigError;
use rnms_protocols::Oid;
use rnms_protocols::snmp::Value;
use tracing::{debug, error};

use super::split_params;
use crate::poller::{PollBuffer, PollContext, PollOutcome, Poller};

fn parse_oid(poller: &str, text: &str) -> Result<Oid, ConfigError> {
    text.parse::<Oid>().map_err(|e| ConfigError::InvalidParameter {
        poller: poller.to_string(),
        reason: e.to_string(),
    })
}

async fn fetch(ctx: &PollContext<'_>, oid: &Oid) -> Result<Value, PollOutcome> {
    match ctx.clients.snmp.get(ctx.host, oid).await {
        Ok(value) if value.is_absent() => {
            debug!(attribute = ctx.attribute.id, %oid, "object not present");
            Err(PollOutcome::NoValue)
        }
        Ok(value) => Ok(value),
        Err(e) if e.is_unreachable() => Err(PollOutcome::Unreachable),
        Err(e) => {
            debug!(attribute = ctx.attribute.id, %oid, error = %e, "snmp get failed");
            Err(PollOutcome::NoValue)
        }
    }
}

/// Reads one numeric object. The raw value is also left in the buffer under
/// the OID text for later steps.
pub struct SnmpCounter;

#[async_trait]
impl Poller for SnmpCounter {
    fn name(&self) -> &'static str {
        "snmp_counter"
    }

    async fn poll(&self, buffer: &mut PollBuffer, params: &str, ctx: &PollContext<'_>) -> PollOutcome {
        let oid = match parse_oid(self.name(), params) {
            Ok(oid) => oid,
            Err(e) => {
                error!(attribute = ctx.attribute.id, error = %e, "bad poller parameters");
                return PollOutcome::NoValue;
            }
        };

        let value = match fetch(ctx, &oid).await {
            Ok(value) => value,
            Err(outcome) => return outcome,
        };

        match value.as_f64() {
            Some(number) => {
                buffer.set(&oid.to_string(), number.to_string());
                PollOutcome::number(number)
            }
            None => PollOutcome::NoValue,
        }
    }
}

/// 1 when an object equals the configured "up" value, 0 otherwise.
pub struct SnmpStatus;

#[async_trait]
impl Poller for SnmpStatus {
    fn name(&self) -> &'static str {
        "snmp_status"
    }

    async fn poll(&self, _buffer: &mut PollBuffer, params: &str, ctx: &PollContext<'_>) -> PollOutcome {
        let parsed = split_params::<2>(self.name(), params)
            .and_then(|[oid, up]| Ok((parse_oid(self.name(), oid)?, up.to_string())));
        let (oid, up_value) = match parsed {
            Ok(parsed) => parsed,
            Err(e) => {
                error!(attribute = ctx.attribute.id, error = %e, "bad poller parameters");
                return PollOutcome::NoValue;
            }
        };

        let value = match fetch(ctx, &oid).await {
            Ok(value) => value,
            Err(outcome) => return outcome,
        };

        let is_up = value.to_text().is_some_and(|text| text.trim() == up_value);
        PollOutcome::number(if is_up { 1.0 } else { 0.0 })
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

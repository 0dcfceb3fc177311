//! Built-in poller plugins.

pub mod buffer;
pub mod ntp;
pub mod saagent;
pub mod snmp;
pub mod tcp;

use std::sync::Arc;

use rnms_common::ConfigError;

use super::PollerRegistry;

/// Registry holding every built-in poller.
pub fn builtin() -> Result<PollerRegistry, ConfigError> {
    let mut registry = PollerRegistry::new();
    registry.register(Arc::new(saagent::CiscoSaAgent))?;
    registry.register(Arc::new(ntp::NtpStatus))?;
    registry.register(Arc::new(snmp::SnmpCounter))?;
    registry.register(Arc::new(snmp::SnmpStatus))?;
    registry.register(Arc::new(tcp::TcpStatus))?;
    registry.register(Arc::new(buffer::BufferValue))?;
    Ok(registry)
}

/// Splits a `|` delimited parameter string into exactly `N` trimmed fields.
pub(crate) fn split_params<'a, const N: usize>(
    poller: &str,
    params: &'a str,
) -> Result<[&'a str; N], ConfigError> {
    let fields: Vec<&str> = params.split('|').map(str::trim).collect();
    <[&str; N]>::try_from(fields).map_err(|fields| ConfigError::InvalidParameter {
        poller: poller.to_string(),
        reason: format!("expected {N} fields, got {}", fields.len()),
    })
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝

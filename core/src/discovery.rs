//! # Attribute Discovery Service
//!
//! Finds the monitorable attributes of a host: interfaces, NTP peers, open
//! TCP ports. Each attribute type has a [`DiscoveryRule`]; a per-host
//! [`DiscoveryHost`] session decides which rules apply and in what order.

pub mod rules;
pub mod session;

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::SystemTime;

use async_trait::async_trait;
use futures::future::join_all;
use rnms_common::{Config, MonitoredHost};
use rnms_protocols::Oid;
use tracing::debug;

use crate::client::Clients;
pub use session::{DiscoveryHost, DiscoveryState};

/// sysObjectID.0
pub const SYSOBJECTID_OID: [u32; 9] = [1, 3, 6, 1, 2, 1, 1, 2, 0];

/// One attribute found on a host, not yet stored anywhere.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredAttribute {
    pub index: String,
    pub display_name: String,
    pub fields: HashMap<String, String>,
}

impl DiscoveredAttribute {
    pub fn new(index: &str, display_name: &str) -> Self {
        Self {
            index: index.to_string(),
            display_name: display_name.to_string(),
            fields: HashMap::new(),
        }
    }

    pub fn with_field(mut self, tag: &str, value: &str) -> Self {
        self.fields.insert(tag.to_string(), value.to_string());
        self
    }
}

/// Attributes of one type, keyed by index.
pub type DiscoveredAttributes = BTreeMap<String, DiscoveredAttribute>;

/// Outcome of one discovery session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryReport {
    pub host_id: u32,
    /// Attribute type id to the attributes found for it.
    pub discovered: HashMap<u32, DiscoveredAttributes>,
}

/// `true` if the identity equals `prefix` or lies below it.
fn identity_matches(sysobjid: Option<&str>, prefix: &str) -> bool {
    sysobjid.is_some_and(|id| {
        id == prefix || id.strip_prefix(prefix).is_some_and(|rest| rest.starts_with('.'))
    })
}

#[async_trait]
pub trait DiscoveryRule: Send + Sync {
    fn attribute_type_id(&self) -> u32;

    fn name(&self) -> &str;

    /// Identity prefix (`ent.9`) a host must have for the rule to apply.
    fn required_sysobjid(&self) -> Option<&str> {
        None
    }

    /// Whether the rule should run on `host` this session.
    fn autodiscover(&self, host: &MonitoredHost, force: bool, now: SystemTime) -> bool {
        if let Some(prefix) = self.required_sysobjid()
            && !identity_matches(host.sysobjid.as_deref(), prefix)
        {
            return false;
        }
        force || host.discovery_due(now)
    }

    /// Runs the discovery. `None` means the rule could not produce a result
    /// this time, which is different from finding nothing.
    async fn discover(&self, host: &MonitoredHost, clients: &Clients) -> Option<DiscoveredAttributes>;
}

/// Drives discovery sessions against live hosts.
pub struct DiscoveryEngine {
    clients: Clients,
    rules: Arc<[Arc<dyn DiscoveryRule>]>,
    cfg: Config,
}

impl DiscoveryEngine {
    pub fn new(clients: Clients, rules: Vec<Arc<dyn DiscoveryRule>>, cfg: Config) -> Self {
        Self {
            clients,
            rules: rules.into(),
            cfg,
        }
    }

    /// Runs one full session on `host` and schedules its next discovery.
    /// Hosts that are not due, unless forced, are left untouched.
    ///
    /// The session:
    /// 1. fetches the device identity when the host has none cached,
    /// 2. runs every applicable rule in order,
    /// 3. reports what each rule found.
    pub async fn discover_host(&self, host: &mut MonitoredHost) -> DiscoveryReport {
        let now = SystemTime::now();
        let mut session = DiscoveryHost::new(host, self.rules.clone(), self.cfg.force_discovery);
        let mut more = session.start_discovery(host, now);

        while more {
            more = match session.state() {
                DiscoveryState::CheckingCapability => {
                    let oid = Oid::from_slice(&SYSOBJECTID_OID);
                    let sysobjid = match self.clients.snmp.get_str(host, &oid).await {
                        Ok(value) => value,
                        Err(e) => {
                            debug!(host = host.id, error = %e, "sysObjectID query failed");
                            None
                        }
                    };
                    session.finish_capability_check(host, sysobjid, now)
                }
                DiscoveryState::RunningRow(_) => {
                    let found = match session.current_rule() {
                        Some(rule) => rule.clone().discover(host, &self.clients).await,
                        None => None,
                    };
                    session.finish_row(host, found, now)
                }
                DiscoveryState::Idle | DiscoveryState::Done => false,
            };
        }

        if session.started() {
            host.update_discover_time(now, &self.cfg);
        }
        session.into_report()
    }

    /// Runs a session on every host concurrently. Reports come back in
    /// input order.
    pub async fn discover_hosts(&self, hosts: &mut [MonitoredHost]) -> Vec<DiscoveryReport> {
        join_all(hosts.iter_mut().map(|host| self.discover_host(host))).await
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_prefix_respects_arc_boundaries() {
        assert!(identity_matches(Some("ent.9.1.516"), "ent.9"));
        assert!(identity_matches(Some("ent.9"), "ent.9"));
        assert!(!identity_matches(Some("ent.90.1"), "ent.9"));
        assert!(!identity_matches(None, "ent.9"));
    }

    #[test]
    fn sysobjectid_oid() {
        assert_eq!(Oid::from_slice(&SYSOBJECTID_OID).to_string(), "1.3.6.1.2.1.1.2.0");
    }
}

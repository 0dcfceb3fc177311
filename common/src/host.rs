//! # Host Model
//!
//! The poller never persists anything. Hosts and attributes are owned by the
//! model layer and handed to the engine; the only thing written back is the
//! host's `sysobjid` and its next discovery time.

use std::collections::HashMap;
use std::time::{Duration, SystemTime};

use crate::config::Config;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SnmpVersion {
    V1,
    #[default]
    V2c,
}

/// Read credentials of a host. An empty community means the host cannot be
/// queried over SNMP at all.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Community {
    pub version: SnmpVersion,
    pub community: String,
}

impl Community {
    pub fn v1(community: &str) -> Self {
        Self {
            version: SnmpVersion::V1,
            community: community.to_string(),
        }
    }

    pub fn v2c(community: &str) -> Self {
        Self {
            version: SnmpVersion::V2c,
            community: community.to_string(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.community.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct MonitoredHost {
    pub id: u32,
    pub display_name: String,
    pub mgmt_address: String,
    pub ro_community: Community,
    /// Device identity (sysObjectID), vendor prefix shortened to `ent`.
    pub sysobjid: Option<String>,
    pub next_discover: SystemTime,
}

impl MonitoredHost {
    pub fn new(id: u32, display_name: &str, mgmt_address: &str) -> Self {
        Self {
            id,
            display_name: display_name.to_string(),
            mgmt_address: mgmt_address.to_string(),
            ro_community: Community::default(),
            sysobjid: None,
            next_discover: SystemTime::UNIX_EPOCH,
        }
    }

    pub fn with_community(mut self, community: Community) -> Self {
        self.ro_community = community;
        self
    }

    pub fn with_sysobjid(mut self, sysobjid: &str) -> Self {
        self.sysobjid = Some(sysobjid.to_string());
        self
    }

    /// The identity has to be fetched before discovery rows can be matched.
    pub fn needs_sysobjid(&self) -> bool {
        let known = self.sysobjid.as_deref().is_some_and(|id| !id.is_empty());
        !known && !self.ro_community.is_empty()
    }

    pub fn discovery_due(&self, now: SystemTime) -> bool {
        now >= self.next_discover
    }

    /// Schedules the next discovery `interval ± variance/2` from `now`.
    pub fn update_discover_time(&mut self, now: SystemTime, cfg: &Config) {
        let jitter = (rand::random::<f64>() - 0.5) * cfg.discover_variance.as_secs_f64();
        let delay = (cfg.discover_interval.as_secs_f64() + jitter).max(0.0);
        self.next_discover = now + Duration::from_secs_f64(delay);
    }
}

/// A monitored item on a host: an interface, a TCP port, an NTP peer...
#[derive(Debug, Clone, Default)]
pub struct Attribute {
    pub id: u64,
    pub host_id: u32,
    pub attribute_type_id: u32,
    pub index: String,
    pub display_name: String,
    pub fields: HashMap<String, String>,
}

impl Attribute {
    pub fn new(id: u64, host_id: u32, attribute_type_id: u32, index: &str) -> Self {
        Self {
            id,
            host_id,
            attribute_type_id,
            index: index.to_string(),
            display_name: index.to_string(),
            fields: HashMap::new(),
        }
    }

    pub fn with_field(mut self, tag: &str, value: &str) -> Self {
        self.fields.insert(tag.to_string(), value.to_string());
        self
    }

    pub fn field(&self, tag: &str) -> Option<&str> {
        self.fields.get(tag).map(String::as_str)
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

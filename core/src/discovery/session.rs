//! # Discovery Session
//!
//! Per-host state machine. It never performs I/O: the engine runs the query
//! a state asks for and feeds the result back through one of the `finish_*`
//! transitions. Every transition returns whether more work is pending.
//!
//! ```text
//! Idle -> CheckingCapability -> RunningRow(0) -> ... -> RunningRow(n) -> Done
//!   \______________________________/^                                   ^
//!    \__________________________________________________________________/
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::time::SystemTime;

use rnms_common::MonitoredHost;
use rnms_protocols::oid::enterprise_mnemonic;
use tracing::{debug, info};

use super::{DiscoveredAttributes, DiscoveryReport, DiscoveryRule};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryState {
    Idle,
    /// Waiting for the device identity (sysObjectID).
    CheckingCapability,
    /// Waiting for the rule at this index.
    RunningRow(usize),
    Done,
}

pub struct DiscoveryHost {
    host_id: u32,
    rules: Arc<[Arc<dyn DiscoveryRule>]>,
    force: bool,
    started: bool,
    state: DiscoveryState,
    discovered: HashMap<u32, DiscoveredAttributes>,
}

impl DiscoveryHost {
    pub fn new(host: &MonitoredHost, rules: Arc<[Arc<dyn DiscoveryRule>]>, force: bool) -> Self {
        Self {
            host_id: host.id,
            rules,
            force,
            started: false,
            state: DiscoveryState::Idle,
            discovered: HashMap::new(),
        }
    }

    pub fn state(&self) -> DiscoveryState {
        self.state
    }

    pub fn in_discovery(&self) -> bool {
        !matches!(self.state, DiscoveryState::Idle | DiscoveryState::Done)
    }

    /// The rule the current `RunningRow` state waits for.
    pub fn current_rule(&self) -> Option<&Arc<dyn DiscoveryRule>> {
        match self.state {
            DiscoveryState::RunningRow(i) => self.rules.get(i),
            _ => None,
        }
    }

    /// Whether the session got past its entry checks. Sessions that never
    /// started leave the host's schedule alone.
    pub fn started(&self) -> bool {
        self.started
    }

    pub fn discovered(&self) -> &HashMap<u32, DiscoveredAttributes> {
        &self.discovered
    }

    pub fn start_discovery(&mut self, host: &MonitoredHost, now: SystemTime) -> bool {
        if self.state != DiscoveryState::Idle {
            return self.in_discovery();
        }

        if self.rules.is_empty() || host.ro_community.is_empty() {
            debug!(host = host.id, "nothing to discover");
            self.state = DiscoveryState::Done;
            return false;
        }

        if !self.force && !host.discovery_due(now) {
            debug!(host = host.id, "discovery not due yet");
            self.state = DiscoveryState::Done;
            return false;
        }

        self.started = true;
        info!(host = host.id, name = %host.display_name, rules = self.rules.len(), "discovery started");
        if host.needs_sysobjid() {
            self.state = DiscoveryState::CheckingCapability;
            return true;
        }

        self.advance(host, 0, now)
    }

    /// Stores the fetched identity, if any, and moves on to the rules.
    pub fn finish_capability_check(
        &mut self,
        host: &mut MonitoredHost,
        sysobjid: Option<String>,
        now: SystemTime,
    ) -> bool {
        if self.state != DiscoveryState::CheckingCapability {
            return self.in_discovery();
        }

        match sysobjid {
            Some(id) if !id.is_empty() => host.sysobjid = Some(enterprise_mnemonic(&id)),
            _ => debug!(host = host.id, "device identity unavailable"),
        }

        self.advance(host, 0, now)
    }

    /// Records what the current rule found and moves to the next one.
    pub fn finish_row(
        &mut self,
        host: &MonitoredHost,
        found: Option<DiscoveredAttributes>,
        now: SystemTime,
    ) -> bool {
        let DiscoveryState::RunningRow(index) = self.state else {
            return self.in_discovery();
        };

        if let Some(found) = found
            && let Some(rule) = self.rules.get(index)
        {
            debug!(host = host.id, rule = rule.name(), attributes = found.len(), "rule finished");
            self.discovered.insert(rule.attribute_type_id(), found);
        }

        self.advance(host, index + 1, now)
    }

    pub fn into_report(self) -> DiscoveryReport {
        DiscoveryReport {
            host_id: self.host_id,
            discovered: self.discovered,
        }
    }

    /// Moves to the first applicable rule at or after `from`.
    fn advance(&mut self, host: &MonitoredHost, from: usize, now: SystemTime) -> bool {
        for index in from..self.rules.len() {
            let rule = &self.rules[index];
            if rule.autodiscover(host, self.force, now) {
                debug!(host = host.id, rule = rule.name(), "running rule");
                self.state = DiscoveryState::RunningRow(index);
                return true;
            }
            debug!(host = host.id, rule = rule.name(), "rule skipped");
        }

        info!(host = host.id, types = self.discovered.len(), "discovery finished");
        self.state = DiscoveryState::Done;
        false
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

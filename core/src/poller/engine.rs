use std::collections::HashMap;

use futures::future::join_all;
use rnms_common::{Attribute, ConfigError, MonitoredHost};
use tracing::{debug, info};

use super::backend::BackendRegistry;
use super::chain::{ChainReport, PollChain, PollerRow};
use super::{PollContext, PollerRegistry};
use crate::client::Clients;

/// Runs the poll chain of each attribute's type.
pub struct PollEngine {
    clients: Clients,
    pollers: PollerRegistry,
    backends: BackendRegistry,
    chains: HashMap<u32, PollChain>,
}

impl PollEngine {
    pub fn new(clients: Clients, pollers: PollerRegistry, backends: BackendRegistry) -> Self {
        Self {
            clients,
            pollers,
            backends,
            chains: HashMap::new(),
        }
    }

    /// Binds the chain used for every attribute of `attribute_type_id`,
    /// replacing any previous one.
    pub fn set_chain(&mut self, attribute_type_id: u32, rows: Vec<PollerRow>) -> Result<(), ConfigError> {
        let chain = PollChain::build(rows, &self.pollers, &self.backends)?;
        debug!(attribute_type_id, steps = chain.len(), "poll chain bound");
        self.chains.insert(attribute_type_id, chain);
        Ok(())
    }

    pub fn chain(&self, attribute_type_id: u32) -> Option<&PollChain> {
        self.chains.get(&attribute_type_id)
    }

    /// Polls one attribute. Attribute types without a chain produce an
    /// empty report.
    pub async fn poll_attribute(&self, host: &MonitoredHost, attribute: &Attribute) -> ChainReport {
        let Some(chain) = self.chains.get(&attribute.attribute_type_id) else {
            debug!(attribute = attribute.id, "no poll chain for attribute type");
            return ChainReport {
                attribute_id: attribute.id,
                outcomes: Vec::new(),
                skipped: 0,
                aborted: false,
            };
        };

        let ctx = PollContext {
            host,
            attribute,
            clients: &self.clients,
        };
        chain.run(&ctx).await
    }

    /// Polls many attributes concurrently. Reports come back in input order.
    pub async fn poll_attributes(&self, targets: &[(&MonitoredHost, &Attribute)]) -> Vec<ChainReport> {
        let reports = join_all(
            targets
                .iter()
                .map(|(host, attribute)| self.poll_attribute(host, attribute)),
        )
        .await;

        let aborted = reports.iter().filter(|report| report.aborted).count();
        info!(attributes = reports.len(), aborted, "poll cycle finished");
        reports
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

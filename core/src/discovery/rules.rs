//! Built-in discovery rules.

use async_trait::async_trait;
use rnms_common::MonitoredHost;
use rnms_protocols::Oid;
use rnms_protocols::snmp::VarBind;
use tracing::debug;

use super::{DiscoveredAttribute, DiscoveredAttributes, DiscoveryRule};
use crate::client::Clients;
use crate::network::resolve;
use crate::network::tcp::open_ports;

/// One attribute per row of an SNMP table column. The row index becomes the
/// attribute index, the column value its display name.
pub struct SnmpTableRule {
    attribute_type_id: u32,
    name: String,
    column: Oid,
    required_sysobjid: Option<String>,
}

impl SnmpTableRule {
    pub fn new(attribute_type_id: u32, name: &str, column: Oid) -> Self {
        Self {
            attribute_type_id,
            name: name.to_string(),
            column,
            required_sysobjid: None,
        }
    }

    pub fn for_vendor(mut self, sysobjid_prefix: &str) -> Self {
        self.required_sysobjid = Some(sysobjid_prefix.to_string());
        self
    }

    /// Row index and attribute for one walked object.
    fn row(&self, varbind: &VarBind) -> Option<DiscoveredAttribute> {
        let suffix = varbind.oid.suffix(&self.column)?;
        if suffix.is_empty() {
            return None;
        }
        let index = suffix
            .iter()
            .map(u32::to_string)
            .collect::<Vec<String>>()
            .join(".");
        let display_name = varbind
            .value
            .to_text()
            .filter(|text| !text.trim().is_empty())
            .unwrap_or_else(|| index.clone());
        Some(DiscoveredAttribute::new(&index, display_name.trim()))
    }
}

#[async_trait]
impl DiscoveryRule for SnmpTableRule {
    fn attribute_type_id(&self) -> u32 {
        self.attribute_type_id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn required_sysobjid(&self) -> Option<&str> {
        self.required_sysobjid.as_deref()
    }

    async fn discover(&self, host: &MonitoredHost, clients: &Clients) -> Option<DiscoveredAttributes> {
        let rows = match clients.snmp.walk(host, &self.column).await {
            Ok(rows) => rows,
            Err(e) => {
                debug!(host = host.id, rule = %self.name, error = %e, "table walk failed");
                return None;
            }
        };

        Some(
            rows.iter()
                .filter_map(|varbind| self.row(varbind))
                .map(|attribute| (attribute.index.clone(), attribute))
                .collect(),
        )
    }
}

/// One attribute per NTP association of the host.
pub struct NtpPeersRule {
    attribute_type_id: u32,
}

impl NtpPeersRule {
    pub fn new(attribute_type_id: u32) -> Self {
        Self { attribute_type_id }
    }
}

#[async_trait]
impl DiscoveryRule for NtpPeersRule {
    fn attribute_type_id(&self) -> u32 {
        self.attribute_type_id
    }

    fn name(&self) -> &str {
        "ntp_peers"
    }

    async fn discover(&self, host: &MonitoredHost, clients: &Clients) -> Option<DiscoveredAttributes> {
        let listing = match clients.ntp.get_peers(host).await {
            Ok(listing) => listing,
            Err(e) => {
                debug!(host = host.id, error = %e, "peer listing failed");
                return None;
            }
        };

        let mut found = DiscoveredAttributes::new();
        for peer in &listing.peers {
            let index = peer.assoc_id.to_string();
            let mut attribute = DiscoveredAttribute::new(&index, &index).with_field("assoc_id", &index);

            // a peer whose variables cannot be read is still listed
            if let Ok(variables) = clients.ntp.get_peer_by_id(host, peer.assoc_id).await
                && let Some(srcadr) = variables.assoc_data.get("srcadr")
            {
                attribute.display_name = srcadr.clone();
                attribute = attribute.with_field("srcadr", srcadr);
            }

            found.insert(index, attribute);
        }
        Some(found)
    }
}

/// One attribute per open port out of a fixed list.
pub struct TcpPortsRule {
    attribute_type_id: u32,
    ports: Vec<u16>,
}

impl TcpPortsRule {
    pub fn new(attribute_type_id: u32, ports: Vec<u16>) -> Self {
        Self {
            attribute_type_id,
            ports,
        }
    }
}

#[async_trait]
impl DiscoveryRule for TcpPortsRule {
    fn attribute_type_id(&self) -> u32 {
        self.attribute_type_id
    }

    fn name(&self) -> &str {
        "tcp_ports"
    }

    async fn discover(&self, host: &MonitoredHost, clients: &Clients) -> Option<DiscoveredAttributes> {
        let ip = resolve(&host.mgmt_address, 0).await?.ip();
        let prober = clients.tcp;
        let open = open_ports(&self.ports, move |port| prober.probe((ip, port).into())).await;

        Some(
            open.into_iter()
                .map(|port| {
                    let index = port.to_string();
                    let attribute = DiscoveredAttribute::new(&index, &index).with_field("port", &index);
                    (index, attribute)
                })
                .collect(),
        )
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

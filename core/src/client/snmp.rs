use rnms_common::{MonitoredHost, SnmpVersion};
use rnms_protocols::Oid;
use rnms_protocols::snmp::{Message, Value, VarBind, Version};
use tracing::debug;

use super::QueryError;
use crate::network::codec::SnmpReply;
use crate::network::event_loop::TransportHandle;

/// Walks stop after this many rows even if the agent keeps answering.
pub const MAX_WALK_ROWS: usize = 10_000;

/// SNMPv1 `noSuchName`, which v1 agents use to end a walk.
const NO_SUCH_NAME: i64 = 2;

#[derive(Clone)]
pub struct SnmpClient {
    transport: TransportHandle,
}

impl SnmpClient {
    pub fn new(transport: TransportHandle) -> Self {
        Self { transport }
    }

    /// Fetches several objects in one request, in request order.
    pub async fn get_list(
        &self,
        host: &MonitoredHost,
        oids: &[Oid],
    ) -> Result<Vec<VarBind>, QueryError> {
        let request = Message::get(version_of(host), &host.ro_community.community, oids);
        let reply = self.send(host, request).await?;
        if reply.is_error() {
            return Err(QueryError::Agent {
                status: reply.error_status,
                index: reply.error_index,
            });
        }
        Ok(reply.varbinds)
    }

    pub async fn get(&self, host: &MonitoredHost, oid: &Oid) -> Result<Value, QueryError> {
        let mut varbinds = self.get_list(host, std::slice::from_ref(oid)).await?;
        match varbinds.pop() {
            Some(varbind) => Ok(varbind.value),
            None => Err(QueryError::NoResponse),
        }
    }

    /// Fetches one object as text. Absent objects yield `None`.
    pub async fn get_str(
        &self,
        host: &MonitoredHost,
        oid: &Oid,
    ) -> Result<Option<String>, QueryError> {
        let value = self.get(host, oid).await?;
        Ok(value.to_text())
    }

    /// Collects every object below `base` with repeated GetNext requests.
    pub async fn walk(&self, host: &MonitoredHost, base: &Oid) -> Result<Vec<VarBind>, QueryError> {
        let mut rows: Vec<VarBind> = Vec::new();
        let mut current = base.clone();

        while rows.len() < MAX_WALK_ROWS {
            let request =
                Message::get_next(version_of(host), &host.ro_community.community, &[current.clone()]);
            let reply = self.send(host, request).await?;

            if reply.error_status == NO_SUCH_NAME {
                break;
            }
            if reply.is_error() {
                return Err(QueryError::Agent {
                    status: reply.error_status,
                    index: reply.error_index,
                });
            }

            let Some(varbind) = reply.varbinds.into_iter().next() else {
                break;
            };
            if varbind.value.is_absent() || !varbind.oid.starts_with(base) {
                break;
            }
            if varbind.oid <= current {
                debug!(host = %host.display_name, oid = %varbind.oid, "agent walked backwards, stopping");
                break;
            }

            current = varbind.oid.clone();
            rows.push(varbind);
        }

        Ok(rows)
    }

    async fn send(&self, host: &MonitoredHost, request: Message) -> Result<SnmpReply, QueryError> {
        if host.ro_community.is_empty() {
            return Err(QueryError::NotIssued);
        }
        if let Some(varbind) = request.pdu.varbinds.iter().find(|vb| !vb.oid.is_encodable()) {
            debug!(host = %host.display_name, oid = %varbind.oid, "object identifier has no wire form");
            return Err(QueryError::NotIssued);
        }
        let pending = self
            .transport
            .snmp(&host.mgmt_address, request)
            .await
            .ok_or(QueryError::NotIssued)?;
        pending.wait().await.ok_or(QueryError::NoResponse)
    }
}

fn version_of(host: &MonitoredHost) -> Version {
    match host.ro_community.version {
        SnmpVersion::V1 => Version::V1,
        SnmpVersion::V2c => Version::V2c,
    }
}

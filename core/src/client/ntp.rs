use rnms_common::MonitoredHost;
use rnms_protocols::ntp::ControlMessage;

use super::QueryError;
use crate::network::event_loop::TransportHandle;

#[derive(Clone)]
pub struct NtpClient {
    transport: TransportHandle,
}

impl NtpClient {
    pub fn new(transport: TransportHandle) -> Self {
        Self { transport }
    }

    /// Lists the peer associations of `host`.
    pub async fn get_peers(&self, host: &MonitoredHost) -> Result<ControlMessage, QueryError> {
        self.query(host, ControlMessage::read_status()).await
    }

    /// Reads the variables of one association.
    pub async fn get_peer_by_id(
        &self,
        host: &MonitoredHost,
        assoc_id: u16,
    ) -> Result<ControlMessage, QueryError> {
        self.query(host, ControlMessage::read_variables(assoc_id)).await
    }

    async fn query(
        &self,
        host: &MonitoredHost,
        request: ControlMessage,
    ) -> Result<ControlMessage, QueryError> {
        let pending = self
            .transport
            .ntp(&host.mgmt_address, request)
            .await
            .ok_or(QueryError::NotIssued)?;
        let response = pending.wait().await.ok_or(QueryError::NoResponse)?;
        if response.header.flags.is_error() {
            return Err(QueryError::Rejected);
        }
        Ok(response)
    }
}

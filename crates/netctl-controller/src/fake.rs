use std::sync::Mutex;

use netctl_routing::OspfState;
use netctl_types::{RemoteNodeInfo, RemotePeerInfo};

use crate::client::ControllerClient;
use crate::wire::{JoinRequest, JoinResponse, LinkTelemetry};
use crate::ControllerError;

/// Every call recorded by a [`FakeControllerClient`], for assertions in
/// reconciliation-controller tests.
#[derive(Debug, Default)]
pub struct RecordedCalls {
    /// Public keys passed to the most recent `sync_wireguard_keys` call.
    pub synced_wireguard_keys: Vec<Vec<String>>,
    /// Link batches passed to `link_telemetry`.
    pub link_telemetry: Vec<Vec<(u32, Option<f64>, u64, u64)>>,
    /// Whether `router_telemetry` was ever called.
    pub router_telemetry_calls: u32,
    /// `join` requests, as `(namespace, eth_name)`.
    pub join_requests: Vec<(String, String)>,
}

/// In-memory [`ControllerClient`] for reconciliation-controller tests:
/// returns pre-programmed fixtures and records every call it sees.
#[derive(Debug, Default)]
pub struct FakeControllerClient {
    node_config: Mutex<RemoteNodeInfo>,
    peers: Mutex<Vec<RemotePeerInfo>>,
    join_response: Mutex<Option<JoinResponse>>,
    calls: Mutex<RecordedCalls>,
}

impl FakeControllerClient {
    /// Builds a fake returning an empty `RemoteNodeInfo` and no peers until
    /// programmed.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the `RemoteNodeInfo` subsequent `get_node_config` calls return.
    pub fn set_node_config(&self, config: RemoteNodeInfo) {
        *self.node_config.lock().expect("fake controller lock poisoned") = config;
    }

    /// Sets the peer list subsequent `get_peers` calls return.
    pub fn set_peers(&self, peers: Vec<RemotePeerInfo>) {
        *self.peers.lock().expect("fake controller lock poisoned") = peers;
    }

    /// Sets the response `join` returns; `join` errors if unset.
    pub fn set_join_response(&self, response: JoinResponse) {
        *self.join_response.lock().expect("fake controller lock poisoned") = Some(response);
    }

    /// Snapshots every call recorded so far.
    #[must_use]
    pub fn calls(&self) -> RecordedCalls {
        let calls = self.calls.lock().expect("fake controller lock poisoned");
        RecordedCalls {
            synced_wireguard_keys: calls.synced_wireguard_keys.clone(),
            link_telemetry: calls.link_telemetry.clone(),
            router_telemetry_calls: calls.router_telemetry_calls,
            join_requests: calls.join_requests.clone(),
        }
    }
}

impl ControllerClient for FakeControllerClient {
    async fn get_node_config(&self) -> Result<RemoteNodeInfo, ControllerError> {
        Ok(self.node_config.lock().expect("fake controller lock poisoned").clone())
    }

    async fn get_peers(&self) -> Result<Vec<RemotePeerInfo>, ControllerError> {
        Ok(self.peers.lock().expect("fake controller lock poisoned").clone())
    }

    async fn sync_wireguard_keys(&self, public_keys: &[String]) -> Result<(), ControllerError> {
        self.calls
            .lock()
            .expect("fake controller lock poisoned")
            .synced_wireguard_keys
            .push(public_keys.to_vec());
        Ok(())
    }

    async fn link_telemetry(&self, links: &[LinkTelemetry]) -> Result<(), ControllerError> {
        self.calls.lock().expect("fake controller lock poisoned").link_telemetry.push(
            links.iter().map(|link| (link.id, link.ping_ms, link.rx, link.tx)).collect(),
        );
        Ok(())
    }

    async fn router_telemetry(&self, _state: &OspfState) -> Result<(), ControllerError> {
        self.calls.lock().expect("fake controller lock poisoned").router_telemetry_calls += 1;
        Ok(())
    }

    async fn join(&self, request: &JoinRequest<'_>) -> Result<JoinResponse, ControllerError> {
        self.calls
            .lock()
            .expect("fake controller lock poisoned")
            .join_requests
            .push((request.namespace.to_string(), request.eth_name.to_string()));
        self.join_response
            .lock()
            .expect("fake controller lock poisoned")
            .clone()
            .ok_or_else(|| ControllerError::NonSuccess {
                endpoint: "node/join",
                status: 500,
                body: "fake controller has no programmed join response".to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_synced_keys() {
        let client = FakeControllerClient::new();
        client.sync_wireguard_keys(&["pub1".to_string()]).await.expect("sync");
        assert_eq!(client.calls().synced_wireguard_keys, vec![vec!["pub1".to_string()]]);
    }

    #[tokio::test]
    async fn join_without_a_programmed_response_errors() {
        let client = FakeControllerClient::new();
        let request = JoinRequest { namespace: "netA", eth_name: "eth0" };
        assert!(client.join(&request).await.is_err());
    }

    #[tokio::test]
    async fn join_returns_the_programmed_response_and_records_the_request() {
        let client = FakeControllerClient::new();
        client.set_join_response(JoinResponse { node_id: 42 });
        let request = JoinRequest { namespace: "netA", eth_name: "eth0" };
        let response = client.join(&request).await.expect("join");
        assert_eq!(response.node_id, 42);
        assert_eq!(client.calls().join_requests, vec![("netA".to_string(), "eth0".to_string())]);
    }
}

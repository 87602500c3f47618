//! The top-level reconciliation tick: one pass over every step from node
//! settings through telemetry reporting.
//!
//! Steps run in a fixed order because later ones depend on earlier ones'
//! output: peer interfaces (7/8) must exist before routing config (9) can
//! name them, and routing config's reload must happen before telemetry's
//! second, independent ping pass (10).

use netctl_container::ContainerRuntime;
use netctl_controller::ControllerClient;
use netctl_link::LinkBackend;
use netctl_ping::PingSource;
use netctl_relay::{RelayManager, Supervisor};
use netctl_store::NodeStore;
use netctl_types::NodeSettings;
use tracing::info;

use crate::error::NetworktoolsError;
use crate::{ensure, exit_node, keys, routing_config, telemetry, veth};

/// Runs one full reconciliation tick against the current controller-desired
/// state.
///
/// # Errors
///
/// Returns [`NetworktoolsError::MissingNodeSettings`] if this node has not
/// completed the init flow yet; any other step's error otherwise.
pub async fn run_once<L, C, P, S, Ctrl>(
    link: &L,
    container: &C,
    ping_source: &P,
    relay: &RelayManager<S>,
    controller: &Ctrl,
    store: &NodeStore,
) -> Result<(), NetworktoolsError>
where
    L: LinkBackend,
    C: ContainerRuntime,
    P: PingSource,
    S: Supervisor,
    Ctrl: ControllerClient,
{
    let settings = store.get_node_settings().map_err(NetworktoolsError::MissingNodeSettings)?;
    let NodeSettings { namespace: ns, eth_name, .. } = settings;

    ensure::ensure_prerequisites(&ns).await?;

    let local_public_keys = keys::sync_key_pool(store).await?;
    controller.sync_wireguard_keys(&local_public_keys).await?;

    let node_config = controller.get_node_config().await?;
    let peers = controller.get_peers().await?;

    exit_node::sync_exit_node(&ns, &eth_name, node_config.exit_node).await?;

    let veth_cidr = node_config
        .veth_cidr
        .as_deref()
        .map(str::parse)
        .transpose()
        .map_err(|_| NetworktoolsError::Invariant("node veth_cidr did not parse as a CIDR".to_string()))?;
    veth::sync_veth(link, &ns, &eth_name, veth_cidr).await?;

    let links = crate::peers::sync_peers(link, relay, store, &ns, &peers).await?;

    let router_bind_dir = ensure::router_dir(&ns);
    routing_config::sync_routing_config(ping_source, container, &ns, &router_bind_dir, &node_config, &links, &peers)
        .await?;

    telemetry::collect_telemetry(link, ping_source, container, controller, &ns, &links, &peers).await?;

    info!(ns, peer_count = peers.len(), "reconciliation tick complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use netctl_container::FakeContainerRuntime;
    use netctl_controller::FakeControllerClient;
    use netctl_link::FakeLinkBackend;
    use netctl_ping::FakePingSource;
    use netctl_relay::FakeSupervisor;
    use netctl_store::PartialNodeSettings;
    use netctl_types::{RemoteNodeInfo, RemotePeerInfo, WireGuardKeyPair};

    use super::*;

    fn store() -> (tempfile::TempDir, NodeStore) {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = NodeStore::open(dir.path().join("state.json")).expect("open");
        (dir, store)
    }

    #[tokio::test]
    async fn missing_node_settings_is_fatal() {
        let (_dir, store) = store();
        let link = FakeLinkBackend::new();
        let container = FakeContainerRuntime::new();
        let ping_source = FakePingSource::new();
        let relay = RelayManager::new(FakeSupervisor::new(), "/opt/networktools");
        let controller = FakeControllerClient::new();

        let result = run_once(&link, &container, &ping_source, &relay, &controller, &store).await;
        assert!(matches!(result, Err(NetworktoolsError::MissingNodeSettings(_))));
    }

    #[tokio::test]
    async fn a_full_tick_creates_the_declared_peer_and_reports_telemetry() {
        let (_dir, store) = store();
        store
            .set_node_settings(&PartialNodeSettings {
                namespace: Some("netT".to_string()),
                eth_name: Some("eth0".to_string()),
                private_key: Some("priv".to_string()),
                node_id: Some(1),
                domain_prefix: Some("https://controller.example".to_string()),
            })
            .unwrap();
        store.create_wireguard_key(WireGuardKeyPair { private: "PRIV_A".to_string(), public: "PUB_A".to_string() }).unwrap();

        let link = FakeLinkBackend::new();
        let container = FakeContainerRuntime::new();
        let ping_source = FakePingSource::new();
        let relay = RelayManager::new(FakeSupervisor::new(), "/opt/networktools");
        let controller = FakeControllerClient::new();
        controller.set_node_config(RemoteNodeInfo::default());
        controller.set_peers(vec![RemotePeerInfo {
            id: 4,
            public_key: "PUB_A".to_string(),
            peer_public_key: "PUB_B".to_string(),
            address_cidr: "10.0.0.1/30".to_string(),
            listen_port: 51820,
            mtu: 1420,
            keepalive: 25,
            endpoint: "198.51.100.9:51820".to_string(),
            extra: None,
        }]);

        run_once(&link, &container, &ping_source, &relay, &controller, &store).await.expect("tick");

        assert!(link.contains("netT", "netT-4").await);
        assert_eq!(controller.calls().link_telemetry.len(), 1);
        assert!(!controller.calls().synced_wireguard_keys.is_empty());
    }
}

//! First-run enrollment: the caller generates this node's signing key (it
//! has to exist before a signed `join` request can go out), then this
//! module asks the controller to assign a node id and persists the result.

use netctl_controller::{ControllerClient, JoinRequest};
use netctl_store::{NodeStore, PartialNodeSettings};
use tracing::info;

use crate::error::NetworktoolsError;

/// Joins the cluster via `controller` (already signing with
/// `private_key_hex`'s identity) and persists the resulting
/// [`netctl_types::NodeSettings`].
///
/// # Errors
///
/// Returns [`NetworktoolsError`] if the join call or the store write fails.
pub async fn run_init<Ctrl: ControllerClient>(
    controller: &Ctrl,
    store: &NodeStore,
    namespace: &str,
    eth_name: &str,
    domain_prefix: &str,
    private_key_hex: &str,
) -> Result<(), NetworktoolsError> {
    info!(namespace, eth_name, "joining cluster");
    let request = JoinRequest { namespace, eth_name };
    let response = controller.join(&request).await?;

    store.set_node_settings(&PartialNodeSettings {
        namespace: Some(namespace.to_string()),
        eth_name: Some(eth_name.to_string()),
        private_key: Some(private_key_hex.to_string()),
        node_id: Some(response.node_id),
        domain_prefix: Some(domain_prefix.to_string()),
    })?;

    info!(node_id = response.node_id, "enrollment complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use netctl_controller::{FakeControllerClient, JoinResponse};

    use super::*;

    fn store() -> (tempfile::TempDir, NodeStore) {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = NodeStore::open(dir.path().join("state.json")).expect("open");
        (dir, store)
    }

    #[tokio::test]
    async fn persists_node_settings_from_the_join_response() {
        let (_dir, store) = store();
        let controller = FakeControllerClient::new();
        controller.set_join_response(JoinResponse { node_id: 42 });

        run_init(&controller, &store, "netA", "eth0", "https://controller.example", "ab".repeat(32).as_str())
            .await
            .expect("init");

        let settings = store.get_node_settings().expect("settings");
        assert_eq!(settings.namespace, "netA");
        assert_eq!(settings.eth_name, "eth0");
        assert_eq!(settings.node_id, 42);
        assert_eq!(settings.domain_prefix, "https://controller.example");
        assert_eq!(settings.private_key, "ab".repeat(32));
    }

    #[tokio::test]
    async fn a_rejected_join_leaves_no_settings_behind() {
        let (_dir, store) = store();
        let controller = FakeControllerClient::new();

        let result = run_init(&controller, &store, "netA", "eth0", "https://controller.example", "ab".repeat(32).as_str()).await;
        assert!(result.is_err());
        assert!(store.get_node_settings().is_err());
    }
}

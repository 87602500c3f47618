use std::collections::HashMap;
use std::sync::Arc;

use ipnet::Ipv4Net;
use netctl_types::{veth_host_ns, ObservedInterfaceState, ObservedPeerState, ObservedWireGuardState};
use tokio::sync::RwLock;

use crate::backend::{AssignWireguardParams, LinkBackend};
use crate::LinkError;

#[derive(Debug, Clone, Default)]
struct FakeInterface {
    address: Option<Ipv4Net>,
    mtu: u32,
    up: bool,
    wireguard: Option<ObservedWireGuardState>,
}

/// An in-memory [`LinkBackend`] keyed by `(ns, name)`, used to exercise
/// reconciliation logic without a real network namespace or WireGuard
/// kernel module available.
#[derive(Debug, Clone, Default)]
pub struct FakeLinkBackend {
    interfaces: Arc<RwLock<HashMap<(String, String), FakeInterface>>>,
}

impl FakeLinkBackend {
    /// Builds an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Test hook: true iff `(ns, name)` currently exists.
    pub async fn contains(&self, ns: &str, name: &str) -> bool {
        self.interfaces.read().await.contains_key(&(ns.to_string(), name.to_string()))
    }
}

impl LinkBackend for FakeLinkBackend {
    async fn create_wireguard(&self, ns: &str, name: &str, addr_cidr: Ipv4Net, mtu: u16) -> Result<(), LinkError> {
        let mut interfaces = self.interfaces.write().await;
        interfaces.insert(
            (ns.to_string(), name.to_string()),
            FakeInterface {
                address: Some(addr_cidr),
                mtu: u32::from(mtu),
                up: false,
                wireguard: Some(ObservedWireGuardState::default()),
            },
        );
        Ok(())
    }

    async fn assign_wireguard(&self, ns: &str, name: &str, params: AssignWireguardParams<'_>) -> Result<(), LinkError> {
        let mut interfaces = self.interfaces.write().await;
        let entry = interfaces
            .entry((ns.to_string(), name.to_string()))
            .or_insert_with(FakeInterface::default);
        let mut wg = entry.wireguard.clone().unwrap_or_default();
        wg.private_key = Some(params.private.to_string());
        wg.listen_port = params.listen_port.unwrap_or(wg.listen_port);
        if let Some(public) = params.peer_public {
            let peer = ObservedPeerState {
                endpoint: params.endpoint.map(str::to_string),
                allowed_ips: params.allowed_ips.map(<[String]>::to_vec).unwrap_or_default(),
                latest_handshake: 0,
                rx_bytes: 0,
                tx_bytes: 0,
                persistent_keepalive: params.keepalive,
            };
            wg.peers.insert(public.to_string(), peer);
        }
        entry.wireguard = Some(wg);
        Ok(())
    }

    async fn up(&self, ns: &str, name: &str) -> Result<(), LinkError> {
        let mut interfaces = self.interfaces.write().await;
        if let Some(entry) = interfaces.get_mut(&(ns.to_string(), name.to_string())) {
            entry.up = true;
        }
        Ok(())
    }

    async fn create_veth(&self, ns: &str, base_name: &str, cidr: Ipv4Net) -> Result<(), LinkError> {
        let (host_addr, ns_addr) = veth_host_ns(cidr)?;
        let prefix = cidr.prefix_len();
        let mut interfaces = self.interfaces.write().await;
        interfaces.insert(
            (String::new(), format!("{base_name}0")),
            FakeInterface {
                address: format!("{host_addr}/{prefix}").parse().ok(),
                mtu: 1500,
                up: true,
                wireguard: None,
            },
        );
        interfaces.insert(
            (ns.to_string(), format!("{base_name}1")),
            FakeInterface {
                address: format!("{ns_addr}/{prefix}").parse().ok(),
                mtu: 1500,
                up: true,
                wireguard: None,
            },
        );
        Ok(())
    }

    async fn try_destroy(&self, ns: &str, name: &str) -> Result<(), LinkError> {
        self.interfaces.write().await.remove(&(ns.to_string(), name.to_string()));
        Ok(())
    }

    async fn dump_all_wireguard(&self, ns: &str) -> Result<HashMap<String, ObservedWireGuardState>, LinkError> {
        let interfaces = self.interfaces.read().await;
        Ok(interfaces
            .iter()
            .filter(|((iface_ns, _), data)| iface_ns == ns && data.wireguard.is_some())
            .map(|((_, name), data)| (name.clone(), data.wireguard.clone().unwrap_or_default()))
            .collect())
    }

    async fn dump_wireguard(&self, ns: &str, name: &str) -> Result<Option<ObservedWireGuardState>, LinkError> {
        let interfaces = self.interfaces.read().await;
        Ok(interfaces
            .get(&(ns.to_string(), name.to_string()))
            .and_then(|data| data.wireguard.clone()))
    }

    async fn get_interface_state(&self, ns: &str, name: &str) -> Result<Option<ObservedInterfaceState>, LinkError> {
        let interfaces = self.interfaces.read().await;
        Ok(interfaces
            .get(&(ns.to_string(), name.to_string()))
            .map(|data| ObservedInterfaceState {
                name: name.to_string(),
                mtu: data.mtu,
                address: data.address,
            }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_then_destroy_round_trips() {
        let backend = FakeLinkBackend::new();
        let cidr: Ipv4Net = "10.1.2.0/30".parse().unwrap();
        backend.create_wireguard("netA", "netA-wg", cidr, 1380).await.unwrap();
        assert!(backend.contains("netA", "netA-wg").await);

        backend.try_destroy("netA", "netA-wg").await.unwrap();
        assert!(!backend.contains("netA", "netA-wg").await);
    }

    #[tokio::test]
    async fn assign_wireguard_records_peer() {
        let backend = FakeLinkBackend::new();
        let cidr: Ipv4Net = "10.1.2.0/30".parse().unwrap();
        backend.create_wireguard("netA", "netA-wg", cidr, 1380).await.unwrap();

        let allowed = vec!["0.0.0.0/0".to_string()];
        backend
            .assign_wireguard(
                "netA",
                "netA-wg",
                AssignWireguardParams {
                    private: "priv",
                    listen_port: Some(51820),
                    peer_public: Some("peerpub"),
                    endpoint: Some("203.0.113.5:51820"),
                    keepalive: Some(25),
                    allowed_ips: Some(&allowed),
                },
            )
            .await
            .unwrap();

        let state = backend.dump_wireguard("netA", "netA-wg").await.unwrap().unwrap();
        assert_eq!(state.listen_port, 51820);
        let peer = state.peers.get("peerpub").unwrap();
        assert_eq!(peer.persistent_keepalive, Some(25));
        assert_eq!(peer.endpoint.as_deref(), Some("203.0.113.5:51820"));
    }

    #[tokio::test]
    async fn create_veth_derives_slash_30_addresses() {
        let backend = FakeLinkBackend::new();
        let cidr: Ipv4Net = "10.2.0.0/30".parse().unwrap();
        backend.create_veth("netA", "vethA", cidr).await.unwrap();

        let host = backend.get_interface_state("", "vethA0").await.unwrap().unwrap();
        let ns = backend.get_interface_state("netA", "vethA1").await.unwrap().unwrap();
        assert_eq!(host.address.unwrap().addr().to_string(), "10.2.0.1");
        assert_eq!(ns.address.unwrap().addr().to_string(), "10.2.0.2");
    }

    #[tokio::test]
    async fn dump_all_wireguard_filters_by_namespace() {
        let backend = FakeLinkBackend::new();
        let cidr: Ipv4Net = "10.1.2.0/30".parse().unwrap();
        backend.create_wireguard("netA", "netA-wg", cidr, 1380).await.unwrap();
        backend.create_wireguard("netB", "netB-wg", cidr, 1380).await.unwrap();

        let dump = backend.dump_all_wireguard("netA").await.unwrap();
        assert_eq!(dump.len(), 1);
        assert!(dump.contains_key("netA-wg"));
    }
}

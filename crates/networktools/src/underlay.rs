//! Step 8: the four-state underlay-relay reconciliation for one peer link.
//!
//! `(local, remote)` over `{absent, present}` gives four cases: nothing to
//! do, start a worker, stop one, or (if the running worker no longer
//! matches what's desired) restart it. The worker itself is supervised by
//! [`netctl_relay::RelayManager`]; this module only decides whether one
//! should exist and what it should look like.

use netctl_link::{AssignWireguardParams, LinkBackend};
use netctl_relay::{RelayManager, Supervisor};
use netctl_store::NodeStore;
use netctl_types::{LocalUnderlayState, PeerUnderlayExtra, RemotePeerInfo, UnderlayProvider};
use tracing::info;

use crate::diff::{underlay_diff, UnderlayAction};
use crate::error::NetworktoolsError;

async fn resolve_ipv4_preferred(host_port: &str) -> Result<std::net::SocketAddr, NetworktoolsError> {
    let mut addrs: Vec<std::net::SocketAddr> = tokio::net::lookup_host(host_port)
        .await?
        .collect();
    addrs.sort_by_key(std::net::SocketAddr::is_ipv6);
    addrs
        .into_iter()
        .next()
        .ok_or_else(|| NetworktoolsError::Invariant(format!("DNS resolution for {host_port} returned no addresses")))
}

async fn create_client<L: LinkBackend, S: Supervisor>(
    link: &L,
    relay: &RelayManager<S>,
    store: &NodeStore,
    ns: &str,
    ifname: &str,
    peer: &RemotePeerInfo,
    extra: &PeerUnderlayExtra,
) -> Result<(), NetworktoolsError> {
    let (dst_host, dst_port) = if let Some(addr) = netctl_types::non_empty(&extra.server_addr) {
        (addr.to_string(), extra.server_port.unwrap_or(0))
    } else {
        let resolved = resolve_ipv4_preferred(&peer.endpoint).await?;
        (resolved.ip().to_string(), extra.server_port.unwrap_or(resolved.port()))
    };

    info!(ns, ifname, dst_host = %dst_host, dst_port, "starting underlay relay client");
    let unit_name = relay.start_client(ns, extra.listen_port, &dst_host, dst_port).await?;
    let state = LocalUnderlayState::Client {
        unit_name,
        listen_port: extra.listen_port,
        server_ip: dst_host,
        server_port: dst_port,
    };
    store.set_local_underlay_state(ifname, &state)?;

    let loopback = format!("127.0.0.1:{}", extra.listen_port);
    let observed = link.dump_wireguard(ns, ifname).await?;
    if let Some(wg) = observed {
        link.assign_wireguard(
            ns,
            ifname,
            AssignWireguardParams {
                private: wg.private_key.as_deref().unwrap_or_default(),
                listen_port: None,
                peer_public: Some(&peer.peer_public_key),
                endpoint: Some(&loopback),
                keepalive: (peer.keepalive != 0).then_some(peer.keepalive),
                allowed_ips: Some(&["0.0.0.0/0".to_string()]),
            },
        )
        .await?;
    }
    Ok(())
}

async fn create_server<L: LinkBackend, S: Supervisor>(
    link: &L,
    relay: &RelayManager<S>,
    store: &NodeStore,
    ns: &str,
    ifname: &str,
    extra: &PeerUnderlayExtra,
) -> Result<(), NetworktoolsError> {
    let wg_listen_port = link
        .dump_wireguard(ns, ifname)
        .await?
        .map(|state| state.listen_port)
        .unwrap_or_default();

    info!(ns, ifname, listen_port = extra.listen_port, wg_listen_port, "starting underlay relay server");
    let unit_name = relay.start_server(ns, extra.listen_port, wg_listen_port).await?;
    let state = LocalUnderlayState::Server { unit_name, listen_port: extra.listen_port };
    store.set_local_underlay_state(ifname, &state)?;
    Ok(())
}

/// Reconciles the underlay relay worker for one peer link against
/// `desired`.
///
/// # Errors
///
/// Returns [`NetworktoolsError`] if store access, DNS resolution, the
/// supervisor, or the paired WireGuard endpoint rewrite fails.
pub async fn sync_underlay<L: LinkBackend, S: Supervisor>(
    link: &L,
    relay: &RelayManager<S>,
    store: &NodeStore,
    ns: &str,
    ifname: &str,
    peer: &RemotePeerInfo,
    desired: Option<&PeerUnderlayExtra>,
) -> Result<(), NetworktoolsError> {
    let local = store.get_local_underlay_state(ifname)?;
    let action = underlay_diff(local.as_ref(), desired);

    match action {
        UnderlayAction::Noop => Ok(()),
        UnderlayAction::Create => match desired {
            Some(extra) => create(link, relay, store, ns, ifname, peer, extra).await,
            None => Ok(()),
        },
        UnderlayAction::Stop => {
            if let Some(local) = local {
                info!(ns, ifname, unit = local.unit_name(), "stopping underlay relay, no longer desired");
                relay.stop(local.unit_name()).await;
                store.delete_local_underlay_state(ifname)?;
            }
            Ok(())
        }
        UnderlayAction::Recreate => {
            if let Some(local) = local {
                info!(ns, ifname, unit = local.unit_name(), "recreating underlay relay, mode or endpoint changed");
                relay.stop(local.unit_name()).await;
                store.delete_local_underlay_state(ifname)?;
            }
            match desired {
                Some(extra) => create(link, relay, store, ns, ifname, peer, extra).await,
                None => Ok(()),
            }
        }
    }
}

async fn create<L: LinkBackend, S: Supervisor>(
    link: &L,
    relay: &RelayManager<S>,
    store: &NodeStore,
    ns: &str,
    ifname: &str,
    peer: &RemotePeerInfo,
    extra: &PeerUnderlayExtra,
) -> Result<(), NetworktoolsError> {
    match extra.provider {
        UnderlayProvider::GostRelayClient => create_client(link, relay, store, ns, ifname, peer, extra).await,
        UnderlayProvider::GostRelayServer => create_server(link, relay, store, ns, ifname, extra).await,
    }
}

#[cfg(test)]
mod tests {
    use ipnet::Ipv4Net;
    use netctl_link::FakeLinkBackend;
    use netctl_relay::FakeSupervisor;

    use super::*;

    fn peer(extra_underlay: Option<PeerUnderlayExtra>) -> RemotePeerInfo {
        RemotePeerInfo {
            id: 3,
            public_key: "PUB_A".to_string(),
            peer_public_key: "PUB_B".to_string(),
            address_cidr: "10.0.0.1/30".to_string(),
            listen_port: 51820,
            mtu: 1420,
            keepalive: 25,
            endpoint: "198.51.100.9:51820".to_string(),
            extra: extra_underlay.map(|underlay| netctl_types::RemotePeerExtra { ospf: None, underlay: Some(underlay) }),
        }
    }

    fn relay() -> RelayManager<FakeSupervisor> {
        RelayManager::new(FakeSupervisor::new(), "/opt/networktools")
    }

    fn store() -> (tempfile::TempDir, NodeStore) {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = NodeStore::open(dir.path().join("state.json")).expect("open");
        (dir, store)
    }

    #[tokio::test]
    async fn no_local_no_remote_is_a_noop() {
        let (_dir, store) = store();
        let link = FakeLinkBackend::new();
        let relay = relay();
        let peer = peer(None);

        sync_underlay(&link, &relay, &store, "netA", "netA-3", &peer, None).await.expect("sync");
        assert!(store.get_local_underlay_state("netA-3").unwrap().is_none());
    }

    #[tokio::test]
    async fn creates_a_server_worker_reading_the_live_wireguard_listen_port() {
        let (_dir, store) = store();
        let link = FakeLinkBackend::new();
        let cidr: Ipv4Net = "10.0.0.1/30".parse().unwrap();
        link.create_wireguard("netA", "netA-3", cidr, 1420).await.unwrap();
        link.assign_wireguard(
            "netA",
            "netA-3",
            AssignWireguardParams {
                private: "priv",
                listen_port: Some(51820),
                peer_public: None,
                endpoint: None,
                keepalive: None,
                allowed_ips: None,
            },
        )
        .await
        .unwrap();
        let relay = relay();
        let extra = PeerUnderlayExtra {
            provider: UnderlayProvider::GostRelayServer,
            listen_port: 8443,
            server_addr: None,
            server_port: None,
        };
        let peer = peer(Some(extra.clone()));

        sync_underlay(&link, &relay, &store, "netA", "netA-3", &peer, Some(&extra)).await.expect("sync");
        let recorded = store.get_local_underlay_state("netA-3").unwrap().unwrap();
        match recorded {
            LocalUnderlayState::Server { listen_port, .. } => assert_eq!(listen_port, 8443),
            LocalUnderlayState::Client { .. } => panic!("expected server state"),
        }
    }

    #[tokio::test]
    async fn stops_the_worker_when_no_longer_desired() {
        let (_dir, store) = store();
        let link = FakeLinkBackend::new();
        let relay = relay();
        store
            .set_local_underlay_state(
                "netA-3",
                &LocalUnderlayState::Server { unit_name: "networktools-netA-worker-x".to_string(), listen_port: 8443 },
            )
            .unwrap();
        let peer = peer(None);

        sync_underlay(&link, &relay, &store, "netA", "netA-3", &peer, None).await.expect("sync");
        assert!(store.get_local_underlay_state("netA-3").unwrap().is_none());
    }

    #[tokio::test]
    async fn matching_state_is_left_alone() {
        let (_dir, store) = store();
        let link = FakeLinkBackend::new();
        let relay = relay();
        let existing = LocalUnderlayState::Server { unit_name: "networktools-netA-worker-x".to_string(), listen_port: 8443 };
        store.set_local_underlay_state("netA-3", &existing).unwrap();
        let extra = PeerUnderlayExtra {
            provider: UnderlayProvider::GostRelayServer,
            listen_port: 8443,
            server_addr: None,
            server_port: None,
        };
        let peer = peer(Some(extra.clone()));

        sync_underlay(&link, &relay, &store, "netA", "netA-3", &peer, Some(&extra)).await.expect("sync");
        let recorded = store.get_local_underlay_state("netA-3").unwrap().unwrap();
        assert_eq!(recorded.unit_name(), "networktools-netA-worker-x");
    }
}

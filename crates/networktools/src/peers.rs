//! Step 7: per-peer WireGuard interfaces, plus the underlay relay each one
//! may need (step 8, delegated to [`crate::underlay`]).

use std::collections::HashSet;

use ipnet::Ipv4Net;
use netctl_iptables::{tags, IptablesManager};
use netctl_link::{AssignWireguardParams, LinkBackend};
use netctl_relay::Supervisor;
use netctl_store::NodeStore;
use netctl_types::{non_empty, RemotePeerInfo};
use tracing::{info, warn};

use crate::error::NetworktoolsError;
use crate::underlay;

/// Default MTU used when a peer doesn't specify one.
const DEFAULT_MTU: u16 = 1420;

/// WireGuard's catch-all allowed-IPs for a mesh peer: all traffic for this
/// peer's link is routed, cost and reachability are OSPF's job from here.
const ALLOWED_IPS: [&str; 1] = ["0.0.0.0/0"];

/// A currently desired-and-present peer link, handed to the routing-config
/// and telemetry steps.
#[derive(Debug, Clone)]
pub struct PeerLinkInfo {
    /// The peer's identifier.
    pub peer_id: u32,
    /// Local interface name, `{ns}-{peer_id}`.
    pub ifname: String,
    /// This node's address and prefix on the peer's `/30` link.
    pub local_cidr: Ipv4Net,
}

/// The interface name a peer's `id` maps to.
#[must_use]
pub fn peer_ifname(ns: &str, peer_id: u32) -> String {
    format!("{ns}-{peer_id}")
}

fn parse_peer_cidr(peer: &RemotePeerInfo) -> Result<Ipv4Net, NetworktoolsError> {
    let cidr: Ipv4Net = peer
        .address_cidr
        .parse()
        .map_err(|_| NetworktoolsError::Invariant(format!("peer {} has unparseable address_cidr", peer.id)))?;
    if cidr.prefix_len() == 32 {
        return Err(NetworktoolsError::Invariant(format!("peer {} address_cidr is a /32", peer.id)));
    }
    Ok(cidr)
}

fn find_private_key(store: &NodeStore, public_key: &str) -> Result<String, NetworktoolsError> {
    store
        .get_all_wireguard_keys()
        .into_iter()
        .find(|pair| pair.public == public_key)
        .map(|pair| pair.private)
        .ok_or_else(|| NetworktoolsError::Invariant(format!("no local private key matches public key {public_key}")))
}

async fn open_listen_port_rule(ifname: &str, listen_port: u16) -> Result<(), NetworktoolsError> {
    let root = IptablesManager::new("");
    let chain = format!("{}-INPUT", ifname.rsplit_once('-').map_or(ifname, |(ns, _)| ns));
    let port = listen_port.to_string();
    let comment = tags::peer_comment_args(ifname);
    let comment_args: Vec<&str> = comment.iter().map(String::as_str).collect();
    let mut args: Vec<&str> = vec!["-p", "udp", "--dport", &port, "-j", "ACCEPT"];
    args.extend(comment_args.iter().copied());
    root.append_if_missing("filter", &chain, &args).await?;
    Ok(())
}

async fn purge_peer_rule(ns: &str, ifname: &str) -> Result<(), NetworktoolsError> {
    let root = IptablesManager::new("");
    root.purge_tagged("filter", &format!("{ns}-INPUT"), &tags::peer_tag(ifname)).await?;
    Ok(())
}

/// Creates/marks/destroys every peer WireGuard interface, maintaining
/// invariant 1 (unmarked observed interfaces matching `{ns}-N` are stale and
/// get destroyed) and invariant 2 (a real private key exists for every
/// declared peer public key, else the tick aborts).
///
/// # Errors
///
/// Returns [`NetworktoolsError`] if any device, rule, or underlay operation
/// fails, or if a semantic invariant is violated.
pub async fn sync_peers<L: LinkBackend, S: Supervisor>(
    link: &L,
    relay: &netctl_relay::RelayManager<S>,
    store: &NodeStore,
    ns: &str,
    peers: &[RemotePeerInfo],
) -> Result<Vec<PeerLinkInfo>, NetworktoolsError> {
    let mut seen = HashSet::new();
    let mut result = Vec::with_capacity(peers.len());

    for peer in peers {
        let cidr = parse_peer_cidr(peer)?;
        let ifname = peer_ifname(ns, peer.id);
        seen.insert(ifname.clone());

        let private_key = find_private_key(store, &peer.public_key)?;
        let mtu = if peer.mtu == 0 { DEFAULT_MTU } else { peer.mtu };
        let was_present = link.get_interface_state(ns, &ifname).await?.is_some();

        if !was_present {
            info!(ns, peer_id = peer.id, ifname = %ifname, "creating peer wireguard interface");
            link.create_wireguard(ns, &ifname, cidr, mtu).await?;
            link.assign_wireguard(
                ns,
                &ifname,
                AssignWireguardParams {
                    private: &private_key,
                    listen_port: (peer.listen_port != 0).then_some(peer.listen_port),
                    peer_public: Some(&peer.peer_public_key),
                    endpoint: non_empty(&Some(peer.endpoint.clone())),
                    keepalive: (peer.keepalive != 0).then_some(peer.keepalive),
                    allowed_ips: Some(&ALLOWED_IPS.map(str::to_string)),
                },
            )
            .await?;
            link.up(ns, &ifname).await?;
            if peer.listen_port != 0 {
                open_listen_port_rule(&ifname, peer.listen_port).await?;
            }
        }

        let underlay_desired = peer.extra.as_ref().and_then(|extra| extra.underlay.as_ref());
        underlay::sync_underlay(link, relay, store, ns, &ifname, peer, underlay_desired).await?;

        if was_present && underlay_desired.is_none() {
            sync_keepalive(link, ns, &ifname, peer).await?;
        }

        result.push(PeerLinkInfo { peer_id: peer.id, ifname, local_cidr: cidr });
    }

    destroy_stale_peers(link, ns, &seen).await?;
    Ok(result)
}

async fn sync_keepalive<L: LinkBackend>(
    link: &L,
    ns: &str,
    ifname: &str,
    peer: &RemotePeerInfo,
) -> Result<(), NetworktoolsError> {
    let Some(observed) = link.dump_wireguard(ns, ifname).await? else {
        return Ok(());
    };
    let desired_keepalive = (peer.keepalive != 0).then_some(peer.keepalive);
    let current_keepalive = observed.peers.get(&peer.peer_public_key).and_then(|p| p.persistent_keepalive);
    if current_keepalive == desired_keepalive {
        return Ok(());
    }
    link.assign_wireguard(
        ns,
        ifname,
        AssignWireguardParams {
            private: observed.private_key.as_deref().unwrap_or_default(),
            listen_port: None,
            peer_public: Some(&peer.peer_public_key),
            endpoint: non_empty(&Some(peer.endpoint.clone())),
            keepalive: desired_keepalive,
            allowed_ips: Some(&ALLOWED_IPS.map(str::to_string)),
        },
    )
    .await?;
    Ok(())
}

async fn destroy_stale_peers<L: LinkBackend>(link: &L, ns: &str, seen: &HashSet<String>) -> Result<(), NetworktoolsError> {
    let observed = link.dump_all_wireguard(ns).await?;
    for ifname in observed.keys() {
        if seen.contains(ifname) {
            continue;
        }
        warn!(ns, ifname, "destroying stale peer interface not in the desired peer set");
        link.try_destroy(ns, ifname).await?;
        purge_peer_rule(ns, ifname).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use netctl_link::FakeLinkBackend;
    use netctl_relay::{FakeSupervisor, RelayManager};
    use netctl_types::WireGuardKeyPair;

    use super::*;

    fn store() -> (tempfile::TempDir, NodeStore) {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = NodeStore::open(dir.path().join("state.json")).expect("open");
        (dir, store)
    }

    fn relay() -> netctl_relay::RelayManager<FakeSupervisor> {
        RelayManager::new(FakeSupervisor::new(), "/opt/networktools")
    }

    fn one_peer() -> RemotePeerInfo {
        RemotePeerInfo {
            id: 7,
            public_key: "PUB_A".to_string(),
            peer_public_key: "PUB_B".to_string(),
            address_cidr: "10.0.0.1/30".to_string(),
            listen_port: 51820,
            mtu: 1420,
            keepalive: 25,
            endpoint: "198.51.100.9:51820".to_string(),
            extra: None,
        }
    }

    #[tokio::test]
    async fn cold_start_creates_the_peer_interface() {
        let (_dir, store) = store();
        store.create_wireguard_key(WireGuardKeyPair { private: "PRIV_A".to_string(), public: "PUB_A".to_string() }).unwrap();
        let link = FakeLinkBackend::new();
        let relay = relay();
        let peers = vec![one_peer()];

        let infos = sync_peers(&link, &relay, &store, "netA", &peers).await.expect("sync");
        assert_eq!(infos.len(), 1);
        assert_eq!(infos[0].ifname, "netA-7");
        assert!(link.contains("netA", "netA-7").await);

        let observed = link.dump_wireguard("netA", "netA-7").await.unwrap().unwrap();
        assert_eq!(observed.listen_port, 51820);
        assert!(observed.peers.contains_key("PUB_B"));
    }

    #[tokio::test]
    async fn missing_private_key_is_an_invariant_violation() {
        let (_dir, store) = store();
        let link = FakeLinkBackend::new();
        let relay = relay();
        let peers = vec![one_peer()];

        let result = sync_peers(&link, &relay, &store, "netA", &peers).await;
        assert!(matches!(result, Err(NetworktoolsError::Invariant(_))));
    }

    #[tokio::test]
    async fn slash_32_address_cidr_is_an_invariant_violation() {
        let (_dir, store) = store();
        let link = FakeLinkBackend::new();
        let relay = relay();
        let mut peer = one_peer();
        peer.address_cidr = "10.0.0.1/32".to_string();

        let result = sync_peers(&link, &relay, &store, "netA", &[peer]).await;
        assert!(matches!(result, Err(NetworktoolsError::Invariant(_))));
    }

    #[tokio::test]
    async fn stale_peer_interface_is_destroyed() {
        let (_dir, store) = store();
        let link = FakeLinkBackend::new();
        let cidr: Ipv4Net = "10.0.0.5/30".parse().unwrap();
        link.create_wireguard("netA", "netA-9", cidr, 1420).await.unwrap();
        let relay = relay();

        let infos = sync_peers(&link, &relay, &store, "netA", &[]).await.expect("sync");
        assert!(infos.is_empty());
        assert!(!link.contains("netA", "netA-9").await);
    }
}

//! Step 9: assembling and applying the routing daemon's configuration.
//!
//! Link costs fold a peer's configured baseline with a fresh ping
//! measurement (see [`crate::diff::ospf_cost`]); the rendered text then
//! replaces the container-bound config file atomically and the daemon is
//! told to reload without restarting.

use std::collections::BTreeMap;
use std::time::Duration;

use netctl_container::ContainerRuntime;
use netctl_ping::{measure_with_window, PingSource, PingTarget, COLLECTION_WINDOW};
use netctl_routing::{render, BfdInterfaceConfig, OspfInterfaceConfig, RoutingConfig};
use netctl_types::{RemoteNodeInfo, RemotePeerInfo};
use tracing::info;

use crate::diff::ospf_cost;
use crate::ensure::router_dir;
use crate::error::NetworktoolsError;
use crate::peers::PeerLinkInfo;
use crate::veth;

/// OSPF/BFD timers fixed for every peer link, per invariant 8 — the
/// reconciliation controller never varies these per peer.
const BFD_INTERVAL_MS: u32 = 1000;
const BFD_IDLE_MS: u32 = 5000;
const BFD_MULTIPLIER: u32 = 5;

fn bfd_defaults() -> BfdInterfaceConfig {
    BfdInterfaceConfig {
        interval_ms: Some(BFD_INTERVAL_MS),
        idle_ms: Some(BFD_IDLE_MS),
        multiplier: Some(BFD_MULTIPLIER),
        ..Default::default()
    }
}

async fn build_config<P: PingSource>(
    ping_source: &P,
    ns: &str,
    remote: &RemoteNodeInfo,
    links: &[PeerLinkInfo],
    peers: &[RemotePeerInfo],
    window: Duration,
) -> RoutingConfig {
    let local_interface_cidrs: Vec<String> = links.iter().map(|link| link.local_cidr.to_string()).collect();

    let targets: Vec<PingTarget<'_>> =
        links.iter().map(|link| PingTarget { ifname: &link.ifname, local: link.local_cidr }).collect();
    let measured = measure_with_window(ping_source, ns, &targets, window).await;

    let mut area0 = BTreeMap::new();
    let mut bfd_config = BTreeMap::new();
    for link in links {
        let Some(peer) = peers.iter().find(|p| p.id == link.peer_id) else { continue };
        let ospf_extra = peer.extra.as_ref().and_then(|e| e.ospf.as_ref());
        let prefer_ping = ospf_extra.is_some_and(|e| e.ping);
        let configured_cost = ospf_extra.and_then(|e| e.cost);
        let offset = ospf_extra.map_or(0, |e| e.offset);
        let ping_ms = measured.get(&link.ifname).copied().flatten();
        let cost = ospf_cost(prefer_ping, ping_ms, configured_cost, offset);

        area0.insert(
            link.ifname.clone(),
            OspfInterfaceConfig { cost: Some(cost), iface_type: Some("ptp".to_string()), auth: None },
        );
        bfd_config.insert(link.ifname.clone(), bfd_defaults());
    }

    let mut ospf_area_config = BTreeMap::new();
    ospf_area_config.insert("0".to_string(), area0);

    if let (Some(_), Some(ospf)) = (&remote.veth_cidr, &remote.ospf) {
        let ifname = veth::ns_ifname(ns);
        let area = ospf_area_config.entry(ospf.area.clone()).or_default();
        area.insert(
            ifname,
            OspfInterfaceConfig { cost: Some(ospf.cost), iface_type: Some("ptp".to_string()), auth: ospf.auth.clone() },
        );
    }

    RoutingConfig {
        router_id: None,
        direct_interface_names: Vec::new(),
        ospf_import_exclude_cidrs: local_interface_cidrs,
        ospf_export_exclude_cidrs: Vec::new(),
        ospf_area_config,
        bfd_config,
        debug_protocols: false,
        disable_logging: false,
        git_version: None,
        generated_at: None,
    }
}

async fn write_config_atomically(ns: &str, text: &str) -> Result<(), NetworktoolsError> {
    let dir = router_dir(ns);
    tokio::fs::create_dir_all(&dir).await?;
    let text = text.to_string();
    tokio::task::spawn_blocking(move || -> Result<(), std::io::Error> {
        let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
        use std::io::Write;
        tmp.write_all(text.as_bytes())?;
        tmp.persist(format!("{dir}/bird.conf")).map_err(|e| e.error)?;
        Ok(())
    })
    .await
    .map_err(|err| NetworktoolsError::Invariant(format!("config write task panicked: {err}")))??;
    Ok(())
}

/// Assembles the routing-daemon configuration from the current peer set
/// and applies it: atomic file replace, then `birdc configure` against the
/// running container.
///
/// # Errors
///
/// Returns [`NetworktoolsError`] if ping measurement's callers, the file
/// write, or the container reload fail.
pub async fn sync_routing_config<P: PingSource, C: ContainerRuntime>(
    ping_source: &P,
    container: &C,
    ns: &str,
    router_bind_dir: &str,
    remote: &RemoteNodeInfo,
    links: &[PeerLinkInfo],
    peers: &[RemotePeerInfo],
) -> Result<(), NetworktoolsError> {
    let config = build_config(ping_source, ns, remote, links, peers, COLLECTION_WINDOW).await;
    let text = render(&config);
    write_config_atomically(ns, &text).await?;

    let container_id = match container.inspect(ns).await? {
        Some(info) if info.is_running() => info.id,
        Some(_) | None => {
            info!(ns, "router container absent or not running, starting it");
            container.start(ns, router_bind_dir).await?
        }
    };
    container.reload(&container_id).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use netctl_container::FakeContainerRuntime;
    use netctl_ping::FakePingSource;
    use netctl_types::{PeerOspfExtra, RemoteOspfConfig, RemotePeerExtra};

    use super::*;

    fn peer(id: u32, ospf: Option<PeerOspfExtra>) -> RemotePeerInfo {
        RemotePeerInfo {
            id,
            public_key: "PUB_A".to_string(),
            peer_public_key: "PUB_B".to_string(),
            address_cidr: "10.0.0.1/30".to_string(),
            listen_port: 51820,
            mtu: 1420,
            keepalive: 25,
            endpoint: "198.51.100.9:51820".to_string(),
            extra: ospf.map(|ospf| RemotePeerExtra { ospf: Some(ospf), underlay: None }),
        }
    }

    #[tokio::test]
    async fn cost_prefers_measured_ping_over_configured_baseline() {
        let ping_source = FakePingSource::new();
        ping_source.set("netA", "10.0.0.2".parse().unwrap(), vec![27.3]).await;
        let link = PeerLinkInfo { peer_id: 7, ifname: "netA-7".to_string(), local_cidr: "10.0.0.1/30".parse().unwrap() };
        let peer = peer(7, Some(PeerOspfExtra { cost: Some(1000), ping: true, offset: 5 }));

        let config = build_config(
            &ping_source,
            "netA",
            &RemoteNodeInfo::default(),
            &[link],
            &[peer],
            Duration::from_millis(1),
        )
        .await;

        let area = config.ospf_area_config.get("0").expect("area 0 present");
        assert_eq!(area.get("netA-7").unwrap().cost, Some(32));
    }

    #[tokio::test]
    async fn absent_ping_sample_falls_back_to_configured_cost_plus_offset() {
        let ping_source = FakePingSource::new();
        let link = PeerLinkInfo { peer_id: 7, ifname: "netA-7".to_string(), local_cidr: "10.0.0.1/30".parse().unwrap() };
        let peer = peer(7, Some(PeerOspfExtra { cost: Some(1000), ping: true, offset: 5 }));

        let config = build_config(
            &ping_source,
            "netA",
            &RemoteNodeInfo::default(),
            &[link],
            &[peer],
            Duration::from_millis(1),
        )
        .await;

        let area = config.ospf_area_config.get("0").expect("area 0 present");
        assert_eq!(area.get("netA-7").unwrap().cost, Some(1005));
    }

    #[tokio::test]
    async fn veth_interface_joins_the_remote_specified_area_when_both_present() {
        let ping_source = FakePingSource::new();
        let remote = RemoteNodeInfo {
            exit_node: false,
            veth_cidr: Some("10.9.0.0/30".to_string()),
            ospf: Some(RemoteOspfConfig { area: "1".to_string(), cost: 50, auth: None }),
        };

        let config = build_config(&ping_source, "netA", &remote, &[], &[], Duration::from_millis(1)).await;

        let area1 = config.ospf_area_config.get("1").expect("area 1 present");
        assert_eq!(area1.get("netA-veth1").unwrap().cost, Some(50));
    }

    #[tokio::test]
    async fn applies_config_and_reloads_a_running_container() {
        let dir = tempfile::tempdir().expect("tempdir");
        let ns = format!("test{}", std::process::id());
        let router_dir_override = dir.path().join("router");
        tokio::fs::create_dir_all(&router_dir_override).await.expect("mkdir");

        let ping_source = FakePingSource::new();
        let container = FakeContainerRuntime::new();
        container.start(&ns, router_dir_override.to_str().unwrap()).await.expect("start");

        let result = sync_routing_config(
            &ping_source,
            &container,
            &ns,
            router_dir_override.to_str().unwrap(),
            &RemoteNodeInfo::default(),
            &[],
            &[],
        )
        .await;

        assert!(result.is_ok());
        assert_eq!(container.reload_count(&ns), 1);
    }
}

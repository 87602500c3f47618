//! Step 10: reporting link and router telemetry to the controller.
//!
//! Runs strictly after the routing-config reload (see the ordering
//! guarantee in the reconciliation controller's design notes): this pass's
//! ping measurement is independent of whatever fed the OSPF cost map a
//! moment earlier.

use std::time::Duration;

use netctl_container::ContainerRuntime;
use netctl_controller::{ControllerClient, LinkTelemetry};
use netctl_link::LinkBackend;
use netctl_ping::{measure_with_window, PingSource, PingTarget, COLLECTION_WINDOW};
use netctl_routing::parse_ospf_state;
use netctl_types::RemotePeerInfo;
use tracing::info;

use crate::error::NetworktoolsError;
use crate::peers::PeerLinkInfo;

async fn collect_link_telemetry<L: LinkBackend, P: PingSource>(
    link: &L,
    ping_source: &P,
    ns: &str,
    links: &[PeerLinkInfo],
    peers: &[RemotePeerInfo],
    window: Duration,
) -> Result<Vec<LinkTelemetry>, NetworktoolsError> {
    let targets: Vec<PingTarget<'_>> =
        links.iter().map(|l| PingTarget { ifname: &l.ifname, local: l.local_cidr }).collect();
    let measured = measure_with_window(ping_source, ns, &targets, window).await;

    let mut telemetry = Vec::with_capacity(links.len());
    for peer_link in links {
        let Some(peer) = peers.iter().find(|p| p.id == peer_link.peer_id) else { continue };
        let ping_ms = measured.get(&peer_link.ifname).copied().flatten();
        let (rx, tx) = link
            .dump_wireguard(ns, &peer_link.ifname)
            .await?
            .and_then(|wg| wg.peers.get(&peer.peer_public_key).map(|p| (p.rx_bytes, p.tx_bytes)))
            .unwrap_or((0, 0));
        telemetry.push(LinkTelemetry { id: peer_link.peer_id, ping_ms, rx, tx });
    }
    Ok(telemetry)
}

/// Measures link quality for the currently reconciled peer set and reports
/// it to the controller, then (if the routing daemon container is up)
/// fetches, parses, and reports its OSPF LSDB.
///
/// # Errors
///
/// Returns [`NetworktoolsError`] if any device, container, parse, or
/// controller call fails.
pub async fn collect_telemetry<L: LinkBackend, P: PingSource, C: ContainerRuntime, Ctrl: ControllerClient>(
    link: &L,
    ping_source: &P,
    container: &C,
    controller: &Ctrl,
    ns: &str,
    links: &[PeerLinkInfo],
    peers: &[RemotePeerInfo],
) -> Result<(), NetworktoolsError> {
    let telemetry = collect_link_telemetry(link, ping_source, ns, links, peers, COLLECTION_WINDOW).await?;
    controller.link_telemetry(&telemetry).await?;

    if let Some(info) = container.inspect(ns).await? {
        if info.is_running() {
            info!(ns, "reporting router telemetry");
            let raw = container.ospf_state(&info.id).await?;
            let state = parse_ospf_state(&raw)?;
            controller.router_telemetry(&state).await?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use ipnet::Ipv4Net;
    use netctl_container::FakeContainerRuntime;
    use netctl_controller::FakeControllerClient;
    use netctl_link::{AssignWireguardParams, FakeLinkBackend};
    use netctl_ping::FakePingSource;

    use super::*;

    fn peer(id: u32) -> RemotePeerInfo {
        RemotePeerInfo {
            id,
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
    async fn reports_ping_and_byte_counters_for_each_link() {
        let link_backend = FakeLinkBackend::new();
        let cidr: Ipv4Net = "10.0.0.1/30".parse().unwrap();
        link_backend.create_wireguard("netA", "netA-7", cidr, 1420).await.unwrap();
        link_backend
            .assign_wireguard(
                "netA",
                "netA-7",
                AssignWireguardParams {
                    private: "priv",
                    listen_port: Some(51820),
                    peer_public: Some("PUB_B"),
                    endpoint: Some("198.51.100.9:51820"),
                    keepalive: Some(25),
                    allowed_ips: Some(&["0.0.0.0/0".to_string()]),
                },
            )
            .await
            .unwrap();

        let ping_source = FakePingSource::new();
        ping_source.set("netA", "10.0.0.2".parse().unwrap(), vec![12.0, 14.0]).await;
        let container = FakeContainerRuntime::new();
        let controller = FakeControllerClient::new();

        let links = vec![PeerLinkInfo { peer_id: 7, ifname: "netA-7".to_string(), local_cidr: cidr }];
        let peers = vec![peer(7)];

        collect_telemetry(
            &link_backend,
            &ping_source,
            &container,
            &controller,
            "netA",
            &links,
            &peers,
        )
        .await
        .expect("collect");

        let calls = controller.calls();
        assert_eq!(calls.link_telemetry.len(), 1);
        let (id, ping, _rx, _tx) = calls.link_telemetry[0][0];
        assert_eq!(id, 7);
        assert_eq!(ping, Some(13.0));
        assert_eq!(calls.router_telemetry_calls, 0);
    }

    #[tokio::test]
    async fn reports_router_telemetry_when_the_container_is_running() {
        let link_backend = FakeLinkBackend::new();
        let ping_source = FakePingSource::new();
        let container = FakeContainerRuntime::new();
        container.start("netA", "/tmp/networktools-netA/router").await.unwrap();
        container.set_ospf_state("area 0.0.0.0\n\trouter 1.1.1.1\n");
        let controller = FakeControllerClient::new();

        collect_telemetry(&link_backend, &ping_source, &container, &controller, "netA", &[], &[])
            .await
            .expect("collect");

        assert_eq!(controller.calls().router_telemetry_calls, 1);
    }

    #[tokio::test]
    async fn skips_router_telemetry_when_the_container_is_absent() {
        let link_backend = FakeLinkBackend::new();
        let ping_source = FakePingSource::new();
        let container = FakeContainerRuntime::new();
        let controller = FakeControllerClient::new();

        collect_telemetry(&link_backend, &ping_source, &container, &controller, "netA", &[], &[])
            .await
            .expect("collect");

        assert_eq!(controller.calls().router_telemetry_calls, 0);
    }
}

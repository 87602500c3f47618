use std::collections::HashMap;
use std::time::Duration;

use ipnet::Ipv4Net;
use netctl_types::veth_peer_of;
use tracing::warn;

use crate::source::PingSource;
use crate::trimmed_mean::trimmed_mean;

/// Wall-clock collection window per ping batch; matches `wait 10 s` in the
/// reconciliation controller's cost-derivation and telemetry passes.
pub const COLLECTION_WINDOW: Duration = Duration::from_secs(10);

/// One interface to probe: its name and its locally assigned `/30`
/// (`addressCIDR` on the peer, or the veth link network). The peer address
/// probed is the complement of this address within the same `/30`.
#[derive(Debug, Clone, Copy)]
pub struct PingTarget<'a> {
    /// Local interface name, e.g. `netA-7`.
    pub ifname: &'a str,
    /// This node's address and prefix on the link.
    pub local: Ipv4Net,
}

/// Concurrently probes every target for one [`COLLECTION_WINDOW`], then
/// reduces each interface's samples with [`trimmed_mean`].
///
/// A target whose `/30` math fails, or whose prober never produces a
/// sample, maps to `None` — it never aborts the rest of the batch.
pub async fn measure<P: PingSource>(source: &P, ns: &str, targets: &[PingTarget<'_>]) -> HashMap<String, Option<f64>> {
    measure_with_window(source, ns, targets, COLLECTION_WINDOW).await
}

/// [`measure`] with an explicit window, so tests don't have to wait 10 s.
pub async fn measure_with_window<P: PingSource>(
    source: &P,
    ns: &str,
    targets: &[PingTarget<'_>],
    window: Duration,
) -> HashMap<String, Option<f64>> {
    let probes = targets.iter().map(|target| async move {
        let peer = match veth_peer_of(target.local.addr(), target.local) {
            Ok(peer) => peer,
            Err(error) => {
                warn!(ifname = target.ifname, %error, "could not derive peer address, target maps to absent");
                return (target.ifname.to_string(), None);
            }
        };
        let samples = source.collect(ns, peer, window).await;
        (target.ifname.to_string(), trimmed_mean(&samples))
    });

    futures::future::join_all(probes).await.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::fake::FakePingSource;

    #[tokio::test]
    async fn measures_multiple_interfaces_independently() {
        let source = FakePingSource::new();
        let net_a: Ipv4Net = "10.0.0.1/30".parse().unwrap();
        let net_b: Ipv4Net = "10.0.0.5/30".parse().unwrap();
        source.set("netA", "10.0.0.2".parse().unwrap(), vec![10.0, 20.0]).await;
        // netB's peer has no programmed fixture -> absent.

        let targets = [
            PingTarget { ifname: "netA-7", local: net_a },
            PingTarget { ifname: "netA-8", local: net_b },
        ];
        let result = measure_with_window(&source, "netA", &targets, Duration::from_millis(1)).await;

        assert_eq!(result.get("netA-7").copied().flatten(), Some(15.0));
        assert_eq!(result.get("netA-8").copied().flatten(), None);
    }

    #[tokio::test]
    async fn failed_spawn_does_not_abort_the_batch() {
        let source = FakePingSource::new();
        let net_a: Ipv4Net = "10.0.0.1/30".parse().unwrap();
        source.set("netA", "10.0.0.2".parse().unwrap(), vec![]).await;

        let targets = [PingTarget { ifname: "netA-7", local: net_a }];
        let result = measure_with_window(&source, "netA", &targets, Duration::from_millis(1)).await;
        assert_eq!(result.get("netA-7").copied().flatten(), None);
    }
}

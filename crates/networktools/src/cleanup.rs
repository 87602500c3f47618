//! Startup cleanup sweep: tears down everything a previous run may have
//! left behind before the service loop starts ticking.
//!
//! Run once, before the first reconciliation tick, so a restart always
//! begins from the same clean slate a fresh namespace would — the tick
//! itself only ever builds on top of what it finds, it never sweeps.

use netctl_container::ContainerRuntime;
use netctl_iptables::IptablesManager;
use netctl_link::LinkBackend;
use tracing::{info, warn};

use crate::error::NetworktoolsError;
use crate::veth;

/// `(table, chain)` pairs naming this agent's own root-namespace
/// `{ns}-{chain}` chains, flushed on startup. The in-namespace builtin
/// `FORWARD` chain, which carries the TCPMSS clamp rule (see
/// [`crate::ensure::ensure_prerequisites`]), is a separate target flushed
/// alongside these in [`flush_owned_chains`].
const OWNED_CHAINS: &[(&str, &str)] = &[
    ("nat", "POSTROUTING"),
    ("nat", "PREROUTING"),
    ("raw", "PREROUTING"),
    ("mangle", "OUTPUT"),
    ("mangle", "POSTROUTING"),
    ("filter", "FORWARD"),
    ("filter", "INPUT"),
];

async fn destroy_all_wireguard<L: LinkBackend>(link: &L, ns: &str) -> Result<(), NetworktoolsError> {
    let observed = link.dump_all_wireguard(ns).await?;
    for ifname in observed.keys() {
        info!(ns, ifname, "destroying wireguard device during startup cleanup");
        link.try_destroy(ns, ifname).await?;
    }
    Ok(())
}

async fn destroy_veth<L: LinkBackend>(link: &L, ns: &str) -> Result<(), NetworktoolsError> {
    link.try_destroy(ns, &veth::host_ifname(ns)).await?;
    Ok(())
}

async fn flush_owned_chains(ns: &str) -> Result<(), NetworktoolsError> {
    let root = IptablesManager::new("");
    for (table, chain) in OWNED_CHAINS {
        let owned = format!("{ns}-{chain}");
        root.flush(table, &owned).await;
    }
    IptablesManager::new(ns).flush("filter", "FORWARD").await;
    Ok(())
}

async fn remove_router_container<C: ContainerRuntime>(container: &C, ns: &str, temp_dir: &str) -> Result<(), NetworktoolsError> {
    match container.shutdown(ns, Some(temp_dir)).await {
        Ok(()) => Ok(()),
        Err(error) => {
            warn!(ns, %error, "router container shutdown during cleanup failed, continuing");
            Ok(())
        }
    }
}

/// Sweeps every resource this agent could have left behind for `ns`:
/// WireGuard devices, the local veth pair, its owned iptables chains, and
/// the routing-daemon container (plus its bind-mount temp directory).
///
/// # Errors
///
/// Returns [`NetworktoolsError`] if a device teardown fails for a reason
/// other than "already gone". Container shutdown failures are logged and
/// swallowed, since a missing or already-stopped container is the common
/// case on a fresh namespace.
pub async fn cleanup_namespace<L: LinkBackend, C: ContainerRuntime>(
    link: &L,
    container: &C,
    ns: &str,
    temp_dir: &str,
) -> Result<(), NetworktoolsError> {
    info!(ns, "running startup cleanup sweep");
    destroy_all_wireguard(link, ns).await?;
    destroy_veth(link, ns).await?;
    flush_owned_chains(ns).await?;
    remove_router_container(container, ns, temp_dir).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use ipnet::Ipv4Net;
    use netctl_container::FakeContainerRuntime;
    use netctl_link::FakeLinkBackend;

    use super::*;

    #[tokio::test]
    async fn destroys_every_wireguard_device_and_the_veth_pair() {
        let link = FakeLinkBackend::new();
        let cidr: Ipv4Net = "10.0.0.1/30".parse().unwrap();
        link.create_wireguard("netA", "netA-7", cidr, 1420).await.unwrap();
        link.create_veth("netA", "netA-veth", "10.9.0.0/30".parse().unwrap()).await.unwrap();
        let container = FakeContainerRuntime::new();

        cleanup_namespace(&link, &container, "netA", "/tmp/networktools-netA").await.expect("cleanup");

        assert!(!link.contains("netA", "netA-7").await);
        assert!(link.get_interface_state("", "netA-veth0").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn a_clean_namespace_with_no_container_is_a_noop() {
        let link = FakeLinkBackend::new();
        let container = FakeContainerRuntime::new();

        let result = cleanup_namespace(&link, &container, "netA", "/tmp/networktools-netA").await;
        assert!(result.is_ok());
    }
}

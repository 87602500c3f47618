//! Step 6: the local veth pair and its five tagged iptables rules.
//!
//! Like the exit-node rule, every rule here lives in the root namespace's
//! `{ns}-*` chains: the host side of the pair (`{ns}-veth0`) is the thing
//! those rules actually match on.

use ipnet::Ipv4Net;
use netctl_iptables::{tags, IptablesManager};
use netctl_link::LinkBackend;
use tracing::info;

use crate::diff::{veth_diff, VethAction};
use crate::error::NetworktoolsError;

const VETH_BASE_SUFFIX: &str = "veth";

/// The host-side veth interface name for `ns` (`{ns}-veth0`).
#[must_use]
pub fn host_ifname(ns: &str) -> String {
    format!("{ns}-{VETH_BASE_SUFFIX}0")
}

/// The namespace-side veth interface name for `ns` (`{ns}-veth1`).
#[must_use]
pub fn ns_ifname(ns: &str) -> String {
    format!("{ns}-{VETH_BASE_SUFFIX}1")
}

/// Reconciles the local veth pair against whether `desired_cidr` calls for
/// one.
///
/// # Errors
///
/// Returns [`NetworktoolsError`] if device or rule operations fail.
pub async fn sync_veth<L: LinkBackend>(
    link: &L,
    ns: &str,
    eth_name: &str,
    desired_cidr: Option<Ipv4Net>,
) -> Result<(), NetworktoolsError> {
    let base = format!("{ns}-{VETH_BASE_SUFFIX}");
    let observed = link.get_interface_state("", &host_ifname(ns)).await?.is_some();

    match veth_diff(observed, desired_cidr.is_some()) {
        VethAction::Noop => {}
        VethAction::Create => {
            let cidr = desired_cidr.ok_or_else(|| {
                NetworktoolsError::Invariant("veth create requested with no desired CIDR".to_string())
            })?;
            info!(ns, %cidr, "creating local veth pair");
            link.create_veth(ns, &base, cidr).await?;
            install_veth_rules(link, ns, eth_name, cidr).await?;
        }
        VethAction::Destroy => {
            info!(ns, "destroying local veth pair");
            link.try_destroy(ns, &host_ifname(ns)).await?;
            purge_veth_rules(ns).await?;
        }
    }
    Ok(())
}

async fn install_veth_rules<L: LinkBackend>(link: &L, ns: &str, eth_name: &str, cidr: Ipv4Net) -> Result<(), NetworktoolsError> {
    let uplink = link.get_interface_state("", eth_name).await?;
    let uplink_ip = uplink
        .and_then(|state| state.address)
        .ok_or_else(|| NetworktoolsError::Invariant(format!("uplink interface {eth_name} has no IPv4 address")))?
        .addr();
    let root = IptablesManager::new("");
    let nat_chain = format!("{ns}-POSTROUTING");
    let forward_chain = format!("{ns}-FORWARD");
    let input_chain = format!("{ns}-INPUT");
    let network = cidr.to_string();
    let comment = tags::local_veth_comment_args();
    let comment_args: Vec<&str> = comment.iter().map(String::as_str).collect();

    let mut accept_intra: Vec<&str> = vec!["-s", &network, "-d", &network, "-j", "ACCEPT"];
    accept_intra.extend(comment_args.iter().copied());
    root.append_if_missing("nat", &nat_chain, &accept_intra).await?;

    let uplink_ip = uplink_ip.to_string();
    let mut snat: Vec<&str> = vec![
        "-s", &network, "!", "-d", "224.0.0.0/4", "-o", eth_name, "-j", "SNAT", "--to-source", &uplink_ip,
    ];
    snat.extend(comment_args.iter().copied());
    root.append_if_missing("nat", &nat_chain, &snat).await?;

    let mut forward: Vec<&str> = vec!["-s", &network, "-d", &network, "-j", "ACCEPT"];
    forward.extend(comment_args.iter().copied());
    root.append_if_missing("filter", &forward_chain, &forward).await?;

    let mut ospf_input: Vec<&str> = vec!["-s", &network, "-p", "ospf", "-j", "ACCEPT"];
    ospf_input.extend(comment_args.iter().copied());
    root.append_if_missing("filter", &input_chain, &ospf_input).await?;

    let mut bfd_input: Vec<&str> = vec!["-s", &network, "-p", "udp", "--dport", "3784:3785", "-j", "ACCEPT"];
    bfd_input.extend(comment_args.iter().copied());
    root.append_if_missing("filter", &input_chain, &bfd_input).await?;

    Ok(())
}

async fn purge_veth_rules(ns: &str) -> Result<(), NetworktoolsError> {
    let root = IptablesManager::new("");
    root.purge_tagged("nat", &format!("{ns}-POSTROUTING"), tags::LOCAL_VETH).await?;
    root.purge_tagged("filter", &format!("{ns}-FORWARD"), tags::LOCAL_VETH).await?;
    root.purge_tagged("filter", &format!("{ns}-INPUT"), tags::LOCAL_VETH).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ifnames_follow_the_documented_convention() {
        assert_eq!(host_ifname("netA"), "netA-veth0");
        assert_eq!(ns_ifname("netA"), "netA-veth1");
    }
}

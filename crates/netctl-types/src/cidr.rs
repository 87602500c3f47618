use ipnet::Ipv4Net;
use std::net::Ipv4Addr;

/// Errors from veth `/30` addressing math.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CidrError {
    /// The supplied network was not a `/30`.
    #[error("expected a /30 network, got /{prefix}")]
    NotSlash30 {
        /// The prefix length actually supplied.
        prefix: u8,
    },
}

/// Derives the host-side and namespace-side addresses for a veth `/30`
/// link: given network `N`, host = `N+1`, namespace = `N+2`. These are the
/// only two usable addresses in the block.
///
/// # Errors
///
/// Returns [`CidrError::NotSlash30`] if `net` isn't a `/30`.
pub fn veth_host_ns(net: Ipv4Net) -> Result<(Ipv4Addr, Ipv4Addr), CidrError> {
    if net.prefix_len() != 30 {
        return Err(CidrError::NotSlash30 { prefix: net.prefix_len() });
    }
    let network = u32::from(net.network());
    Ok((Ipv4Addr::from(network + 1), Ipv4Addr::from(network + 2)))
}

/// Given one address inside a `/30` veth link, returns the other ("peer")
/// address in the same block: the host address maps to the namespace
/// address and vice versa.
///
/// # Errors
///
/// Returns [`CidrError::NotSlash30`] if `net` isn't a `/30`, or if `addr` is
/// neither of the block's two usable addresses.
pub fn veth_peer_of(addr: Ipv4Addr, net: Ipv4Net) -> Result<Ipv4Addr, CidrError> {
    let (host, ns) = veth_host_ns(net)?;
    if addr == host {
        Ok(ns)
    } else if addr == ns {
        Ok(host)
    } else {
        Err(CidrError::NotSlash30 { prefix: net.prefix_len() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_is_network_plus_one_ns_is_network_plus_two() {
        let net: Ipv4Net = "10.0.0.0/30".parse().unwrap();
        let (host, ns) = veth_host_ns(net).unwrap();
        assert_eq!(host, Ipv4Addr::new(10, 0, 0, 1));
        assert_eq!(ns, Ipv4Addr::new(10, 0, 0, 2));
    }

    #[test]
    fn rejects_non_slash_30() {
        let net: Ipv4Net = "10.0.0.0/29".parse().unwrap();
        assert!(veth_host_ns(net).is_err());
    }

    #[test]
    fn peer_of_host_is_ns_and_vice_versa() {
        let net: Ipv4Net = "10.0.0.4/30".parse().unwrap();
        let host = Ipv4Addr::new(10, 0, 0, 5);
        let ns = Ipv4Addr::new(10, 0, 0, 6);
        assert_eq!(veth_peer_of(host, net).unwrap(), ns);
        assert_eq!(veth_peer_of(ns, net).unwrap(), host);
    }

    #[test]
    fn any_slash_30_network_has_exactly_these_two_usable_hosts() {
        for base in [0u32, 4, 8, 252].iter() {
            let net = Ipv4Net::new(Ipv4Addr::from(*base), 30).unwrap();
            let (host, ns) = veth_host_ns(net).unwrap();
            assert_eq!(u32::from(host), base + 1);
            assert_eq!(u32::from(ns), base + 2);
        }
    }
}

use std::collections::HashMap;

use ipnet::Ipv4Net;

/// Observed state of a local network interface, from `ip -j addr show`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservedInterfaceState {
    /// Interface name.
    pub name: String,
    /// Interface MTU.
    pub mtu: u32,
    /// Primary IPv4 address with prefix length, if assigned.
    pub address: Option<Ipv4Net>,
}

/// Observed runtime state of a WireGuard interface, from `wg show ... dump`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ObservedWireGuardState {
    /// Base64-encoded private key, if present (omitted by `wg show` for
    /// non-root callers, but this agent always runs with root/namespace
    /// privilege).
    pub private_key: Option<String>,
    /// Base64-encoded public key.
    pub public_key: Option<String>,
    /// UDP listen port.
    pub listen_port: u16,
    /// Firewall mark, `0` if unset (`wg` reports this as `off`).
    pub fwmark: u32,
    /// Peer table keyed by the peer's public key.
    pub peers: HashMap<String, ObservedPeerState>,
}

/// One row of a WireGuard interface's runtime peer table.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ObservedPeerState {
    /// Resolved endpoint, if the peer has ever been reachable.
    pub endpoint: Option<String>,
    /// Allowed-IPs list as configured on the interface.
    pub allowed_ips: Vec<String>,
    /// Unix timestamp of the most recent handshake, `0` if none yet.
    pub latest_handshake: u64,
    /// Bytes received from this peer.
    pub rx_bytes: u64,
    /// Bytes transmitted to this peer.
    pub tx_bytes: u64,
    /// Persistent-keepalive interval in seconds, if set.
    pub persistent_keepalive: Option<u16>,
}

use std::collections::HashMap;

use ipnet::Ipv4Net;
use netctl_types::{ObservedInterfaceState, ObservedWireGuardState};

use crate::LinkError;

/// Inputs to [`LinkBackend::assign_wireguard`].
#[derive(Debug, Clone)]
pub struct AssignWireguardParams<'a> {
    /// Base64-encoded private key to install on the interface.
    pub private: &'a str,
    /// UDP listen port, if the interface should bind one.
    pub listen_port: Option<u16>,
    /// The single peer's public key, if a peer should be configured.
    pub peer_public: Option<&'a str>,
    /// `host:port` or `[v6]:port` endpoint to dial, resolved before use.
    pub endpoint: Option<&'a str>,
    /// Persistent-keepalive interval in seconds.
    pub keepalive: Option<u16>,
    /// Allowed-IPs list for the peer.
    pub allowed_ips: Option<&'a [String]>,
}

/// Abstracts device creation/inspection so the reconciliation logic can run
/// against a process-invoking production backend or an in-memory fake,
/// mirroring the trait-plus-fake split used elsewhere in this codebase for
/// interface management — just backed by process invocation here instead of
/// a netlink client.
#[allow(async_fn_in_trait)]
pub trait LinkBackend {
    /// Creates a WireGuard device in the root namespace, moves it into
    /// `ns`, assigns `addr_cidr`, and sets `mtu`.
    async fn create_wireguard(&self, ns: &str, name: &str, addr_cidr: Ipv4Net, mtu: u16) -> Result<(), LinkError>;

    /// Configures private key, listen port, and optional single peer on an
    /// existing WireGuard device.
    async fn assign_wireguard(&self, ns: &str, name: &str, params: AssignWireguardParams<'_>) -> Result<(), LinkError>;

    /// Brings a device up.
    async fn up(&self, ns: &str, name: &str) -> Result<(), LinkError>;

    /// Creates a veth pair: `{base_name}0` in the root namespace,
    /// `{base_name}1` moved into `ns`; addresses derived per
    /// [`netctl_types::veth_host_ns`]; both ends brought up.
    async fn create_veth(&self, ns: &str, base_name: &str, cidr: Ipv4Net) -> Result<(), LinkError>;

    /// Deletes `name` from `ns` iff it currently exists.
    async fn try_destroy(&self, ns: &str, name: &str) -> Result<(), LinkError>;

    /// Dumps runtime state for every WireGuard device in `ns`.
    async fn dump_all_wireguard(&self, ns: &str) -> Result<HashMap<String, ObservedWireGuardState>, LinkError>;

    /// Dumps runtime state for one WireGuard device, `None` if absent.
    async fn dump_wireguard(&self, ns: &str, name: &str) -> Result<Option<ObservedWireGuardState>, LinkError>;

    /// Reads the address/MTU state of any interface, `None` if absent.
    async fn get_interface_state(&self, ns: &str, name: &str) -> Result<Option<ObservedInterfaceState>, LinkError>;
}

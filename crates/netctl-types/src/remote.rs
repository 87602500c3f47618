use serde::{Deserialize, Serialize};

/// Desired per-node configuration fetched from the controller each tick.
///
/// The wire payload carries additional fields the core does not consume;
/// `serde(default)` plus ignoring unknown fields on deserialize keeps this
/// struct from breaking when the controller adds new ones.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RemoteNodeInfo {
    /// Whether this node should masquerade egress traffic for the uplink.
    #[serde(default)]
    pub exit_node: bool,
    /// CIDR for the local veth pair, if one is desired.
    #[serde(default)]
    pub veth_cidr: Option<String>,
    /// OSPF area this node's veth should join, if configured.
    #[serde(default)]
    pub ospf: Option<RemoteOspfConfig>,
}

/// OSPF participation for the node-level veth interface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteOspfConfig {
    /// OSPF area identifier, e.g. `"0"`.
    pub area: String,
    /// Static link cost for the veth interface.
    pub cost: u32,
    /// Optional authentication key material.
    #[serde(default)]
    pub auth: Option<String>,
}

/// Desired configuration for one mesh peer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemotePeerInfo {
    /// Peer identifier; the local interface is named `{namespace}-{id}`.
    pub id: u32,
    /// Selects which local private key half to use (matched by public key).
    pub public_key: String,
    /// The peer's WireGuard public key.
    pub peer_public_key: String,
    /// The `/30` link network for this peer, e.g. `"10.0.0.1/30"`.
    pub address_cidr: String,
    /// UDP listen port; `0` means dynamic (no inbound ACCEPT rule needed).
    pub listen_port: u16,
    /// Interface MTU.
    pub mtu: u16,
    /// WireGuard persistent-keepalive interval in seconds.
    pub keepalive: u16,
    /// `host:port` or `[v6]:port` endpoint to dial.
    pub endpoint: String,
    /// Free-form per-peer extras. A parse failure on this field must not
    /// invalidate the rest of the peer record.
    #[serde(default)]
    pub extra: Option<RemotePeerExtra>,
}

/// Tagged-union extras attached to a peer. Parsed leniently: if the raw JSON
/// blob fails to deserialize into this shape the caller maps the whole
/// field to `None` rather than rejecting the peer.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RemotePeerExtra {
    /// OSPF cost-derivation hints for this peer's link.
    #[serde(default)]
    pub ospf: Option<PeerOspfExtra>,
    /// Underlay relay configuration, if the native endpoint is unreachable.
    #[serde(default)]
    pub underlay: Option<PeerUnderlayExtra>,
}

/// Per-peer OSPF cost inputs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PeerOspfExtra {
    /// Baseline cost used when no ping measurement is available.
    #[serde(default)]
    pub cost: Option<u32>,
    /// Whether to prefer a measured ping over `cost`.
    #[serde(default)]
    pub ping: bool,
    /// Offset added to the baseline cost before clamping.
    #[serde(default)]
    pub offset: i32,
}

/// Per-peer underlay relay configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeerUnderlayExtra {
    /// Which relay role this node plays for the peer.
    pub provider: UnderlayProvider,
    /// Relay listen port.
    pub listen_port: u16,
    /// Relay server address, used only in client mode; empty means "resolve
    /// the peer's endpoint host via DNS instead".
    #[serde(default)]
    pub server_addr: Option<String>,
    /// Relay server port, used only in client mode.
    #[serde(default)]
    pub server_port: Option<u16>,
}

/// Relay role requested for a peer's underlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnderlayProvider {
    /// This node dials the relay server.
    GostRelayClient,
    /// This node accepts relayed connections.
    GostRelayServer,
}

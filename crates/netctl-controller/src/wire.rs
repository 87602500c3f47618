//! Wire-format DTOs for the controller API that don't belong in
//! `netctl-types` because they're artifacts of the transport (string-wrapped
//! JSON, snake-case telemetry schemas) rather than the shared domain model.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use netctl_routing::OspfState;
use netctl_types::{RemotePeerExtra, RemotePeerInfo};

/// `GET /api/v1/node/config` wraps the actual config as a JSON string
/// rather than an inline object.
#[derive(Debug, Deserialize)]
pub(crate) struct ConfigEnvelope {
    pub config: String,
}

/// `GET /api/v1/node/peers` envelope.
#[derive(Debug, Deserialize)]
pub(crate) struct PeersEnvelope {
    pub peers: Vec<RemotePeerInfoRaw>,
}

/// A peer record as received on the wire, before `extra` has been parsed.
///
/// `extra` is parsed leniently: a JSON blob that doesn't match
/// [`RemotePeerExtra`]'s shape degrades the peer's `extra` field to `None`
/// rather than rejecting the whole peer record.
#[derive(Debug, Deserialize)]
pub(crate) struct RemotePeerInfoRaw {
    pub id: u32,
    pub public_key: String,
    pub peer_public_key: String,
    pub address_cidr: String,
    pub listen_port: u16,
    pub mtu: u16,
    pub keepalive: u16,
    pub endpoint: String,
    #[serde(default)]
    pub extra: Option<Value>,
}

impl RemotePeerInfoRaw {
    /// Converts to the in-memory [`RemotePeerInfo`], tolerating a
    /// malformed `extra` blob.
    pub(crate) fn into_peer_info(self) -> RemotePeerInfo {
        let extra = self.extra.and_then(|value| match serde_json::from_value::<RemotePeerExtra>(value) {
            Ok(extra) => Some(extra),
            Err(error) => {
                tracing::warn!(peer_id = self.id, %error, "peer extra did not match the expected shape, ignoring");
                None
            }
        });

        RemotePeerInfo {
            id: self.id,
            public_key: self.public_key,
            peer_public_key: self.peer_public_key,
            address_cidr: self.address_cidr,
            listen_port: self.listen_port,
            mtu: self.mtu,
            keepalive: self.keepalive,
            endpoint: self.endpoint,
            extra,
        }
    }
}

/// `POST /api/v1/node/sync_wireguard_keys` body.
#[derive(Debug, Serialize)]
pub(crate) struct SyncWireguardKeysRequest<'a> {
    pub keys: &'a [String],
}

/// One interface's freshly measured link telemetry.
#[derive(Debug, Clone, Copy)]
pub struct LinkTelemetry {
    /// The remote peer id this link carries traffic for.
    pub id: u32,
    /// Measured round-trip time in milliseconds, `None` if no sample.
    pub ping_ms: Option<f64>,
    /// Bytes received from the peer.
    pub rx: u64,
    /// Bytes transmitted to the peer.
    pub tx: u64,
}

/// Wire encoding of [`LinkTelemetry`]: absent ping becomes `-1` rather than
/// `null`, per the endpoint's documented contract.
#[derive(Debug, Serialize)]
struct WireLinkTelemetry {
    id: u32,
    ping: f64,
    rx: u64,
    tx: u64,
}

impl From<LinkTelemetry> for WireLinkTelemetry {
    fn from(link: LinkTelemetry) -> Self {
        Self { id: link.id, ping: link.ping_ms.unwrap_or(-1.0), rx: link.rx, tx: link.tx }
    }
}

/// `POST /api/v1/node/link_telemetry` body.
#[derive(Debug, Serialize)]
pub(crate) struct LinkTelemetryRequest {
    pub links: Vec<WireLinkTelemetry>,
}

impl LinkTelemetryRequest {
    pub(crate) fn from_links(links: &[LinkTelemetry]) -> Self {
        Self { links: links.iter().copied().map(WireLinkTelemetry::from).collect() }
    }
}

/// A `vlink`/`router` adjacency on the wire.
#[derive(Debug, Serialize)]
struct WireAdjacency {
    id: String,
    metric: u32,
}

/// A `stubnet`/`xnetwork` entry on the wire.
#[derive(Debug, Serialize)]
struct WireNetwork {
    network: String,
    metric: u32,
}

/// An `external`/`nssa-ext` entry on the wire.
#[derive(Debug, Serialize)]
struct WireExternal {
    network: String,
    metric: u32,
    metric_type: u8,
    via: Option<String>,
    tag: Option<String>,
}

/// Snake-case wire form of [`netctl_types::RouterInfo`]; field names already
/// match Rust convention so no `rename_all` is needed to get snake_case on
/// the wire.
#[derive(Debug, Serialize)]
struct WireRouterInfo {
    router_id: String,
    distance: Option<u32>,
    vlinks: Vec<WireAdjacency>,
    routers: Vec<WireAdjacency>,
    stubnets: Vec<WireNetwork>,
    xnetworks: Vec<WireNetwork>,
    xrouters: Vec<WireNetwork>,
    externals: Vec<WireExternal>,
    nssa_externals: Vec<WireExternal>,
}

impl From<&netctl_types::RouterInfo> for WireRouterInfo {
    fn from(info: &netctl_types::RouterInfo) -> Self {
        Self {
            router_id: info.router_id.clone(),
            distance: info.distance,
            vlinks: info.vlinks.iter().map(|e| WireAdjacency { id: e.id.clone(), metric: e.metric }).collect(),
            routers: info.routers.iter().map(|e| WireAdjacency { id: e.id.clone(), metric: e.metric }).collect(),
            stubnets: info
                .stubnets
                .iter()
                .map(|e| WireNetwork { network: e.network.clone(), metric: e.metric })
                .collect(),
            xnetworks: info
                .xnetworks
                .iter()
                .map(|e| WireNetwork { network: e.network.clone(), metric: e.metric })
                .collect(),
            xrouters: info
                .xrouters
                .iter()
                .map(|e| WireNetwork { network: e.network.clone(), metric: e.metric })
                .collect(),
            externals: info
                .externals
                .iter()
                .map(|e| WireExternal {
                    network: e.network.clone(),
                    metric: e.metric,
                    metric_type: e.metric_type,
                    via: e.via.clone(),
                    tag: e.tag.clone(),
                })
                .collect(),
            nssa_externals: info
                .nssa_externals
                .iter()
                .map(|e| WireExternal {
                    network: e.network.clone(),
                    metric: e.metric,
                    metric_type: e.metric_type,
                    via: e.via.clone(),
                    tag: e.tag.clone(),
                })
                .collect(),
        }
    }
}

/// `POST /api/v1/node/router_telemetry` body.
#[derive(Debug, Serialize)]
pub(crate) struct RouterTelemetryRequest {
    area_routers: HashMap<String, Vec<WireRouterInfo>>,
    other_asbrs: Vec<WireRouterInfo>,
}

impl RouterTelemetryRequest {
    pub(crate) fn from_state(state: &OspfState) -> Self {
        Self {
            area_routers: state
                .area_routers
                .iter()
                .map(|(area, routers)| (area.clone(), routers.iter().map(WireRouterInfo::from).collect()))
                .collect(),
            other_asbrs: state.other_asbrs.iter().map(WireRouterInfo::from).collect(),
        }
    }
}

/// `POST /api/v1/node/join` request body.
///
/// The distilled endpoint list names only the route, not its payload; this
/// shape carries what the init flow already knows about the node before a
/// `node_id` has been assigned; see `DESIGN.md` for the reasoning.
#[derive(Debug, Serialize)]
pub struct JoinRequest<'a> {
    /// The namespace this node will manage.
    pub namespace: &'a str,
    /// The host uplink interface this node will use for exit-node traffic.
    pub eth_name: &'a str,
}

/// `POST /api/v1/node/join` response body.
#[derive(Debug, Clone, Deserialize)]
pub struct JoinResponse {
    /// The node identifier assigned by the controller.
    pub node_id: u64,
}

//! Shared data model for the networktools agent.
//!
//! Every other crate in this workspace depends on this one and nothing else
//! in the reverse direction: these types carry no process-invocation,
//! persistence, or HTTP-client baggage, so tests elsewhere can build fixtures
//! without pulling in I/O.

mod cidr;
mod observed;
mod optional;
mod remote;
mod router;
mod settings;
mod underlay;

pub use cidr::{veth_host_ns, veth_peer_of, CidrError};
pub use observed::{ObservedInterfaceState, ObservedPeerState, ObservedWireGuardState};
pub use optional::non_empty;
pub use remote::{
    PeerOspfExtra, PeerUnderlayExtra, RemoteNodeInfo, RemoteOspfConfig, RemotePeerExtra,
    RemotePeerInfo, UnderlayProvider,
};
pub use router::{ExternalEntry, RouterInfo, StubnetEntry, VlinkEntry, XnetworkEntry};
pub use settings::{NodeSettings, WireGuardKeyPair};
pub use underlay::LocalUnderlayState;

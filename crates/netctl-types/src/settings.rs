use serde::{Deserialize, Serialize};

/// Persistent, one-per-node configuration written by the init flow and read
/// by every reconciliation pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeSettings {
    /// Linux network namespace name this agent manages.
    pub namespace: String,
    /// Host uplink interface used for exit-node masquerading.
    pub eth_name: String,
    /// Hex-encoded raw Ed25519 private key used to sign controller requests.
    pub private_key: String,
    /// Node identifier assigned by the controller on cluster join.
    pub node_id: u64,
    /// Base URL of the controller API.
    pub domain_prefix: String,
}

/// A pre-generated WireGuard key pair held in the local key pool.
///
/// Keys are generated by shelling out to `wg genkey` / `wg pubkey` rather
/// than via in-process key derivation, since the on-disk pool must contain
/// exactly the key material `wg` itself produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireGuardKeyPair {
    /// Base64-encoded private key.
    pub private: String,
    /// Base64-encoded public key, derived from `private`. Unique across the pool.
    pub public: String,
}

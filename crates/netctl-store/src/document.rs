use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use netctl_types::WireGuardKeyPair;

/// One `simplekv` row: an opaque JSON-encoded value plus an optional
/// expiry. `expires` is a Unix timestamp in seconds; `None` means the
/// entry never expires.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimpleKvEntry {
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub expires: Option<i64>,
}

/// The full on-disk document: three top-level maps mirroring the
/// `nodeconfig`, `wgkey`, and `simplekv` tables.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub nodeconfig: HashMap<String, String>,
    #[serde(default)]
    pub wgkey: Vec<WireGuardKeyPair>,
    #[serde(default)]
    pub simplekv: HashMap<String, SimpleKvEntry>,
}

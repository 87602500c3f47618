/// A parsed OSPF LSDB entry for one router, as reported by
/// `birdc show ospf state all`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RouterInfo {
    /// Router ID, e.g. `"1.1.1.1"`.
    pub router_id: String,
    /// Distance reported for this router.
    pub distance: Option<u32>,
    /// Virtual link entries.
    pub vlinks: Vec<VlinkEntry>,
    /// Adjacent router entries (router-to-router links).
    pub routers: Vec<VlinkEntry>,
    /// Directly attached stub networks.
    pub stubnets: Vec<StubnetEntry>,
    /// Transit networks this router advertises.
    pub xnetworks: Vec<XnetworkEntry>,
    /// Other ASBRs reachable via this router.
    pub xrouters: Vec<XnetworkEntry>,
    /// Type-5 external routes.
    pub externals: Vec<ExternalEntry>,
    /// Type-7 NSSA external routes.
    pub nssa_externals: Vec<ExternalEntry>,
}

/// A `vlink`/`router` adjacency line: `<id> metric <m>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VlinkEntry {
    /// Router ID or virtual-link endpoint identifier.
    pub id: String,
    /// Metric advertised for this adjacency.
    pub metric: u32,
}

/// A `stubnet`/`xnetwork` line: `<network> metric <m>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StubnetEntry {
    /// Network in CIDR form.
    pub network: String,
    /// Advertised metric.
    pub metric: u32,
}

/// A transit network or ASBR entry: `<network-or-id> metric <m>`.
pub type XnetworkEntry = StubnetEntry;

/// An `external`/`nssa-ext` line, which carries optional type-2 metric,
/// forwarding address, and route tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalEntry {
    /// Network in CIDR form.
    pub network: String,
    /// Advertised metric.
    pub metric: u32,
    /// `2` if the `metric2` token was present, else `1`.
    pub metric_type: u8,
    /// Forwarding address from the `via` token, if present.
    pub via: Option<String>,
    /// Route tag from the `tag` token, if present.
    pub tag: Option<String>,
}

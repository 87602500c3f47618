//! Node-local persistent state: settings, the WireGuard key pool, and
//! underlay-worker records.
//!
//! Everything lives in one JSON document on disk, mirroring the three
//! tables (`nodeconfig`, `wgkey`, `simplekv`) the original relational
//! schema described, written atomically (temp file plus rename) on every
//! mutation rather than through an embedded SQL engine this agent has no
//! other use for.

mod document;
mod error;
mod store;

pub use document::{Document, SimpleKvEntry};
pub use error::StoreError;
pub use store::{NodeStore, PartialNodeSettings};

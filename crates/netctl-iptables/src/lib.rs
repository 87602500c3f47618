//! iptables chain and rule reconciliation.
//!
//! Every rule this agent authors is comment-tagged (`#local_veth#` or
//! `#peer_{ifname}#`) so deletion scans can identify it unambiguously; see
//! [`tags`] for the shared tag constants and builders.

mod dump;
mod error;
mod manager;
pub mod tags;

pub use dump::{parse_dump, DumpedRule, IptablesDump};
pub use error::IptablesError;
pub use manager::IptablesManager;

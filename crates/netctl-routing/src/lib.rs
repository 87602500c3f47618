//! OSPF telemetry parsing and routing-daemon configuration rendering.
//!
//! Two independent pure-data transforms live here: [`parse_ospf_state`]
//! turns `birdc show ospf state all` text into a typed tree for telemetry
//! reporting, and [`render`] turns a structured routing intent into the
//! BIRD-style configuration text the container-managed routing daemon
//! consumes. Neither touches a process or the filesystem; callers own I/O.

mod error;
mod parser;
mod render;

pub use error::OspfParseError;
pub use parser::{parse_ospf_state, OspfState};
pub use render::{render, BfdInterfaceConfig, OspfInterfaceConfig, RoutingConfig};

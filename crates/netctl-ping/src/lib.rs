//! Concurrent multi-interface ICMP liveness probing.
//!
//! Each WireGuard or veth link gets one long-running `ping -D -n -i 1 -r`
//! prober; all probers for a tick run concurrently for a fixed wall-clock
//! window and are unconditionally killed when it elapses, then each
//! interface's samples are reduced with a trimmed mean. This is the one
//! true fan-out point in the agent — everywhere else reconciliation is
//! strictly sequential.

mod aggregator;
mod error;
mod fake;
mod parse;
mod process_source;
mod source;
mod trimmed_mean;

pub use aggregator::{measure, measure_with_window, PingTarget, COLLECTION_WINDOW};
pub use error::PingError;
pub use fake::FakePingSource;
pub use parse::parse_ping_line;
pub use process_source::ProcessPingSource;
pub use source::PingSource;
pub use trimmed_mean::trimmed_mean;

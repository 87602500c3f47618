//! Lifecycle management for `gost` relay-worker processes.
//!
//! When two peers can't reach each other directly, a relay worker forwards
//! WireGuard traffic through a `relay+tls` tunnel. This crate starts and
//! stops the host-supervised units that run `gost` in either direction;
//! it does not decide when a relay is needed or persist which peers have
//! one — that's the reconciliation controller's job, against this crate's
//! [`RelayManager`].

mod error;
mod fake;
mod manager;
mod supervisor;

pub use error::RelayError;
pub use fake::{FakeSupervisor, StartedUnit};
pub use manager::RelayManager;
pub use supervisor::{Supervisor, SystemdSupervisor};

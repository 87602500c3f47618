//! Top-level error type the reconciliation controller and CLI propagate to.
//!
//! Every sub-crate's error type folds into this one at the tick boundary
//! (see §7 of the design notes this agent implements: everything but the
//! explicitly best-effort operations bubbles up and aborts the current
//! tick). Only [`NetworktoolsError::MissingNodeSettings`] is fatal at
//! startup; every other variant is caught and logged by the service loop.

use thiserror::Error;

/// Errors raised anywhere in the reconciliation pipeline or the CLI.
#[derive(Debug, Error)]
pub enum NetworktoolsError {
    /// The persistent store could not be read or written.
    #[error(transparent)]
    Store(#[from] netctl_store::StoreError),

    /// A controller API call failed.
    #[error(transparent)]
    Controller(#[from] netctl_controller::ControllerError),

    /// A WireGuard/veth device operation failed.
    #[error(transparent)]
    Link(#[from] netctl_link::LinkError),

    /// An iptables chain or rule operation failed.
    #[error(transparent)]
    Iptables(#[from] netctl_iptables::IptablesError),

    /// Starting or stopping a relay-worker unit failed.
    #[error(transparent)]
    Relay(#[from] netctl_relay::RelayError),

    /// A routing-daemon container operation failed.
    #[error(transparent)]
    Container(#[from] netctl_container::ContainerError),

    /// The OSPF LSDB dump could not be parsed.
    #[error(transparent)]
    OspfParse(#[from] netctl_routing::OspfParseError),

    /// Veth `/30` addressing math failed.
    #[error(transparent)]
    Cidr(#[from] netctl_types::CidrError),

    /// An allowlisted process invocation failed.
    #[error(transparent)]
    Proc(#[from] netctl_proc::ProcError),

    /// The node's private key did not decode as hex.
    #[error("node private key is not valid hex: {0}")]
    Identity(#[from] hex::FromHexError),

    /// A filesystem operation (temp dir, config write) failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A semantic invariant the reconciliation pipeline depends on was
    /// violated — e.g. no local private key matches a peer's declared
    /// public key, or a peer's link CIDR is a `/32`. Distinct from a
    /// transient process failure: retrying the next tick won't help until
    /// the controller's desired state changes.
    #[error("invariant violation: {0}")]
    Invariant(String),

    /// Node settings were missing or incomplete at startup. The only
    /// variant the service loop treats as fatal rather than log-and-retry.
    #[error("node settings unavailable: {0}")]
    MissingNodeSettings(netctl_store::StoreError),

    /// A CLI argument or interactive init-flow input was invalid.
    #[error("configuration error: {0}")]
    Config(String),
}

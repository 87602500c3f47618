use thiserror::Error;

/// Errors raised by the ping aggregator.
///
/// Per-prober spawn failures never reach the caller of [`crate::measure`] —
/// they are logged and the affected interface maps to `None` instead — so
/// this enum exists mainly for the pure CIDR math that feeds it.
#[derive(Debug, Error)]
pub enum PingError {
    /// The supplied local address/network wasn't a veth-style `/30`, so no
    /// peer address could be derived.
    #[error(transparent)]
    Cidr(#[from] netctl_types::CidrError),
}

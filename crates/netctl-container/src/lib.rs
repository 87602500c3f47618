//! Lifecycle management for the per-namespace routing-daemon container.
//!
//! The routing daemon (`bird`) runs inside a rootless `podman` container
//! joined to the namespace's network stack, with its configuration bind-
//! mounted read-only from a temp directory this agent writes to. The
//! [`ContainerRuntime`] trait keeps the reconciliation controller
//! engine-agnostic; [`ProcessContainerRuntime`] is the real `podman`
//! adapter, [`FakeContainerRuntime`] the in-memory test double.

mod error;
mod fake;
mod inspect;
mod process;
mod runtime;

pub use error::ContainerError;
pub use fake::FakeContainerRuntime;
pub use inspect::ContainerInfo;
pub use process::ProcessContainerRuntime;
pub use runtime::ContainerRuntime;

use crate::{ContainerError, ContainerInfo};

/// Abstracts the container engine running the per-namespace routing
/// daemon so the reconciliation logic stays engine-agnostic and testable
/// against a fake, rather than depending directly on `podman`.
pub trait ContainerRuntime {
    /// Looks up the `{ns}-router` container. Returns `None` if it doesn't
    /// exist.
    ///
    /// # Errors
    ///
    /// Returns [`ContainerError`] if the engine could not be queried.
    async fn inspect(&self, ns: &str) -> Result<Option<ContainerInfo>, ContainerError>;

    /// Creates and starts the `{ns}-router` container, binding
    /// `router_bind_dir` read-only at `/data`. Returns the new container's
    /// ID.
    ///
    /// # Errors
    ///
    /// Returns [`ContainerError`] if creation or the supervised start
    /// fails.
    async fn start(&self, ns: &str, router_bind_dir: &str) -> Result<String, ContainerError>;

    /// Stops and removes the `{ns}-router` container. Stopping the
    /// supervisor unit is best-effort; `clear_temp_dir`, if given, is
    /// removed recursively after removal.
    ///
    /// # Errors
    ///
    /// Returns [`ContainerError`] if the container could not be removed or
    /// the temp directory could not be cleared.
    async fn shutdown(&self, ns: &str, clear_temp_dir: Option<&str>) -> Result<(), ContainerError>;

    /// Runs `birdc configure` inside `container_id` to apply a rewritten
    /// configuration file without restarting the daemon.
    ///
    /// # Errors
    ///
    /// Returns [`ContainerError`] if the exec fails.
    async fn reload(&self, container_id: &str) -> Result<(), ContainerError>;

    /// Runs `birdc show ospf state all` inside `container_id` and returns
    /// its raw stdout, for [`netctl_routing::parse_ospf_state`] to consume.
    ///
    /// # Errors
    ///
    /// Returns [`ContainerError`] if the exec fails.
    async fn ospf_state(&self, container_id: &str) -> Result<String, ContainerError>;
}

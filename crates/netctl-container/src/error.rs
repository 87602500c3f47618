use thiserror::Error;

/// Errors raised managing the per-namespace routing-daemon container.
#[derive(Debug, Error)]
pub enum ContainerError {
    /// The underlying `podman`/supervisor invocation failed.
    #[error(transparent)]
    Process(#[from] netctl_proc::ProcError),

    /// `podman inspect` returned output that didn't match the expected
    /// shape.
    #[error("failed to parse podman inspect output: {detail}")]
    Parse {
        /// What went wrong.
        detail: String,
    },

    /// Removing the namespace's temp bind directory failed.
    #[error("failed to remove temp dir {path}: {source}")]
    TempDirRemoval {
        /// The directory that could not be removed.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

use thiserror::Error;

/// Errors raised by link-device reconciliation.
#[derive(Debug, Error)]
pub enum LinkError {
    /// The underlying `ip`/`wg` invocation failed.
    #[error("link operation failed: {0}")]
    Process(#[from] netctl_proc::ProcError),

    /// `ip -j addr show` or `wg ... dump` output could not be parsed.
    #[error("failed to parse {command} output: {reason}")]
    Parse {
        /// Which command's output failed to parse.
        command: &'static str,
        /// Description of the parse failure.
        reason: String,
    },

    /// A `/30` was required but the supplied network has a different prefix.
    #[error(transparent)]
    Cidr(#[from] netctl_types::CidrError),

    /// The endpoint host could not be resolved to an IP address.
    #[error("failed to resolve endpoint {endpoint}: {source}")]
    EndpointResolution {
        /// The endpoint string that failed to resolve.
        endpoint: String,
        /// Underlying resolution error.
        #[source]
        source: std::io::Error,
    },

    /// A temporary key file could not be written.
    #[error("failed to write temporary key material: {0}")]
    TempFile(std::io::Error),
}

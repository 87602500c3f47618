use thiserror::Error;

/// Errors raised starting or stopping a relay-worker unit.
#[derive(Debug, Error)]
pub enum RelayError {
    /// The supervisor failed to create the unit.
    #[error("failed to start relay unit {unit}: {source}")]
    Start {
        /// The unit name that failed to start.
        unit: String,
        /// Underlying process error.
        #[source]
        source: netctl_proc::ProcError,
    },
}

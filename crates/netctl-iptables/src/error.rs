use thiserror::Error;

/// Errors raised by iptables reconciliation.
#[derive(Debug, Error)]
pub enum IptablesError {
    /// The underlying `iptables`/`iptables-save` invocation failed for a
    /// reason other than the two tolerated "doesn't exist" kernel strings.
    #[error("iptables operation failed: {0}")]
    Process(#[from] netctl_proc::ProcError),

    /// `iptables-save` output could not be parsed.
    #[error("failed to parse iptables-save output: {reason}")]
    DumpParse {
        /// Description of the parse failure.
        reason: String,
    },
}

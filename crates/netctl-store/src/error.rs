use thiserror::Error;

/// Errors raised reading or writing the node's persistent store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The on-disk document could not be read or the atomic write failed.
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The on-disk document, or a value within it, was not valid JSON.
    #[error("store serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// `getNodeSettings` was called before every required field had been
    /// written.
    #[error("node settings incomplete: missing '{field}'")]
    MissingField {
        /// The `nodeconfig` key that was absent.
        field: &'static str,
    },
}

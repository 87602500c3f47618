use thiserror::Error;

/// Errors raised talking to the controller API.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// The request could not be built or sent at all.
    #[error("controller request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// `domain_prefix` did not parse as a base URL.
    #[error("invalid controller URL: {0}")]
    Url(#[from] url::ParseError),

    /// The controller responded with a non-2xx status.
    #[error("controller returned {status} for {endpoint}: {body}")]
    NonSuccess {
        /// The endpoint path that was called.
        endpoint: &'static str,
        /// The HTTP status code.
        status: u16,
        /// The captured response body.
        body: String,
    },

    /// The response body wasn't valid JSON, or didn't match the expected
    /// shape.
    #[error("failed to decode response from {endpoint}: {source}")]
    Decode {
        /// The endpoint path that was called.
        endpoint: &'static str,
        /// Underlying deserialization error.
        #[source]
        source: serde_json::Error,
    },
}

//! Client error types.

use thiserror::Error;

/// Errors produced by a [`crate::Transport`] implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The request could not be sent or the response could not be read.
    #[error("request failed: {0}")]
    Request(String),

    /// The request did not complete within the configured timeout.
    #[error("request timed out")]
    Timeout,

    /// The transport was configured with an unusable base URL.
    #[error("invalid base url: {0}")]
    InvalidUrl(String),
}

/// Errors returned by [`crate::ApiClient`] calls.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// Server rejected the bearer credential (HTTP 401).
    ///
    /// The caller is expected to drop the session and send the user back to
    /// the login view.
    #[error("unauthorized")]
    Unauthorized,

    /// Server answered with a non-success status other than 401.
    #[error("http {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, lossily decoded, `<empty>` if blank.
        body: String,
    },

    /// Network-level failure.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Response body did not match the expected schema.
    #[error("decode error: {0}")]
    Decode(String),

    /// Request could not be built from the given arguments.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl ApiError {
    /// Whether this error is an authorization failure.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized)
    }
}

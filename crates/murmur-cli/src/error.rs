//! CLI error type.

use murmur_client::TransportError;
use murmur_store::StorageError;
use thiserror::Error;

/// Errors surfaced by a CLI invocation.
#[derive(Debug, Error)]
pub enum CliError {
    /// Writing output failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The state file could not be opened.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// The HTTP transport could not be configured.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The command needs a session and none is persisted.
    #[error("not logged in; run `murmur login` first")]
    NotLoggedIn,

    /// The server rejected the credential and the session was dropped.
    #[error("session expired; log in again (redirected to {path})")]
    SessionExpired {
        /// Route the store asked to navigate to.
        path: String,
    },

    /// A read-through request failed; details are in the log.
    #[error("could not load {0}; see log for details")]
    FetchFailed(String),

    /// An argument failed validation.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

//! Persistence seam.
//!
//! The store mirrors a few values into a string key-value store so they
//! survive a restart. The trait is synchronous; writes are best-effort and
//! not grouped, so a crash between two writes can leave keys out of step.

use thiserror::Error;

/// Key holding the session identity as JSON (never the token).
pub const USER_KEY: &str = "user";

/// Key holding the raw bearer token.
pub const TOKEN_KEY: &str = "token";

/// Key holding the unread-count map as JSON.
pub const UNREAD_KEY: &str = "unreadCounts";

/// Storage errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    /// Backing medium could not be read or written.
    #[error("storage I/O error: {0}")]
    Io(String),

    /// Backing medium holds data that cannot be interpreted.
    #[error("storage corrupted: {0}")]
    Corrupted(String),
}

/// Key-value string storage.
///
/// Must be Clone so the store and the navigation guard can consult the same
/// backing storage; implementations share internal state via Arc.
pub trait Storage: Clone + Send + Sync + 'static {
    /// Value stored under `key`. `None` if absent.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove `key`. Removing an absent key is not an error.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

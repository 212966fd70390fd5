//! Observable session state.

use murmur_client::SessionUser;

/// Authenticated identity plus its bearer credential.
///
/// The two halves are always set and cleared together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Logged-in user.
    pub user: SessionUser,
    /// Bearer credential.
    pub token: String,
}

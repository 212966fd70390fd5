//! Live connection handle.

/// Real-time channel owned by the store.
///
/// The store holds at most one handle and closes it on logout. Opening a
/// new channel while one is attached is the caller's business; the store
/// does not enforce exclusivity.
pub trait LiveConnection: Send {
    /// Close the channel. Must tolerate being called on a closed channel.
    fn close(&mut self);
}

//! Chat client store for murmur
//!
//! Single owner of client-side state: session identity and credential, the
//! message list, presence, typing indicators, unread counts, the selected
//! conversation, and the live-connection handle. State changes only through
//! the [`Store`]'s named operations, and every change is reported to
//! subscribed observers synchronously.
//!
//! # Components
//!
//! - [`Store`]: State container and its mutation entry points
//! - [`Storage`]: Key-value persistence seam (survives restarts)
//! - [`Router`]: Navigation guard for authentication-gated routes
//! - [`LiveConnection`]: Handle to the real-time channel owned by the store
//! - [`RemoteEvent`]: Typed real-time events routed into store operations

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod change;
mod connection;
mod remote;
mod router;
mod state;
mod storage;
mod store;

pub use change::{StoreChange, SubscriptionId};
pub use connection::LiveConnection;
pub use remote::RemoteEvent;
pub use router::{LOGIN_PATH, Navigation, Route, Router};
pub use state::Session;
pub use storage::{Storage, StorageError, TOKEN_KEY, UNREAD_KEY, USER_KEY};
pub use store::Store;

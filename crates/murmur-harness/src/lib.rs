//! Test harness for the murmur chat client.
//!
//! In-memory implementations of the [`murmur_store::Storage`],
//! [`murmur_client::Transport`], and [`murmur_store::LiveConnection`] seams,
//! message fixtures, and invariant checks over store snapshots.
//!
//! # Invariant Testing
//!
//! The `invariants` module verifies WHAT must be true of the store after any
//! sequence of operations, not specific scenarios. Use
//! [`InvariantRegistry::standard()`] for the store's structural invariants.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod invariants;
pub mod memory_storage;
pub mod recording_connection;
pub mod scripted_transport;

pub use invariants::{
    Invariant, InvariantRegistry, InvariantResult, NoEmptyReactionSets, SessionPairPersisted,
    StatusMonotonicity, StoreSnapshot, UniqueMessageIds, UnreadKeysNormalized, UnreadPersisted,
    Violation,
};
pub use memory_storage::MemoryStorage;
pub use recording_connection::RecordingConnection;
pub use scripted_transport::ScriptedTransport;

/// Store wired to the in-memory doubles.
pub type TestStore = murmur_store::Store<MemoryStorage, ScriptedTransport>;

/// Fresh logged-out store plus handles to its storage and transport.
pub fn test_store() -> (TestStore, MemoryStorage, ScriptedTransport) {
    let storage = MemoryStorage::new();
    let transport = ScriptedTransport::new();
    let store = murmur_store::Store::new(storage.clone(), transport.clone());
    (store, storage, transport)
}

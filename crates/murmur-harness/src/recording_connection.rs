//! [`LiveConnection`] double that records closes.

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use murmur_store::LiveConnection;

/// Connection handle whose clones observe the same close counter.
///
/// Hand one clone to the store and keep another to assert on.
#[derive(Debug, Clone, Default)]
pub struct RecordingConnection {
    closes: Arc<AtomicUsize>,
}

impl RecordingConnection {
    /// Create a connection that has not been closed.
    pub fn new() -> Self {
        Self::default()
    }

    /// How many times `close` was called.
    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

impl LiveConnection for RecordingConnection {
    fn close(&mut self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}

//! Observable store state for invariant checking.

use std::collections::BTreeMap;

use murmur_client::{MessageId, MessageStatus, Reactions, Transport};
use murmur_store::{Storage, Store, TOKEN_KEY, UNREAD_KEY, USER_KEY};

/// Point-in-time view of a store and its persisted keys.
///
/// `status_history` accumulates across [`StoreSnapshot::observe`] calls so
/// transitions can be checked; every other field reflects the latest
/// observation only.
#[derive(Debug, Clone, Default)]
pub struct StoreSnapshot {
    /// Token held in memory. `None` if logged out.
    pub session_token: Option<String>,
    /// Raw persisted identity.
    pub persisted_user: Option<String>,
    /// Raw persisted token.
    pub persisted_token: Option<String>,
    /// Raw persisted unread map.
    pub persisted_unread: Option<String>,
    /// Message ids in list order.
    pub message_ids: Vec<MessageId>,
    /// Reactions per message, in list order.
    pub reactions: Vec<(MessageId, Reactions)>,
    /// In-memory unread counts.
    pub unread: BTreeMap<String, u32>,
    /// Every status observed per message, oldest observation first.
    pub status_history: BTreeMap<MessageId, Vec<MessageStatus>>,
}

impl StoreSnapshot {
    /// Snapshot of a single observation.
    pub fn capture<S: Storage, T: Transport>(store: &Store<S, T>) -> Self {
        let mut snapshot = Self::default();
        snapshot.observe(store);
        snapshot
    }

    /// Refresh from `store`, extending status history.
    pub fn observe<S: Storage, T: Transport>(&mut self, store: &Store<S, T>) {
        let storage = store.storage();
        let read = |key: &str| storage.get(key).ok().flatten();

        self.session_token = store.session().map(|s| s.token.clone());
        self.persisted_user = read(USER_KEY);
        self.persisted_token = read(TOKEN_KEY);
        self.persisted_unread = read(UNREAD_KEY);
        self.message_ids = store.messages().iter().map(|m| m.id.clone()).collect();
        self.reactions =
            store.messages().iter().map(|m| (m.id.clone(), m.reactions.clone())).collect();
        self.unread = store.unread_counts().clone();

        for message in store.messages() {
            let history = self.status_history.entry(message.id.clone()).or_default();
            if history.last() != Some(&message.status) {
                history.push(message.status);
            }
        }
    }
}

//! Change notifications.
//!
//! Observers subscribe to the [`crate::Store`] and are called synchronously
//! after each mutation that actually changed state.

/// What part of the store changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreChange {
    /// Session started or ended.
    Session,
    /// Message list changed.
    Messages,
    /// Presence roster replaced.
    Presence,
    /// Typing set changed.
    Typing,
    /// Unread counts changed.
    Unread,
    /// Selected conversation changed.
    Selection,
    /// Group member list changed.
    GroupMembers,
    /// Live connection attached or closed.
    Connection,
    /// The view must navigate to `path` (forced logout).
    Redirect {
        /// Target route path.
        path: String,
    },
}

/// Handle returned by [`crate::Store::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Observer = Box<dyn FnMut(&StoreChange) + Send>;

/// Registered observers in subscription order.
#[derive(Default)]
pub(crate) struct Observers {
    next_id: u64,
    entries: Vec<(SubscriptionId, Observer)>,
}

impl Observers {
    pub(crate) fn subscribe(&mut self, observer: Observer) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.entries.push((id, observer));
        id
    }

    pub(crate) fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(existing, _)| *existing != id);
        self.entries.len() != before
    }

    pub(crate) fn notify(&mut self, change: &StoreChange) {
        for (_, observer) in &mut self.entries {
            observer(change);
        }
    }
}

//! Message and user fixtures.
//!
//! Timestamps are seconds since the Unix epoch so ordering in a test reads
//! directly off the arguments.

use chrono::{DateTime, TimeZone, Utc};
use murmur_client::{Conversation, GroupId, Message, SessionUser, UserId, UserSummary};

/// Timestamp `secs` seconds after the epoch. Out-of-range input clamps to
/// the epoch.
pub fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).single().unwrap_or(DateTime::UNIX_EPOCH)
}

/// Direct message `id` from `sender` to `receiver`, sent at `secs`.
pub fn direct(id: &str, sender: &str, receiver: &str, secs: i64) -> Message {
    Message::new(
        id,
        sender,
        Conversation::Direct(UserId::new(receiver)),
        format!("{sender} says {id}"),
        at(secs),
    )
}

/// Group message `id` from `sender` to `group`, sent at `secs`.
pub fn group(id: &str, sender: &str, group: &str, secs: i64) -> Message {
    Message::new(
        id,
        sender,
        Conversation::Group(GroupId::new(group)),
        format!("{sender} says {id}"),
        at(secs),
    )
}

/// Session identity whose display name is its id.
pub fn user(id: &str) -> SessionUser {
    SessionUser::new(id, id)
}

/// Roster entry whose username is its id.
pub fn summary(id: &str) -> UserSummary {
    UserSummary { id: UserId::new(id), username: id.to_owned() }
}

/// Store logged in as `me` with a token derived from the id.
pub fn logged_in(me: &str) -> (crate::TestStore, crate::MemoryStorage, crate::ScriptedTransport) {
    let (mut store, storage, transport) = crate::test_store();
    store.set_session(user(me), format!("token-{me}"));
    (store, storage, transport)
}

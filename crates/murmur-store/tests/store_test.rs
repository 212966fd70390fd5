//! Integration tests for the chat store.
//!
//! Each test drives a store wired to in-memory storage and a scripted
//! transport, then checks observable state, persisted keys, and the change
//! notifications observers received.

use std::sync::{Arc, Mutex};

use murmur_client::{
    AUTHORIZATION, ApiError, Conversation, GroupId, MessageId, MessageStatus, ReactionKind,
    SessionUser, TransportError, UserId,
};
use murmur_harness::{
    MemoryStorage, RecordingConnection, ScriptedTransport, TestStore,
    fixtures::{direct, group, logged_in, summary, user},
    test_store,
};
use murmur_store::{LOGIN_PATH, RemoteEvent, Store, StoreChange, TOKEN_KEY, UNREAD_KEY, USER_KEY};
use serde_json::json;

fn record_changes(store: &mut TestStore) -> Arc<Mutex<Vec<StoreChange>>> {
    let log = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&log);
    store.subscribe(move |change| sink.lock().unwrap().push(change.clone()));
    log
}

fn redirects(log: &Arc<Mutex<Vec<StoreChange>>>) -> usize {
    log.lock().unwrap().iter().filter(|c| matches!(c, StoreChange::Redirect { .. })).count()
}

// Session

#[test]
fn set_session_persists_both_halves_and_attaches_bearer() {
    let (mut store, storage, _) = test_store();

    store.set_session(user("alice"), "tok-1");

    assert!(store.is_logged_in());
    assert_eq!(store.api().bearer(), Some("tok-1"));
    assert_eq!(storage.raw(TOKEN_KEY).as_deref(), Some("tok-1"));
    let persisted: SessionUser =
        serde_json::from_str(&storage.raw(USER_KEY).expect("user persisted")).expect("parse user");
    assert_eq!(persisted, user("alice"));
}

#[test]
fn blank_token_is_rejected() {
    let (mut store, storage, _) = test_store();

    store.set_session(user("alice"), "   ");

    assert!(!store.is_logged_in());
    assert!(storage.keys().is_empty());
}

#[test]
fn clear_session_removes_persisted_token_and_closes_connection() {
    let (mut store, storage, _) = logged_in("alice");
    let connection = RecordingConnection::new();
    store.set_connection(connection.clone());

    store.clear_session();

    assert!(!store.is_logged_in());
    assert_eq!(store.api().bearer(), None);
    assert_eq!(storage.raw(TOKEN_KEY), None);
    assert_eq!(storage.raw(USER_KEY), None);
    assert!(!store.has_connection());
    assert_eq!(connection.close_count(), 1);

    store.clear_session();
    assert_eq!(connection.close_count(), 1);
}

#[test]
fn replacing_connection_leaves_previous_open() {
    let (mut store, ..) = logged_in("alice");
    let first = RecordingConnection::new();
    let second = RecordingConnection::new();
    store.set_connection(first.clone());

    store.set_connection(second.clone());
    store.clear_session();

    assert_eq!(first.close_count(), 0);
    assert_eq!(second.close_count(), 1);
}

#[test]
fn storage_failure_keeps_in_memory_session() {
    let (mut store, storage, _) = test_store();
    storage.fail_writes(true);

    store.set_session(user("alice"), "tok-1");

    assert!(store.is_logged_in());
    assert_eq!(store.api().bearer(), Some("tok-1"));
    assert_eq!(storage.raw(TOKEN_KEY), None);
}

#[test]
fn restore_reloads_session_and_unread_counts() {
    let (mut store, storage, _) = logged_in("alice");
    store.increment_unread_count("bob");
    store.increment_unread_count("bob");

    let restored = Store::restore(storage.clone(), ScriptedTransport::new());

    assert_eq!(restored.user(), Some(&user("alice")));
    assert_eq!(restored.api().bearer(), Some("token-alice"));
    assert_eq!(restored.unread_count("bob"), 2);
}

#[test]
fn restore_discards_lone_token() {
    let storage = MemoryStorage::new();
    storage.insert_raw(TOKEN_KEY, "orphan");

    let store = Store::restore(storage.clone(), ScriptedTransport::new());

    assert!(!store.is_logged_in());
    assert_eq!(storage.raw(TOKEN_KEY), None);
}

#[test]
fn restore_normalizes_unread_keys() {
    let storage = MemoryStorage::new();
    storage.insert_raw(UNREAD_KEY, r#"{" 7": 2, "7": 1, "  ": 4, "g1": 3}"#);

    let store = Store::restore(storage, ScriptedTransport::new());

    assert_eq!(store.unread_count("7"), 3);
    assert_eq!(store.unread_count("g1"), 3);
    assert_eq!(store.unread_counts().len(), 2);
}

#[test]
fn restore_treats_corrupt_unread_as_empty() {
    let storage = MemoryStorage::new();
    storage.insert_raw(UNREAD_KEY, "{not json");

    let store = Store::restore(storage, ScriptedTransport::new());

    assert!(store.unread_counts().is_empty());
}

// Messages

#[test]
fn append_keeps_arrival_order() {
    let (mut store, ..) = logged_in("alice");

    store.append_message(direct("m1", "alice", "bob", 1));
    store.append_message(direct("m2", "bob", "alice", 2));
    store.append_message(direct("m3", "alice", "bob", 3));

    let ids: Vec<_> = store.messages().iter().map(|m| m.id.as_str()).collect();
    assert_eq!(ids, ["m1", "m2", "m3"]);
}

#[test]
fn append_attaches_reply_preview_without_touching_original() {
    let (mut store, ..) = logged_in("alice");
    let original = direct("m1", "bob", "alice", 1);
    store.append_message(original.clone());

    store.append_message(direct("m2", "alice", "bob", 2).replying_to("m1"));

    let reply = store.message(&MessageId::new("m2")).expect("reply stored");
    assert_eq!(reply.reply_preview, Some(original.preview()));
    assert_eq!(store.message(&MessageId::new("m1")), Some(&original));
}

#[test]
fn append_with_known_id_updates_entry_in_place() {
    let (mut store, ..) = logged_in("alice");
    store.append_message(direct("m1", "alice", "bob", 1));
    store.append_message(direct("m2", "bob", "alice", 2));
    let mut edited = direct("m1", "alice", "bob", 1);
    edited.content = "edited".to_owned();

    store.append_message(edited);

    let ids: Vec<_> = store.messages().iter().map(|m| m.id.as_str()).collect();
    assert_eq!(ids, ["m1", "m2"]);
    assert_eq!(store.messages()[0].content, "edited");
}

#[test]
fn repeated_message_keeps_status_and_reactions() {
    let (mut store, ..) = logged_in("alice");
    store.append_message(direct("m1", "alice", "bob", 1));
    let id = MessageId::new("m1");
    store.update_message_status(&id, MessageStatus::Read);
    store.toggle_reaction(&id, "👍", true);

    store.append_message(direct("m1", "alice", "bob", 1));

    let message = store.message(&id).expect("message kept");
    assert_eq!(message.status, MessageStatus::Read);
    assert!(message.reactors("👍").is_some_and(|users| users.contains(&UserId::new("alice"))));
}

#[test]
fn echoed_message_does_not_reset_status() {
    let (mut store, ..) = logged_in("alice");
    store.select_conversation(Conversation::Direct(UserId::new("bob")));
    store.receive_message(direct("m1", "alice", "bob", 1));
    store.update_message_status(&MessageId::new("m1"), MessageStatus::Delivered);

    store.receive_message(direct("m1", "alice", "bob", 1));

    assert_eq!(store.messages().len(), 1);
    assert_eq!(store.messages()[0].status, MessageStatus::Delivered);
}

#[test]
fn repeated_message_with_newer_status_advances() {
    let (mut store, ..) = logged_in("alice");
    store.append_message(direct("m1", "alice", "bob", 1));
    let mut delivered = direct("m1", "alice", "bob", 1);
    delivered.status = MessageStatus::Delivered;

    store.append_message(delivered);

    assert_eq!(store.messages()[0].status, MessageStatus::Delivered);
}

#[test]
fn clear_messages_empties_list_and_notifies_once() {
    let (mut store, ..) = logged_in("alice");
    store.append_message(direct("m1", "alice", "bob", 1));
    let changes = record_changes(&mut store);

    store.clear_messages();
    store.clear_messages();

    assert!(store.messages().is_empty());
    assert_eq!(*changes.lock().unwrap(), [StoreChange::Messages]);
}

#[test]
fn merge_older_skips_known_ids_and_prepends() {
    let (mut store, ..) = logged_in("alice");
    store.replace_messages(vec![direct("m3", "a", "b", 3), direct("m4", "a", "b", 4)]);

    let added = store.merge_older_messages(vec![
        direct("m1", "a", "b", 1),
        direct("m2", "a", "b", 2),
        direct("m3", "a", "b", 3),
    ]);

    assert_eq!(added, 2);
    let ids: Vec<_> = store.messages().iter().map(|m| m.id.as_str()).collect();
    assert_eq!(ids, ["m1", "m2", "m3", "m4"]);
}

#[test]
fn toggle_reaction_round_trip_restores_message() {
    let (mut store, ..) = logged_in("alice");
    let message = direct("m1", "bob", "alice", 1);
    store.append_message(message.clone());
    let id = MessageId::new("m1");

    assert!(store.toggle_reaction(&id, "👍", true));
    let reactors = store.message(&id).and_then(|m| m.reactors("👍")).expect("reaction stored");
    assert!(reactors.contains(&UserId::new("alice")));

    assert!(store.toggle_reaction(&id, "👍", false));
    assert_eq!(store.message(&id), Some(&message));
}

#[test]
fn toggle_reaction_without_session_is_noop() {
    let (mut store, ..) = test_store();
    store.append_message(direct("m1", "bob", "alice", 1));

    assert!(!store.toggle_reaction(&MessageId::new("m1"), "👍", true));
    assert!(store.messages()[0].reactions.is_empty());
}

#[test]
fn remote_removal_of_unrecorded_reaction_is_noop() {
    let (mut store, ..) = logged_in("alice");
    let message = direct("m1", "bob", "alice", 1);
    store.append_message(message.clone());
    let changes = record_changes(&mut store);

    let changed = store.apply_remote_reaction(
        &MessageId::new("m1"),
        &UserId::new("carol"),
        "🎉",
        ReactionKind::Removed,
    );

    assert!(!changed);
    assert_eq!(store.messages(), [message]);
    assert!(changes.lock().unwrap().is_empty());
}

#[test]
fn remote_reaction_for_unknown_message_is_noop() {
    let (mut store, ..) = logged_in("alice");

    let changed = store.apply_remote_reaction(
        &MessageId::new("missing"),
        &UserId::new("carol"),
        "🎉",
        ReactionKind::Added,
    );

    assert!(!changed);
}

#[test]
fn status_only_moves_forward() {
    let (mut store, ..) = logged_in("alice");
    store.append_message(direct("m1", "alice", "bob", 1));
    let id = MessageId::new("m1");

    assert!(store.update_message_status(&id, MessageStatus::Delivered));
    assert!(!store.update_message_status(&id, MessageStatus::Sent));
    assert!(!store.update_message_status(&id, MessageStatus::Delivered));
    assert_eq!(store.messages()[0].status, MessageStatus::Delivered);

    assert!(store.update_message_status(&id, MessageStatus::Read));
    assert_eq!(store.messages()[0].status, MessageStatus::Read);
}

// Presence, typing, unread

#[test]
fn typing_set_ignores_duplicates() {
    let (mut store, ..) = logged_in("alice");
    let changes = record_changes(&mut store);

    store.add_typing_user("bob");
    store.add_typing_user("bob");
    store.remove_typing_user("carol");

    assert_eq!(store.typing_users().len(), 1);
    assert_eq!(*changes.lock().unwrap(), [StoreChange::Typing]);

    store.remove_typing_user("bob");
    assert!(store.typing_users().is_empty());
}

#[test]
fn presence_is_replaced_wholesale() {
    let (mut store, ..) = logged_in("alice");
    store.set_presence(vec![summary("bob"), summary("carol")]);

    store.set_presence(vec![summary("dave")]);

    assert_eq!(store.presence(), [summary("dave")]);
}

#[test]
fn unread_increment_then_clear() {
    let (mut store, storage, _) = logged_in("alice");

    store.increment_unread_count("g1");
    store.increment_unread_count("g1");
    store.increment_unread_count("g1");
    assert_eq!(store.unread_count("g1"), 3);

    store.clear_unread_count("g1");
    assert_eq!(store.unread_count("g1"), 0);
    assert_eq!(store.unread_count("never-seen"), 0);
    assert_eq!(storage.raw(UNREAD_KEY).as_deref(), Some("{}"));
}

#[test]
fn unread_keys_are_string_normalized() {
    let (mut store, storage, _) = logged_in("alice");

    store.increment_unread_count(42u32);
    store.set_unread_count(" 7 ", 5);

    assert_eq!(store.unread_count("42"), 1);
    assert_eq!(store.unread_count(7u64), 5);
    let persisted: serde_json::Value =
        serde_json::from_str(&storage.raw(UNREAD_KEY).expect("persisted")).expect("json");
    assert_eq!(persisted, json!({"42": 1, "7": 5}));
}

// Read-through

#[tokio::test]
async fn fetch_page_replaces_messages_oldest_first() {
    let (mut store, _, transport) = logged_in("alice");
    store.append_message(direct("stale", "alice", "bob", 0));
    store.select_conversation(Conversation::Direct(UserId::new("bob")));
    transport.push_page(&[direct("m3", "bob", "alice", 3), direct("m2", "alice", "bob", 2)]);

    store.fetch_conversation_page(1, 20).await;

    let ids: Vec<_> = store.messages().iter().map(|m| m.id.as_str()).collect();
    assert_eq!(ids, ["m2", "m3"]);
    let request = transport.last_request().expect("request sent");
    assert_eq!(request.path, "/messages");
    assert_eq!(request.query_param("user1"), Some("alice"));
    assert_eq!(request.query_param("user2"), Some("bob"));
    assert_eq!(request.query_param("pageSize"), Some("20"));
    assert_eq!(request.header(AUTHORIZATION), Some("Bearer token-alice"));
}

#[tokio::test]
async fn fetch_group_page_uses_group_path() {
    let (mut store, _, transport) = logged_in("alice");
    store.select_conversation(Conversation::Group(GroupId::new("g1")));
    transport.push_page(&[group("m1", "bob", "g1", 1)]);

    store.fetch_conversation_page(2, 10).await;

    assert_eq!(store.messages().len(), 1);
    let request = transport.last_request().expect("request sent");
    assert_eq!(request.path, "/groups/g1/messages");
    assert_eq!(request.query_param("page"), Some("2"));
}

#[tokio::test]
async fn fetch_without_selection_sends_nothing() {
    let (mut store, _, transport) = logged_in("alice");

    store.fetch_conversation_page(1, 20).await;

    assert!(transport.requests().is_empty());
}

#[tokio::test]
async fn failed_fetch_leaves_state_unchanged() {
    let (mut store, _, transport) = logged_in("alice");
    store.append_message(direct("m1", "alice", "bob", 1));
    store.select_conversation(Conversation::Direct(UserId::new("bob")));
    transport.push_status(500);
    transport.push_error(TransportError::Timeout);

    store.fetch_conversation_page(1, 20).await;
    store.fetch_conversation_page(1, 20).await;

    assert!(store.is_logged_in());
    assert_eq!(store.messages().len(), 1);
}

#[tokio::test]
async fn unauthorized_response_logs_out_and_redirects_once() {
    let (mut store, storage, transport) = logged_in("alice");
    store.select_conversation(Conversation::Group(GroupId::new("g1")));
    let changes = record_changes(&mut store);
    transport.push_status(401);

    store.fetch_conversation_page(1, 20).await;
    store.fetch_conversation_page(1, 20).await;

    assert!(!store.is_logged_in());
    assert_eq!(storage.raw(TOKEN_KEY), None);
    assert_eq!(redirects(&changes), 1);
    assert!(
        changes
            .lock()
            .unwrap()
            .contains(&StoreChange::Redirect { path: LOGIN_PATH.to_owned() })
    );
    assert_eq!(transport.requests().len(), 1, "no fetch without a session");
}

#[test]
fn unauthorized_after_logout_is_ignored() {
    let (mut store, ..) = logged_in("alice");
    let changes = record_changes(&mut store);

    store.handle_api_error("first", ApiError::Unauthorized);
    store.handle_api_error("second", ApiError::Unauthorized);

    assert_eq!(redirects(&changes), 1);
    assert_eq!(
        changes.lock().unwrap().iter().filter(|c| **c == StoreChange::Session).count(),
        1
    );
}

#[test]
fn non_auth_errors_keep_session() {
    let (mut store, ..) = logged_in("alice");
    let changes = record_changes(&mut store);

    store.handle_api_error("refresh presence", ApiError::Status { status: 503, body: String::new() });

    assert!(store.is_logged_in());
    assert!(changes.lock().unwrap().is_empty());
}

#[tokio::test]
async fn fetch_group_members_fills_and_clears_list() {
    let (mut store, _, transport) = logged_in("alice");
    transport.push_json(json!({
        "ID": "g1",
        "Name": "crew",
        "Users": [{"id": "alice", "username": "alice"}, {"id": "bob", "username": "bob"}]
    }));

    store.fetch_group_members(&GroupId::new("g1")).await;

    assert_eq!(store.group_members(), [summary("alice"), summary("bob")]);
    assert_eq!(transport.last_request().map(|r| r.path), Some("/groups/g1".to_owned()));

    store.clear_group_members();
    assert!(store.group_members().is_empty());
}

// Remote events

#[test]
fn pushed_message_for_selected_conversation_is_appended() {
    let (mut store, ..) = logged_in("alice");
    store.select_conversation(Conversation::Direct(UserId::new("bob")));

    store.receive_message(direct("m1", "bob", "alice", 1));

    assert_eq!(store.messages().len(), 1);
    assert_eq!(store.unread_count("bob"), 0);
}

#[test]
fn pushed_message_elsewhere_bumps_unread() {
    let (mut store, ..) = logged_in("alice");
    store.select_conversation(Conversation::Direct(UserId::new("bob")));

    store.receive_message(direct("m1", "carol", "alice", 1));
    store.receive_message(group("m2", "carol", "g7", 2));

    assert!(store.messages().is_empty());
    assert_eq!(store.unread_count("carol"), 1);
    assert_eq!(store.unread_count("g7"), 1);
}

#[test]
fn own_message_elsewhere_is_not_unread() {
    let (mut store, ..) = logged_in("alice");
    store.select_conversation(Conversation::Direct(UserId::new("bob")));

    store.receive_message(direct("m9", "alice", "carol", 1));
    store.receive_message(group("m10", "alice", "g7", 2));

    assert!(store.messages().is_empty());
    assert_eq!(store.unread_count("carol"), 0);
    assert_eq!(store.unread_count("g7"), 0);
}

#[test]
fn read_receipt_from_sender_is_ignored() {
    let (mut store, ..) = logged_in("alice");
    store.append_message(direct("m1", "bob", "alice", 1));
    let id = MessageId::new("m1");

    store.apply_remote_event(RemoteEvent::ReadMessage {
        message_id: id.clone(),
        read_by: UserId::new("bob"),
    });
    assert_eq!(store.message(&id).map(|m| m.status), Some(MessageStatus::Sent));

    store.apply_remote_event(RemoteEvent::ReadMessage {
        message_id: id.clone(),
        read_by: UserId::new("alice"),
    });
    assert_eq!(store.message(&id).map(|m| m.status), Some(MessageStatus::Read));
}

#[test]
fn remote_events_route_to_store_operations() {
    let (mut store, ..) = logged_in("alice");
    store.select_conversation(Conversation::Group(GroupId::new("g1")));
    let frames = [
        r#"{"type": "new_message", "message": {"id": "m1", "sender_id": "bob", "group_id": "g1",
            "content": "hi", "created_at": "2024-05-01T10:00:00Z"}}"#,
        r#"{"type": "reaction_added", "message_id": "m1", "user_id": "carol", "emoji": "🎉"}"#,
        r#"{"type": "typing", "username": "bob"}"#,
        r#"{"type": "online_users", "users": [{"id": "bob", "username": "bob"}]}"#,
        r#"{"type": "read_message", "message_id": "m1", "read_by": "carol"}"#,
    ];

    for frame in frames {
        store.apply_remote_event(RemoteEvent::from_json(frame).expect("parse frame"));
    }

    let message = store.message(&MessageId::new("m1")).expect("message appended");
    assert_eq!(message.status, MessageStatus::Read);
    assert!(message.reactors("🎉").is_some_and(|users| users.contains(&UserId::new("carol"))));
    assert!(store.typing_users().contains("bob"));
    assert_eq!(store.presence(), [summary("bob")]);
}

// Observers

#[test]
fn unsubscribed_observer_stops_receiving() {
    let (mut store, ..) = test_store();
    let seen = Arc::new(Mutex::new(0usize));
    let sink = Arc::clone(&seen);
    let id = store.subscribe(move |_| *sink.lock().unwrap() += 1);

    store.add_typing_user("bob");
    assert!(store.unsubscribe(id));
    store.add_typing_user("carol");

    assert_eq!(*seen.lock().unwrap(), 1);
    assert!(!store.unsubscribe(id));
}

//! Session and chat store.
//!
//! This module defines the [`Store`], the single owner of client-side chat
//! state. It is mutated only through its named operations, which run to
//! completion before the next one can start (`&mut self`), so no locking is
//! needed. Read-through operations await the [`ApiClient`] and then re-enter
//! the store's own mutation entry points.
//!
//! # Ordering
//!
//! The message list is chronological: newest at the tail. Appends push to
//! the tail, older history is merged in at the head, and fetched pages
//! (newest first on the wire) are reversed before they replace the list.
//!
//! # Failures
//!
//! Mutations never return errors. Storage failures and failed read-through
//! requests are logged and leave in-memory state as it was. The one failure
//! that escapes is an unauthorized response: the session is dropped and
//! observers are told to redirect to the login view.

use std::{
    collections::{BTreeMap, BTreeSet, HashSet},
    fmt::Display,
};

use murmur_client::{
    ApiClient, ApiError, Conversation, GroupId, Message, MessageId, MessageStatus, PageRequest,
    ReactionKind, SessionUser, Transport, UserId, UserSummary,
};

use crate::{
    LOGIN_PATH, LiveConnection, Session, Storage, StoreChange, SubscriptionId, TOKEN_KEY,
    UNREAD_KEY, USER_KEY, change::Observers,
};

/// Client-side chat state container.
///
/// Generic over the persistence seam `S` and the API transport `T`.
pub struct Store<S: Storage, T: Transport> {
    storage: S,
    api: ApiClient<T>,
    session: Option<Session>,
    messages: Vec<Message>,
    presence: Vec<UserSummary>,
    typing: BTreeSet<String>,
    /// Keyed by string-normalized conversation id.
    unread: BTreeMap<String, u32>,
    selected: Option<Conversation>,
    group_members: Vec<UserSummary>,
    connection: Option<Box<dyn LiveConnection>>,
    observers: Observers,
}

impl<S: Storage, T: Transport> Store<S, T> {
    /// Create an empty, logged-out store. Persisted state is not read.
    pub fn new(storage: S, transport: T) -> Self {
        Self {
            storage,
            api: ApiClient::new(transport),
            session: None,
            messages: Vec::new(),
            presence: Vec::new(),
            typing: BTreeSet::new(),
            unread: BTreeMap::new(),
            selected: None,
            group_members: Vec::new(),
            connection: None,
            observers: Observers::default(),
        }
    }

    /// Create a store and reload the persisted session and unread counts.
    ///
    /// The session is restored only if both identity and token are present
    /// and readable; a lone half is removed from storage.
    pub fn restore(storage: S, transport: T) -> Self {
        let mut store = Self::new(storage, transport);

        if let Some(session) = store.load_session() {
            tracing::info!(user_id = %session.user.id, "restored persisted session");
            store.api.set_bearer(Some(session.token.clone()));
            store.session = Some(session);
        }
        store.unread = store.load_unread();

        store
    }

    /// Register an observer called after every state change.
    pub fn subscribe(
        &mut self,
        observer: impl FnMut(&StoreChange) + Send + 'static,
    ) -> SubscriptionId {
        self.observers.subscribe(Box::new(observer))
    }

    /// Remove an observer. Returns `false` if it was not registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.observers.unsubscribe(id)
    }

    // Session

    /// Start a session: store identity and token, persist both, and attach
    /// the token to outgoing API requests.
    ///
    /// A blank user id or token is rejected with a warning.
    pub fn set_session(&mut self, user: SessionUser, token: impl Into<String>) {
        let token = token.into();
        if user.id.is_empty() || token.trim().is_empty() {
            tracing::warn!("rejecting session with empty user id or token");
            return;
        }

        match serde_json::to_string(&user) {
            Ok(user_json) => {
                self.write_key(USER_KEY, &user_json);
                self.write_key(TOKEN_KEY, &token);
            },
            Err(error) => tracing::warn!(%error, "failed to serialize session user; not persisted"),
        }

        tracing::info!(user_id = %user.id, "session started");
        self.api.set_bearer(Some(token.clone()));
        self.session = Some(Session { user, token });
        self.notify(StoreChange::Session);
    }

    /// End the session: clear identity, token, their persisted copies, the
    /// API credential, and close the live connection if one is attached.
    ///
    /// Safe to call when already logged out.
    pub fn clear_session(&mut self) {
        let had_session = self.session.take().is_some();
        self.api.set_bearer(None);
        self.remove_key(USER_KEY);
        self.remove_key(TOKEN_KEY);

        if had_session {
            tracing::info!("session cleared");
            self.notify(StoreChange::Session);
        }
        self.clear_connection();
    }

    // Messages

    /// Replace the whole message list (fresh page from the server).
    pub fn replace_messages(&mut self, messages: Vec<Message>) {
        self.messages = messages;
        self.notify(StoreChange::Messages);
    }

    /// Drop all messages.
    pub fn clear_messages(&mut self) {
        if self.messages.is_empty() {
            return;
        }
        self.messages.clear();
        self.notify(StoreChange::Messages);
    }

    /// Append a message at the tail.
    ///
    /// If the message replies to one already in the list, a preview of the
    /// original is attached to the new message; the original is untouched.
    /// A message whose id is already present updates the existing entry in
    /// place. Its status never moves backwards and its reactions are kept.
    pub fn append_message(&mut self, mut message: Message) {
        if let Some(original_id) = &message.reply_to_message_id
            && let Some(original) = self.messages.iter().find(|m| &m.id == original_id)
        {
            message.reply_preview = Some(original.preview());
        }

        if let Some(existing) = self.messages.iter_mut().find(|m| m.id == message.id) {
            tracing::debug!(message_id = %message.id, "message already present; merging");
            message.status = message.status.max(existing.status);
            message.reactions = std::mem::take(&mut existing.reactions);
            *existing = message;
        } else {
            self.messages.push(message);
        }
        self.notify(StoreChange::Messages);
    }

    /// Prepend older history, skipping ids already present.
    ///
    /// Relative order within `batch` is kept. Returns how many messages
    /// were added.
    pub fn merge_older_messages(&mut self, batch: Vec<Message>) -> usize {
        let mut seen: HashSet<MessageId> = self.messages.iter().map(|m| m.id.clone()).collect();
        let older: Vec<Message> = batch.into_iter().filter(|m| seen.insert(m.id.clone())).collect();

        if older.is_empty() {
            tracing::debug!("older history batch contained no new messages");
            return 0;
        }

        let added = older.len();
        self.messages.splice(0..0, older);
        self.notify(StoreChange::Messages);
        added
    }

    /// Add or remove the session user's `emoji` reaction on a message.
    ///
    /// No-op without a session or if the message is not loaded. Returns
    /// whether anything changed.
    pub fn toggle_reaction(&mut self, message_id: &MessageId, emoji: &str, add: bool) -> bool {
        let Some(user) = self.session.as_ref().map(|s| s.user.id.clone()) else {
            tracing::warn!(%message_id, "cannot react without a session");
            return false;
        };
        let kind = if add { ReactionKind::Added } else { ReactionKind::Removed };
        self.apply_reaction(message_id, &user, emoji, kind)
    }

    /// Apply a reaction change reported by the server for any user.
    ///
    /// Events for messages not loaded locally, and removals of reactions
    /// that were never recorded, are no-ops. Returns whether anything
    /// changed.
    pub fn apply_remote_reaction(
        &mut self,
        message_id: &MessageId,
        user: &UserId,
        emoji: &str,
        kind: ReactionKind,
    ) -> bool {
        if user.is_empty() {
            tracing::warn!(%message_id, "ignoring reaction event without user id");
            return false;
        }
        self.apply_reaction(message_id, user, emoji, kind)
    }

    /// Advance a message's delivery status.
    ///
    /// Status only moves forward (`sent -> delivered -> read`); a regression
    /// or repeat is ignored. Returns whether the status changed.
    pub fn update_message_status(&mut self, message_id: &MessageId, status: MessageStatus) -> bool {
        let Some(message) = self.messages.iter_mut().find(|m| &m.id == message_id) else {
            tracing::debug!(%message_id, "status update for unknown message ignored");
            return false;
        };

        if status <= message.status {
            if status < message.status {
                tracing::debug!(
                    %message_id,
                    current = %message.status,
                    requested = %status,
                    "status regression ignored"
                );
            }
            return false;
        }

        message.status = status;
        self.notify(StoreChange::Messages);
        true
    }

    // Presence and typing

    /// Replace the online-user roster.
    pub fn set_presence(&mut self, users: Vec<UserSummary>) {
        self.presence = users;
        self.notify(StoreChange::Presence);
    }

    /// Mark `name` as typing. No-op if already marked.
    pub fn add_typing_user(&mut self, name: impl Into<String>) {
        let name = name.into();
        if name.trim().is_empty() {
            tracing::warn!("ignoring typing indicator without a username");
            return;
        }
        if self.typing.insert(name) {
            self.notify(StoreChange::Typing);
        }
    }

    /// Clear `name`'s typing mark. No-op if not marked.
    pub fn remove_typing_user(&mut self, name: &str) {
        if self.typing.remove(name) {
            self.notify(StoreChange::Typing);
        }
    }

    // Unread counts

    /// Unread count for a conversation id; 0 if never set.
    pub fn unread_count(&self, id: impl Display) -> u32 {
        normalize_key(&id).and_then(|key| self.unread.get(&key).copied()).unwrap_or(0)
    }

    /// Set the unread count for a conversation id.
    pub fn set_unread_count(&mut self, id: impl Display, count: u32) {
        let Some(key) = normalize_key(&id) else {
            tracing::warn!("ignoring unread count update for empty conversation id");
            return;
        };
        self.unread.insert(key, count);
        self.commit_unread();
    }

    /// Add one to the unread count for a conversation id.
    pub fn increment_unread_count(&mut self, id: impl Display) {
        let Some(key) = normalize_key(&id) else {
            tracing::warn!("ignoring unread count increment for empty conversation id");
            return;
        };
        let count = self.unread.entry(key).or_insert(0);
        *count = count.saturating_add(1);
        self.commit_unread();
    }

    /// Reset the unread count for a conversation id to zero.
    pub fn clear_unread_count(&mut self, id: impl Display) {
        let Some(key) = normalize_key(&id) else {
            tracing::warn!("ignoring unread count reset for empty conversation id");
            return;
        };
        self.unread.remove(&key);
        self.commit_unread();
    }

    // Selection and read-through

    /// Make `conversation` the active one. Messages are left as they are.
    pub fn select_conversation(&mut self, conversation: Conversation) {
        self.selected = Some(conversation);
        self.notify(StoreChange::Selection);
    }

    /// Fetch one page of history for the selected conversation and replace
    /// the message list with it, oldest first.
    ///
    /// Without a selection or a session this is a no-op. A failed request
    /// leaves state unchanged. Returns whether the page was loaded.
    pub async fn fetch_conversation_page(&mut self, page: u32, page_size: u32) -> bool {
        let Some(conversation) = self.selected.clone() else {
            tracing::warn!("no conversation selected; skipping history fetch");
            return false;
        };
        let Some(viewer) = self.session.as_ref().map(|s| s.user.id.clone()) else {
            tracing::warn!("no session; skipping history fetch");
            return false;
        };
        let request = PageRequest { conversation, viewer, page, page_size };

        match self.api.conversation_page(&request).await {
            Ok(history) => {
                let messages = history.into_chronological();
                tracing::debug!(page, count = messages.len(), "loaded conversation page");
                self.replace_messages(messages);
                true
            },
            Err(error) => {
                self.handle_api_error("fetch conversation page", error);
                false
            },
        }
    }

    /// Fetch the members of `group` into the member list.
    ///
    /// A failed request leaves state unchanged.
    pub async fn fetch_group_members(&mut self, group: &GroupId) {
        match self.api.group_members(group).await {
            Ok(members) => {
                self.group_members = members;
                self.notify(StoreChange::GroupMembers);
            },
            Err(error) => self.handle_api_error("fetch group members", error),
        }
    }

    /// Empty the member list.
    pub fn clear_group_members(&mut self) {
        if self.group_members.is_empty() {
            return;
        }
        self.group_members.clear();
        self.notify(StoreChange::GroupMembers);
    }

    /// Route a failed API call through the store.
    ///
    /// Unauthorized responses end the session and ask observers to redirect
    /// to login, once per failing call while a session exists. Every other
    /// failure is logged and absorbed.
    pub fn handle_api_error(&mut self, operation: &'static str, error: ApiError) {
        if !error.is_unauthorized() {
            tracing::warn!(operation, %error, "request failed; state unchanged");
            return;
        }

        if self.session.is_none() {
            tracing::debug!(operation, "unauthorized response after logout ignored");
            return;
        }

        tracing::warn!(operation, "credential rejected; logging out");
        self.clear_session();
        self.notify(StoreChange::Redirect { path: LOGIN_PATH.to_owned() });
    }

    // Live connection

    /// Attach a live connection.
    ///
    /// An already attached connection is replaced without being closed.
    pub fn set_connection(&mut self, connection: impl LiveConnection + 'static) {
        if self.connection.is_some() {
            tracing::warn!("replacing live connection without closing the previous one");
        }
        self.connection = Some(Box::new(connection));
        self.notify(StoreChange::Connection);
    }

    /// Close and drop the live connection, if any.
    pub fn clear_connection(&mut self) {
        let Some(mut connection) = self.connection.take() else {
            return;
        };
        connection.close();
        tracing::debug!("live connection closed");
        self.notify(StoreChange::Connection);
    }

    // Accessors

    /// Current session. `None` if logged out.
    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Logged-in user. `None` if logged out.
    pub fn user(&self) -> Option<&SessionUser> {
        self.session.as_ref().map(|s| &s.user)
    }

    /// Whether a session is active.
    pub fn is_logged_in(&self) -> bool {
        self.session.is_some()
    }

    /// Messages, oldest first.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Message with `id`. `None` if not loaded.
    pub fn message(&self, id: &MessageId) -> Option<&Message> {
        self.messages.iter().find(|m| &m.id == id)
    }

    /// Online users.
    pub fn presence(&self) -> &[UserSummary] {
        &self.presence
    }

    /// Usernames currently typing.
    pub fn typing_users(&self) -> &BTreeSet<String> {
        &self.typing
    }

    /// All unread counts by conversation id.
    pub fn unread_counts(&self) -> &BTreeMap<String, u32> {
        &self.unread
    }

    /// Selected conversation. `None` before the first selection.
    pub fn selected_conversation(&self) -> Option<&Conversation> {
        self.selected.as_ref()
    }

    /// Members of the last fetched group.
    pub fn group_members(&self) -> &[UserSummary] {
        &self.group_members
    }

    /// Whether a live connection is attached.
    pub fn has_connection(&self) -> bool {
        self.connection.is_some()
    }

    /// Persistence backend.
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// API client, for calls the store does not wrap. Route failures back
    /// through [`Store::handle_api_error`].
    pub fn api(&self) -> &ApiClient<T> {
        &self.api
    }

    fn apply_reaction(
        &mut self,
        message_id: &MessageId,
        user: &UserId,
        emoji: &str,
        kind: ReactionKind,
    ) -> bool {
        if emoji.is_empty() {
            tracing::warn!(%message_id, "ignoring reaction without emoji");
            return false;
        }
        let Some(index) = self.messages.iter().position(|m| &m.id == message_id) else {
            tracing::debug!(%message_id, "reaction for unknown message ignored");
            return false;
        };

        // Replace rather than mutate so observers holding the old message
        // see a distinct value.
        let mut updated = self.messages[index].clone();
        let changed = match kind {
            ReactionKind::Added => updated.add_reaction(emoji, user),
            ReactionKind::Removed => updated.remove_reaction(emoji, user),
        };
        if !changed {
            return false;
        }

        self.messages[index] = updated;
        self.notify(StoreChange::Messages);
        true
    }

    fn commit_unread(&mut self) {
        match serde_json::to_string(&self.unread) {
            Ok(json) => self.write_key(UNREAD_KEY, &json),
            Err(error) => tracing::warn!(%error, "failed to serialize unread counts"),
        }
        self.notify(StoreChange::Unread);
    }

    fn load_session(&self) -> Option<Session> {
        let user = self.read_key(USER_KEY);
        let token = self.read_key(TOKEN_KEY).filter(|t| !t.trim().is_empty());

        match (user, token) {
            (None, None) => None,
            (Some(user_json), Some(token)) => {
                match serde_json::from_str::<SessionUser>(&user_json) {
                    Ok(user) if !user.id.is_empty() => Some(Session { user, token }),
                    Ok(_) | Err(_) => {
                        tracing::warn!("persisted session user unreadable; discarding");
                        self.discard_persisted_session();
                        None
                    },
                }
            },
            _ => {
                tracing::warn!("persisted session incomplete; discarding");
                self.discard_persisted_session();
                None
            },
        }
    }

    fn load_unread(&self) -> BTreeMap<String, u32> {
        let Some(json) = self.read_key(UNREAD_KEY) else {
            return BTreeMap::new();
        };
        match serde_json::from_str::<BTreeMap<String, u32>>(&json) {
            Ok(counts) => {
                let mut normalized = BTreeMap::new();
                for (key, count) in counts {
                    if let Some(key) = normalize_key(&key) {
                        let total: &mut u32 = normalized.entry(key).or_insert(0);
                        *total = total.saturating_add(count);
                    }
                }
                normalized
            },
            Err(error) => {
                tracing::warn!(%error, "persisted unread counts unreadable; starting empty");
                BTreeMap::new()
            },
        }
    }

    fn discard_persisted_session(&self) {
        self.remove_key(USER_KEY);
        self.remove_key(TOKEN_KEY);
    }

    fn read_key(&self, key: &str) -> Option<String> {
        self.storage.get(key).unwrap_or_else(|error| {
            tracing::warn!(key, %error, "storage read failed");
            None
        })
    }

    fn write_key(&self, key: &str, value: &str) {
        if let Err(error) = self.storage.set(key, value) {
            tracing::warn!(key, %error, "storage write failed");
        }
    }

    fn remove_key(&self, key: &str) {
        if let Err(error) = self.storage.remove(key) {
            tracing::warn!(key, %error, "storage remove failed");
        }
    }

    fn notify(&mut self, change: StoreChange) {
        self.observers.notify(&change);
    }
}

/// String form of a conversation id. `None` if blank.
fn normalize_key(id: &impl Display) -> Option<String> {
    let key = id.to_string();
    let key = key.trim();
    if key.is_empty() { None } else { Some(key.to_owned()) }
}

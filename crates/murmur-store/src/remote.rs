//! Real-time events.
//!
//! [`RemoteEvent`] is the typed form of a server broadcast on the live
//! connection. Payloads are parsed strictly: an unknown `type` or a missing
//! field is an error at the boundary, never a half-applied update.

use murmur_client::{
    Message, MessageId, MessageStatus, ReactionKind, Transport, UserId, UserSummary,
};
use serde::Deserialize;

use crate::{Storage, Store};

/// Server broadcast received on the live connection.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RemoteEvent {
    /// A message was sent to one of the user's conversations.
    NewMessage {
        /// The message.
        message: Message,
    },
    /// A user started typing.
    Typing {
        /// Who is typing.
        username: String,
    },
    /// A user stopped typing.
    StopTyping {
        /// Who stopped.
        username: String,
    },
    /// Full roster of online users.
    OnlineUsers {
        /// Everyone currently online.
        users: Vec<UserSummary>,
    },
    /// A user reacted to a message.
    ReactionAdded {
        /// Target message.
        message_id: MessageId,
        /// Who reacted.
        user_id: UserId,
        /// Emoji used.
        emoji: String,
    },
    /// A user withdrew a reaction.
    ReactionRemoved {
        /// Target message.
        message_id: MessageId,
        /// Who withdrew it.
        user_id: UserId,
        /// Emoji withdrawn.
        emoji: String,
    },
    /// A message's delivery status changed.
    #[serde(rename = "message_status")]
    StatusChanged {
        /// Target message.
        message_id: MessageId,
        /// New status.
        status: MessageStatus,
    },
    /// A message was read.
    ReadMessage {
        /// Target message.
        message_id: MessageId,
        /// Reader.
        read_by: UserId,
    },
}

impl RemoteEvent {
    /// Parse a raw text frame.
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}

impl<S: Storage, T: Transport> Store<S, T> {
    /// Apply a real-time event through the matching store operation.
    pub fn apply_remote_event(&mut self, event: RemoteEvent) {
        match event {
            RemoteEvent::NewMessage { message } => self.receive_message(message),
            RemoteEvent::Typing { username } => self.add_typing_user(username),
            RemoteEvent::StopTyping { username } => self.remove_typing_user(&username),
            RemoteEvent::OnlineUsers { users } => self.set_presence(users),
            RemoteEvent::ReactionAdded { message_id, user_id, emoji } => {
                self.apply_remote_reaction(&message_id, &user_id, &emoji, ReactionKind::Added);
            },
            RemoteEvent::ReactionRemoved { message_id, user_id, emoji } => {
                self.apply_remote_reaction(&message_id, &user_id, &emoji, ReactionKind::Removed);
            },
            RemoteEvent::StatusChanged { message_id, status } => {
                self.update_message_status(&message_id, status);
            },
            RemoteEvent::ReadMessage { message_id, read_by } => {
                let by_sender = self.message(&message_id).is_some_and(|m| m.sender_id == read_by);
                if by_sender {
                    tracing::debug!(%message_id, "read receipt from the sender ignored");
                    return;
                }
                tracing::trace!(%message_id, %read_by, "message read");
                self.update_message_status(&message_id, MessageStatus::Read);
            },
        }
    }

    /// Take in a message pushed by the server.
    ///
    /// Messages for the selected conversation are appended. Anything else
    /// bumps that conversation's unread count, unless the session user sent
    /// it.
    pub fn receive_message(&mut self, message: Message) {
        let Some(viewer) = self.user().map(|u| u.id.clone()) else {
            tracing::warn!(message_id = %message.id, "dropping pushed message without a session");
            return;
        };

        let conversation = message.conversation_for(&viewer);
        if self.selected_conversation() == Some(&conversation) {
            self.append_message(message);
        } else if message.sender_id == viewer {
            tracing::debug!(message_id = %message.id, "own message for another conversation");
        } else {
            self.increment_unread_count(conversation);
        }
    }
}

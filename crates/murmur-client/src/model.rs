//! Domain model shared by the API client and the store.
//!
//! Wire payloads are parsed into these types at the API boundary. Anything
//! the server may omit or send as `null` is defaulted here, and payloads
//! that cannot be made whole (a message with no destination, a blank id)
//! are rejected as decode errors instead of leaking into the store.

use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap a raw id string.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Raw id string.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Whether the id is blank.
            pub fn is_empty(&self) -> bool {
                self.0.trim().is_empty()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }
    };
}

string_id!(
    /// Server-assigned user identifier.
    UserId
);

string_id!(
    /// Server-assigned group identifier.
    GroupId
);

string_id!(
    /// Server-assigned message identifier.
    MessageId
);

/// Emoji to the set of users who reacted with it.
///
/// Sets keep a user from reacting twice with the same emoji. Empty sets are
/// never stored; see [`Message::remove_reaction`].
pub type Reactions = BTreeMap<String, BTreeSet<UserId>>;

/// Delivery status of a message.
///
/// Ordered: a message moves `Sent -> Delivered -> Read`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum MessageStatus {
    /// Accepted by the server.
    #[default]
    Sent,
    /// Delivered to the recipient's client.
    #[serde(alias = "received")]
    Delivered,
    /// Seen by the recipient.
    Read,
}

impl fmt::Display for MessageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sent => f.write_str("sent"),
            Self::Delivered => f.write_str("delivered"),
            Self::Read => f.write_str("read"),
        }
    }
}

/// Whether a reaction event adds or removes the reaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReactionKind {
    /// User reacted.
    Added,
    /// User withdrew the reaction.
    Removed,
}

/// A conversation: either a direct chat with one peer or a group.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Conversation {
    /// Direct chat with the given peer.
    Direct(UserId),
    /// Group chat.
    Group(GroupId),
}

impl fmt::Display for Conversation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Direct(peer) => peer.fmt(f),
            Self::Group(group) => group.fmt(f),
        }
    }
}

/// Denormalized excerpt of the message being replied to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyPreview {
    /// Id of the original message.
    pub id: MessageId,
    /// Content of the original message.
    pub content: String,
    /// Author of the original message.
    pub sender_id: UserId,
}

/// A chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "WireMessage", into = "WireMessage")]
pub struct Message {
    /// Unique server-assigned id.
    pub id: MessageId,
    /// Author.
    pub sender_id: UserId,
    /// Direct peer or group the message was sent to.
    pub target: Conversation,
    /// Message text.
    pub content: String,
    /// Server timestamp.
    pub created_at: DateTime<Utc>,
    /// Delivery status.
    pub status: MessageStatus,
    /// Reactions by emoji.
    pub reactions: Reactions,
    /// Message this one replies to, if any.
    pub reply_to_message_id: Option<MessageId>,
    /// Excerpt of the replied-to message, if known.
    pub reply_preview: Option<ReplyPreview>,
}

impl Message {
    /// Create a message with `Sent` status and no reactions.
    pub fn new(
        id: impl Into<MessageId>,
        sender_id: impl Into<UserId>,
        target: Conversation,
        content: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            sender_id: sender_id.into(),
            target,
            content: content.into(),
            created_at,
            status: MessageStatus::Sent,
            reactions: Reactions::new(),
            reply_to_message_id: None,
            reply_preview: None,
        }
    }

    /// Mark this message as a reply to `original`.
    #[must_use]
    pub fn replying_to(mut self, original: impl Into<MessageId>) -> Self {
        self.reply_to_message_id = Some(original.into());
        self
    }

    /// Excerpt of this message for use as another message's reply preview.
    pub fn preview(&self) -> ReplyPreview {
        ReplyPreview {
            id: self.id.clone(),
            content: self.content.clone(),
            sender_id: self.sender_id.clone(),
        }
    }

    /// Users who reacted with `emoji`. `None` if nobody did.
    pub fn reactors(&self, emoji: &str) -> Option<&BTreeSet<UserId>> {
        self.reactions.get(emoji)
    }

    /// Record `user` reacting with `emoji`. Returns `false` if already
    /// recorded.
    pub fn add_reaction(&mut self, emoji: &str, user: &UserId) -> bool {
        self.reactions.entry(emoji.to_owned()).or_default().insert(user.clone())
    }

    /// Withdraw `user`'s `emoji` reaction, dropping the emoji once nobody
    /// is left. Returns `false` if there was nothing to remove.
    pub fn remove_reaction(&mut self, emoji: &str, user: &UserId) -> bool {
        let Some(users) = self.reactions.get_mut(emoji) else {
            return false;
        };
        let removed = users.remove(user);
        if users.is_empty() {
            self.reactions.remove(emoji);
        }
        removed
    }

    /// Conversation this message belongs to from `viewer`'s point of view.
    ///
    /// Direct messages are keyed by the other party: the receiver for
    /// messages `viewer` sent, the sender otherwise.
    pub fn conversation_for(&self, viewer: &UserId) -> Conversation {
        match &self.target {
            Conversation::Group(group) => Conversation::Group(group.clone()),
            Conversation::Direct(receiver) if &self.sender_id == viewer => {
                Conversation::Direct(receiver.clone())
            },
            Conversation::Direct(_) => Conversation::Direct(self.sender_id.clone()),
        }
    }
}

/// Minimal public profile of a user.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserSummary {
    /// User id.
    pub id: UserId,
    /// Login name.
    pub username: String,
}

/// Identity of the logged-in user.
///
/// Persisted separately from the bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    /// User id.
    pub id: UserId,
    /// Name shown in the UI.
    #[serde(rename = "username", alias = "display_name")]
    pub display_name: String,
}

impl SessionUser {
    /// Create a session identity.
    pub fn new(id: impl Into<UserId>, display_name: impl Into<String>) -> Self {
        Self { id: id.into(), display_name: display_name.into() }
    }
}

/// Group details as returned by the group endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GroupDetails {
    /// Group id.
    #[serde(alias = "ID")]
    pub id: GroupId,
    /// Display name.
    #[serde(default, alias = "Name", deserialize_with = "null_as_default")]
    pub name: String,
    /// Current members.
    #[serde(default, alias = "Users", deserialize_with = "null_as_default")]
    pub users: Vec<UserSummary>,
}

/// One page of conversation history, newest message first.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ConversationPage {
    /// Messages, newest first.
    #[serde(default, deserialize_with = "null_as_default")]
    pub messages: Vec<Message>,
}

impl ConversationPage {
    /// Messages in chronological (oldest first) order.
    pub fn into_chronological(self) -> Vec<Message> {
        let mut messages = self.messages;
        messages.reverse();
        messages
    }
}

/// Wire representation of [`Message`].
#[derive(Serialize, Deserialize)]
struct WireMessage {
    id: MessageId,
    sender_id: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    receiver_id: Option<UserId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    group_id: Option<GroupId>,
    #[serde(default, deserialize_with = "null_as_default")]
    content: String,
    #[serde(with = "timestamp")]
    created_at: DateTime<Utc>,
    #[serde(default, deserialize_with = "null_as_default")]
    status: MessageStatus,
    #[serde(default, deserialize_with = "null_as_default")]
    reactions: Reactions,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    reply_to_message_id: Option<MessageId>,
    #[serde(default, rename = "reply_to_message", skip_serializing_if = "Option::is_none")]
    reply_preview: Option<ReplyPreview>,
}

impl TryFrom<WireMessage> for Message {
    type Error = String;

    fn try_from(wire: WireMessage) -> Result<Self, Self::Error> {
        if wire.id.is_empty() {
            return Err("message id is empty".to_owned());
        }

        let group = wire.group_id.filter(|id| !id.is_empty());
        let receiver = wire.receiver_id.filter(|id| !id.is_empty());
        let target = match (group, receiver) {
            (Some(group), _) => Conversation::Group(group),
            (None, Some(peer)) => Conversation::Direct(peer),
            (None, None) => {
                return Err(format!("message {} has neither receiver_id nor group_id", wire.id));
            },
        };

        let mut reactions = wire.reactions;
        reactions.retain(|_, users| !users.is_empty());

        Ok(Self {
            id: wire.id,
            sender_id: wire.sender_id,
            target,
            content: wire.content,
            created_at: wire.created_at,
            status: wire.status,
            reactions,
            reply_to_message_id: wire.reply_to_message_id.filter(|id| !id.is_empty()),
            reply_preview: wire.reply_preview,
        })
    }
}

impl From<Message> for WireMessage {
    fn from(message: Message) -> Self {
        let (receiver_id, group_id) = match message.target {
            Conversation::Direct(peer) => (Some(peer), None),
            Conversation::Group(group) => (None, Some(group)),
        };
        Self {
            id: message.id,
            sender_id: message.sender_id,
            receiver_id,
            group_id,
            content: message.content,
            created_at: message.created_at,
            status: message.status,
            reactions: message.reactions,
            reply_to_message_id: message.reply_to_message_id,
            reply_preview: message.reply_preview,
        }
    }
}

/// Treat an explicit JSON `null` the same as a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Server timestamps: RFC 3339, or `YYYY-MM-DD HH:MM:SS` read as UTC.
mod timestamp {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    const NAIVE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

    pub(super) fn serialize<S: Serializer>(
        value: &DateTime<Utc>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_rfc3339())
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| D::Error::custom(format!("invalid timestamp: {raw}")))
    }

    pub(super) fn parse(raw: &str) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(raw).map(|t| t.with_timezone(&Utc)).ok().or_else(|| {
            NaiveDateTime::parse_from_str(raw, NAIVE_FORMAT).ok().map(|naive| naive.and_utc())
        })
    }
}

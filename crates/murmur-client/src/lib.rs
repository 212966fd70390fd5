//! Client
//!
//! Typed boundary between the murmur chat client and its HTTP API. Incoming
//! payloads are parsed into a strict domain model at this boundary so the
//! rest of the client never touches partially-shaped JSON.
//!
//! # Architecture
//!
//! The client follows a Sans-IO split: [`ApiClient`] owns request building,
//! bearer credential attachment, and response interception, while the actual
//! network I/O sits behind the [`Transport`] trait. Tests drive the client
//! with scripted transports; production uses [`http::HttpTransport`].
//!
//! # Components
//!
//! - [`ApiClient`]: Bearer header, unauthorized interception, typed endpoints
//! - [`Transport`]: Async request/response I/O abstraction
//! - [`model`]: Messages, reactions, ids, conversations, user summaries
//!
//! # Transport (optional)
//!
//! With the `transport` feature enabled, this crate also provides:
//! - [`http::HttpTransport`]: reqwest-backed transport
//! - [`http::HttpConfig`]: Base URL and timeout configuration

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod api;
mod error;
pub mod model;
mod transport;

#[cfg(feature = "transport")]
pub mod http;

pub use api::{ApiClient, AUTHORIZATION, PageRequest};
pub use error::{ApiError, TransportError};
pub use model::{
    Conversation, ConversationPage, GroupDetails, GroupId, Message, MessageId, MessageStatus,
    ReactionKind, Reactions, ReplyPreview, SessionUser, UserId, UserSummary,
};
pub use transport::{ApiRequest, ApiResponse, Transport};

//! Subcommands.

use std::{
    io::Write,
    sync::{Arc, Mutex, PoisonError},
};

use clap::{Args, Subcommand};
use murmur_client::{Conversation, GroupId, Message, SessionUser, Transport, UserId};
use murmur_store::{Navigation, Router, Storage, Store, StoreChange};

use crate::CliError;

/// A single CLI action.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start a session with a credential issued by the identity service
    Login {
        /// User id
        #[arg(long)]
        user_id: String,

        /// Display name
        #[arg(long)]
        name: String,

        /// Bearer token
        #[arg(long)]
        token: String,
    },

    /// End the session
    Logout,

    /// Print one page of a conversation's history, oldest first
    History {
        /// Conversation to load
        #[command(flatten)]
        conversation: ConversationArgs,

        /// 1-based page number
        #[arg(long, default_value_t = 1)]
        page: u32,

        /// Messages per page
        #[arg(long, default_value_t = 20)]
        page_size: u32,
    },

    /// List the members of a group
    Members {
        /// Group id
        #[arg(long)]
        group: String,
    },

    /// Show unread counts, or reset one
    Unread {
        /// Conversation id to reset
        #[arg(long)]
        clear: Option<String>,
    },

    /// Check whether navigation to a route is allowed
    Route {
        /// Route path, e.g. `/`
        path: String,
    },
}

/// Selects a direct or group conversation.
#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
pub struct ConversationArgs {
    /// Peer user id (direct conversation)
    #[arg(long)]
    pub peer: Option<String>,

    /// Group id
    #[arg(long)]
    pub group: Option<String>,
}

impl ConversationArgs {
    /// The selected conversation.
    ///
    /// # Errors
    ///
    /// Returns an error unless exactly one non-blank id is given.
    pub fn conversation(&self) -> Result<Conversation, CliError> {
        match (&self.peer, &self.group) {
            (Some(peer), None) if !peer.trim().is_empty() => {
                Ok(Conversation::Direct(UserId::new(peer.trim())))
            },
            (None, Some(group)) if !group.trim().is_empty() => {
                Ok(Conversation::Group(GroupId::new(group.trim())))
            },
            _ => Err(CliError::InvalidArgument("give exactly one of --peer or --group".into())),
        }
    }
}

/// Run `command` against `store`, writing human-readable output to `out`.
///
/// # Errors
///
/// Returns [`CliError::SessionExpired`] if the server rejected the session
/// while the command ran, and other variants for invalid input or failed
/// output.
pub async fn run<S: Storage, T: Transport>(
    store: &mut Store<S, T>,
    router: &Router,
    command: Command,
    out: &mut impl Write,
) -> Result<(), CliError> {
    let redirect: Arc<Mutex<Option<String>>> = Arc::default();
    let sink = Arc::clone(&redirect);
    let subscription = store.subscribe(move |change| {
        if let StoreChange::Redirect { path } = change {
            *sink.lock().unwrap_or_else(PoisonError::into_inner) = Some(path.clone());
        }
    });

    let result = execute(store, router, command, out).await;
    store.unsubscribe(subscription);

    let redirected = redirect.lock().unwrap_or_else(PoisonError::into_inner).take();
    if let Some(path) = redirected {
        tracing::warn!(%path, "session rejected by server");
        return Err(CliError::SessionExpired { path });
    }
    result
}

async fn execute<S: Storage, T: Transport>(
    store: &mut Store<S, T>,
    router: &Router,
    command: Command,
    out: &mut impl Write,
) -> Result<(), CliError> {
    match command {
        Command::Login { user_id, name, token } => {
            if user_id.trim().is_empty() || token.trim().is_empty() {
                return Err(CliError::InvalidArgument("user id and token must not be blank".into()));
            }
            store.set_session(SessionUser::new(user_id.trim(), name), token.trim());
            if let Some(user) = store.user() {
                writeln!(out, "logged in as {} ({})", user.display_name, user.id)?;
            }
        },
        Command::Logout => {
            store.clear_session();
            writeln!(out, "logged out")?;
        },
        Command::History { conversation, page, page_size } => {
            require_session(store)?;
            let conversation = conversation.conversation()?;
            store.select_conversation(conversation.clone());
            if !store.fetch_conversation_page(page, page_size).await {
                return Err(CliError::FetchFailed("conversation history".into()));
            }

            for message in store.messages() {
                write_message(out, message)?;
            }
            store.clear_unread_count(&conversation);
        },
        Command::Members { group } => {
            require_session(store)?;
            store.fetch_group_members(&GroupId::new(group.trim())).await;

            for member in store.group_members() {
                writeln!(out, "{}\t{}", member.id, member.username)?;
            }
        },
        Command::Unread { clear: Some(id) } => {
            let id = id.trim();
            if id.is_empty() {
                return Err(CliError::InvalidArgument("conversation id must not be blank".into()));
            }
            store.clear_unread_count(id);
            writeln!(out, "cleared {id}")?;
        },
        Command::Unread { clear: None } => {
            for (id, count) in store.unread_counts() {
                writeln!(out, "{id}\t{count}")?;
            }
        },
        Command::Route { path } => match router.guard(&path, store.storage()) {
            Navigation::Proceed => writeln!(out, "proceed")?,
            Navigation::Redirect(target) => writeln!(out, "redirect {target}")?,
        },
    }
    Ok(())
}

fn require_session<S: Storage, T: Transport>(store: &Store<S, T>) -> Result<(), CliError> {
    if store.is_logged_in() { Ok(()) } else { Err(CliError::NotLoggedIn) }
}

fn write_message(out: &mut impl Write, message: &Message) -> std::io::Result<()> {
    write!(
        out,
        "{} {}: {}",
        message.created_at.format("%Y-%m-%d %H:%M:%S"),
        message.sender_id,
        message.content
    )?;
    if let Some(preview) = &message.reply_preview {
        write!(out, " (re {}: {})", preview.sender_id, preview.content)?;
    }
    for (emoji, users) in &message.reactions {
        write!(out, " {emoji}{}", users.len())?;
    }
    writeln!(out, " [{}]", message.status)
}

//! Command-line front end for the murmur chat client.
//!
//! Each invocation restores a [`murmur_store::Store`] from a JSON state file,
//! runs one subcommand against it, and exits. Store state that should
//! survive (session, unread counts) persists through the file.
//!
//! # Components
//!
//! - [`FileStorage`]: JSON file implementing the store's persistence seam
//! - [`Command`]: Subcommands and their arguments
//! - [`run`]: Executes a command against a store
//! - [`CliError`]: Failures surfaced to the binary

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod command;
mod error;
mod file_storage;

pub use command::{Command, ConversationArgs, run};
pub use error::CliError;
pub use file_storage::FileStorage;

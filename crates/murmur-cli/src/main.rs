//! murmur command-line client.
//!
//! # Usage
//!
//! ```bash
//! # Adopt a credential issued by the identity service
//! murmur login --user-id 7f0c... --name alice --token eyJ...
//!
//! # Read a direct conversation and a group
//! murmur history --peer 1b2e...
//! murmur history --group 9a41... --page 2
//!
//! # Check the navigation guard
//! murmur route /
//! ```

use std::{path::PathBuf, time::Duration};

use clap::Parser;
use murmur_cli::{Command, FileStorage};
use murmur_client::http::{DEFAULT_BASE_URL, HttpConfig, HttpTransport};
use murmur_store::{Router, Store};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// murmur chat client
#[derive(Parser, Debug)]
#[command(name = "murmur")]
#[command(about = "Command-line client for the murmur chat service")]
#[command(version)]
struct Args {
    /// API base URL
    #[arg(long, default_value = DEFAULT_BASE_URL)]
    base_url: String,

    /// Path to the JSON state file (session and unread counts)
    #[arg(long, default_value = "murmur-state.json")]
    state_file: PathBuf,

    /// Request timeout in milliseconds
    #[arg(long, default_value = "10000")]
    timeout_ms: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    tracing::debug!(state_file = %args.state_file.display(), base_url = %args.base_url, "starting");

    let storage = FileStorage::open(&args.state_file)?;
    let transport = HttpTransport::new(HttpConfig {
        base_url: args.base_url,
        timeout: Duration::from_millis(args.timeout_ms),
    })?;
    let mut store = Store::restore(storage, transport);
    let router = Router::default();

    let mut stdout = std::io::stdout().lock();
    murmur_cli::run(&mut store, &router, args.command, &mut stdout).await?;

    Ok(())
}

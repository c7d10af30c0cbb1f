//! notekeep - command-line client for the notekeep personal notes service.
//!
//! Log in once, then create, edit, favorite and categorize notes. The
//! session token is kept in the OS keychain (or a credential file) between
//! runs.

mod app;
mod commands;
mod format;

use std::io;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use notekeep_core::Config;

use app::App;

/// Log file name prefix inside the cache directory
const LOG_FILE_PREFIX: &str = "notekeep.log";

#[derive(Parser)]
#[command(name = "notekeep")]
#[command(about = "Personal notes from the terminal")]
#[command(version)]
struct Cli {
    /// Notes API base URL (overrides config and NOTEKEEP_API_URL)
    #[arg(long, global = true, value_name = "URL")]
    api_url: Option<String>,

    /// Keep the session in memory only, for this run
    #[arg(long, global = true)]
    ephemeral: bool,

    /// Also write logs to a daily file in the cache directory
    #[arg(long, global = true)]
    log_file: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Log in with email and password
    Login {
        /// Account email (defaults to the last one used)
        email: Option<String>,

        /// Password (prompted when omitted)
        #[arg(long)]
        password: Option<String>,
    },

    /// Create an account and log into it
    Register {
        username: String,
        email: String,

        /// Password (prompted when omitted)
        #[arg(long)]
        password: Option<String>,
    },

    /// Forget the stored session
    Logout,

    /// Show who is logged in
    Whoami,

    /// Manage notes
    Notes {
        #[command(subcommand)]
        action: NotesCommand,
    },

    /// List favorite notes
    Favorites,

    /// Manage categories
    Categories {
        #[command(subcommand)]
        action: CategoriesCommand,
    },
}

#[derive(Subcommand)]
pub enum NotesCommand {
    /// List all notes
    List,

    /// Show one note
    Show { id: i64 },

    /// Create a note
    Create {
        title: String,

        #[arg(long, short)]
        description: String,

        /// Make the note public
        #[arg(long)]
        public: bool,
    },

    /// Edit a note; omitted fields keep their value
    Edit {
        id: i64,

        #[arg(long, short)]
        title: Option<String>,

        #[arg(long, short)]
        description: Option<String>,

        /// Set visibility (true = public)
        #[arg(long, value_name = "BOOL")]
        public: Option<bool>,
    },

    /// Delete a note
    Delete { id: i64 },

    /// Toggle the favorite flag of a note
    Favorite { id: i64 },
}

#[derive(Subcommand)]
pub enum CategoriesCommand {
    /// List all categories
    List,

    /// Create a category
    Create { name: String },

    /// Delete a category
    Delete { id: i64 },

    /// List the notes in a category
    Show { id: i64 },

    /// Add a note to a category
    AddNote { category_id: i64, note_id: i64 },

    /// Remove a note from a category
    RemoveNote { category_id: i64, note_id: i64 },
}

/// Initialize the tracing subscriber for logging.
///
/// Returns the file appender guard, which must live until exit.
fn init_tracing(config: &Config, log_file: bool) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match log_file.then(|| config.cache_dir()) {
        Some(Ok(dir)) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(fmt::layer().with_writer(writer).with_ansi(false)), Some(guard))
        }
        _ => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

fn load_config(api_url: Option<String>) -> Result<Config> {
    let mut config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            warn!(error = %e, "Failed to load config, using defaults");
            Config::default()
        }
    };
    config.apply_env(|key| std::env::var(key).ok())?;
    if api_url.is_some() {
        config.api_url = api_url;
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let base_config = Config::load().unwrap_or_default();
    let log_guard = init_tracing(&base_config, cli.log_file);
    info!("notekeep starting");

    let config = load_config(cli.api_url)?;
    let mut app = App::new(config, cli.ephemeral).await?;

    if let Err(e) = commands::run(&mut app, cli.command).await {
        error!(error = %e, "Command failed");
        eprintln!("Error: {}", commands::user_message(&e));
        // Flush file logs before exiting
        drop(log_guard);
        std::process::exit(1);
    }

    info!("notekeep finished");
    Ok(())
}

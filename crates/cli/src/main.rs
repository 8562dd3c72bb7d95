//! Nexus CLI: the main entry point.
//!
//! Commands:
//! - `onboard` Initialize config and data directories
//! - `chat`    Interactive chat or single-message mode
//! - `serve`   Start the HTTP API server
//! - `cache`   Inspect or invalidate cached game data

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "nexus",
    about = "Nexus: your gaming coach, on the command line",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize configuration and data directories
    Onboard,

    /// Chat with Nexus
    Chat {
        /// Send a single message instead of entering interactive mode
        #[arg(short, long)]
        message: Option<String>,

        /// User id whose profile and history to use
        #[arg(short, long, default_value = "local", env = "NEXUS_USER")]
        user: String,

        /// Load a single player profile from a JSON file
        #[arg(short, long)]
        profile: Option<PathBuf>,

        /// Print the reasoning trace after each reply
        #[arg(long)]
        trace: bool,
    },

    /// Start the HTTP API server
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Inspect or invalidate cached game data
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// List cached entries with their source and age
    List,

    /// Show one entry
    Info { key: String },

    /// Remove one entry, or everything when no key is given
    Invalidate { key: Option<String> },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Onboard => commands::onboard::run().await?,
        Commands::Chat {
            message,
            user,
            profile,
            trace,
        } => {
            commands::chat::run(commands::chat::ChatOptions {
                message,
                user,
                profile,
                show_trace: trace,
            })
            .await?
        }
        Commands::Serve { port } => commands::serve::run(port).await?,
        Commands::Cache { action } => match action {
            CacheAction::List => commands::cache::list().await?,
            CacheAction::Info { key } => commands::cache::info(&key).await?,
            CacheAction::Invalidate { key } => commands::cache::invalidate(key.as_deref()).await?,
        },
    }

    Ok(())
}

//! Quill CLI: the main entry point.
//!
//! Commands:
//! - `chat`    Interactive chat or single-message mode (the default)
//! - `init`    Write a starter config file
//! - `config`  Show, locate, or validate configuration
//! - `tools`   List the built-in tools

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;
mod display;
mod input;

#[derive(Parser)]
#[command(name = "quill", about = "Quill: a terminal coding assistant", version, author)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Send a single message instead of entering interactive mode
    #[arg(short, long)]
    message: Option<String>,

    /// Path to a config file
    #[arg(short, long, global = true, env = "QUILL_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat with the assistant
    Chat {
        /// Send a single message instead of entering interactive mode
        #[arg(short, long)]
        message: Option<String>,
    },

    /// Write a starter config file
    Init,

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// List the built-in tools
    Tools,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration (API key redacted)
    Show,
    /// Print the config file search path
    Path,
    /// Load and check the configuration
    Validate,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Logs go to stderr so they never interleave with streamed answers
    let filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = cli.config.as_deref();
    match cli.command {
        None => commands::chat::run(config, cli.message).await?,
        Some(Commands::Chat { message }) => {
            commands::chat::run(config, message.or(cli.message)).await?
        }
        Some(Commands::Init) => commands::init::run().await?,
        Some(Commands::Config { action }) => match action {
            ConfigAction::Show => commands::config_cmd::show(config).await?,
            ConfigAction::Path => commands::config_cmd::path().await?,
            ConfigAction::Validate => commands::config_cmd::validate(config).await?,
        },
        Some(Commands::Tools) => commands::tools::run().await?,
    }

    Ok(())
}

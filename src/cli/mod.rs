use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::core::ClientConfig;

pub mod chat;
pub mod files;

#[derive(Subcommand)]
enum Command {
    /// Start an interactive chat session (default)
    Chat {},
    /// Print the recent conversation history
    History {},
    /// List uploaded documents
    Files {},
    /// Upload a PDF to the knowledge base
    Upload {
        path: PathBuf,
    },
    /// Delete an uploaded document
    Delete {
        name: String,
        /// Skip the confirmation prompt
        #[arg(long, action, default_value = "false")]
        yes: bool,
    },
}

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Backend base URL, overrides RAGCHAT_API_BASE_URL
    #[arg(long, global = true)]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

fn init_tracing() {
    // Logs go to stderr so streamed answers on stdout stay readable
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("{}=info", env!("CARGO_CRATE_NAME")).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

pub async fn run() -> Result<()> {
    init_tracing();
    let args = Cli::parse();

    let config = match args.base_url {
        Some(url) => ClientConfig {
            api_base_url: url.trim_end_matches('/').to_string(),
            ..ClientConfig::default()
        },
        None => ClientConfig::default(),
    };
    tracing::debug!("Using backend at {}", config.api_base_url);

    // Handle each sub command
    match args.command {
        Some(Command::Chat {}) | None => {
            chat::run(config).await?;
        }
        Some(Command::History {}) => {
            files::history(config).await?;
        }
        Some(Command::Files {}) => {
            files::list(config).await?;
        }
        Some(Command::Upload { path }) => {
            files::upload(config, &path).await?;
        }
        Some(Command::Delete { name, yes }) => {
            files::delete(config, &name, yes).await?;
        }
    }

    Ok(())
}

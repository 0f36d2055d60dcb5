mod cli;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use memhost::config::MemhostConfig;

#[derive(Parser)]
#[command(name = "memhost", version, about = "Self-hosted local memory backend for AI agents")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the HTTP server on 127.0.0.1
    Serve {
        /// Port to listen on (overrides config and MEMHOST_PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Print the bearer token clients must send
    Token {
        /// Print the token file path instead of the token
        #[arg(long)]
        path: bool,
    },
    /// Show record counts per container tag
    Stats {
        #[arg(short, long)]
        tag: Option<String>,
    },
    /// Ranked keyword search within a container tag
    Search {
        query: String,
        #[arg(short, long)]
        tag: Option<String>,
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Show one record in full, including deleted ones
    Inspect {
        id: String,
        #[arg(short, long)]
        tag: Option<String>,
    },
    /// Dump the whole store as JSON to stdout
    Export,
    /// Check the snapshot and token files
    Doctor,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load config (for log level)
    let mut config = MemhostConfig::load()?;

    // Log to stderr so stdout stays clean for `token` and `export`.
    let filter = EnvFilter::try_new(&config.server.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Serve { port } => {
            if let Some(port) = port {
                config.server.port = port;
            }
            memhost::server::serve_http(config).await?;
        }
        Command::Token { path } => cli::token::token(&config, path)?,
        Command::Stats { tag } => cli::stats::stats(&config, tag.as_deref())?,
        Command::Search { query, tag, limit } => {
            cli::search::search_cmd(&config, &query, tag.as_deref(), limit)?
        }
        Command::Inspect { id, tag } => cli::inspect::inspect(&config, &id, tag.as_deref())?,
        Command::Export => cli::export::export(&config)?,
        Command::Doctor => cli::doctor::doctor(&config)?,
    }

    Ok(())
}

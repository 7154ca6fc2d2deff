//! Chexgate - HTTP gateway for chest X-ray classification and report generation.
//!
//! Accepts image URLs and scores them against fourteen thoracic findings via
//! a remote classifier, and answers questions or writes reports through a
//! generative chat endpoint.
//!
//! # Usage
//!
//! ```bash
//! # Start the server on the configured host/port
//! chexgate serve
//!
//! # Override the bind port
//! chexgate serve --port 9000
//!
//! # View configuration
//! chexgate config show
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cli;
mod logging;
mod server;

/// Chexgate - chest X-ray classification and reporting gateway.
#[derive(Parser, Debug)]
#[command(name = "chexgate")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    json_logs: bool,

    /// Config file path (defaults to the platform config directory)
    #[arg(long, global = true, env = "CHEXGATE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP gateway
    Serve(cli::serve::ServeArgs),

    /// View and manage configuration
    Config(cli::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve(args) => {
            // A broken config must stop the server, not fall back to defaults
            let config = cli::load_config(cli.config.as_deref())?;
            logging::init_from_config(&config, cli.verbose, cli.json_logs);
            tracing::debug!("chexgate v{}", chexgate_core::VERSION);
            cli::serve::execute(args, config).await
        }
        Commands::Config(args) => {
            logging::init(if cli.verbose { "debug" } else { "warn" }, cli.json_logs);
            cli::config::execute(args, cli.config.as_deref()).await
        }
    }
}

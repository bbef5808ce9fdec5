//! balas CLI — the main entry point.
//!
//! Commands:
//! - `init`     — Write a starter `balas.toml`
//! - `serve`    — Run the responder and its HTTP control surface
//! - `doctor`   — Diagnose configuration and data directories
//! - `cleanup`  — Remove the transport auth session

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "balas",
    about = "balas — automated chat responder with a tiered reply pipeline",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to balas.toml (defaults to the working directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a starter configuration file
    Init,

    /// Run the responder and the HTTP control surface
    Serve {
        /// Override the control-surface port
        #[arg(short, long)]
        port: Option<u16>,

        /// Start the chat session immediately instead of waiting for
        /// POST /api/session/start
        #[arg(long)]
        autostart: bool,
    },

    /// Diagnose configuration and data directories
    Doctor,

    /// Remove the transport auth session so the next start pairs fresh
    Cleanup,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Init => commands::init::run(cli.config)?,
        Commands::Serve { port, autostart } => {
            commands::serve::run(cli.config, port, autostart).await?
        }
        Commands::Doctor => commands::doctor::run(cli.config)?,
        Commands::Cleanup => commands::cleanup::run(cli.config)?,
    }

    Ok(())
}

mod commands;

use std::net::IpAddr;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::error;
use tracing_subscriber::EnvFilter;

// ============================================================================
// CLI Types
// ============================================================================

/// Voyagent - conversational travel booking agent
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the chat server
    Serve {
        /// Path to configuration file
        #[arg(short, long, default_value = "voyagent.yaml")]
        config: String,

        /// Host to bind to (overrides config file)
        #[arg(long)]
        host: Option<IpAddr>,

        /// Port to listen on (overrides config file)
        #[arg(short, long)]
        port: Option<u16>,
    },
}

// ============================================================================
// Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> std::process::ExitCode {
    init_tracing();

    match run().await {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            std::process::ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { config, host, port } => commands::serve::run(&config, host, port).await,
    }
}

// ============================================================================
// Initialization
// ============================================================================

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

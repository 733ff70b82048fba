//! Mascot CLI — the main entry point.
//!
//! Commands:
//! - `serve`    — Start the HTTP service
//! - `ask`      — Ask a mascot one question without HTTP
//! - `doctor`   — Check configuration and dependency reachability
//! - `personas` — List the configured mascots

use clap::{Parser, Subcommand};
use mascot_config::{AppConfig, ConfigError};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "mascot",
    about = "Uplifted Mascot — project Q&A grounded in documentation",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (defaults to $MASCOT_CONFIG, then ./mascot.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP service
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Ask a mascot a single question (no rate limiting)
    Ask {
        /// Project whose documentation to search
        #[arg(long)]
        project: String,

        /// Mascot persona id
        #[arg(long, default_value = "gooey")]
        mascot: String,

        /// Number of chunks to retrieve (1-20)
        #[arg(long)]
        top_k: Option<i64>,

        /// The question
        question: String,
    },

    /// Check configuration and dependency reachability
    Doctor,

    /// List configured mascot personas
    Personas,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let loaded = AppConfig::load(cli.config.as_deref());
    let log_level = loaded
        .as_ref()
        .map(|c| c.log_level.clone())
        .unwrap_or_else(|_| "info".to_string());
    init_tracing(&log_level, cli.verbose, cli.json_logs);

    match cli.command {
        Commands::Serve { port } => commands::serve::run(require(loaded)?, port).await?,
        Commands::Ask {
            project,
            mascot,
            top_k,
            question,
        } => commands::ask::run(require(loaded)?, project, mascot, top_k, question).await?,
        Commands::Doctor => commands::doctor::run(loaded).await?,
        Commands::Personas => commands::personas::run(&require(loaded)?)?,
    }

    Ok(())
}

fn require(
    loaded: Result<AppConfig, ConfigError>,
) -> Result<AppConfig, Box<dyn std::error::Error>> {
    loaded.map_err(|e| format!("Failed to load config: {e}").into())
}

/// `RUST_LOG` wins, then the configured level; `--verbose` forces debug.
fn init_tracing(level: &str, verbose: bool, json: bool) {
    let filter = if verbose {
        tracing_subscriber::EnvFilter::new("debug")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level))
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

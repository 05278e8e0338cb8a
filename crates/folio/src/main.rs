//! Folio - document version-history server.
//!
//! This is the main entry point for the folio CLI.

mod commands;

use clap::{Parser, Subcommand};
use commands::*;
use folio_core::Config;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "folio")]
#[command(author, version, about = "Document version-history server", long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Extra config file, applied after the global and project configs
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Development mode: use a built-in token secret if none is configured
    #[arg(long, global = true)]
    dev: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Address to bind to (overrides config)
        #[arg(short, long)]
        address: Option<String>,

        /// Keep everything in memory; nothing survives a restart
        #[arg(long)]
        memory: bool,

        /// Directory for the JSON store (overrides config)
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },

    /// Issue a bearer token for a user
    Token {
        /// User id to put in the token subject
        #[arg(short, long)]
        user: String,

        /// Token lifetime in seconds (overrides config)
        #[arg(long)]
        ttl: Option<u64>,
    },

    /// Show the effective configuration
    Config,

    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cwd = std::env::current_dir()?;

    let (mut config, sources) = Config::load(Some(cwd.as_path()), cli.config.as_deref()).await?;
    if cli.dev {
        config.enable_dev_mode();
    }

    let headless = matches!(cli.command, Commands::Serve { .. });
    let log_file = init_logging(&config, cli.verbose, headless);

    let result = match cli.command {
        Commands::Serve {
            address,
            memory,
            data_dir,
        } => {
            run_server(
                config,
                ServeOptions {
                    address,
                    memory,
                    data_dir,
                },
            )
            .await
        }
        Commands::Token { user, ttl } => issue_token(&config, &user, ttl),
        Commands::Config => show_config(&config, &sources),
        Commands::Version => {
            print_version();
            Ok(())
        }
    };

    if let (Err(_), Some(path)) = (&result, log_file) {
        eprintln!("Logs: {}", path.display());
    }

    result
}

/// Print the merged configuration with the token secret masked.
fn show_config(config: &Config, sources: &[PathBuf]) -> anyhow::Result<()> {
    println!("Configuration sources:");
    if sources.is_empty() {
        println!("  (none)");
    } else {
        for source in sources {
            println!("  {}", source.display());
        }
    }
    println!();

    let mut shown = config.clone();
    if let Some(server) = shown.server.as_mut() {
        if server.jwt_secret.is_some() {
            server.jwt_secret = Some("********".to_string());
        }
    }

    println!("Current configuration:");
    println!("{}", serde_json::to_string_pretty(&shown)?);

    Ok(())
}

/// Print version information.
fn print_version() {
    println!("folio {}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("Document version history with structural diffs.");
}

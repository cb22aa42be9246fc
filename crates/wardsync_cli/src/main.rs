//! Wardsync CLI
//!
//! Command-line driver for the Wardsync engine over JSON files: a local
//! store file and a remote snapshot file standing in for the server.
//!
//! # Commands
//!
//! - `sync` - Run one sync and save the store
//! - `watch` - Run periodic syncs in the background runner
//! - `inspect` - Display store contents and sync bookkeeping

mod commands;
mod remote;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Wardsync command-line sync tools.
#[derive(Parser)]
#[command(name = "wardsync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the local store file (JSON)
    #[arg(global = true, short, long)]
    store: Option<PathBuf>,

    /// Path to a JSON engine configuration
    #[arg(global = true, short, long)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one sync against a remote snapshot
    Sync {
        /// Path to the remote snapshot (JSON)
        #[arg(short, long)]
        remote: PathBuf,

        /// Comma-separated phases, e.g. USERS,PATIENTS (default: all)
        #[arg(short, long)]
        phases: Option<String>,

        /// Treat the remote as unreachable
        #[arg(long)]
        offline: bool,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Run periodic syncs until the requested count is reached
    Watch {
        /// Path to the remote snapshot (JSON), re-read on every sync
        #[arg(short, long)]
        remote: PathBuf,

        /// Comma-separated phases (default: all)
        #[arg(short, long)]
        phases: Option<String>,

        /// Seconds between syncs (default: from config, else 60)
        #[arg(short, long)]
        interval: Option<u64>,

        /// Stop after this many syncs
        #[arg(short = 'n', long)]
        count: Option<u64>,
    },

    /// Display store contents and sync bookkeeping
    Inspect {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging; RUST_LOG overrides the default level.
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = commands::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Sync {
            remote,
            phases,
            offline,
            format,
        } => {
            let store = cli.store.ok_or("Store path required for sync")?;
            commands::sync::run(
                &store,
                &remote,
                phases.as_deref(),
                offline,
                config,
                &format,
            )?;
        }
        Commands::Watch {
            remote,
            phases,
            interval,
            count,
        } => {
            let store = cli.store.ok_or("Store path required for watch")?;
            commands::watch::run(&store, &remote, phases.as_deref(), interval, count, config)?;
        }
        Commands::Inspect { format } => {
            let store = cli.store.ok_or("Store path required for inspect")?;
            commands::inspect::run(&store, &format)?;
        }
        Commands::Version => {
            println!("Wardsync CLI v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}

// SPDX-License-Identifier: AGPL-3.0-or-later
//! Satchel CLI
//!
//! Drives the offline worker from a terminal: precache a site, fetch through
//! the caching strategies, inspect caches and the background sync queue.

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "satchel")]
#[command(author, version, about = "Satchel - offline cache engine for the Kita site", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Worker config file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Site origin, overrides the config file
    #[arg(long, global = true)]
    origin: Option<String>,

    /// Serve the origin from this directory instead of the network
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// Durable store location
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Cache version tag, overrides the config file
    #[arg(long = "cache-version", global = true)]
    cache_version: Option<String>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch a path through the worker
    Fetch {
        /// Site path, e.g. /about
        path: String,

        /// Send as a page navigation (Accept: text/html)
        #[arg(long)]
        html: bool,

        /// Simulate having no network
        #[arg(long)]
        offline: bool,

        /// Print the response body
        #[arg(short, long)]
        body: bool,
    },

    /// Precache the application shell
    Install,

    /// Delete caches from other versions
    Activate,

    /// Install the configured version and collect outdated caches
    Update,

    /// Show caches
    Caches {
        /// Delete every cache of the current version
        #[arg(long)]
        clear: bool,

        /// Do not ask for confirmation
        #[arg(short, long)]
        force: bool,
    },

    /// List queued submissions
    Queue,

    /// Queue a submission for background sync
    Enqueue {
        /// registration or contact
        kind: String,

        /// JSON payload
        payload: String,
    },

    /// Replay queued submissions for a sync tag
    Sync {
        /// urgent-registration-sync or contact-form-sync
        tag: String,
    },

    /// Render the notification for a push payload
    Push {
        /// JSON payload; omitted means an empty push
        payload: Option<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "satchel_worker={default_level},satchel_cache={default_level},satchel_providers={default_level}"
        ))
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();

    let options = commands::Options {
        config: cli.config,
        origin: cli.origin,
        root: cli.root,
        data_dir: cli.data_dir,
        version: cli.cache_version,
        verbose: cli.verbose,
    };

    let result = match cli.command {
        Commands::Fetch { path, html, offline, body } => {
            commands::fetch(&options, &path, html, offline, body).await
        }
        Commands::Install => commands::install(&options).await,
        Commands::Activate => commands::activate(&options).await,
        Commands::Update => commands::update(&options).await,
        Commands::Caches { clear, force } => commands::caches(&options, clear, force).await,
        Commands::Queue => commands::queue(&options).await,
        Commands::Enqueue { kind, payload } => commands::enqueue(&options, &kind, &payload).await,
        Commands::Sync { tag } => commands::sync(&options, &tag).await,
        Commands::Push { payload } => commands::push(&options, payload.as_deref()).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

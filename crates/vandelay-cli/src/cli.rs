//! CLI argument parsing for the `vandelay` binary.
//!
//! Flags override every other configuration source.

use clap::{Parser, Subcommand};

/// Vandelay catalog enrichment
///
/// Pulls a museum collection catalog, stores each object's primary image,
/// indexes image embeddings, and writes a manifest of enriched objects.
#[derive(Parser, Debug)]
#[command(name = "vandelay")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to config file (overrides default <config_dir>/vandelay/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Set log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a full enrichment pass
    Run(RunArgs),

    /// Fetch one catalog object and print it as JSON
    Fetch {
        /// Object identifier
        id: u64,
    },

    /// Download the embedding model into the local cache
    DownloadModel,
}

/// Overrides for a single run
#[derive(clap::Args, Debug, Default, Clone)]
pub struct RunArgs {
    /// Maximum simultaneous catalog record requests
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Records enriched at once
    #[arg(long)]
    pub enrich_concurrency: Option<usize>,

    /// Process at most this many objects (0 = all)
    #[arg(long)]
    pub limit: Option<usize>,

    /// Blob key for the manifest
    #[arg(long)]
    pub manifest_key: Option<String>,

    /// Output directory for the filesystem blob backend
    #[arg(long)]
    pub blob_root: Option<String>,
}

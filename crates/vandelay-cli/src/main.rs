//! Vandelay catalog enrichment
//!
//! Fetches every object in a museum collection API, stores each object's
//! primary image, indexes an image embedding per object, and writes a JSON
//! manifest of all fetched objects.
//!
//! # Usage
//!
//! ```bash
//! vandelay run [--concurrency N] [--enrich-concurrency N] [--limit N]
//! vandelay fetch <ID>
//! vandelay download-model
//! ```
//!
//! # Configuration
//!
//! Configuration is loaded in order (later sources override earlier):
//! 1. Built-in defaults
//! 2. Config file (<config_dir>/vandelay/config.toml)
//! 3. File passed with --config
//! 4. Environment variables (VANDELAY_*)
//! 5. CLI flags

use anyhow::Result;
use clap::Parser;

use vandelay_cli::{download_model, fetch_record, run_enrichment, Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run(args) => {
            let stats =
                run_enrichment(cli.config.as_deref(), cli.log_level.as_deref(), &args).await?;
            println!("{}", stats);
        }
        Commands::Fetch { id } => {
            fetch_record(cli.config.as_deref(), cli.log_level.as_deref(), id).await?;
        }
        Commands::DownloadModel => {
            download_model(cli.config.as_deref(), cli.log_level.as_deref()).await?;
        }
    }

    Ok(())
}

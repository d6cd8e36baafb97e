//! Vandelay CLI library exports.
//!
//! # Modules
//!
//! - `cli`: Command-line argument parsing with clap
//! - `commands`: Command implementations (run, fetch, download-model)

pub mod cli;
pub mod commands;

pub use cli::{Cli, Commands, RunArgs};
pub use commands::{
    apply_run_overrides, build_blob_store, build_catalog_client, build_vector_store,
    download_model, fetch_record, load_settings, model_cache, run_enrichment,
};

//! Scribe CLI - notes with categories, tags and file attachments
//!
//! Talks to the Supabase project configured through `SCRIBE_*` variables,
//! read from the environment, a local `.env` file or
//! `<config dir>/scribe/scribe.env`.

mod auth;
mod cli;
mod commands;
mod error;


use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;
use crate::error::CliError;

const DEFAULT_LOG_FILTER: &str = "scribe=info";

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    load_env_files();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    commands::run(cli).await
}

/// Load `.env` from the working directory, then the user config file.
/// Variables already set are never overridden.
fn load_env_files() {
    dotenvy::dotenv().ok();
    if let Some(path) = user_env_file() {
        dotenvy::from_path(path).ok();
    }
}

fn user_env_file() -> Option<PathBuf> {
    let path = dirs::config_dir()?.join("scribe").join("scribe.env");
    path.is_file().then_some(path)
}

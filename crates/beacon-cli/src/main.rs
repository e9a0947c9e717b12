//! `beacon`, the command-line front end for the Beacon signal store.
//!
//! # Usage
//!
//! ```text
//! beacon init
//! beacon company add --name Acme --domain acme.example
//! beacon ingest --text post.txt --company <ID> --embedding post.json
//! beacon signal add --company <ID> --type funding_round --value '{"amount":5000000}' --source <SOURCE>
//! beacon export <ID> --out exports/acme.json
//! ```
//!
//! The store path comes from `store_path` in `beacon.toml` (or the file given
//! with `--config`), then `BEACON_STORE_PATH`, then `--store`.

mod cli;
mod commands;
mod settings;

use anyhow::Context as _;
use beacon_store_sqlite::SqliteStore;
use clap::Parser;
use cli::Cli;
use settings::{Settings, expand_tilde};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Logs go to stderr; stdout carries command output.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .with_writer(std::io::stderr)
    .init();

  let cli = Cli::parse();

  let settings = Settings::load(&cli.config)?;
  let store_path = match &cli.store {
    Some(path) => expand_tilde(path),
    None => settings.store_path,
  };

  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;
  tracing::debug!(path = %store_path.display(), "store opened");

  let mut stdout = std::io::stdout().lock();
  commands::run(&store, cli.command, &mut stdout).await
}

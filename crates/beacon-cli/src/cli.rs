//! Command-line arguments.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "beacon", author, version, about = "Beacon signal store")]
pub struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "beacon.toml")]
  pub config: PathBuf,

  /// Path to the SQLite store; overrides `store_path` from the config.
  #[arg(long, value_name = "FILE")]
  pub store: Option<PathBuf>,

  #[command(subcommand)]
  pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
  /// Create the store and its schema if they do not exist.
  Init,

  /// Manage companies.
  #[command(subcommand)]
  Company(CompanyCommand),

  /// Ingest a document. Documents whose content was already ingested are
  /// skipped.
  Ingest(IngestArgs),

  /// Record and inspect signals.
  #[command(subcommand)]
  Signal(SignalCommand),

  /// List the sources nearest to an embedding.
  Similar {
    /// JSON file holding the query embedding as an array of numbers.
    #[arg(long, value_name = "FILE")]
    embedding: PathBuf,

    /// Maximum number of results.
    #[arg(short, default_value_t = 5)]
    k: usize,
  },

  /// Write a company's snapshot (company, signals, sources) as JSON.
  Export {
    company: Uuid,

    /// Output file; parent directories are created. Defaults to stdout.
    #[arg(short, long, value_name = "FILE")]
    out: Option<PathBuf>,
  },

  /// Print row counts.
  Stats,
}

#[derive(Subcommand, Debug)]
pub enum CompanyCommand {
  /// Create a company and print its id.
  Add {
    #[arg(long)]
    name:   String,
    #[arg(long)]
    domain: Option<String>,
    /// Notes as a JSON document.
    #[arg(long, value_parser = parse_json)]
    notes:  Option<serde_json::Value>,
  },
  List,
  Show {
    id: Uuid,
  },
  /// Replace a company's notes; omit the document to clear them.
  Notes {
    id:    Uuid,
    #[arg(value_parser = parse_json)]
    notes: Option<serde_json::Value>,
  },
}

#[derive(Args, Debug)]
pub struct IngestArgs {
  /// File holding the document's plain text.
  #[arg(long, value_name = "FILE")]
  pub text:         PathBuf,
  #[arg(long)]
  pub company:      Option<Uuid>,
  /// Stored in normalised form.
  #[arg(long)]
  pub url:          Option<String>,
  #[arg(long)]
  pub title:        Option<String>,
  #[arg(long)]
  pub language:     Option<String>,
  /// RFC 3339 timestamp.
  #[arg(long)]
  pub published_at: Option<DateTime<Utc>>,
  /// Deduplication key; defaults to the SHA-256 of the text.
  #[arg(long)]
  pub hash:         Option<String>,
  /// JSON file holding the document embedding.
  #[arg(long, value_name = "FILE")]
  pub embedding:    Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum SignalCommand {
  /// Record a signal and print its id.
  Add {
    #[arg(long)]
    company:     Option<Uuid>,
    #[arg(long = "type")]
    signal_type: Option<String>,
    /// Payload as a JSON document.
    #[arg(long, value_parser = parse_json)]
    value:       Option<serde_json::Value>,
    #[arg(long)]
    confidence:  Option<f64>,
    /// Evidence source id; repeatable. Not checked for existence.
    #[arg(long = "source")]
    sources:     Vec<Uuid>,
    /// RFC 3339 timestamp; defaults to now.
    #[arg(long)]
    detected_at: Option<DateTime<Utc>>,
  },
  /// List a company's signals, newest first.
  List {
    company:     Uuid,
    #[arg(long = "type")]
    signal_type: Option<String>,
  },
  Show {
    id:      Uuid,
    /// Also load the cited sources and report missing ones.
    #[arg(long)]
    resolve: bool,
  },
}

/// Parse an argument as a JSON document rather than a JSON string.
fn parse_json(raw: &str) -> Result<serde_json::Value, serde_json::Error> {
  serde_json::from_str(raw)
}

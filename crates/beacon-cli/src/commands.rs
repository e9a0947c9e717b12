//! Command execution against an open store.
//!
//! Every command writes its result to `out` as pretty-printed JSON, except
//! `export` with `--out`, which writes the snapshot to the named file.

use std::{io::Write, path::Path};

use anyhow::{Context as _, bail};
use beacon_core::{
  company::NewCompany,
  content::{content_hash, normalize_url},
  embedding::Embedding,
  signal::NewSignal,
  source::{NewSource, Source},
  store::SignalStore as _,
};
use beacon_store_sqlite::{Error as StoreError, SqliteStore};
use serde::Serialize;
use uuid::Uuid;

use crate::cli::{Command, CompanyCommand, IngestArgs, SignalCommand};

// ─── Dispatch ────────────────────────────────────────────────────────────────

pub async fn run(
  store: &SqliteStore,
  command: Command,
  out: &mut impl Write,
) -> anyhow::Result<()> {
  match command {
    Command::Init => print_json(out, &store.stats().await?),
    Command::Company(cmd) => company(store, cmd, out).await,
    Command::Ingest(args) => match ingest(store, args).await? {
      IngestOutcome::Ingested(source) => print_json(out, &source),
      IngestOutcome::AlreadySeen(source_id) => {
        tracing::info!(%source_id, "content already ingested");
        print_json(out, &serde_json::json!({ "already_seen": source_id }))
      }
    },
    Command::Signal(cmd) => signal(store, cmd, out).await,
    Command::Similar { embedding, k } => {
      let embedding = read_embedding(&embedding)?;
      print_json(out, &store.find_similar_sources(&embedding, k).await?)
    }
    Command::Export { company, out: path } => export(store, company, path.as_deref(), out).await,
    Command::Stats => print_json(out, &store.stats().await?),
  }
}

// ─── Companies ───────────────────────────────────────────────────────────────

async fn company(
  store: &SqliteStore,
  command: CompanyCommand,
  out: &mut impl Write,
) -> anyhow::Result<()> {
  match command {
    CompanyCommand::Add { name, domain, notes } => {
      let company = store
        .upsert_company(NewCompany { name, domain, notes })
        .await?;
      print_json(out, &company)
    }
    CompanyCommand::List => print_json(out, &store.list_companies().await?),
    CompanyCommand::Show { id } => match store.get_company(id).await? {
      Some(company) => print_json(out, &company),
      None => bail!("company {id} not found"),
    },
    CompanyCommand::Notes { id, notes } => {
      match store.update_company_notes(id, notes).await? {
        Some(company) => print_json(out, &company),
        None => bail!("company {id} not found"),
      }
    }
  }
}

// ─── Ingest ──────────────────────────────────────────────────────────────────

/// Result of an ingest attempt.
#[derive(Debug)]
pub enum IngestOutcome {
  Ingested(Source),
  /// The content hash is already stored under this source id.
  AlreadySeen(Uuid),
}

pub async fn ingest(store: &SqliteStore, args: IngestArgs) -> anyhow::Result<IngestOutcome> {
  let text = std::fs::read_to_string(&args.text)
    .with_context(|| format!("reading {}", args.text.display()))?;
  let hash = args.hash.unwrap_or_else(|| content_hash(&text));

  if let Some(existing) = store.find_source_by_hash(&hash).await? {
    return Ok(IngestOutcome::AlreadySeen(existing.source_id));
  }

  let embedding = args.embedding.as_deref().map(read_embedding).transpose()?;

  let input = NewSource {
    company_id:   args.company,
    url:          args.url.as_deref().map(normalize_url),
    title:        args.title,
    published_at: args.published_at,
    language:     args.language,
    raw_text:     Some(text),
    hash,
    embedding,
  };

  match store.ingest_source(input).await {
    Ok(source) => Ok(IngestOutcome::Ingested(source)),
    // Lost a race with another writer between the lookup and the insert.
    Err(StoreError::DuplicateContent(hash)) => {
      let existing = store
        .find_source_by_hash(&hash)
        .await?
        .with_context(|| format!("source with hash {hash} vanished"))?;
      Ok(IngestOutcome::AlreadySeen(existing.source_id))
    }
    Err(StoreError::ReferenceNotFound(id)) => bail!("company {id} not found"),
    Err(e) => Err(e.into()),
  }
}

// ─── Signals ─────────────────────────────────────────────────────────────────

async fn signal(
  store: &SqliteStore,
  command: SignalCommand,
  out: &mut impl Write,
) -> anyhow::Result<()> {
  match command {
    SignalCommand::Add {
      company,
      signal_type,
      value,
      confidence,
      sources,
      detected_at,
    } => {
      let input = NewSignal {
        company_id:  company,
        signal_type,
        value,
        confidence,
        source_ids:  sources.into(),
        detected_at,
      };
      match store.record_signal(input).await {
        Ok(signal) => print_json(out, &signal),
        Err(StoreError::ReferenceNotFound(id)) => bail!("company {id} not found"),
        Err(e) => Err(e.into()),
      }
    }
    SignalCommand::List { company, signal_type } => {
      let signals = store
        .list_signals_for_company(company, signal_type.as_deref())
        .await?;
      print_json(out, &signals)
    }
    SignalCommand::Show { id, resolve } => {
      let Some(signal) = store.get_signal(id).await? else {
        bail!("signal {id} not found");
      };
      if !resolve {
        return print_json(out, &signal);
      }
      let evidence = store.resolve_evidence(&signal).await?;
      print_json(
        out,
        &serde_json::json!({ "signal": signal, "evidence": evidence }),
      )
    }
  }
}

// ─── Export ──────────────────────────────────────────────────────────────────

async fn export(
  store: &SqliteStore,
  company_id: Uuid,
  path: Option<&Path>,
  out: &mut impl Write,
) -> anyhow::Result<()> {
  let Some(snapshot) = store.snapshot(company_id).await? else {
    bail!("company {company_id} not found");
  };

  let Some(path) = path else {
    return print_json(out, &snapshot);
  };

  if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
    std::fs::create_dir_all(parent)
      .with_context(|| format!("creating {}", parent.display()))?;
  }
  let json = serde_json::to_string_pretty(&snapshot)?;
  std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;

  tracing::info!(
    company_id = %company_id,
    signals = snapshot.signals.len(),
    sources = snapshot.sources.len(),
    path = %path.display(),
    "snapshot exported"
  );
  Ok(())
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

/// Read an embedding stored as a JSON array of numbers.
fn read_embedding(path: &Path) -> anyhow::Result<Embedding> {
  let raw = std::fs::read_to_string(path)
    .with_context(|| format!("reading {}", path.display()))?;
  let values: Vec<f32> = serde_json::from_str(&raw)
    .with_context(|| format!("parsing embedding in {}", path.display()))?;
  Embedding::new(values).with_context(|| format!("invalid embedding in {}", path.display()))
}

fn print_json<T: Serialize + ?Sized>(out: &mut impl Write, value: &T) -> anyhow::Result<()> {
  serde_json::to_writer_pretty(&mut *out, value)?;
  writeln!(out)?;
  Ok(())
}

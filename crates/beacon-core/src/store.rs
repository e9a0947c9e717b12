//! The `SignalStore` trait and supporting types.
//!
//! The trait is implemented by storage backends (e.g. `beacon-store-sqlite`).
//! Callers that ingest documents or derive signals depend on this
//! abstraction, not on any concrete backend.

use std::future::Future;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  company::{Company, NewCompany},
  embedding::Embedding,
  signal::{NewSignal, ResolvedEvidence, Signal},
  snapshot::Snapshot,
  source::{NewSource, SimilarSource, Source},
};

/// Row counts reported by [`SignalStore::stats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
  pub companies:        u64,
  pub sources:          u64,
  /// Sources carrying an embedding, i.e. reachable by similarity search.
  pub embedded_sources: u64,
  pub signals:          u64,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a Beacon signal store backend.
///
/// Backends must enforce two constraints atomically:
///
/// - `source.hash` is unique; a second ingest of the same hash fails with the
///   backend's duplicate-content error, even under concurrent writers.
/// - a non-null `company_id` on a source or signal names an existing company;
///   otherwise the write fails with the backend's reference-not-found error.
///
/// Nothing else is validated. In particular a signal's evidence set is stored
/// exactly as given.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes.
pub trait SignalStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Companies ─────────────────────────────────────────────────────────

  /// Persist a new company. Always inserts: names are not unique and the
  /// store applies no deduplication policy.
  fn upsert_company(
    &self,
    input: NewCompany,
  ) -> impl Future<Output = Result<Company, Self::Error>> + Send + '_;

  /// Retrieve a company by UUID. Returns `None` if not found.
  fn get_company(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Company>, Self::Error>> + Send + '_;

  /// List all companies, oldest first.
  fn list_companies(
    &self,
  ) -> impl Future<Output = Result<Vec<Company>, Self::Error>> + Send + '_;

  /// Replace a company's notes. Returns the updated company, or `None` if
  /// the company does not exist.
  fn update_company_notes(
    &self,
    id: Uuid,
    notes: Option<serde_json::Value>,
  ) -> impl Future<Output = Result<Option<Company>, Self::Error>> + Send + '_;

  // ── Sources ───────────────────────────────────────────────────────────

  /// Persist a new source. Fails if its hash is already stored or if its
  /// company does not exist.
  fn ingest_source(
    &self,
    input: NewSource,
  ) -> impl Future<Output = Result<Source, Self::Error>> + Send + '_;

  fn get_source(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Source>, Self::Error>> + Send + '_;

  /// Look up the source stored under a content hash, if any.
  fn find_source_by_hash<'a>(
    &'a self,
    hash: &'a str,
  ) -> impl Future<Output = Result<Option<Source>, Self::Error>> + Send + 'a;

  /// Sources owned by a company, most recently published first. Sources
  /// without a publication date come last.
  fn list_sources_for_company(
    &self,
    company_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Source>, Self::Error>> + Send + '_;

  /// The `k` sources nearest to `embedding`, nearest first. Sources without
  /// an embedding are never returned.
  fn find_similar_sources<'a>(
    &'a self,
    embedding: &'a Embedding,
    k: usize,
  ) -> impl Future<Output = Result<Vec<SimilarSource>, Self::Error>> + Send + 'a;

  // ── Signals ───────────────────────────────────────────────────────────

  /// Persist a new signal. `detected_at` defaults to now.
  fn record_signal(
    &self,
    input: NewSignal,
  ) -> impl Future<Output = Result<Signal, Self::Error>> + Send + '_;

  fn get_signal(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Signal>, Self::Error>> + Send + '_;

  /// Signals about a company, newest `detected_at` first, optionally
  /// restricted to one type tag. An unknown company yields an empty list.
  fn list_signals_for_company<'a>(
    &'a self,
    company_id: Uuid,
    signal_type: Option<&'a str>,
  ) -> impl Future<Output = Result<Vec<Signal>, Self::Error>> + Send + 'a;

  /// Load the sources a signal cites, reporting ids with no stored source
  /// rather than failing.
  fn resolve_evidence<'a>(
    &'a self,
    signal: &'a Signal,
  ) -> impl Future<Output = Result<ResolvedEvidence, Self::Error>> + Send + 'a;

  // ── Read models ───────────────────────────────────────────────────────

  /// Materialise a [`Snapshot`] for a company. Returns `None` if the
  /// company does not exist.
  fn snapshot(
    &self,
    company_id: Uuid,
  ) -> impl Future<Output = Result<Option<Snapshot>, Self::Error>> + Send + '_;

  fn stats(
    &self,
  ) -> impl Future<Output = Result<StoreStats, Self::Error>> + Send + '_;
}

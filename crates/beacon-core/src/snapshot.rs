//! The per-company read model exported as JSON.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{company::Company, signal::Signal, source::Source};

/// Everything known about one company at `generated_at`. Never stored,
/// always derived.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
  pub company:      Company,
  pub generated_at: DateTime<Utc>,
  /// Newest first.
  pub signals:      Vec<Signal>,
  /// Embeddings are stripped; they are large and meaningless to readers.
  pub sources:      Vec<Source>,
}

impl Snapshot {
  pub fn new(
    company: Company,
    generated_at: DateTime<Utc>,
    signals: Vec<Signal>,
    sources: Vec<Source>,
  ) -> Self {
    let sources = sources
      .into_iter()
      .map(|source| Source { embedding: None, ..source })
      .collect();
    Self { company, generated_at, signals, sources }
  }
}

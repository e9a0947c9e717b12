//! Signals: derived, evidenced facts about companies.
//!
//! Signals are immutable once written. Their evidence is a list of source ids
//! that the store records verbatim and never validates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::source::Source;

// ─── Evidence ────────────────────────────────────────────────────────────────

/// The source ids a signal cites as evidence.
///
/// This is a weak reference list, not a relation: ids may name sources that
/// were never stored. Readers must tolerate dangling entries; see
/// [`crate::store::SignalStore::resolve_evidence`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EvidenceSet(Vec<Uuid>);

impl EvidenceSet {
  pub fn new(ids: Vec<Uuid>) -> Self { Self(ids) }

  pub fn ids(&self) -> &[Uuid] { &self.0 }

  pub fn len(&self) -> usize { self.0.len() }

  pub fn is_empty(&self) -> bool { self.0.is_empty() }

  pub fn contains(&self, id: &Uuid) -> bool { self.0.contains(id) }
}

impl From<Vec<Uuid>> for EvidenceSet {
  fn from(ids: Vec<Uuid>) -> Self { Self(ids) }
}

impl FromIterator<Uuid> for EvidenceSet {
  fn from_iter<T: IntoIterator<Item = Uuid>>(iter: T) -> Self {
    Self(iter.into_iter().collect())
  }
}

/// The outcome of looking up a signal's evidence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResolvedEvidence {
  /// Sources that exist, in evidence order.
  pub found:   Vec<Source>,
  /// Evidence ids with no stored source.
  pub missing: Vec<Uuid>,
}

// ─── Signal ──────────────────────────────────────────────────────────────────

/// A stored signal. No field is ever updated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
  pub signal_id:   Uuid,
  pub company_id:  Option<Uuid>,
  /// Free-form type tag, e.g. `"funding_round"`. The vocabulary belongs to
  /// whatever process derives signals.
  #[serde(rename = "type")]
  pub signal_type: Option<String>,
  pub value:       Option<serde_json::Value>,
  pub confidence:  Option<f64>,
  pub source_ids:  EvidenceSet,
  pub detected_at: DateTime<Utc>,
}

/// Input to [`crate::store::SignalStore::record_signal`].
///
/// `detected_at` defaults to the time the store records the signal.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewSignal {
  pub company_id:  Option<Uuid>,
  pub signal_type: Option<String>,
  pub value:       Option<serde_json::Value>,
  /// Stored as given, except that NaN is rejected.
  pub confidence:  Option<f64>,
  pub source_ids:  EvidenceSet,
  pub detected_at: Option<DateTime<Utc>>,
}

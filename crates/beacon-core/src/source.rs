//! Sources: ingested documents and observations.
//!
//! A source is identified for deduplication purposes by its content `hash`;
//! no two stored sources share one. Sources may belong to a company or be
//! orphans.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{content::content_hash, embedding::Embedding};

/// A stored document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
  pub source_id:    Uuid,
  pub company_id:   Option<Uuid>,
  pub url:          Option<String>,
  pub title:        Option<String>,
  pub published_at: Option<DateTime<Utc>>,
  pub language:     Option<String>,
  pub raw_text:     Option<String>,
  /// Deduplication key; unique across all sources.
  pub hash:         String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub embedding:    Option<Embedding>,
  /// Server-assigned timestamp; never changes after creation.
  pub ingested_at:  DateTime<Utc>,
}

/// Input to [`crate::store::SignalStore::ingest_source`].
#[derive(Debug, Clone, PartialEq)]
pub struct NewSource {
  pub company_id:   Option<Uuid>,
  pub url:          Option<String>,
  pub title:        Option<String>,
  pub published_at: Option<DateTime<Utc>>,
  pub language:     Option<String>,
  pub raw_text:     Option<String>,
  pub hash:         String,
  pub embedding:    Option<Embedding>,
}

impl NewSource {
  /// A source with only its deduplication hash set.
  pub fn new(hash: impl Into<String>) -> Self {
    Self {
      company_id:   None,
      url:          None,
      title:        None,
      published_at: None,
      language:     None,
      raw_text:     None,
      hash:         hash.into(),
      embedding:    None,
    }
  }

  /// A source carrying `text`, keyed by its [`content_hash`].
  pub fn from_text(text: impl Into<String>) -> Self {
    let text = text.into();
    let mut source = Self::new(content_hash(&text));
    source.raw_text = Some(text);
    source
  }
}

/// One hit from [`crate::store::SignalStore::find_similar_sources`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarSource {
  pub source:   Source,
  /// Cosine distance to the query; smaller is closer.
  pub distance: f32,
}

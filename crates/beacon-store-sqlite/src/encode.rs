//! Encoding and decoding helpers between Rust domain types and the
//! representations stored in SQLite columns.
//!
//! Timestamps are integer microseconds since the Unix epoch. Every
//! `DateTime<Utc>` fits, negative years included, and `ORDER BY` on the raw
//! column is chronological. Structured documents and evidence sets are
//! compact JSON.
//! UUIDs are hyphenated lowercase strings. Embeddings are little-endian `f32`
//! blobs.

use beacon_core::{
  company::Company,
  embedding::Embedding,
  signal::{EvidenceSet, Signal},
  source::Source,
};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> i64 { dt.timestamp_micros() }

pub fn decode_dt(micros: i64) -> Result<DateTime<Utc>> {
  DateTime::from_timestamp_micros(micros).ok_or(Error::TimestampOutOfRange(micros))
}

/// Truncate to what [`encode_dt`] keeps, so values handed back to callers
/// compare equal to what a later read returns.
pub fn truncate_dt(dt: DateTime<Utc>) -> DateTime<Utc> {
  DateTime::from_timestamp_micros(encode_dt(dt)).unwrap_or(dt)
}

// ─── JSON documents ──────────────────────────────────────────────────────────

pub fn encode_json(value: Option<&serde_json::Value>) -> Option<String> {
  value.map(serde_json::Value::to_string)
}

pub fn decode_json(s: Option<&str>) -> Result<Option<serde_json::Value>> {
  Ok(s.map(serde_json::from_str).transpose()?)
}

// ─── Evidence ────────────────────────────────────────────────────────────────

pub fn encode_evidence(set: &EvidenceSet) -> Result<String> {
  Ok(serde_json::to_string(set)?)
}

pub fn decode_evidence(s: &str) -> Result<EvidenceSet> {
  Ok(serde_json::from_str(s)?)
}

// ─── Embedding ───────────────────────────────────────────────────────────────

pub fn encode_embedding(embedding: &Embedding) -> Vec<u8> {
  embedding
    .as_slice()
    .iter()
    .flat_map(|f| f.to_le_bytes())
    .collect()
}

pub fn decode_embedding(blob: &[u8]) -> Result<Embedding> {
  if blob.len() % 4 != 0 {
    return Err(Error::CorruptEmbedding(blob.len()));
  }
  let values = blob
    .chunks_exact(4)
    .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
    .collect();
  Ok(Embedding::new(values)?)
}

// ─── Row types ───────────────────────────────────────────────────────────────

pub const COMPANY_COLUMNS: &str = "id, name, domain, notes, created_at";

/// Raw values read directly from a `company` row.
pub struct RawCompany {
  pub id:         String,
  pub name:       String,
  pub domain:     Option<String>,
  pub notes:      Option<String>,
  pub created_at: i64,
}

impl RawCompany {
  /// Expects the columns in [`COMPANY_COLUMNS`] order.
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:         row.get(0)?,
      name:       row.get(1)?,
      domain:     row.get(2)?,
      notes:      row.get(3)?,
      created_at: row.get(4)?,
    })
  }

  pub fn into_company(self) -> Result<Company> {
    Ok(Company {
      company_id: decode_uuid(&self.id)?,
      name:       self.name,
      domain:     self.domain,
      notes:      decode_json(self.notes.as_deref())?,
      created_at: decode_dt(self.created_at)?,
    })
  }
}

pub const SOURCE_COLUMNS: &str = "id, company_id, url, title, published_at, \
                                  language, raw_text, hash, embedding, ingested_at";

/// Raw values read directly from a `source` row.
pub struct RawSource {
  pub id:           String,
  pub company_id:   Option<String>,
  pub url:          Option<String>,
  pub title:        Option<String>,
  pub published_at: Option<i64>,
  pub language:     Option<String>,
  pub raw_text:     Option<String>,
  pub hash:         String,
  pub embedding:    Option<Vec<u8>>,
  pub ingested_at:  i64,
}

impl RawSource {
  /// Expects the columns in [`SOURCE_COLUMNS`] order.
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:           row.get(0)?,
      company_id:   row.get(1)?,
      url:          row.get(2)?,
      title:        row.get(3)?,
      published_at: row.get(4)?,
      language:     row.get(5)?,
      raw_text:     row.get(6)?,
      hash:         row.get(7)?,
      embedding:    row.get(8)?,
      ingested_at:  row.get(9)?,
    })
  }

  pub fn into_source(self) -> Result<Source> {
    Ok(Source {
      source_id:    decode_uuid(&self.id)?,
      company_id:   self.company_id.as_deref().map(decode_uuid).transpose()?,
      url:          self.url,
      title:        self.title,
      published_at: self.published_at.map(decode_dt).transpose()?,
      language:     self.language,
      raw_text:     self.raw_text,
      hash:         self.hash,
      embedding:    self.embedding.as_deref().map(decode_embedding).transpose()?,
      ingested_at:  decode_dt(self.ingested_at)?,
    })
  }
}

pub const SIGNAL_COLUMNS: &str =
  "id, company_id, type, value, confidence, source_ids, detected_at";

/// Raw values read directly from a `signal` row.
pub struct RawSignal {
  pub id:          String,
  pub company_id:  Option<String>,
  pub signal_type: Option<String>,
  pub value:       Option<String>,
  pub confidence:  Option<f64>,
  pub source_ids:  String,
  pub detected_at: i64,
}

impl RawSignal {
  /// Expects the columns in [`SIGNAL_COLUMNS`] order.
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:          row.get(0)?,
      company_id:  row.get(1)?,
      signal_type: row.get(2)?,
      value:       row.get(3)?,
      confidence:  row.get(4)?,
      source_ids:  row.get(5)?,
      detected_at: row.get(6)?,
    })
  }

  pub fn into_signal(self) -> Result<Signal> {
    Ok(Signal {
      signal_id:   decode_uuid(&self.id)?,
      company_id:  self.company_id.as_deref().map(decode_uuid).transpose()?,
      signal_type: self.signal_type,
      value:       decode_json(self.value.as_deref())?,
      confidence:  self.confidence,
      source_ids:  decode_evidence(&self.source_ids)?,
      detected_at: decode_dt(self.detected_at)?,
    })
  }
}

//! Error type for `beacon-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] beacon_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  /// A stored timestamp lies outside the range `chrono` can represent.
  #[error("timestamp out of range: {0} microseconds since the epoch")]
  TimestampOutOfRange(i64),

  /// Confidence was NaN, which SQLite would silently store as NULL.
  #[error("signal confidence is NaN")]
  NanConfidence,

  /// A source with this content hash is already stored.
  #[error("duplicate content: a source with hash {0} already exists")]
  DuplicateContent(String),

  /// A `company_id` names a company that does not exist.
  #[error("company not found: {0}")]
  ReferenceNotFound(uuid::Uuid),

  /// A stored embedding blob is not a whole number of `f32` values.
  #[error("corrupt embedding blob of {0} bytes")]
  CorruptEmbedding(usize),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

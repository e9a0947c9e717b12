//! The SQLite implementation of [`SignalStore`].

use std::{collections::HashMap, path::Path, sync::Arc};

use beacon_core::{
  company::{Company, NewCompany},
  embedding::Embedding,
  index::{ExactIndex, VectorIndex},
  signal::{NewSignal, ResolvedEvidence, Signal},
  snapshot::Snapshot,
  source::{NewSource, SimilarSource, Source},
  store::{SignalStore, StoreStats},
};
use chrono::Utc;
use rusqlite::{OptionalExtension as _, ffi};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
  Error, Result,
  encode::{
    COMPANY_COLUMNS, RawCompany, RawSignal, RawSource, SIGNAL_COLUMNS,
    SOURCE_COLUMNS, decode_embedding, decode_uuid, encode_dt, encode_embedding,
    encode_evidence, encode_json, encode_uuid, truncate_dt,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// Ids bound per `IN (...)` lookup.
const LOOKUP_CHUNK: usize = 500;

/// A Beacon signal store backed by a single SQLite file.
///
/// Similarity search is answered from an in-memory [`VectorIndex`] hydrated
/// from the `source` table at open time and updated on every ingest through
/// this handle. Writes made by other processes become visible to search after
/// [`SqliteStore::rebuild_index`].
///
/// Clones share the connection and the index.
pub struct SqliteStore<I = ExactIndex> {
  conn:  tokio_rusqlite::Connection,
  index: Arc<RwLock<I>>,
}

impl<I> Clone for SqliteStore<I> {
  fn clone(&self) -> Self {
    Self {
      conn:  self.conn.clone(),
      index: Arc::clone(&self.index),
    }
  }
}

impl SqliteStore {
  /// Open (or create) a store at `path` with the exact vector index.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    Self::open_with_index(path, ExactIndex::default()).await
  }

  /// Open an in-memory store.
  pub async fn open_in_memory() -> Result<Self> {
    Self::open_in_memory_with_index(ExactIndex::default()).await
  }
}

impl<I: VectorIndex + 'static> SqliteStore<I> {
  /// Open (or create) a store at `path`, answering similarity queries from
  /// `index`.
  pub async fn open_with_index(path: impl AsRef<Path>, index: I) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    Self::init(conn, index).await
  }

  pub async fn open_in_memory_with_index(index: I) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    Self::init(conn, index).await
  }

  async fn init(conn: tokio_rusqlite::Connection, index: I) -> Result<Self> {
    let store = Self {
      conn,
      index: Arc::new(RwLock::new(index)),
    };
    store.init_schema().await?;
    store.rebuild_index().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Reload the vector index from every stored embedding. Returns the number
  /// of indexed sources.
  ///
  /// The index write lock is held from before the read until the reload
  /// finishes, so an ingest that commits meanwhile lands in the index after
  /// the rebuild instead of being cleared by it.
  pub async fn rebuild_index(&self) -> Result<usize> {
    let mut index = self.index.write().await;

    let rows: Vec<(String, Vec<u8>)> = self
      .conn
      .call(|conn| {
        let mut stmt =
          conn.prepare("SELECT id, embedding FROM source WHERE embedding IS NOT NULL")?;
        let rows = stmt
          .query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, Vec<u8>>(1)?))
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    let entries = rows
      .into_iter()
      .map(|(id, blob)| Ok((decode_uuid(&id)?, decode_embedding(&blob)?)))
      .collect::<Result<Vec<_>>>()?;

    index.clear();
    for (id, embedding) in &entries {
      index.insert(*id, embedding);
    }
    tracing::debug!(entries = index.len(), "vector index rebuilt");
    Ok(index.len())
  }

  /// Fetch sources by id. Unknown ids are simply absent from the map.
  ///
  /// Ids are looked up [`LOOKUP_CHUNK`] at a time to stay under SQLite's
  /// bound-parameter limit.
  async fn load_sources(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, Source>> {
    if ids.is_empty() {
      return Ok(HashMap::new());
    }
    let id_strs: Vec<String> = ids.iter().copied().map(encode_uuid).collect();

    let raws: Vec<RawSource> = self
      .conn
      .call(move |conn| {
        let mut rows = Vec::new();
        for chunk in id_strs.chunks(LOOKUP_CHUNK) {
          let placeholders = vec!["?"; chunk.len()].join(", ");
          let mut stmt = conn.prepare(&format!(
            "SELECT {SOURCE_COLUMNS} FROM source WHERE id IN ({placeholders})"
          ))?;
          let found = stmt
            .query_map(rusqlite::params_from_iter(chunk.iter()), RawSource::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
          rows.extend(found);
        }
        Ok(rows)
      })
      .await?;

    raws
      .into_iter()
      .map(|raw| {
        let source = raw.into_source()?;
        Ok((source.source_id, source))
      })
      .collect()
  }
}

/// Translate a failed insert into the constraint it violated, if any.
///
/// The only UNIQUE column is `source.hash` and the only foreign keys are the
/// `company_id` columns, so the extended result code identifies the cause.
fn classify_write_error(
  err: tokio_rusqlite::Error,
  hash: Option<&str>,
  company_id: Option<Uuid>,
) -> Error {
  if let tokio_rusqlite::Error::Rusqlite(rusqlite::Error::SqliteFailure(failure, _)) = &err {
    match (failure.extended_code, hash, company_id) {
      (ffi::SQLITE_CONSTRAINT_UNIQUE, Some(hash), _) => {
        return Error::DuplicateContent(hash.to_owned());
      }
      (ffi::SQLITE_CONSTRAINT_FOREIGNKEY, _, Some(id)) => {
        return Error::ReferenceNotFound(id);
      }
      _ => {}
    }
  }
  Error::Database(err)
}

// ─── SignalStore impl ────────────────────────────────────────────────────────

impl<I: VectorIndex + 'static> SignalStore for SqliteStore<I> {
  type Error = Error;

  // ── Companies ─────────────────────────────────────────────────────────────

  async fn upsert_company(&self, input: NewCompany) -> Result<Company> {
    let company = Company {
      company_id: Uuid::new_v4(),
      name:       input.name,
      domain:     input.domain,
      notes:      input.notes,
      created_at: truncate_dt(Utc::now()),
    };

    let id_str    = encode_uuid(company.company_id);
    let name      = company.name.clone();
    let domain    = company.domain.clone();
    let notes_str = encode_json(company.notes.as_ref());
    let created   = encode_dt(company.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO company (id, name, domain, notes, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![id_str, name, domain, notes_str, created],
        )?;
        Ok(())
      })
      .await?;

    tracing::debug!(company_id = %company.company_id, name = %company.name, "company created");
    Ok(company)
  }

  async fn get_company(&self, id: Uuid) -> Result<Option<Company>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawCompany> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {COMPANY_COLUMNS} FROM company WHERE id = ?1"),
            rusqlite::params![id_str],
            RawCompany::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawCompany::into_company).transpose()
  }

  async fn list_companies(&self) -> Result<Vec<Company>> {
    let raws: Vec<RawCompany> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {COMPANY_COLUMNS} FROM company ORDER BY created_at, rowid"
        ))?;
        let rows = stmt
          .query_map([], RawCompany::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawCompany::into_company).collect()
  }

  async fn update_company_notes(
    &self,
    id:    Uuid,
    notes: Option<serde_json::Value>,
  ) -> Result<Option<Company>> {
    let id_str    = encode_uuid(id);
    let notes_str = encode_json(notes.as_ref());

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE company SET notes = ?2 WHERE id = ?1",
          rusqlite::params![id_str, notes_str],
        )?)
      })
      .await?;

    if changed == 0 {
      return Ok(None);
    }
    self.get_company(id).await
  }

  // ── Sources ───────────────────────────────────────────────────────────────

  async fn ingest_source(&self, input: NewSource) -> Result<Source> {
    let source = Source {
      source_id:    Uuid::new_v4(),
      company_id:   input.company_id,
      url:          input.url,
      title:        input.title,
      published_at: input.published_at.map(truncate_dt),
      language:     input.language,
      raw_text:     input.raw_text,
      hash:         input.hash,
      embedding:    input.embedding,
      ingested_at:  truncate_dt(Utc::now()),
    };

    let id_str         = encode_uuid(source.source_id);
    let company_str    = source.company_id.map(encode_uuid);
    let url            = source.url.clone();
    let title          = source.title.clone();
    let published      = source.published_at.map(encode_dt);
    let language       = source.language.clone();
    let raw_text       = source.raw_text.clone();
    let hash           = source.hash.clone();
    let embedding_blob = source.embedding.as_ref().map(encode_embedding);
    let ingested       = encode_dt(source.ingested_at);

    let inserted = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO source (
             id, company_id, url, title, published_at,
             language, raw_text, hash, embedding, ingested_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
          rusqlite::params![
            id_str,
            company_str,
            url,
            title,
            published,
            language,
            raw_text,
            hash,
            embedding_blob,
            ingested,
          ],
        )?;
        Ok(())
      })
      .await;

    if let Err(err) = inserted {
      let err = classify_write_error(err, Some(&source.hash), source.company_id);
      if let Error::DuplicateContent(hash) = &err {
        tracing::warn!(%hash, "rejected source with duplicate content");
      }
      return Err(err);
    }

    if let Some(embedding) = &source.embedding {
      self.index.write().await.insert(source.source_id, embedding);
    }

    tracing::debug!(source_id = %source.source_id, hash = %source.hash, "source ingested");
    Ok(source)
  }

  async fn get_source(&self, id: Uuid) -> Result<Option<Source>> {
    Ok(self.load_sources(&[id]).await?.remove(&id))
  }

  async fn find_source_by_hash(&self, hash: &str) -> Result<Option<Source>> {
    let hash = hash.to_owned();

    let raw: Option<RawSource> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {SOURCE_COLUMNS} FROM source WHERE hash = ?1"),
            rusqlite::params![hash],
            RawSource::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawSource::into_source).transpose()
  }

  async fn list_sources_for_company(&self, company_id: Uuid) -> Result<Vec<Source>> {
    let company_str = encode_uuid(company_id);

    let raws: Vec<RawSource> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {SOURCE_COLUMNS} FROM source
           WHERE company_id = ?1
           ORDER BY published_at IS NULL, published_at DESC,
                    ingested_at DESC, rowid DESC"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![company_str], RawSource::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawSource::into_source).collect()
  }

  async fn find_similar_sources(
    &self,
    embedding: &Embedding,
    k:         usize,
  ) -> Result<Vec<SimilarSource>> {
    let neighbors = self.index.read().await.search(embedding, k);
    let ids: Vec<Uuid> = neighbors.iter().map(|n| n.id).collect();
    let mut sources = self.load_sources(&ids).await?;

    Ok(
      neighbors
        .into_iter()
        .filter_map(|n| {
          sources
            .remove(&n.id)
            .map(|source| SimilarSource { source, distance: n.distance })
        })
        .collect(),
    )
  }

  // ── Signals ───────────────────────────────────────────────────────────────

  async fn record_signal(&self, input: NewSignal) -> Result<Signal> {
    if input.confidence.is_some_and(f64::is_nan) {
      return Err(Error::NanConfidence);
    }

    let signal = Signal {
      signal_id:   Uuid::new_v4(),
      company_id:  input.company_id,
      signal_type: input.signal_type,
      value:       input.value,
      confidence:  input.confidence,
      source_ids:  input.source_ids,
      detected_at: truncate_dt(input.detected_at.unwrap_or_else(Utc::now)),
    };

    let id_str       = encode_uuid(signal.signal_id);
    let company_str  = signal.company_id.map(encode_uuid);
    let signal_type  = signal.signal_type.clone();
    let value_str    = encode_json(signal.value.as_ref());
    let confidence   = signal.confidence;
    let evidence_str = encode_evidence(&signal.source_ids)?;
    let detected     = encode_dt(signal.detected_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO signal (
             id, company_id, type, value, confidence, source_ids, detected_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          rusqlite::params![
            id_str,
            company_str,
            signal_type,
            value_str,
            confidence,
            evidence_str,
            detected,
          ],
        )?;
        Ok(())
      })
      .await
      .map_err(|e| classify_write_error(e, None, signal.company_id))?;

    tracing::debug!(
      signal_id = %signal.signal_id,
      evidence = signal.source_ids.len(),
      "signal recorded"
    );
    Ok(signal)
  }

  async fn get_signal(&self, id: Uuid) -> Result<Option<Signal>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawSignal> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {SIGNAL_COLUMNS} FROM signal WHERE id = ?1"),
            rusqlite::params![id_str],
            RawSignal::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawSignal::into_signal).transpose()
  }

  async fn list_signals_for_company(
    &self,
    company_id:  Uuid,
    signal_type: Option<&str>,
  ) -> Result<Vec<Signal>> {
    let company_str = encode_uuid(company_id);
    let type_filter = signal_type.map(str::to_owned);

    let raws: Vec<RawSignal> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {SIGNAL_COLUMNS} FROM signal
           WHERE company_id = ?1
             AND (?2 IS NULL OR type = ?2)
           ORDER BY detected_at DESC, rowid DESC"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![company_str, type_filter], RawSignal::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawSignal::into_signal).collect()
  }

  async fn resolve_evidence(&self, signal: &Signal) -> Result<ResolvedEvidence> {
    let sources = self.load_sources(signal.source_ids.ids()).await?;

    let mut evidence = ResolvedEvidence::default();
    for id in signal.source_ids.ids() {
      match sources.get(id) {
        Some(source) => evidence.found.push(source.clone()),
        None => evidence.missing.push(*id),
      }
    }

    if !evidence.missing.is_empty() {
      tracing::debug!(
        signal_id = %signal.signal_id,
        missing = evidence.missing.len(),
        "signal cites sources that are not stored"
      );
    }
    Ok(evidence)
  }

  // ── Read models ───────────────────────────────────────────────────────────

  async fn snapshot(&self, company_id: Uuid) -> Result<Option<Snapshot>> {
    let company = match self.get_company(company_id).await? {
      Some(c) => c,
      None    => return Ok(None),
    };

    let signals = self.list_signals_for_company(company_id, None).await?;
    let sources = self.list_sources_for_company(company_id).await?;

    Ok(Some(Snapshot::new(company, Utc::now(), signals, sources)))
  }

  async fn stats(&self) -> Result<StoreStats> {
    let (companies, sources, embedded_sources, signals): (i64, i64, i64, i64) = self
      .conn
      .call(|conn| {
        Ok(conn.query_row(
          "SELECT
             (SELECT COUNT(*) FROM company),
             (SELECT COUNT(*) FROM source),
             (SELECT COUNT(*) FROM source WHERE embedding IS NOT NULL),
             (SELECT COUNT(*) FROM signal)",
          [],
          |row| {
            Ok((
              row.get::<_, i64>(0)?,
              row.get::<_, i64>(1)?,
              row.get::<_, i64>(2)?,
              row.get::<_, i64>(3)?,
            ))
          },
        )?)
      })
      .await?;

    Ok(StoreStats {
      companies:        companies as u64,
      sources:          sources as u64,
      embedded_sources: embedded_sources as u64,
      signals:          signals as u64,
    })
  }
}

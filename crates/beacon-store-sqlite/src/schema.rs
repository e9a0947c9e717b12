//! SQL schema for the Beacon SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS company (
    id          TEXT PRIMARY KEY,
    name        TEXT NOT NULL,
    domain      TEXT,
    notes       TEXT,            -- JSON document or NULL
    created_at  INTEGER NOT NULL -- microseconds since the Unix epoch
);

CREATE TABLE IF NOT EXISTS source (
    id           TEXT PRIMARY KEY,
    company_id   TEXT REFERENCES company(id),
    url          TEXT,
    title        TEXT,
    published_at INTEGER,
    language     TEXT,
    raw_text     TEXT,
    hash         TEXT NOT NULL UNIQUE,
    embedding    BLOB,           -- 1536 little-endian f32 values or NULL
    ingested_at  INTEGER NOT NULL
);

-- Signals are never updated.
-- source_ids is a JSON array of UUIDs with no foreign-key backing.
CREATE TABLE IF NOT EXISTS signal (
    id          TEXT PRIMARY KEY,
    company_id  TEXT REFERENCES company(id),
    type        TEXT,
    value       TEXT,            -- JSON document or NULL
    confidence  REAL,            -- never NaN; SQLite would store it as NULL
    source_ids  TEXT NOT NULL DEFAULT '[]',
    detected_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS source_company_idx  ON source(company_id);
CREATE INDEX IF NOT EXISTS signal_company_idx  ON signal(company_id, detected_at);
CREATE INDEX IF NOT EXISTS signal_type_idx     ON signal(type);

PRAGMA user_version = 1;
";

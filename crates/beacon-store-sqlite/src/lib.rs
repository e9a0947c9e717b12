//! SQLite backend for the Beacon signal store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Hash uniqueness and company references
//! are enforced by SQLite constraints, which makes them safe under concurrent
//! writers.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;

#[cfg(test)]
mod tests;

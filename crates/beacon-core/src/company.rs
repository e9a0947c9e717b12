//! Companies: the organisations that sources and signals are attached to.
//!
//! Companies are created on first observation and never deleted. The only
//! permitted mutation is replacing the free-form `notes` document.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A tracked organisation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Company {
  pub company_id: Uuid,
  pub name:       String,
  pub domain:     Option<String>,
  /// Free-form structured notes; the store never inspects the contents.
  pub notes:      Option<serde_json::Value>,
  /// Server-assigned timestamp; never changes after creation.
  pub created_at: DateTime<Utc>,
}

/// Input to [`crate::store::SignalStore::upsert_company`].
///
/// Names are not unique. Deciding whether two observations refer to the same
/// company is left to the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct NewCompany {
  pub name:   String,
  pub domain: Option<String>,
  pub notes:  Option<serde_json::Value>,
}

impl NewCompany {
  /// Convenience constructor with domain and notes unset.
  pub fn new(name: impl Into<String>) -> Self {
    Self {
      name:   name.into(),
      domain: None,
      notes:  None,
    }
  }
}

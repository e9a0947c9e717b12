//! Nearest-neighbour search over source embeddings.
//!
//! Backends keep one [`VectorIndex`] per store and answer
//! `find_similar_sources` from it. [`ExactIndex`] scans every entry and is the
//! default; an approximate index can be swapped in behind the same trait once
//! the corpus outgrows a linear scan.

use std::collections::BTreeMap;

use uuid::Uuid;

use crate::embedding::Embedding;

/// A search hit: the id of an indexed entry and its distance to the query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
  pub id:       Uuid,
  pub distance: f32,
}

/// An in-memory index of embeddings keyed by source id.
pub trait VectorIndex: Send + Sync {
  /// Add or replace the embedding stored under `id`.
  fn insert(&mut self, id: Uuid, embedding: &Embedding);

  /// Return at most `k` entries ordered by non-decreasing distance to
  /// `query`. Equal distances are ordered by id.
  fn search(&self, query: &Embedding, k: usize) -> Vec<Neighbor>;

  /// Remove every entry.
  fn clear(&mut self);

  fn len(&self) -> usize;

  fn is_empty(&self) -> bool { self.len() == 0 }
}

/// Brute-force cosine-distance index.
#[derive(Debug, Clone, Default)]
pub struct ExactIndex {
  entries: BTreeMap<Uuid, Embedding>,
}

impl VectorIndex for ExactIndex {
  fn insert(&mut self, id: Uuid, embedding: &Embedding) {
    self.entries.insert(id, embedding.clone());
  }

  fn search(&self, query: &Embedding, k: usize) -> Vec<Neighbor> {
    if k == 0 {
      return Vec::new();
    }

    let mut hits: Vec<Neighbor> = self
      .entries
      .iter()
      .map(|(id, embedding)| Neighbor {
        id:       *id,
        distance: query.cosine_distance(embedding),
      })
      .collect();

    hits.sort_by(|a, b| a.distance.total_cmp(&b.distance).then(a.id.cmp(&b.id)));
    hits.truncate(k);
    hits
  }

  fn clear(&mut self) { self.entries.clear(); }

  fn len(&self) -> usize { self.entries.len() }
}

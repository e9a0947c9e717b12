//! Fixed-length document embeddings.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Number of components in every stored embedding.
pub const EMBEDDING_DIM: usize = 1536;

/// A validated embedding: exactly [`EMBEDDING_DIM`] finite components.
///
/// Deserialisation goes through the same checks as [`Embedding::new`], so an
/// `Embedding` value is always well-formed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f32>", into = "Vec<f32>")]
pub struct Embedding(Vec<f32>);

impl Embedding {
  pub fn new(values: Vec<f32>) -> Result<Self> {
    if values.len() != EMBEDDING_DIM {
      return Err(Error::DimensionMismatch {
        expected: EMBEDDING_DIM,
        actual:   values.len(),
      });
    }
    if let Some(index) = values.iter().position(|v| !v.is_finite()) {
      return Err(Error::NonFiniteEmbedding { index });
    }
    Ok(Self(values))
  }

  pub fn as_slice(&self) -> &[f32] { &self.0 }

  pub fn into_inner(self) -> Vec<f32> { self.0 }

  /// Cosine distance, `1 - cos θ`, in `[0, 2]`.
  ///
  /// A zero vector has no direction; its distance to anything is `1.0`.
  /// Sums are taken in `f64`, which holds the square of any finite `f32`.
  pub fn cosine_distance(&self, other: &Embedding) -> f32 {
    let mut dot = 0.0_f64;
    let mut sq_a = 0.0_f64;
    let mut sq_b = 0.0_f64;
    for (&a, &b) in self.0.iter().zip(&other.0) {
      let (a, b) = (f64::from(a), f64::from(b));
      dot += a * b;
      sq_a += a * a;
      sq_b += b * b;
    }

    if sq_a == 0.0 || sq_b == 0.0 {
      return 1.0;
    }
    (1.0 - dot / (sq_a.sqrt() * sq_b.sqrt())).clamp(0.0, 2.0) as f32
  }
}

impl TryFrom<Vec<f32>> for Embedding {
  type Error = Error;

  fn try_from(values: Vec<f32>) -> Result<Self> { Self::new(values) }
}

impl From<Embedding> for Vec<f32> {
  fn from(embedding: Embedding) -> Self { embedding.0 }
}

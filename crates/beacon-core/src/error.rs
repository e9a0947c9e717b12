//! Error types for `beacon-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("embedding has {actual} dimensions, expected {expected}")]
  DimensionMismatch { expected: usize, actual: usize },

  #[error("embedding component {index} is not a finite number")]
  NonFiniteEmbedding { index: usize },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

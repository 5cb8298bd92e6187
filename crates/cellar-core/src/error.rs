//! Error types for `cellar-core`.

use thiserror::Error;

use crate::draft::FieldKey;

#[derive(Debug, Error)]
pub enum Error {
  #[error("invalid identifier: {0:?}")]
  InvalidId(String),

  #[error("unknown field: {0:?}")]
  UnknownField(String),

  #[error("{field} expects a non-negative number, got {value:?}")]
  InvalidNumber { field: FieldKey, value: String },

  #[error("percentage must be a number in [0, 100], got {0:?}")]
  InvalidPercentage(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

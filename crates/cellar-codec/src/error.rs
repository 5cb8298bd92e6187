//! Error types for the cellar-codec serialization boundary.

use thiserror::Error;

use crate::payload::ValidationErrors;

#[derive(Debug, Error)]
pub enum Error {
  #[error(transparent)]
  Invalid(#[from] ValidationErrors),

  #[error("JSON error: {0}")]
  Json(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

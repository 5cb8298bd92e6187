//! Error type for `cellar-client`.

use cellar_core::transport::HttpError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error(transparent)]
  Core(#[from] cellar_core::Error),

  #[error(transparent)]
  Codec(#[from] cellar_codec::Error),

  #[error(transparent)]
  Http(#[from] HttpError),

  #[error("item could not be loaded: {0}")]
  Hydration(String),

  #[error("item snapshot could not be decoded: {0}")]
  Snapshot(#[source] serde_json::Error),

  #[error("failed to build HTTP client: {0}")]
  Client(#[from] reqwest::Error),

  #[error("configuration error: {0}")]
  Config(#[from] config::ConfigError),

  /// A draft operation was attempted while no editable draft exists.
  #[error("the form is not ready for edits (state: {0})")]
  NotReady(&'static str),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

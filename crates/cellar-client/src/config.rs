//! Layered client configuration: optional TOML file, then `CELLAR_*`
//! environment variables. CLI flags are applied on top by the binary.

use std::{path::Path, time::Duration};

use cellar_core::locale::Locale;
use serde::Deserialize;

use crate::Result;

#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
  /// Backend origin, e.g. `https://cellar.example.com/api`.
  #[serde(default = "default_base_url")]
  pub base_url:     String,
  /// UI locale: selects localized handbooks and the `Accept-Language` value.
  #[serde(default)]
  pub locale:       Locale,
  /// Token used when `CELLAR_TOKEN` is not set at request time.
  #[serde(default)]
  pub token:        Option<String>,
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs: u64,
}

fn default_base_url() -> String { "http://localhost:8000".to_string() }

fn default_timeout_secs() -> u64 { 30 }

impl Default for ClientConfig {
  fn default() -> Self {
    Self {
      base_url:     default_base_url(),
      locale:       Locale::default(),
      token:        None,
      timeout_secs: default_timeout_secs(),
    }
  }
}

impl ClientConfig {
  /// Read `file` (when given, it must exist) and overlay `CELLAR_*`
  /// variables.
  pub fn load(file: Option<&Path>) -> Result<Self> {
    let mut builder = config::Config::builder();
    if let Some(path) = file {
      builder = builder.add_source(config::File::from(path).required(true));
    }
    let settings = builder
      .add_source(config::Environment::with_prefix("CELLAR"))
      .build()?;
    Ok(settings.try_deserialize()?)
  }

  pub fn timeout(&self) -> Duration { Duration::from_secs(self.timeout_secs) }
}

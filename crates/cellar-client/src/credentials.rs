//! Bearer-token suppliers.

use std::sync::{PoisonError, RwLock};

use cellar_core::transport::CredentialSupplier;

/// Reads the token from an environment variable on every call, so a rotated
/// token applies to the next request. Falls back to a configured token when
/// the variable is unset or blank.
#[derive(Debug, Clone)]
pub struct EnvCredentials {
  var:      String,
  fallback: Option<String>,
}

impl EnvCredentials {
  pub const DEFAULT_VAR: &'static str = "CELLAR_TOKEN";

  pub fn new(var: impl Into<String>) -> Self {
    Self {
      var:      var.into(),
      fallback: None,
    }
  }

  pub fn with_fallback(mut self, token: Option<String>) -> Self {
    self.fallback = token.filter(|t| !t.trim().is_empty());
    self
  }
}

impl Default for EnvCredentials {
  fn default() -> Self { Self::new(Self::DEFAULT_VAR) }
}

impl CredentialSupplier for EnvCredentials {
  fn current_token(&self) -> Option<String> {
    std::env::var(&self.var)
      .ok()
      .filter(|t| !t.trim().is_empty())
      .or_else(|| self.fallback.clone())
  }
}

/// An in-memory token that can be swapped at runtime.
#[derive(Debug, Default)]
pub struct StaticCredentials(RwLock<Option<String>>);

impl StaticCredentials {
  pub fn new(token: Option<String>) -> Self { Self(RwLock::new(token)) }

  pub fn set(&self, token: Option<String>) {
    *self.0.write().unwrap_or_else(PoisonError::into_inner) = token;
  }
}

impl CredentialSupplier for StaticCredentials {
  fn current_token(&self) -> Option<String> {
    self.0.read().unwrap_or_else(PoisonError::into_inner).clone()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn static_token_can_rotate() {
    let creds = StaticCredentials::new(Some("one".into()));
    assert_eq!(creds.current_token().as_deref(), Some("one"));
    creds.set(None);
    assert_eq!(creds.current_token(), None);
  }

  #[test]
  fn env_credentials_fall_back_when_variable_is_unset() {
    let creds = EnvCredentials::new("CELLAR_TEST_TOKEN_THAT_IS_NEVER_SET")
      .with_fallback(Some("from-config".into()));
    assert_eq!(creds.current_token().as_deref(), Some("from-config"));

    let blank = EnvCredentials::new("CELLAR_TEST_TOKEN_THAT_IS_NEVER_SET")
      .with_fallback(Some("  ".into()));
    assert_eq!(blank.current_token(), None);
  }
}

//! Contracts of the external collaborators: the JSON/multipart HTTP
//! transport, the credential supplier and the authenticated asset source.
//!
//! Implemented by `cellar-client` over reqwest and by in-process fakes in
//! tests. Higher layers depend on these traits, never on a concrete client.

use std::{fmt, future::Future, sync::Arc};

use bytes::Bytes;
use serde_json::Value;
use thiserror::Error;

use crate::{ids::ResourceId, item::FileAttachment};

// ─── Requests ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
  Get,
  Post,
  Patch,
}

impl fmt::Display for Method {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Self::Get => "GET",
      Self::Post => "POST",
      Self::Patch => "PATCH",
    })
  }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
  Empty,
  Json(Value),
  /// `data` carries the JSON document as text; the transport picks the
  /// content type (and boundary) itself.
  Multipart {
    data: String,
    file: Option<FileAttachment>,
  },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
  pub method:            Method,
  pub path:              String,
  pub body:              RequestBody,
  /// Send the UI locale as `Accept-Language`.
  pub use_locale_header: bool,
}

impl ApiRequest {
  pub fn get(path: impl Into<String>) -> Self {
    Self {
      method:            Method::Get,
      path:              path.into(),
      body:              RequestBody::Empty,
      use_locale_header: true,
    }
  }

  pub fn patch_json(path: impl Into<String>, body: Value) -> Self {
    Self {
      method:            Method::Patch,
      path:              path.into(),
      body:              RequestBody::Json(body),
      use_locale_header: true,
    }
  }

  pub fn multipart(
    method: Method,
    path: impl Into<String>,
    data: String,
    file: Option<FileAttachment>,
  ) -> Self {
    Self {
      method,
      path: path.into(),
      body: RequestBody::Multipart { data, file },
      use_locale_header: false,
    }
  }
}

// ─── Errors ──────────────────────────────────────────────────────────────────

/// A failed exchange. `status` is `None` when no response was received or the
/// response could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", render(.status, .message))]
pub struct HttpError {
  pub status:  Option<u16>,
  pub message: String,
}

fn render(status: &Option<u16>, message: &str) -> String {
  match *status {
    Some(code) => format!("HTTP {code}: {message}"),
    None => message.to_string(),
  }
}

impl HttpError {
  pub fn status(code: u16, message: impl Into<String>) -> Self {
    Self {
      status:  Some(code),
      message: message.into(),
    }
  }

  pub fn network(message: impl Into<String>) -> Self {
    Self {
      status:  None,
      message: message.into(),
    }
  }

  pub fn is_unauthorized(&self) -> bool { self.status == Some(401) }
}

// ─── Traits ──────────────────────────────────────────────────────────────────

/// JSON API transport. `request` resolves to the decoded JSON body.
pub trait Transport: Send + Sync {
  fn request(
    &self,
    request: ApiRequest,
  ) -> impl Future<Output = Result<Value, HttpError>> + Send + '_;
}

/// Synchronous access to the current bearer token. Consulted on every
/// request; never cached by callers.
pub trait CredentialSupplier: Send + Sync {
  fn current_token(&self) -> Option<String>;
}

impl<C: CredentialSupplier + ?Sized> CredentialSupplier for Arc<C> {
  fn current_token(&self) -> Option<String> { (**self).current_token() }
}

/// Which rendition of an image to load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Variant {
  Thumbnail,
  Full,
}

impl Variant {
  /// `"full"` selects the full-resolution image; anything else selects the
  /// thumbnail.
  pub fn from_selector(selector: &str) -> Self {
    if selector == "full" { Self::Full } else { Self::Thumbnail }
  }

  /// Path segment of the asset endpoint for this variant.
  pub fn endpoint(self) -> &'static str {
    match self {
      Self::Thumbnail => "thumbnails",
      Self::Full => "images",
    }
  }
}

/// Source of authenticated binary image data.
pub trait AssetSource: Send + Sync {
  fn fetch_asset(
    &self,
    id: ResourceId,
    variant: Variant,
  ) -> impl Future<Output = Result<Bytes, HttpError>> + Send + '_;
}

/// Path of the asset endpoint for (`id`, `variant`).
pub fn asset_path(id: &ResourceId, variant: Variant) -> String {
  format!("/assets/{}/{}", variant.endpoint(), id)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn only_full_selects_full_endpoint() {
    assert_eq!(Variant::from_selector("full").endpoint(), "images");
    for other in ["thumbnail", "small", "large", "FULL", ""] {
      assert_eq!(Variant::from_selector(other).endpoint(), "thumbnails");
    }
  }

  #[test]
  fn asset_paths() {
    let id = ResourceId::new("abc123").unwrap();
    assert_eq!(asset_path(&id, Variant::Full), "/assets/images/abc123");
    assert_eq!(asset_path(&id, Variant::Thumbnail), "/assets/thumbnails/abc123");
  }

  #[test]
  fn http_error_display() {
    assert_eq!(HttpError::status(422, "bad title").to_string(), "HTTP 422: bad title");
    assert_eq!(HttpError::network("connection reset").to_string(), "connection reset");
  }
}

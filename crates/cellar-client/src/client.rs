//! Async HTTP client for the cellar backend.
//!
//! Implements [`Transport`] for the JSON API and [`AssetSource`] for the
//! authenticated image endpoints. The bearer token is asked of the
//! [`CredentialSupplier`] on every request.

use std::{future::Future, sync::Arc};

use bytes::Bytes;
use cellar_core::{
  ids::ResourceId,
  item::FileAttachment,
  locale::Locale,
  transport::{
    ApiRequest, AssetSource, CredentialSupplier, HttpError, Method, RequestBody, Transport,
    Variant, asset_path,
  },
};
use reqwest::{
  Client, RequestBuilder, Response,
  header::{ACCEPT, ACCEPT_LANGUAGE, AUTHORIZATION},
  multipart::{Form, Part},
};
use serde_json::Value;
use tracing::debug;

use crate::{Result, config::ClientConfig};

/// HTTP client for the cellar API.
///
/// Cheap to clone; the inner [`reqwest::Client`] and the credential supplier
/// are shared.
pub struct ApiClient<C> {
  client:      Client,
  base_url:    String,
  locale:      Locale,
  credentials: Arc<C>,
}

impl<C> Clone for ApiClient<C> {
  fn clone(&self) -> Self {
    Self {
      client:      self.client.clone(),
      base_url:    self.base_url.clone(),
      locale:      self.locale,
      credentials: Arc::clone(&self.credentials),
    }
  }
}

impl<C: CredentialSupplier> ApiClient<C> {
  pub fn new(config: &ClientConfig, credentials: C) -> Result<Self> {
    let client = Client::builder().timeout(config.timeout()).build()?;
    Ok(Self {
      client,
      base_url: config.base_url.trim_end_matches('/').to_string(),
      locale: config.locale,
      credentials: Arc::new(credentials),
    })
  }

  pub fn locale(&self) -> Locale { self.locale }

  fn url(&self, path: &str) -> String { format!("{}{}", self.base_url, path) }

  /// Attach `Authorization: Bearer <token>`. A missing token is sent as an
  /// empty bearer and left for the backend to reject.
  fn auth(&self, req: RequestBuilder) -> RequestBuilder {
    let token = self.credentials.current_token().unwrap_or_default();
    req.header(AUTHORIZATION, format!("Bearer {token}"))
  }

  async fn send(&self, request: ApiRequest) -> Result<Value, HttpError> {
    let ApiRequest {
      method,
      path,
      body,
      use_locale_header,
    } = request;

    let url = self.url(&path);
    let mut req = self.auth(match method {
      Method::Get => self.client.get(url),
      Method::Post => self.client.post(url),
      Method::Patch => self.client.patch(url),
    });
    if use_locale_header {
      req = req.header(ACCEPT_LANGUAGE, self.locale.code());
    }
    req = match body {
      RequestBody::Empty => req,
      RequestBody::Json(json) => req.json(&json),
      RequestBody::Multipart { data, file } => req.multipart(multipart_form(data, file)?),
    };

    debug!(%method, %path, "sending request");
    let resp = req.send().await.map_err(network_error)?;
    let bytes = check_status(resp).await?.bytes().await.map_err(network_error)?;
    debug!(%method, %path, len = bytes.len(), "request completed");

    if bytes.is_empty() {
      return Ok(Value::Null);
    }
    serde_json::from_slice(&bytes)
      .map_err(|e| HttpError::network(format!("invalid JSON in response to {path}: {e}")))
  }

  async fn fetch(&self, id: ResourceId, variant: Variant) -> Result<Bytes, HttpError> {
    let path = asset_path(&id, variant);
    debug!(%path, "fetching asset");
    let resp = self
      .auth(self.client.get(self.url(&path)))
      .header(ACCEPT, "image/*")
      .send()
      .await
      .map_err(network_error)?;
    check_status(resp).await?.bytes().await.map_err(network_error)
  }
}

impl<C: CredentialSupplier> Transport for ApiClient<C> {
  fn request(
    &self,
    request: ApiRequest,
  ) -> impl Future<Output = Result<Value, HttpError>> + Send + '_ {
    self.send(request)
  }
}

impl<C: CredentialSupplier> AssetSource for ApiClient<C> {
  fn fetch_asset(
    &self,
    id: ResourceId,
    variant: Variant,
  ) -> impl Future<Output = Result<Bytes, HttpError>> + Send + '_ {
    self.fetch(id, variant)
  }
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

/// `data` as a text part, plus the attachment as `file` when present. The
/// boundary and content type are chosen by reqwest.
fn multipart_form(data: String, file: Option<FileAttachment>) -> Result<Form, HttpError> {
  let form = Form::new().text("data", data);
  let Some(file) = file else {
    return Ok(form);
  };
  let part = Part::stream(file.bytes)
    .file_name(file.file_name)
    .mime_str(&file.content_type)
    .map_err(|e| HttpError::network(format!("invalid attachment type: {e}")))?;
  Ok(form.part("file", part))
}

fn network_error(err: reqwest::Error) -> HttpError { HttpError::network(err.to_string()) }

/// Pass 2xx responses through; turn anything else into an [`HttpError`]
/// carrying the backend's message.
async fn check_status(resp: Response) -> Result<Response, HttpError> {
  let status = resp.status();
  if status.is_success() {
    return Ok(resp);
  }
  let body = resp.text().await.unwrap_or_default();
  let message = error_message(&body)
    .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string());
  Err(HttpError::status(status.as_u16(), message))
}

/// The human-readable part of an error body: a `message` or `detail` string
/// in a JSON object, or the raw text.
fn error_message(body: &str) -> Option<String> {
  let body = body.trim();
  if body.is_empty() {
    return None;
  }
  let from_json = serde_json::from_str::<Value>(body).ok().and_then(|v| {
    ["message", "detail", "error"]
      .iter()
      .find_map(|key| v.get(key).and_then(Value::as_str).map(str::to_string))
  });
  Some(from_json.unwrap_or_else(|| body.to_string()))
}

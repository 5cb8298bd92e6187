//! Image previews: authenticated fetches published as scoped, locally
//! addressable handles.
//!
//! An [`AssetResolver`] serves one consumer. It keeps at most one live
//! [`AssetHandle`], and every handle it publishes is released exactly once:
//! when the (resource, variant) pair changes, on [`AssetResolver::teardown`],
//! or when the resolver itself is dropped. Each request carries the epoch it
//! was issued under; a completion from an older epoch is dropped without ever
//! opening a handle.

use std::{
  collections::HashMap,
  fmt,
  sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use bytes::Bytes;
use cellar_core::{
  ids::ResourceId,
  transport::{AssetSource, HttpError, Variant},
};
use tracing::{debug, warn};
use uuid::Uuid;

// ─── Registry ────────────────────────────────────────────────────────────────

#[derive(Default)]
struct RegistryState {
  live:     HashMap<Uuid, Bytes>,
  opened:   u64,
  released: u64,
}

/// Backing store that makes handles dereferenceable by locator. Shared by
/// every resolver of one display surface; cheap to clone.
#[derive(Clone, Default)]
pub struct HandleRegistry {
  inner: Arc<Mutex<RegistryState>>,
}

impl HandleRegistry {
  pub fn new() -> Self { Self::default() }

  fn state(&self) -> MutexGuard<'_, RegistryState> {
    self.inner.lock().unwrap_or_else(PoisonError::into_inner)
  }

  fn open(&self, resource: ResourceId, variant: Variant, bytes: Bytes) -> AssetHandle {
    let id = Uuid::new_v4();
    let mut state = self.state();
    state.live.insert(id, bytes);
    state.opened += 1;
    AssetHandle {
      id,
      resource,
      variant,
      registry: self.clone(),
    }
  }

  fn release(&self, id: Uuid) {
    let mut state = self.state();
    if state.live.remove(&id).is_some() {
      state.released += 1;
    }
  }

  /// Bytes behind a live handle's locator.
  pub fn lookup(&self, locator: &str) -> Option<Bytes> {
    let id = locator.strip_prefix(LOCATOR_PREFIX)?.parse::<Uuid>().ok()?;
    self.state().live.get(&id).cloned()
  }

  /// Handles opened and not yet released.
  pub fn live(&self) -> usize { self.state().live.len() }

  pub fn opened(&self) -> u64 { self.state().opened }

  pub fn released(&self) -> u64 { self.state().released }
}

impl fmt::Debug for HandleRegistry {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let state = self.state();
    f.debug_struct("HandleRegistry")
      .field("live", &state.live.len())
      .field("opened", &state.opened)
      .field("released", &state.released)
      .finish()
  }
}

const LOCATOR_PREFIX: &str = "blob:cellar/";

// ─── Handle ──────────────────────────────────────────────────────────────────

/// An owned reference to fetched image bytes. Dropping it (or calling
/// [`AssetHandle::release`]) releases it from the registry.
#[derive(Debug)]
pub struct AssetHandle {
  id:       Uuid,
  resource: ResourceId,
  variant:  Variant,
  registry: HandleRegistry,
}

impl AssetHandle {
  /// Opaque address the display layer dereferences through the registry.
  pub fn locator(&self) -> String { format!("{LOCATOR_PREFIX}{}", self.id) }

  pub fn resource(&self) -> &ResourceId { &self.resource }

  pub fn variant(&self) -> Variant { self.variant }

  pub fn bytes(&self) -> Bytes { self.registry.lookup(&self.locator()).unwrap_or_default() }

  pub fn release(self) {}
}

impl Drop for AssetHandle {
  fn drop(&mut self) {
    debug!(locator = %self.locator(), "releasing asset handle");
    self.registry.release(self.id);
  }
}

// ─── Resolver ────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
enum Slot {
  #[default]
  Absent,
  Loading,
  Ready(AssetHandle),
}

/// A fetch issued by [`AssetResolver::request`]. Run it anywhere, then hand
/// the result back through [`AssetResolver::complete`].
pub struct PendingAsset<S> {
  source:  Arc<S>,
  epoch:   u64,
  id:      ResourceId,
  variant: Variant,
}

/// The settled result of a [`PendingAsset`].
#[derive(Debug)]
pub struct AssetCompletion {
  epoch:   u64,
  id:      ResourceId,
  variant: Variant,
  result:  Result<Bytes, HttpError>,
}

impl<S: AssetSource> PendingAsset<S> {
  pub async fn run(self) -> AssetCompletion {
    let result = self.source.fetch_asset(self.id.clone(), self.variant).await;
    AssetCompletion {
      epoch: self.epoch,
      id: self.id,
      variant: self.variant,
      result,
    }
  }
}

pub struct AssetResolver<S> {
  source:     Arc<S>,
  registry:   HandleRegistry,
  epoch:      u64,
  key:        Option<(ResourceId, Variant)>,
  slot:       Slot,
  last_error: Option<HttpError>,
}

impl<S: AssetSource> AssetResolver<S> {
  pub fn new(source: Arc<S>, registry: HandleRegistry) -> Self {
    Self {
      source,
      registry,
      epoch: 0,
      key: None,
      slot: Slot::Absent,
      last_error: None,
    }
  }

  /// Point the resolver at (`id`, `variant`).
  ///
  /// Returns the fetch to run when the pair changed and names an image. The
  /// previous handle, if any, is released before this returns. `None` as the
  /// id means "no image" and never touches the network.
  pub fn request(&mut self, id: Option<ResourceId>, variant: Variant) -> Option<PendingAsset<S>> {
    let key = id.map(|id| (id, variant));
    if key.is_some() && key == self.key {
      return None;
    }

    self.epoch += 1;
    self.slot = Slot::Absent;
    self.last_error = None;
    self.key = key.clone();

    let (id, variant) = key?;
    self.slot = Slot::Loading;
    Some(PendingAsset {
      source: Arc::clone(&self.source),
      epoch: self.epoch,
      id,
      variant,
    })
  }

  /// Publish a completion if it belongs to the current epoch. Returns whether
  /// it was applied.
  pub fn complete(&mut self, completion: AssetCompletion) -> bool {
    let AssetCompletion {
      epoch,
      id,
      variant,
      result,
    } = completion;

    if epoch != self.epoch || !matches!(self.slot, Slot::Loading) {
      warn!(%id, epoch, current = self.epoch, "discarding stale asset completion");
      return false;
    }

    match result {
      Ok(bytes) => {
        let handle = self.registry.open(id, variant, bytes);
        debug!(locator = %handle.locator(), "published asset handle");
        self.slot = Slot::Ready(handle);
      }
      Err(err) => {
        warn!(%id, ?variant, error = %err, "asset fetch failed");
        self.slot = Slot::Absent;
        self.last_error = Some(err);
      }
    }
    true
  }

  /// Request, fetch and publish in one step.
  pub async fn resolve(&mut self, id: Option<ResourceId>, variant: Variant) -> Option<&AssetHandle> {
    if let Some(pending) = self.request(id, variant) {
      let completion = pending.run().await;
      self.complete(completion);
    }
    self.handle()
  }

  /// Release the live handle and orphan any fetch in flight.
  pub fn teardown(&mut self) {
    self.epoch += 1;
    self.key = None;
    self.slot = Slot::Absent;
  }

  pub fn handle(&self) -> Option<&AssetHandle> {
    match &self.slot {
      Slot::Ready(handle) => Some(handle),
      _ => None,
    }
  }

  pub fn is_loading(&self) -> bool { matches!(self.slot, Slot::Loading) }

  /// The failure behind the current `Absent`, if the last fetch failed.
  pub fn last_error(&self) -> Option<&HttpError> { self.last_error.as_ref() }
}

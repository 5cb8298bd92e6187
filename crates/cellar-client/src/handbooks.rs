//! Reference lists per locale, loaded concurrently and cached once complete.

use std::{
  collections::HashMap,
  sync::{Arc, Mutex, PoisonError},
};

use cellar_core::{
  handbook::{HandbookEntry, HandbookKind, HandbookSet},
  locale::{DisplayNameOrder, Locale},
  transport::{ApiRequest, HttpError, Transport},
};
use tracing::{info, warn};

pub struct HandbookCache<T> {
  transport: Arc<T>,
  order:     DisplayNameOrder,
  sets:      Mutex<HashMap<Locale, Arc<HandbookSet>>>,
}

impl<T: Transport> HandbookCache<T> {
  pub fn new(transport: Arc<T>) -> Self { Self::with_order(transport, DisplayNameOrder::default()) }

  pub fn with_order(transport: Arc<T>, order: DisplayNameOrder) -> Self {
    Self {
      transport,
      order,
      sets: Mutex::new(HashMap::new()),
    }
  }

  pub fn order(&self) -> &DisplayNameOrder { &self.order }

  /// All five lists for `locale`, each sorted by display name.
  ///
  /// Resolves only once every list has settled. A list that fails to load is
  /// presented empty and recorded in [`HandbookSet::degraded`]; such a set is
  /// not cached, so the next call tries again.
  pub async fn load(&self, locale: Locale) -> Arc<HandbookSet> {
    if let Some(set) = self.cached(locale) {
      return set;
    }

    let (subcategories, sweetness, subregions, varietals, foods) = tokio::join!(
      self.fetch(HandbookKind::Subcategories, locale),
      self.fetch(HandbookKind::Sweetness, locale),
      self.fetch(HandbookKind::Subregions, locale),
      self.fetch(HandbookKind::Varietals, locale),
      self.fetch(HandbookKind::Foods, locale),
    );

    let mut set = HandbookSet {
      locale,
      ..HandbookSet::default()
    };
    for (kind, result) in [
      (HandbookKind::Subcategories, subcategories),
      (HandbookKind::Sweetness, sweetness),
      (HandbookKind::Subregions, subregions),
      (HandbookKind::Varietals, varietals),
      (HandbookKind::Foods, foods),
    ] {
      match result {
        Ok(entries) => set.put_sorted(kind, entries, &self.order),
        Err(err) => {
          warn!(%kind, %locale, error = %err, "handbook list unavailable");
          set.degraded.push(kind);
        }
      }
    }

    let set = Arc::new(set);
    if set.is_complete() {
      info!(%locale, "handbooks loaded");
      self
        .sets
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .insert(locale, Arc::clone(&set));
    }
    set
  }

  /// Drop every cached set.
  pub fn invalidate(&self) { self.sets.lock().unwrap_or_else(PoisonError::into_inner).clear(); }

  fn cached(&self, locale: Locale) -> Option<Arc<HandbookSet>> {
    self
      .sets
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .get(&locale)
      .cloned()
  }

  async fn fetch(&self, kind: HandbookKind, locale: Locale) -> Result<Vec<HandbookEntry>, HttpError> {
    let value = self.transport.request(ApiRequest::get(kind.path(locale))).await?;
    serde_json::from_value(value)
      .map_err(|e| HttpError::network(format!("malformed {kind} list: {e}")))
  }
}

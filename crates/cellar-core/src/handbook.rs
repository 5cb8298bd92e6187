//! Read-only reference lists ("handbooks") that populate selection controls.

use serde::{Deserialize, Deserializer};
use strum::{Display, EnumIter, IntoStaticStr};

use crate::{
  ids::EntityId,
  locale::{DisplayNameOrder, Locale, LocalizedNames, sort_by_display_name},
};

/// The reference lists an item form consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum HandbookKind {
  Subcategories,
  Sweetness,
  Subregions,
  Varietals,
  Foods,
}

impl HandbookKind {
  /// Whether the backend serves this list per locale (`/{kind}/{locale}`) or
  /// as one list carrying every locale (`/{kind}/all`).
  pub fn is_localized(self) -> bool {
    matches!(self, Self::Subcategories | Self::Sweetness | Self::Subregions)
  }

  pub fn path(self, locale: Locale) -> String {
    let name: &'static str = self.into();
    if self.is_localized() {
      format!("/handbooks/{name}/{}", locale.code())
    } else {
      format!("/handbooks/{name}/all")
    }
  }
}

/// One reference record: an id plus its name columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandbookEntry {
  pub id:    EntityId,
  pub names: LocalizedNames,
}

impl HandbookEntry {
  pub fn display_name<'a>(&'a self, order: &DisplayNameOrder) -> &'a str {
    order.resolve(&self.names)
  }
}

#[derive(Deserialize)]
struct RawEntry {
  id:      EntityId,
  name:    Option<String>,
  name_en: Option<String>,
  name_ru: Option<String>,
  name_fr: Option<String>,
  name_es: Option<String>,
  name_it: Option<String>,
  name_de: Option<String>,
  name_zh: Option<String>,
}

impl<'de> Deserialize<'de> for HandbookEntry {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    let raw = RawEntry::deserialize(deserializer)?;
    let mut names = LocalizedNames {
      generic: raw.name.unwrap_or_default(),
      ..Default::default()
    };
    for (locale, value) in [
      (Locale::En, raw.name_en),
      (Locale::Ru, raw.name_ru),
      (Locale::Fr, raw.name_fr),
      (Locale::Es, raw.name_es),
      (Locale::It, raw.name_it),
      (Locale::De, raw.name_de),
      (Locale::Zh, raw.name_zh),
    ] {
      names.set(locale, value.unwrap_or_default());
    }
    Ok(Self { id: raw.id, names })
  }
}

/// All five reference lists for one locale, each sorted by display name.
///
/// Only constructed once every list has settled, so holding one means the
/// form can safely resolve labels and hydrate.
#[derive(Debug, Clone, Default)]
pub struct HandbookSet {
  pub locale:        Locale,
  pub subcategories: Vec<HandbookEntry>,
  pub sweetness:     Vec<HandbookEntry>,
  pub subregions:    Vec<HandbookEntry>,
  pub varietals:     Vec<HandbookEntry>,
  pub foods:         Vec<HandbookEntry>,
  /// Lists that failed to load and are presented empty.
  pub degraded:      Vec<HandbookKind>,
}

impl HandbookSet {
  pub fn list(&self, kind: HandbookKind) -> &[HandbookEntry] {
    match kind {
      HandbookKind::Subcategories => &self.subcategories,
      HandbookKind::Sweetness => &self.sweetness,
      HandbookKind::Subregions => &self.subregions,
      HandbookKind::Varietals => &self.varietals,
      HandbookKind::Foods => &self.foods,
    }
  }

  pub fn list_mut(&mut self, kind: HandbookKind) -> &mut Vec<HandbookEntry> {
    match kind {
      HandbookKind::Subcategories => &mut self.subcategories,
      HandbookKind::Sweetness => &mut self.sweetness,
      HandbookKind::Subregions => &mut self.subregions,
      HandbookKind::Varietals => &mut self.varietals,
      HandbookKind::Foods => &mut self.foods,
    }
  }

  pub fn find(&self, kind: HandbookKind, id: EntityId) -> Option<&HandbookEntry> {
    self.list(kind).iter().find(|e| e.id == id)
  }

  pub fn is_complete(&self) -> bool { self.degraded.is_empty() }

  /// Store `entries` for `kind`, sorted by display name under this set's
  /// locale.
  pub fn put_sorted(
    &mut self,
    kind: HandbookKind,
    mut entries: Vec<HandbookEntry>,
    order: &DisplayNameOrder,
  ) {
    sort_by_display_name(&mut entries, |e| &e.names, order, self.locale);
    *self.list_mut(kind) = entries;
  }
}

//! The Locale Field Matrix: closed locale and field enumerations, the 35-slot
//! text matrix, and display-name resolution for reference data.
//!
//! Every place that turns a multilingual record into one visible label goes
//! through [`DisplayNameOrder::resolve`], so the fallback order is identical
//! across the application.

use icu_collator::{Collator, CollatorOptions};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

// ─── Enumerations ────────────────────────────────────────────────────────────

/// A supported content locale. [`Locale::En`] is the default locale: its slots
/// carry no suffix on the wire and it is the fallback for every other locale.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
  Default,
  Serialize,
  Deserialize,
  Display,
  EnumIter,
  EnumString,
  IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Locale {
  #[default]
  En,
  Ru,
  Fr,
  Es,
  It,
  De,
  Zh,
}

pub const LOCALE_COUNT: usize = 7;

impl Locale {
  pub fn is_default(self) -> bool { self == Self::En }

  /// BCP-47 language tag, also used in handbook URLs and `Accept-Language`.
  pub fn code(self) -> &'static str { self.into() }

  /// Wire suffix for localized content slots: empty for the default locale.
  pub fn content_suffix(self) -> &'static str {
    match self {
      Self::En => "",
      Self::Ru => "_ru",
      Self::Fr => "_fr",
      Self::Es => "_es",
      Self::It => "_it",
      Self::De => "_de",
      Self::Zh => "_zh",
    }
  }

  fn index(self) -> usize { self as usize }
}

/// A canonical localized content field of a drink record.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumIter,
  EnumString,
  IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LocalizedField {
  Title,
  Subtitle,
  Description,
  Recommendation,
  #[serde(rename = "madeof")]
  #[strum(serialize = "madeof")]
  MadeOf,
}

pub const FIELD_COUNT: usize = 5;

impl LocalizedField {
  /// Unsuffixed wire name (`title`, `madeof`, ...).
  pub fn base_name(self) -> &'static str { self.into() }

  fn index(self) -> usize { self as usize }
}

/// Wire / form key of one slot, e.g. `title` or `description_fr`.
pub fn slot_key(field: LocalizedField, locale: Locale) -> String {
  format!("{}{}", field.base_name(), locale.content_suffix())
}

/// Inverse of [`slot_key`]. Returns `None` for keys outside the matrix.
pub fn parse_slot_key(key: &str) -> Option<(LocalizedField, Locale)> {
  LocalizedField::iter().find_map(|field| {
    let rest = key.strip_prefix(field.base_name())?;
    Locale::iter()
      .find(|locale| locale.content_suffix() == rest)
      .map(|locale| (field, locale))
  })
}

// ─── Matrix ──────────────────────────────────────────────────────────────────

/// Dense storage for every (field, locale) text slot. An empty string means
/// "unset".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocaleMatrix {
  slots: [String; FIELD_COUNT * LOCALE_COUNT],
}

impl Default for LocaleMatrix {
  fn default() -> Self {
    Self {
      slots: std::array::from_fn(|_| String::new()),
    }
  }
}

impl LocaleMatrix {
  fn offset(field: LocalizedField, locale: Locale) -> usize {
    field.index() * LOCALE_COUNT + locale.index()
  }

  pub fn get(&self, field: LocalizedField, locale: Locale) -> &str {
    &self.slots[Self::offset(field, locale)]
  }

  pub fn set(&mut self, field: LocalizedField, locale: Locale, value: impl Into<String>) {
    self.slots[Self::offset(field, locale)] = value.into();
  }

  /// The slot value, or the default-locale value of the same field when the
  /// slot is blank.
  pub fn get_or_default(&self, field: LocalizedField, locale: Locale) -> &str {
    let value = self.get(field, locale);
    if value.trim().is_empty() {
      self.get(field, Locale::En)
    } else {
      value
    }
  }

  /// Every (field, locale) slot address in field-major order.
  pub fn keys() -> impl Iterator<Item = (LocalizedField, Locale)> {
    LocalizedField::iter().flat_map(|field| Locale::iter().map(move |locale| (field, locale)))
  }

  /// All 35 slots in field-major order.
  pub fn iter(&self) -> impl Iterator<Item = (LocalizedField, Locale, &str)> + '_ {
    LocalizedField::iter().flat_map(move |field| {
      Locale::iter().map(move |locale| (field, locale, self.get(field, locale)))
    })
  }
}

// ─── Display names ───────────────────────────────────────────────────────────

/// The per-locale name columns of a reference record.
///
/// Unlike content slots, the default locale has its own `name_en` column next
/// to the generic `name`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalizedNames {
  pub generic:   String,
  pub localized: [String; LOCALE_COUNT],
}

impl LocalizedNames {
  pub fn get(&self, locale: Locale) -> &str { &self.localized[locale.index()] }

  pub fn set(&mut self, locale: Locale, value: impl Into<String>) {
    self.localized[locale.index()] = value.into();
  }
}

/// One column consulted during display-name resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameSlot {
  Generic,
  Localized(Locale),
}

/// Explicit fallback order for resolving a visible name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayNameOrder(Vec<NameSlot>);

impl Default for DisplayNameOrder {
  /// Generic name first, then `en`, `ru`, `fr`, `es`, `it`, `de`, `zh`.
  fn default() -> Self {
    let mut slots = vec![NameSlot::Generic];
    slots.extend(Locale::iter().map(NameSlot::Localized));
    Self(slots)
  }
}

impl DisplayNameOrder {
  pub fn new(slots: Vec<NameSlot>) -> Self { Self(slots) }

  pub fn slots(&self) -> &[NameSlot] { &self.0 }

  /// First non-blank name in this order, or `""` when every column is blank.
  pub fn resolve<'a>(&self, names: &'a LocalizedNames) -> &'a str {
    self
      .0
      .iter()
      .map(|slot| match slot {
        NameSlot::Generic => names.generic.as_str(),
        NameSlot::Localized(locale) => names.get(*locale),
      })
      .find(|name| !name.trim().is_empty())
      .unwrap_or_default()
  }
}

/// Sort `items` by their resolved display name using collation rules for
/// `locale`, falling back to the root collation and finally to code-point
/// order when no collation data is available.
pub fn sort_by_display_name<T>(
  items: &mut [T],
  names: impl Fn(&T) -> &LocalizedNames,
  order: &DisplayNameOrder,
  locale: Locale,
) {
  let collator = collator_for(locale);
  items.sort_by(|a, b| {
    let left = order.resolve(names(a));
    let right = order.resolve(names(b));
    let collated = match &collator {
      Some(c) => c.compare(left, right),
      None => left.cmp(right),
    };
    collated.then_with(|| left.cmp(right))
  });
}

fn collator_for(locale: Locale) -> Option<Collator> {
  let tag: icu_locid::Locale = locale.code().parse().ok()?;
  Collator::try_new(&tag.into(), CollatorOptions::new())
    .or_else(|_| Collator::try_new(&Default::default(), CollatorOptions::new()))
    .ok()
}

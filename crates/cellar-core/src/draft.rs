//! The Draft: the form-owned, typed working copy of one item, its localized
//! content and both relation sets.
//!
//! Every edit goes through a field-scoped mutator that parses and validates
//! the raw form input before anything is stored, so the draft never holds a
//! value the wire format cannot express.

use std::{collections::BTreeMap, fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use strum::{EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

use crate::{
  Error, Result,
  ids::{DrinkId, EntityId, ItemId, ResourceId},
  item::FileAttachment,
  locale::{Locale, LocaleMatrix, LocalizedField, parse_slot_key, slot_key},
  relation::{FoodSet, Percentage, VarietalSet},
};

// ─── Field addressing ────────────────────────────────────────────────────────

/// A non-localized form field, named as on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, EnumString, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum ScalarField {
  Vol,
  Price,
  Count,
  Alc,
  Sugar,
  Age,
  ImageId,
  SubcategoryId,
  SubregionId,
  SweetnessId,
}

/// Any editable text-valued field of the draft, addressed by its form name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKey {
  Text(LocalizedField, Locale),
  Scalar(ScalarField),
}

impl FieldKey {
  /// Every addressable field: the 35 text slots, then the scalars.
  pub fn all() -> impl Iterator<Item = FieldKey> {
    LocaleMatrix::keys()
      .map(|(field, locale)| FieldKey::Text(field, locale))
      .chain(ScalarField::iter().map(FieldKey::Scalar))
  }
}

impl fmt::Display for FieldKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Text(field, locale) => f.write_str(&slot_key(*field, *locale)),
      Self::Scalar(scalar) => f.write_str(scalar.into()),
    }
  }
}

impl FromStr for FieldKey {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    if let Some((field, locale)) = parse_slot_key(s) {
      return Ok(Self::Text(field, locale));
    }
    s.parse::<ScalarField>()
      .map(Self::Scalar)
      .map_err(|_| Error::UnknownField(s.to_string()))
  }
}

// ─── Draft ───────────────────────────────────────────────────────────────────

/// Whether the draft will create a new item or patch an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftMode {
  Create,
  Edit {
    item_id:  ItemId,
    drink_id: Option<DrinkId>,
  },
}

/// What an edit submission does with the item's localized-content record:
/// patch it in place or save the content as a new record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DrinkAction {
  #[default]
  Update,
  Create,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Draft {
  pub mode:           DraftMode,
  pub text:           LocaleMatrix,
  pub vol:            Option<f64>,
  pub price:          Option<f64>,
  pub count:          Option<u32>,
  pub alc:            Option<f64>,
  pub sugar:          Option<f64>,
  pub age:            String,
  pub image_id:       Option<ResourceId>,
  /// Storage path reported by the backend; round-tripped, never edited.
  pub image_path:     Option<String>,
  pub subcategory_id: Option<EntityId>,
  pub subregion_id:   Option<EntityId>,
  pub sweetness_id:   Option<EntityId>,
  pub varietals:      VarietalSet,
  pub foods:          FoodSet,
  /// Pending image replacement; at most one.
  pub attachment:     Option<FileAttachment>,
  pub drink_action:   DrinkAction,
}

impl Draft {
  /// An empty draft for the create flow.
  pub fn blank() -> Self { Self::with_mode(DraftMode::Create) }

  pub fn with_mode(mode: DraftMode) -> Self {
    Self {
      mode,
      text: LocaleMatrix::default(),
      vol: None,
      price: None,
      count: None,
      alc: None,
      sugar: None,
      age: String::new(),
      image_id: None,
      image_path: None,
      subcategory_id: None,
      subregion_id: None,
      sweetness_id: None,
      varietals: VarietalSet::new(),
      foods: FoodSet::new(),
      attachment: None,
      drink_action: DrinkAction::default(),
    }
  }

  /// Apply raw form input to one field. Invalid input leaves the draft
  /// unchanged. Blank input clears optional values.
  pub fn set_field(&mut self, key: FieldKey, raw: &str) -> Result<()> {
    let scalar = match key {
      FieldKey::Text(field, locale) => {
        self.text.set(field, locale, raw);
        return Ok(());
      }
      FieldKey::Scalar(scalar) => scalar,
    };
    match scalar {
      ScalarField::Vol => self.vol = parse_amount(key, raw, None)?,
      ScalarField::Price => self.price = parse_amount(key, raw, None)?,
      ScalarField::Alc => self.alc = parse_amount(key, raw, Some(100.0))?,
      ScalarField::Sugar => self.sugar = parse_amount(key, raw, Some(100.0))?,
      ScalarField::Count => {
        self.count = blank_or(raw, |s| s.parse::<u32>().ok())
          .ok_or_else(|| invalid_number(key, raw))?;
      }
      ScalarField::Age => self.age = raw.to_string(),
      ScalarField::ImageId => self.image_id = ResourceId::new(raw),
      ScalarField::SubcategoryId => self.subcategory_id = parse_ref(key, raw)?,
      ScalarField::SubregionId => self.subregion_id = parse_ref(key, raw)?,
      ScalarField::SweetnessId => self.sweetness_id = parse_ref(key, raw)?,
    }
    Ok(())
  }

  /// The form-control text of one field.
  pub fn field_value(&self, key: FieldKey) -> String {
    fn opt<T: ToString>(v: &Option<T>) -> String {
      v.as_ref().map(ToString::to_string).unwrap_or_default()
    }
    match key {
      FieldKey::Text(field, locale) => self.text.get(field, locale).to_string(),
      FieldKey::Scalar(scalar) => match scalar {
        ScalarField::Vol => opt(&self.vol),
        ScalarField::Price => opt(&self.price),
        ScalarField::Count => opt(&self.count),
        ScalarField::Alc => opt(&self.alc),
        ScalarField::Sugar => opt(&self.sugar),
        ScalarField::Age => self.age.clone(),
        ScalarField::ImageId => opt(&self.image_id),
        ScalarField::SubcategoryId => opt(&self.subcategory_id),
        ScalarField::SubregionId => opt(&self.subregion_id),
        ScalarField::SweetnessId => opt(&self.sweetness_id),
      },
    }
  }

  /// Every addressable field keyed by form name.
  pub fn flat_record(&self) -> BTreeMap<String, String> {
    FieldKey::all()
      .map(|key| (key.to_string(), self.field_value(key)))
      .collect()
  }

  pub fn toggle_varietal(&mut self, id: EntityId, on: bool) -> bool {
    self.varietals.toggle(id, on)
  }

  /// Rewrite the percentage of a selected varietal. Unselected varietals are
  /// not added.
  pub fn set_varietal_percentage(&mut self, id: EntityId, raw: &str) -> Result<bool> {
    let percentage: Percentage = raw.parse()?;
    Ok(self.varietals.set_attribute(id, percentage))
  }

  pub fn toggle_food(&mut self, id: EntityId, on: bool) -> bool { self.foods.toggle(id, on) }

  /// Queue `file` as the replacement image, returning any attachment it
  /// displaces.
  pub fn attach(&mut self, file: FileAttachment) -> Option<FileAttachment> {
    self.attachment.replace(file)
  }

  pub fn clear_attachment(&mut self) -> Option<FileAttachment> { self.attachment.take() }
}

fn invalid_number(field: FieldKey, raw: &str) -> Error {
  Error::InvalidNumber {
    field,
    value: raw.to_string(),
  }
}

/// `Some(None)` for blank input, `Some(Some(v))` when `parse` accepts the
/// trimmed input, `None` otherwise.
fn blank_or<T>(raw: &str, parse: impl FnOnce(&str) -> Option<T>) -> Option<Option<T>> {
  let trimmed = raw.trim();
  if trimmed.is_empty() {
    Some(None)
  } else {
    parse(trimmed).map(Some)
  }
}

fn parse_amount(key: FieldKey, raw: &str, max: Option<f64>) -> Result<Option<f64>> {
  blank_or(raw, |s| {
    s.parse::<f64>()
      .ok()
      .filter(|v| v.is_finite() && *v >= 0.0 && max.is_none_or(|m| *v <= m))
  })
  .ok_or_else(|| invalid_number(key, raw))
}

fn parse_ref(key: FieldKey, raw: &str) -> Result<Option<EntityId>> {
  blank_or(raw, |s| s.parse::<EntityId>().ok()).ok_or_else(|| invalid_number(key, raw))
}

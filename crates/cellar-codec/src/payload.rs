//! Wire payloads built from a [`Draft`] on submit, and the local validation
//! that must pass before any of them is sent.
//!
//! Create mode sends one multipart request carrying the item scalars and the
//! content together. Edit mode sends the scalar patch first and the content
//! patch second; the plan is ordered and the caller stops at the first
//! failure.

use cellar_core::{
  draft::{Draft, DraftMode, DrinkAction, FieldKey, ScalarField},
  ids::{DrinkId, EntityId, ItemId, ResourceId},
  locale::{Locale, LocalizedField, slot_key},
  relation::{FoodRef, VarietalRef},
  transport::{ApiRequest, Method},
};
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::{Result, matrix::project_from_draft};

// ─── Validation ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
  #[error("{} is required", slot_label(.field, .locale))]
  MissingText {
    field:  LocalizedField,
    locale: Locale,
  },

  #[error("{} is required", scalar_label(.0))]
  MissingReference(ScalarField),

  #[error("the item has no drink record to update; save the content as a new record")]
  MissingDrinkRecord,

  /// Input the draft refused to store; the field still holds an older value.
  #[error("{field} has an invalid value {value:?}")]
  Unparsed { field: FieldKey, value: String },
}

fn slot_label(field: &LocalizedField, locale: &Locale) -> String { slot_key(*field, *locale) }

fn scalar_label(field: &ScalarField) -> &'static str { (*field).into() }

/// Every problem found in one draft, in field order.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", join(.0))]
pub struct ValidationErrors(pub Vec<ValidationError>);

impl ValidationErrors {
  pub fn iter(&self) -> impl Iterator<Item = &ValidationError> { self.0.iter() }

  pub fn contains(&self, error: &ValidationError) -> bool { self.0.contains(error) }
}

fn join(errors: &[ValidationError]) -> String {
  errors.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
}

/// Check the fields the backend cannot accept empty. Numeric inputs were
/// already checked when they were set, so only presence is left.
pub fn validate(draft: &Draft) -> Result<(), ValidationErrors> {
  let mut errors = Vec::new();

  if draft.text.get(LocalizedField::Title, Locale::En).trim().is_empty() {
    errors.push(ValidationError::MissingText {
      field:  LocalizedField::Title,
      locale: Locale::En,
    });
  }
  if draft.subcategory_id.is_none() {
    errors.push(ValidationError::MissingReference(ScalarField::SubcategoryId));
  }
  if draft.subregion_id.is_none() {
    errors.push(ValidationError::MissingReference(ScalarField::SubregionId));
  }
  if let DraftMode::Edit { drink_id: None, .. } = draft.mode
    && draft.drink_action == DrinkAction::Update
  {
    errors.push(ValidationError::MissingDrinkRecord);
  }

  if errors.is_empty() { Ok(()) } else { Err(ValidationErrors(errors)) }
}

// ─── Payloads ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageFields {
  pub image_id:   Option<ResourceId>,
  pub image_path: Option<String>,
}

/// Scalar item attributes. Empty optionals go out as `null`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemPatch {
  pub vol:   Option<f64>,
  pub price: Option<f64>,
  pub count: Option<u32>,
  /// Absent while an attachment is pending; the backend derives the new
  /// reference from the uploaded file.
  #[serde(flatten)]
  pub image: Option<ImageFields>,
}

impl ItemPatch {
  pub fn from_draft(draft: &Draft) -> Self {
    let image = draft.attachment.is_none().then(|| ImageFields {
      image_id:   draft.image_id.clone(),
      image_path: draft.image_path.clone(),
    });
    Self {
      vol: draft.vol,
      price: draft.price,
      count: draft.count,
      image,
    }
  }
}

/// Identity of the records an edit submission rewrites.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EditTarget {
  pub id:           ItemId,
  pub drink_id:     Option<DrinkId>,
  pub drink_action: DrinkAction,
}

/// Localized content, drink attributes and both relation lists.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContentPayload {
  /// The 35 `{field}{_locale}` slots, blank slots already filled from the
  /// default locale.
  #[serde(flatten)]
  pub text:           Map<String, Value>,
  pub alc:            Option<f64>,
  pub sugar:          Option<f64>,
  pub age:            String,
  pub subcategory_id: EntityId,
  pub subregion_id:   EntityId,
  pub sweetness_id:   Option<EntityId>,
  pub varietals:      Vec<VarietalRef>,
  pub foods:          Vec<FoodRef>,
  /// Item scalars, carried inline by the create submission only.
  #[serde(flatten)]
  pub item:           Option<ItemPatch>,
  #[serde(flatten)]
  pub target:         Option<EditTarget>,
}

impl ContentPayload {
  /// Build the content payload. Fails with the same errors as [`validate`]
  /// when a required reference is missing.
  pub fn from_draft(draft: &Draft) -> Result<Self, ValidationErrors> {
    validate(draft)?;
    let (Some(subcategory_id), Some(subregion_id)) = (draft.subcategory_id, draft.subregion_id)
    else {
      return Err(ValidationErrors(vec![ValidationError::MissingReference(
        ScalarField::SubcategoryId,
      )]));
    };

    let (item, target) = match draft.mode {
      DraftMode::Create => (Some(ItemPatch::from_draft(draft)), None),
      DraftMode::Edit { item_id, drink_id } => (
        None,
        Some(EditTarget {
          id: item_id,
          drink_id,
          drink_action: draft.drink_action,
        }),
      ),
    };

    Ok(Self {
      text: project_from_draft(&draft.text).into_wire(),
      alc: draft.alc,
      sugar: draft.sugar,
      age: draft.age.clone(),
      subcategory_id,
      subregion_id,
      sweetness_id: draft.sweetness_id,
      varietals: (&draft.varietals).into(),
      foods: (&draft.foods).into(),
      item,
      target,
    })
  }
}

// ─── Submission plan ─────────────────────────────────────────────────────────

pub const CREATE_PATH: &str = "/items/create_item_drink";

pub fn item_path(id: ItemId) -> String { format!("/items/{id}") }

pub fn content_path(id: ItemId) -> String { format!("/items/update_item_drink/{id}") }

/// Requests to issue, in order, for one submit.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmitPlan {
  pub requests: Vec<ApiRequest>,
}

impl SubmitPlan {
  pub fn len(&self) -> usize { self.requests.len() }

  pub fn is_empty(&self) -> bool { self.requests.is_empty() }

  pub fn iter(&self) -> impl Iterator<Item = &ApiRequest> { self.requests.iter() }
}

impl IntoIterator for SubmitPlan {
  type IntoIter = std::vec::IntoIter<ApiRequest>;
  type Item = ApiRequest;

  fn into_iter(self) -> Self::IntoIter { self.requests.into_iter() }
}

/// Validate `draft` and serialize it into the requests of one submit.
pub fn plan_submission(draft: &Draft) -> Result<SubmitPlan> {
  let content = ContentPayload::from_draft(draft)?;
  let attachment = draft.attachment.clone();

  let requests = match draft.mode {
    DraftMode::Create => vec![ApiRequest::multipart(
      Method::Post,
      CREATE_PATH,
      serde_json::to_string(&content)?,
      attachment,
    )],
    DraftMode::Edit { item_id, .. } => {
      let scalars = ApiRequest::patch_json(
        item_path(item_id),
        serde_json::to_value(ItemPatch::from_draft(draft))?,
      );
      let content = match attachment {
        Some(file) => ApiRequest::multipart(
          Method::Patch,
          content_path(item_id),
          serde_json::to_string(&content)?,
          Some(file),
        ),
        None => ApiRequest::patch_json(content_path(item_id), serde_json::to_value(&content)?),
      };
      vec![scalars, content]
    }
  };

  Ok(SubmitPlan { requests })
}

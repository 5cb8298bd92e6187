//! The fetched, editable projection of an item and the image attachment that
//! can accompany a submission.

use bytes::Bytes;
use serde::{Deserialize, Deserializer, de};
use serde_json::{Map, Value};

use crate::ids::{DrinkId, EntityId, ItemId, ResourceId};

/// The edit-flow snapshot served for one item: scalar attributes, foreign
/// keys, relation rows and (in `content`) the flat localized slots.
#[derive(Debug, Clone, Deserialize)]
pub struct ItemSnapshot {
  pub id:             ItemId,
  pub drink_id:       Option<DrinkId>,
  #[serde(default, deserialize_with = "lenient_f64")]
  pub vol:            Option<f64>,
  #[serde(default, deserialize_with = "lenient_f64")]
  pub price:          Option<f64>,
  #[serde(default, deserialize_with = "lenient_f64")]
  pub count:          Option<f64>,
  #[serde(default, deserialize_with = "blank_as_none")]
  pub image_id:       Option<ResourceId>,
  #[serde(default)]
  pub image_path:     Option<String>,
  pub subcategory_id: Option<EntityId>,
  pub subregion_id:   Option<EntityId>,
  pub sweetness_id:   Option<EntityId>,
  #[serde(default, deserialize_with = "lenient_f64")]
  pub alc:            Option<f64>,
  #[serde(default, deserialize_with = "lenient_f64")]
  pub sugar:          Option<f64>,
  #[serde(default)]
  pub age:            Option<String>,
  /// Raw `{id, percentage}` rows; malformed rows are dropped on projection.
  #[serde(default)]
  pub varietals:      Vec<Value>,
  /// Raw `{id}` rows; malformed rows are dropped on projection.
  #[serde(default)]
  pub foods:          Vec<Value>,
  /// Every remaining field, including the localized text slots.
  #[serde(flatten)]
  pub content:        Map<String, Value>,
}

/// Accepts a JSON number, a numeric string, an empty string or null.
fn lenient_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
  match Option::<Value>::deserialize(deserializer)? {
    None | Some(Value::Null) => Ok(None),
    Some(Value::Number(n)) => Ok(n.as_f64()),
    Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
    Some(Value::String(s)) => s
      .trim()
      .parse::<f64>()
      .map(Some)
      .map_err(|_| de::Error::custom(format!("not a number: {s:?}"))),
    Some(other) => Err(de::Error::custom(format!("not a number: {other}"))),
  }
}

fn blank_as_none<'de, D: Deserializer<'de>>(
  deserializer: D,
) -> Result<Option<ResourceId>, D::Error> {
  Ok(Option::<String>::deserialize(deserializer)?.and_then(ResourceId::new))
}

/// A local image file queued to replace the item's image on submit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileAttachment {
  pub file_name:    String,
  pub content_type: String,
  pub bytes:        Bytes,
}

impl FileAttachment {
  /// Build an attachment, inferring the media type from the file extension.
  pub fn new(file_name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
    let file_name = file_name.into();
    let content_type = media_type_for(&file_name).to_string();
    Self {
      file_name,
      content_type,
      bytes: bytes.into(),
    }
  }
}

fn media_type_for(file_name: &str) -> &'static str {
  let ext = file_name
    .rsplit_once('.')
    .map(|(_, ext)| ext.to_ascii_lowercase())
    .unwrap_or_default();
  match ext.as_str() {
    "jpg" | "jpeg" => "image/jpeg",
    "png" => "image/png",
    "webp" => "image/webp",
    "gif" => "image/gif",
    "avif" => "image/avif",
    _ => "application/octet-stream",
  }
}

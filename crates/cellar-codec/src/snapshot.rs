//! Hydration: the edit-flow snapshot fetched from the backend, projected into
//! a [`Draft`].

use cellar_core::{
  draft::{Draft, DraftMode},
  ids::ItemId,
  item::ItemSnapshot,
  transport::ApiRequest,
};

use crate::{matrix::project_to_draft, token::decode_rows};

/// The request that loads one item's editable projection.
pub fn hydration_request(id: ItemId) -> ApiRequest {
  ApiRequest::get(format!("/items_view/preact/{id}"))
}

/// Project a fetched snapshot into an edit-mode draft. Relation rows that do
/// not decode are dropped; a fractional or negative `count` is treated as
/// unset.
pub fn hydrate_draft(snapshot: ItemSnapshot) -> Draft {
  let mut draft = Draft::with_mode(DraftMode::Edit {
    item_id:  snapshot.id,
    drink_id: snapshot.drink_id,
  });
  draft.text = project_to_draft(&snapshot.content);
  draft.vol = snapshot.vol;
  draft.price = snapshot.price;
  draft.count = snapshot
    .count
    .filter(|c| c.fract() == 0.0 && (0.0..=f64::from(u32::MAX)).contains(c))
    .map(|c| c as u32);
  draft.alc = snapshot.alc;
  draft.sugar = snapshot.sugar;
  draft.age = snapshot.age.unwrap_or_default();
  draft.image_id = snapshot.image_id;
  draft.image_path = snapshot.image_path;
  draft.subcategory_id = snapshot.subcategory_id;
  draft.subregion_id = snapshot.subregion_id;
  draft.sweetness_id = snapshot.sweetness_id;
  draft.varietals = decode_rows(&snapshot.varietals);
  draft.foods = decode_rows(&snapshot.foods);
  draft
}

#[cfg(test)]
mod tests {
  use cellar_core::{
    ids::{DrinkId, EntityId},
    locale::{Locale, LocalizedField},
  };
  use serde_json::json;

  use super::*;
  use crate::{payload::ItemPatch, token::encode};

  fn snapshot() -> ItemSnapshot {
    serde_json::from_value(json!({
      "id": 7,
      "drink_id": 70,
      "vol": 0.75,
      "price": "31.00",
      "count": 12,
      "image_id": "65f0c",
      "image_path": "/srv/images/65f0c.webp",
      "subcategory_id": 4,
      "subregion_id": 12,
      "sweetness_id": 2,
      "alc": 13.5,
      "sugar": null,
      "age": "5 years",
      "title": "Barolo",
      "title_ru": "Бароло",
      "madeof_it": "Nebbiolo",
      "varietals": [{"id": 3, "percentage": 60}, {"id": 5, "percentage": 40}, {"id": 9}],
      "foods": [{"id": 2}, {"id": 2}, {"id": 8}],
    }))
    .unwrap()
  }

  #[test]
  fn request_targets_the_item_view() {
    assert_eq!(hydration_request(ItemId(7)).path, "/items_view/preact/7");
  }

  #[test]
  fn snapshot_projects_into_an_edit_draft() {
    let d = hydrate_draft(snapshot());
    assert_eq!(d.mode, DraftMode::Edit {
      item_id:  ItemId(7),
      drink_id: Some(DrinkId(70)),
    });
    assert_eq!(d.text.get(LocalizedField::Title, Locale::Ru), "Бароло");
    assert_eq!(d.text.get(LocalizedField::MadeOf, Locale::It), "Nebbiolo");
    assert_eq!(d.price, Some(31.0));
    assert_eq!(d.count, Some(12));
    assert_eq!(d.sugar, None);
    assert_eq!(d.age, "5 years");
    assert_eq!(d.sweetness_id, Some(EntityId(2)));
    assert_eq!(encode(&d.varietals), vec!["3:60", "5:40"]);
    assert_eq!(encode(&d.foods), vec!["2", "8"]);
  }

  #[test]
  fn hydrated_image_fields_round_trip_unchanged() {
    let patch = serde_json::to_value(ItemPatch::from_draft(&hydrate_draft(snapshot()))).unwrap();
    assert_eq!(patch["image_id"], json!("65f0c"));
    assert_eq!(patch["image_path"], json!("/srv/images/65f0c.webp"));
  }

  #[test]
  fn fractional_count_is_dropped() {
    let mut snap = snapshot();
    snap.count = Some(2.5);
    assert_eq!(hydrate_draft(snap).count, None);
  }
}

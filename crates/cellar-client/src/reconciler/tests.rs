//! State-machine tests for `Reconciler` against a scripted transport.

use std::sync::Arc;

use cellar_core::{
  draft::DraftMode,
  handbook::{HandbookEntry, HandbookSet},
  ids::{DrinkId, EntityId, ItemId},
  item::FileAttachment,
  locale::{Locale, LocalizedField, LocalizedNames},
  transport::{HttpError, Method, RequestBody},
};
use serde_json::{Value, json};

use super::*;
use crate::testing::ScriptedTransport;

fn snapshot(id: u32, title: &str) -> Value {
  json!({
    "id": id,
    "drink_id": id * 10,
    "vol": 0.75,
    "price": 24,
    "count": 6,
    "image_id": "img-7",
    "image_path": "/srv/images/img-7.webp",
    "subcategory_id": 4,
    "subregion_id": 12,
    "sweetness_id": null,
    "title": title,
    "title_ru": "Бароло",
    "varietals": [{"id": 3, "percentage": 100}],
    "foods": [{"id": 8}],
  })
}

fn entry(id: u32, name: &str) -> HandbookEntry {
  HandbookEntry {
    id:    EntityId(id),
    names: LocalizedNames {
      generic: name.to_string(),
      ..LocalizedNames::default()
    },
  }
}

fn handbooks() -> Arc<HandbookSet> {
  Arc::new(HandbookSet {
    locale: Locale::En,
    varietals: vec![entry(3, "Nebbiolo"), entry(5, "Barbera")],
    foods: vec![entry(8, "Truffles"), entry(9, "Game")],
    ..HandbookSet::default()
  })
}

async fn hydrated(transport: &Arc<ScriptedTransport>) -> Reconciler<ScriptedTransport> {
  transport.reply("/items_view/preact/7", Ok(snapshot(7, "Barolo")));
  let mut form = Reconciler::new_edit(Arc::clone(transport), "7");
  form.hydrate(handbooks()).await.unwrap();
  form
}

fn body_json(body: &RequestBody) -> Value {
  match body {
    RequestBody::Json(v) => v.clone(),
    RequestBody::Multipart { data, .. } => serde_json::from_str(data).unwrap(),
    RequestBody::Empty => Value::Null,
  }
}

// ─── Hydration ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_mode_starts_ready_with_blank_draft() {
  let form = Reconciler::new_create(Arc::new(ScriptedTransport::default()), handbooks());
  assert_eq!(form.state().name(), "ready");
  assert_eq!(form.draft(), Some(&cellar_core::draft::Draft::blank()));
}

#[tokio::test]
async fn invalid_route_id_fails_before_any_fetch() {
  let transport = Arc::new(ScriptedTransport::default());
  let mut form = Reconciler::new_edit(Arc::clone(&transport), "abc");
  assert!(matches!(form.state(), FormState::Failed { .. }));
  assert!(form.error().unwrap().contains("abc"));
  assert!(matches!(
    form.begin_hydration(handbooks()),
    Err(Error::NotReady("failed"))
  ));
  assert!(transport.requests().is_empty());
}

#[tokio::test]
async fn hydration_projects_snapshot_into_draft() {
  let transport = Arc::new(ScriptedTransport::default());
  let form = hydrated(&transport).await;

  let draft = form.draft().unwrap();
  assert_eq!(draft.mode, DraftMode::Edit {
    item_id:  ItemId(7),
    drink_id: Some(DrinkId(70)),
  });
  assert_eq!(draft.text.get(LocalizedField::Title, Locale::Ru), "Бароло");
  assert_eq!(draft.count, Some(6));
  assert_eq!(form.varietal_tokens(), vec!["3:100"]);

  let requests = transport.requests();
  assert_eq!(requests.len(), 1);
  assert_eq!(requests[0].method, Method::Get);
  assert!(requests[0].use_locale_header);
}

#[tokio::test]
async fn fetch_failure_is_terminal() {
  let transport = Arc::new(ScriptedTransport::default());
  transport.reply("/items_view/preact/7", Err(HttpError::status(500, "db down")));
  let mut form = Reconciler::new_edit(Arc::clone(&transport), "7");
  let err = form.hydrate(handbooks()).await.unwrap_err();
  assert!(matches!(err, Error::Hydration(_)));
  assert_eq!(form.error(), Some("HTTP 500: db down"));
  assert!(form.set_field("title", "x").is_err());
}

#[tokio::test]
async fn retargeted_hydration_discards_stale_snapshot() {
  let transport = Arc::new(ScriptedTransport::default());
  let old = transport.gate("/items_view/preact/7");
  let new = transport.gate("/items_view/preact/8");

  let mut form = Reconciler::new_edit(Arc::clone(&transport), "7");
  let first = form.begin_hydration(handbooks()).unwrap();
  form.retarget("8");
  let second = form.begin_hydration(handbooks()).unwrap();
  assert_eq!(second.item_id(), ItemId(8));

  old.send(Ok(snapshot(7, "Stale"))).unwrap();
  new.send(Ok(snapshot(8, "Fresh"))).unwrap();
  let (stale, fresh) = tokio::join!(first.run(), second.run());

  assert!(form.finish_hydration(fresh));
  assert!(!form.finish_hydration(stale));
  let draft = form.draft().unwrap();
  assert_eq!(draft.text.get(LocalizedField::Title, Locale::En), "Fresh");
}

#[tokio::test]
async fn hydration_requires_empty_state() {
  let transport = Arc::new(ScriptedTransport::default());
  let mut form = hydrated(&transport).await;
  assert!(matches!(
    form.begin_hydration(handbooks()),
    Err(Error::NotReady("ready"))
  ));
}

// ─── Edits and controls ──────────────────────────────────────────────────────

#[tokio::test]
async fn edits_are_field_scoped_and_validated() {
  let transport = Arc::new(ScriptedTransport::default());
  let mut form = hydrated(&transport).await;

  form.set_field("price", "").unwrap();
  assert_eq!(form.draft().unwrap().price, None);
  assert!(matches!(
    form.set_field("vol", "a lot"),
    Err(Error::Core(cellar_core::Error::InvalidNumber { .. }))
  ));
  assert!(matches!(
    form.set_field("colour", "red"),
    Err(Error::Core(cellar_core::Error::UnknownField(_)))
  ));
  assert_eq!(form.draft().unwrap().vol, Some(0.75));
}

#[tokio::test]
async fn controls_follow_handbook_order_and_draft_state() {
  let transport = Arc::new(ScriptedTransport::default());
  let mut form = hydrated(&transport).await;
  form.toggle_varietal(EntityId(5), true).unwrap();
  form.set_varietal_percentage(EntityId(3), "65").unwrap();
  form.toggle_food(EntityId(8), false).unwrap();

  let varietals = form.varietal_controls();
  let rows: Vec<_> = varietals
    .iter()
    .map(|c| (c.label.as_str(), c.checked, c.percentage.as_str()))
    .collect();
  assert_eq!(rows, vec![("Nebbiolo", true, "65"), ("Barbera", true, "100")]);

  let foods = form.food_controls();
  assert!(foods.iter().all(|c| !c.checked));
  assert_eq!(form.varietal_tokens(), vec!["3:65", "5:100"]);
}

// ─── Submission ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn validation_failure_blocks_network_and_keeps_draft() {
  let transport = Arc::new(ScriptedTransport::default());
  let mut form = hydrated(&transport).await;
  form.set_field("title", "").unwrap();
  let before = form.draft().cloned();

  let err = form.submit().await.unwrap_err();
  assert!(matches!(err, Error::Codec(cellar_codec::Error::Invalid(_))));
  assert_eq!(form.error(), Some("title is required"));
  assert_eq!(form.draft().cloned(), before);
  assert_eq!(transport.requests().len(), 1, "only the hydration fetch");
}

#[tokio::test]
async fn successful_edit_submits_both_payloads_and_discards_draft() {
  let transport = Arc::new(ScriptedTransport::default());
  let mut form = hydrated(&transport).await;
  transport.reply("/items/7", Ok(json!({"ok": true})));
  transport.reply("/items/update_item_drink/7", Ok(json!({"ok": true})));

  form.set_field("count", "").unwrap();
  form.submit().await.unwrap();
  assert_eq!(form.state(), &FormState::Done);
  assert!(form.draft().is_none());

  let requests = transport.requests();
  assert_eq!(requests.len(), 3);
  let scalars = body_json(&requests[1].body);
  assert_eq!(scalars["count"], Value::Null);
  assert_eq!(scalars["image_id"], json!("img-7"));
  let content = body_json(&requests[2].body);
  assert_eq!(content["varietals"], json!([{"id": 3, "percentage": 100}]));
  assert_eq!(content["foods"], json!([{"id": 8}]));
}

#[tokio::test]
async fn backend_rejection_returns_to_ready_with_message() {
  let transport = Arc::new(ScriptedTransport::default());
  let mut form = hydrated(&transport).await;
  transport.reply("/items/7", Ok(json!({})));
  transport.reply(
    "/items/update_item_drink/7",
    Err(HttpError::status(422, "title_fr too long")),
  );
  form.set_field("title_fr", "Barolo DOCG").unwrap();
  let before = form.draft().cloned();

  let err = form.submit().await.unwrap_err();
  assert!(matches!(err, Error::Http(_)));
  assert_eq!(form.error(), Some("HTTP 422: title_fr too long"));
  assert_eq!(form.draft().cloned(), before);

  // A manual resubmit goes through once the backend accepts it.
  transport.reply("/items/7", Ok(json!({})));
  transport.reply("/items/update_item_drink/7", Ok(json!({})));
  form.submit().await.unwrap();
  assert_eq!(form.state(), &FormState::Done);
}

#[tokio::test]
async fn failed_scalar_patch_skips_content_patch() {
  let transport = Arc::new(ScriptedTransport::default());
  let mut form = hydrated(&transport).await;
  transport.reply("/items/7", Err(HttpError::network("connection reset")));
  assert!(form.submit().await.is_err());
  let paths: Vec<_> = transport.requests().into_iter().map(|r| r.path).collect();
  assert_eq!(paths, vec!["/items_view/preact/7", "/items/7"]);
}

#[tokio::test]
async fn create_with_attachment_sends_one_multipart_request() {
  let transport = Arc::new(ScriptedTransport::default());
  transport.reply("/items/create_item_drink", Ok(json!({"id": 99})));
  let mut form = Reconciler::new_create(Arc::clone(&transport), handbooks());
  form.set_field("title", "Gavi").unwrap();
  form.set_field("subcategory_id", "4").unwrap();
  form.set_field("subregion_id", "12").unwrap();
  form.toggle_varietal(EntityId(3), true).unwrap();
  form.attach(FileAttachment::new("old.png", vec![1])).unwrap();
  form.attach(FileAttachment::new("gavi.jpg", vec![0xff, 0xd8])).unwrap();

  let ticket = form.begin_submit().unwrap();
  assert!(form.is_busy());
  assert!(form.set_field("title", "late edit").is_err());
  let outcome = ticket.run().await;
  form.finish_submit(outcome).unwrap();
  assert_eq!(form.state(), &FormState::Done);

  let requests = transport.requests();
  assert_eq!(requests.len(), 1);
  assert_eq!(requests[0].method, Method::Post);
  let RequestBody::Multipart { data, file } = &requests[0].body else {
    panic!("create must be multipart");
  };
  assert_eq!(file.as_ref().unwrap().file_name, "gavi.jpg");
  let data: Value = serde_json::from_str(data).unwrap();
  assert_eq!(data["subcategory_id"], json!(4));
  assert!(data.get("image_id").is_none());
}

#[tokio::test]
async fn cancel_orphans_an_in_flight_submit() {
  let transport = Arc::new(ScriptedTransport::default());
  let mut form = hydrated(&transport).await;
  let gate = transport.gate("/items/7");
  transport.reply("/items/update_item_drink/7", Ok(json!({})));

  let ticket = form.begin_submit().unwrap();
  form.cancel();
  gate.send(Err(HttpError::status(500, "late failure"))).unwrap();
  let outcome = ticket.run().await;
  assert!(form.finish_submit(outcome).is_ok());
  assert_eq!(form.state(), &FormState::Cancelled);
  assert_ne!(form.state(), &FormState::Done);
}

#[tokio::test]
async fn rejected_required_input_blocks_submit_until_corrected() {
  let transport = Arc::new(ScriptedTransport::default());
  let mut form = hydrated(&transport).await;

  assert!(form.set_field("subregion_id", "twelve").is_err());
  assert_eq!(form.draft().unwrap().subregion_id, Some(EntityId(12)));
  assert_eq!(
    form.error(),
    Some("subregion_id has an invalid value \"twelve\"")
  );

  let err = form.submit().await.unwrap_err();
  let Error::Codec(cellar_codec::Error::Invalid(errors)) = &err else {
    panic!("expected a validation error, got {err:?}");
  };
  assert!(errors.contains(&ValidationError::Unparsed {
    field: "subregion_id".parse().unwrap(),
    value: "twelve".to_string(),
  }));
  assert_eq!(form.state().name(), "ready");
  assert_eq!(transport.requests().len(), 1, "only the hydration fetch");

  // An unrelated valid edit leaves the rejection in place.
  form.set_field("price", "30").unwrap();
  assert!(form.submit().await.is_err());
  assert_eq!(transport.requests().len(), 1);

  form.set_field("subregion_id", "13").unwrap();
  assert_eq!(form.error(), None);
  transport.reply("/items/7", Ok(json!({})));
  transport.reply("/items/update_item_drink/7", Ok(json!({})));
  form.submit().await.unwrap();
  let content = body_json(&transport.requests()[2].body);
  assert_eq!(content["subregion_id"], json!(13));
}

#[tokio::test]
async fn fixing_edit_clears_stale_validation_message() {
  let transport = Arc::new(ScriptedTransport::default());
  let mut form = hydrated(&transport).await;
  form.set_field("title", "").unwrap();
  assert!(form.submit().await.is_err());
  assert_eq!(form.error(), Some("title is required"));

  form.set_field("title", "Barolo").unwrap();
  assert_eq!(form.error(), None);

  assert!(form.submit().await.is_err(), "nothing scripted for the patch");
  assert!(form.error().is_some());
  form.toggle_food(EntityId(9), true).unwrap();
  assert_eq!(form.error(), None);
}

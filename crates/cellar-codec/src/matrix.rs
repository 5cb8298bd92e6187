//! Locale Field Matrix projections between the flat wire record and the
//! draft's [`LocaleMatrix`].

use std::collections::BTreeMap;

use cellar_core::locale::{Locale, LocaleMatrix, LocalizedField, slot_key};
use serde_json::{Map, Value};

/// Read every `{field}{_locale}` slot out of a flat record. Missing, null and
/// non-string values become empty slots.
pub fn project_to_draft(record: &Map<String, Value>) -> LocaleMatrix {
  let mut matrix = LocaleMatrix::default();
  for (field, locale) in LocaleMatrix::keys() {
    if let Some(text) = record.get(&slot_key(field, locale)).and_then(Value::as_str) {
      matrix.set(field, locale, text);
    }
  }
  matrix
}

/// Localized content grouped per locale, keyed by canonical field name, with
/// blank slots already replaced by the default-locale text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalePayload(BTreeMap<Locale, BTreeMap<LocalizedField, String>>);

impl LocalePayload {
  pub fn get(&self, locale: Locale, field: LocalizedField) -> Option<&str> {
    self.0.get(&locale)?.get(&field).map(String::as_str)
  }

  pub fn locale(&self, locale: Locale) -> Option<&BTreeMap<LocalizedField, String>> {
    self.0.get(&locale)
  }

  /// Flatten back into wire keys (`title`, `title_ru`, ...).
  pub fn into_wire(self) -> Map<String, Value> {
    self
      .0
      .into_iter()
      .flat_map(|(locale, fields)| {
        fields
          .into_iter()
          .map(move |(field, text)| (slot_key(field, locale), Value::String(text)))
      })
      .collect()
  }
}

pub fn project_from_draft(matrix: &LocaleMatrix) -> LocalePayload {
  let mut out: BTreeMap<Locale, BTreeMap<LocalizedField, String>> = BTreeMap::new();
  for (field, locale, _) in matrix.iter() {
    out
      .entry(locale)
      .or_default()
      .insert(field, matrix.get_or_default(field, locale).to_string());
  }
  LocalePayload(out)
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  #[test]
  fn projection_reads_suffixed_keys_and_ignores_others() {
    let record = json!({
      "title": "Chablis",
      "title_fr": "Chablis AOC",
      "madeof_zh": "霞多丽",
      "subtitle_ru": null,
      "vol": 0.75,
    });
    let m = project_to_draft(record.as_object().unwrap());
    assert_eq!(m.get(LocalizedField::Title, Locale::En), "Chablis");
    assert_eq!(m.get(LocalizedField::Title, Locale::Fr), "Chablis AOC");
    assert_eq!(m.get(LocalizedField::MadeOf, Locale::Zh), "霞多丽");
    assert_eq!(m.get(LocalizedField::Subtitle, Locale::Ru), "");
  }

  #[test]
  fn payload_falls_back_to_default_locale() {
    let mut m = LocaleMatrix::default();
    m.set(LocalizedField::Description, Locale::En, "Dry white");
    m.set(LocalizedField::Description, Locale::It, "Bianco secco");
    let payload = project_from_draft(&m);
    assert_eq!(
      payload.get(Locale::It, LocalizedField::Description),
      Some("Bianco secco")
    );
    assert_eq!(
      payload.get(Locale::De, LocalizedField::Description),
      Some("Dry white")
    );
    assert_eq!(payload.locale(Locale::Zh).map(BTreeMap::len), Some(5));

    let wire = payload.into_wire();
    assert_eq!(wire.len(), 35);
    assert_eq!(wire["description_de"], json!("Dry white"));
    assert_eq!(wire["description"], json!("Dry white"));
  }
}

//! Relation Codec: string tokens for checkbox / percentage form controls and
//! JSON rows from the backend, both mapped to [`RelationSet`].
//!
//! Token grammar:
//!   attributed (varietals)  → `"{id}:{percentage}"`
//!   plain (foods)           → `"{id}"`
//!
//! Malformed tokens are dropped one by one; the rest of the set survives.

use cellar_core::{
  ids::EntityId,
  relation::{EdgeAttribute, FoodRef, Percentage, RelationEdge, RelationSet, VarietalRef},
};
use serde_json::Value;

/// The string and row encodings of one relation kind.
pub trait RelationCodec: EdgeAttribute + Sized {
  fn encode_token(edge: &RelationEdge<Self>) -> String;

  fn decode_token(token: &str) -> Option<RelationEdge<Self>>;

  fn decode_row(row: &Value) -> Option<RelationEdge<Self>>;
}

impl RelationCodec for Percentage {
  fn encode_token(edge: &RelationEdge<Self>) -> String {
    format!("{}:{}", edge.target, edge.attribute)
  }

  fn decode_token(token: &str) -> Option<RelationEdge<Self>> {
    let (id, pct) = token.split_once(':')?;
    Some(RelationEdge {
      target:    id.parse::<EntityId>().ok()?,
      attribute: pct.parse::<Percentage>().ok()?,
    })
  }

  fn decode_row(row: &Value) -> Option<RelationEdge<Self>> {
    let r: VarietalRef = serde_json::from_value(row.clone()).ok()?;
    Some(RelationEdge {
      target:    r.id,
      attribute: r.percentage,
    })
  }
}

impl RelationCodec for () {
  fn encode_token(edge: &RelationEdge<Self>) -> String { edge.target.to_string() }

  fn decode_token(token: &str) -> Option<RelationEdge<Self>> {
    Some(RelationEdge {
      target:    token.parse::<EntityId>().ok()?,
      attribute: (),
    })
  }

  fn decode_row(row: &Value) -> Option<RelationEdge<Self>> {
    let r: FoodRef = serde_json::from_value(row.clone()).ok()?;
    Some(RelationEdge {
      target:    r.id,
      attribute: (),
    })
  }
}

/// One token per edge, in set order.
pub fn encode<A: RelationCodec>(set: &RelationSet<A>) -> Vec<String> {
  set.iter().map(A::encode_token).collect()
}

/// Decode `tokens`, dropping malformed ones and repeated ids (first wins).
pub fn decode<A: RelationCodec, S: AsRef<str>>(tokens: &[S]) -> RelationSet<A> {
  decode_with_rejects(tokens).0
}

/// As [`decode`], also returning the tokens that were dropped as malformed.
pub fn decode_with_rejects<A: RelationCodec, S: AsRef<str>>(
  tokens: &[S],
) -> (RelationSet<A>, Vec<String>) {
  let mut rejects = Vec::new();
  let set = RelationSet::from_edges(tokens.iter().filter_map(|t| {
    let decoded = A::decode_token(t.as_ref());
    if decoded.is_none() {
      rejects.push(t.as_ref().to_string());
    }
    decoded
  }));
  (set, rejects)
}

/// Decode backend relation rows, dropping malformed rows.
pub fn decode_rows<A: RelationCodec>(rows: &[Value]) -> RelationSet<A> {
  RelationSet::from_edges(rows.iter().filter_map(A::decode_row))
}

//! Many-to-many relation edges of an item: varietal composition (with a
//! percentage per edge) and food pairings (no attribute).
//!
//! A [`RelationSet`] holds at most one edge per target id. Every mutation
//! preserves that, not only construction.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{Error, ids::EntityId};

// ─── Attributes ──────────────────────────────────────────────────────────────

/// Share of a varietal in an item's composition, in `[0, 100]`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Percentage(f64);

impl Percentage {
  pub const FULL: Self = Self(100.0);

  pub fn new(value: f64) -> Option<Self> {
    (value.is_finite() && (0.0..=100.0).contains(&value)).then_some(Self(value))
  }

  pub fn value(self) -> f64 { self.0 }
}

impl fmt::Display for Percentage {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

impl FromStr for Percentage {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    s.trim()
      .parse::<f64>()
      .ok()
      .and_then(Self::new)
      .ok_or_else(|| Error::InvalidPercentage(s.to_string()))
  }
}

impl Serialize for Percentage {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    // Whole percentages go out as JSON integers.
    if self.0.fract() == 0.0 {
      serializer.serialize_u64(self.0 as u64)
    } else {
      serializer.serialize_f64(self.0)
    }
  }
}

impl<'de> Deserialize<'de> for Percentage {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    let raw = f64::deserialize(deserializer)?;
    Self::new(raw).ok_or_else(|| {
      serde::de::Error::custom(format!("percentage out of range: {raw}"))
    })
  }
}

/// The per-edge attribute of a relation kind.
pub trait EdgeAttribute: Clone + PartialEq + fmt::Debug {
  /// Attribute given to an edge when a target is toggled on.
  fn on_insert() -> Self;
}

impl EdgeAttribute for Percentage {
  fn on_insert() -> Self { Self::FULL }
}

impl EdgeAttribute for () {
  fn on_insert() -> Self {}
}

// ─── Edges and sets ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct RelationEdge<A> {
  pub target:    EntityId,
  pub attribute: A,
}

/// An ordered set of relation edges keyed by target id.
#[derive(Debug, Clone, PartialEq)]
pub struct RelationSet<A> {
  edges: Vec<RelationEdge<A>>,
}

pub type VarietalSet = RelationSet<Percentage>;
pub type FoodSet = RelationSet<()>;

impl<A> Default for RelationSet<A> {
  fn default() -> Self { Self { edges: Vec::new() } }
}

impl<A: EdgeAttribute> RelationSet<A> {
  pub fn new() -> Self { Self::default() }

  /// Build from edges in order; a repeated target keeps its first edge.
  pub fn from_edges(edges: impl IntoIterator<Item = RelationEdge<A>>) -> Self {
    let mut set = Self::new();
    for edge in edges {
      set.insert(edge);
    }
    set
  }

  pub fn len(&self) -> usize { self.edges.len() }

  pub fn is_empty(&self) -> bool { self.edges.is_empty() }

  pub fn iter(&self) -> impl Iterator<Item = &RelationEdge<A>> { self.edges.iter() }

  pub fn contains(&self, target: EntityId) -> bool { self.get(target).is_some() }

  pub fn get(&self, target: EntityId) -> Option<&A> {
    self
      .edges
      .iter()
      .find(|e| e.target == target)
      .map(|e| &e.attribute)
  }

  /// Append `edge` unless its target is already present. Returns whether the
  /// set changed.
  pub fn insert(&mut self, edge: RelationEdge<A>) -> bool {
    if self.contains(edge.target) {
      return false;
    }
    self.edges.push(edge);
    true
  }

  /// Remove the edge for `target`, leaving every other edge in place.
  pub fn remove(&mut self, target: EntityId) -> bool {
    let before = self.edges.len();
    self.edges.retain(|e| e.target != target);
    before != self.edges.len()
  }

  /// Checkbox semantics: `on` inserts with the default attribute when absent,
  /// `!on` removes. Returns whether the set changed.
  pub fn toggle(&mut self, target: EntityId, on: bool) -> bool {
    if on {
      self.insert(RelationEdge {
        target,
        attribute: A::on_insert(),
      })
    } else {
      self.remove(target)
    }
  }

  /// Rewrite the attribute of an existing edge in place. Absent targets are
  /// left absent.
  pub fn set_attribute(&mut self, target: EntityId, attribute: A) -> bool {
    match self.edges.iter_mut().find(|e| e.target == target) {
      Some(edge) => {
        edge.attribute = attribute;
        true
      }
      None => false,
    }
  }

  /// Equality ignoring edge order.
  pub fn same_members(&self, other: &Self) -> bool {
    self.len() == other.len()
      && self
        .edges
        .iter()
        .all(|e| other.get(e.target) == Some(&e.attribute))
  }
}

// ─── Wire rows ───────────────────────────────────────────────────────────────

/// `{ "id": 3, "percentage": 60 }` as exchanged with the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VarietalRef {
  pub id:         EntityId,
  pub percentage: Percentage,
}

/// `{ "id": 5 }` as exchanged with the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoodRef {
  pub id: EntityId,
}

impl From<&VarietalSet> for Vec<VarietalRef> {
  fn from(set: &VarietalSet) -> Self {
    set
      .iter()
      .map(|e| VarietalRef {
        id:         e.target,
        percentage: e.attribute,
      })
      .collect()
  }
}

impl From<&FoodSet> for Vec<FoodRef> {
  fn from(set: &FoodSet) -> Self { set.iter().map(|e| FoodRef { id: e.target }).collect() }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn pct(v: f64) -> Percentage { Percentage::new(v).unwrap() }

  #[test]
  fn percentage_bounds() {
    assert!(Percentage::new(0.0).is_some());
    assert!(Percentage::new(100.0).is_some());
    assert!(Percentage::new(100.5).is_none());
    assert!(Percentage::new(-1.0).is_none());
    assert!(Percentage::new(f64::NAN).is_none());
    assert!("abc".parse::<Percentage>().is_err());
    assert_eq!("12.5".parse::<Percentage>().unwrap(), pct(12.5));
  }

  #[test]
  fn whole_percentages_serialize_as_integers() {
    assert_eq!(serde_json::to_string(&pct(60.0)).unwrap(), "60");
    assert_eq!(serde_json::to_string(&pct(12.5)).unwrap(), "12.5");
    assert_eq!(pct(40.0).to_string(), "40");
  }

  #[test]
  fn toggle_on_inserts_default_and_off_removes_only_that_edge() {
    let mut set = VarietalSet::from_edges([
      RelationEdge { target: EntityId(3), attribute: pct(50.0) },
      RelationEdge { target: EntityId(7), attribute: pct(50.0) },
    ]);
    assert!(set.toggle(EntityId(9), true));
    assert_eq!(set.get(EntityId(9)), Some(&Percentage::FULL));
    assert!(!set.toggle(EntityId(9), true), "second toggle-on is a no-op");
    assert_eq!(set.len(), 3);

    assert!(set.toggle(EntityId(9), false));
    let ids: Vec<_> = set.iter().map(|e| e.target).collect();
    assert_eq!(ids, vec![EntityId(3), EntityId(7)]);
  }

  #[test]
  fn set_attribute_rewrites_in_place() {
    let mut set = VarietalSet::new();
    set.toggle(EntityId(1), true);
    set.toggle(EntityId(2), true);
    set.toggle(EntityId(3), true);
    assert!(set.set_attribute(EntityId(2), pct(25.0)));
    assert!(!set.set_attribute(EntityId(4), pct(25.0)));
    let rows: Vec<_> = set.iter().map(|e| (e.target.0, e.attribute.value())).collect();
    assert_eq!(rows, vec![(1, 100.0), (2, 25.0), (3, 100.0)]);
  }

  #[test]
  fn duplicate_targets_keep_first_edge() {
    let set = VarietalSet::from_edges([
      RelationEdge { target: EntityId(3), attribute: pct(60.0) },
      RelationEdge { target: EntityId(3), attribute: pct(10.0) },
    ]);
    assert_eq!(set.len(), 1);
    assert_eq!(set.get(EntityId(3)), Some(&pct(60.0)));
  }

  #[test]
  fn same_members_ignores_order() {
    let mut a = FoodSet::new();
    a.toggle(EntityId(1), true);
    a.toggle(EntityId(2), true);
    let mut b = FoodSet::new();
    b.toggle(EntityId(2), true);
    b.toggle(EntityId(1), true);
    assert!(a.same_members(&b));
    assert_ne!(a, b);
  }
}

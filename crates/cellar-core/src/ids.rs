//! Identifier newtypes.
//!
//! Backend row ids are small positive integers; image resources are opaque
//! strings minted by the asset store.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::Error;

macro_rules! numeric_id {
  ($(#[$meta:meta])* $name:ident) => {
    $(#[$meta])*
    #[derive(
      Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
    )]
    #[serde(transparent)]
    pub struct $name(pub u32);

    impl fmt::Display for $name {
      fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
      }
    }

    impl FromStr for $name {
      type Err = Error;

      fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
          .parse::<u32>()
          .map($name)
          .map_err(|_| Error::InvalidId(s.to_string()))
      }
    }
  };
}

numeric_id!(
  /// Primary key of a catalog item.
  ItemId
);
numeric_id!(
  /// Primary key of the localized-content ("drink") record behind an item.
  DrinkId
);
numeric_id!(
  /// Primary key of a handbook entry (subcategory, varietal, food, ...).
  EntityId
);

/// Opaque identifier of a stored image. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ResourceId(String);

impl ResourceId {
  /// Returns `None` for blank input, which callers treat as "no image".
  pub fn new(raw: impl Into<String>) -> Option<Self> {
    let raw = raw.into();
    let trimmed = raw.trim();
    if trimmed.is_empty() {
      None
    } else if trimmed.len() == raw.len() {
      Some(Self(raw))
    } else {
      Some(Self(trimmed.to_string()))
    }
  }

  pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for ResourceId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

impl TryFrom<String> for ResourceId {
  type Error = Error;

  fn try_from(value: String) -> Result<Self, Self::Error> {
    Self::new(value.clone()).ok_or(Error::InvalidId(value))
  }
}

impl From<ResourceId> for String {
  fn from(value: ResourceId) -> Self { value.0 }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn item_id_parses_route_segment() {
    assert_eq!(" 42 ".parse::<ItemId>().unwrap(), ItemId(42));
  }

  #[test]
  fn non_numeric_item_id_is_rejected() {
    assert!(matches!("abc".parse::<ItemId>(), Err(Error::InvalidId(_))));
    assert!("-3".parse::<ItemId>().is_err());
    assert!("".parse::<ItemId>().is_err());
  }

  #[test]
  fn blank_resource_id_means_no_image() {
    assert!(ResourceId::new("").is_none());
    assert!(ResourceId::new("   ").is_none());
    assert_eq!(ResourceId::new(" abc ").unwrap().as_str(), "abc");
  }

  #[test]
  fn resource_id_deserialization_rejects_blank() {
    let ok: ResourceId = serde_json::from_str("\"65f0c\"").unwrap();
    assert_eq!(ok.as_str(), "65f0c");
    assert!(serde_json::from_str::<ResourceId>("\"\"").is_err());
  }
}

//! Core types and collaborator contracts for the cellar catalog admin client.
//!
//! No HTTP and no async runtime here: `cellar-codec` and `cellar-client` build
//! on these types, and tests can fake every collaborator trait in-process.

pub mod draft;
pub mod error;
pub mod handbook;
pub mod ids;
pub mod item;
pub mod locale;
pub mod relation;
pub mod transport;

pub use error::{Error, Result};

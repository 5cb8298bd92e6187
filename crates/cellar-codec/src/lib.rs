//! Serialization boundary between the cellar [`Draft`](cellar_core::draft::Draft)
//! and the backend wire format.
//!
//! Everything here is synchronous and side-effect free: relation tokens,
//! the locale matrix projections, snapshot hydration and the ordered request
//! plan for a submit. Issuing the requests is the client crate's job.

pub mod error;
pub mod matrix;
pub mod payload;
pub mod snapshot;
pub mod token;

pub use error::{Error, Result};
pub use matrix::{LocalePayload, project_from_draft, project_to_draft};
pub use payload::{SubmitPlan, ValidationError, ValidationErrors, plan_submission, validate};
pub use snapshot::{hydrate_draft, hydration_request};
pub use token::RelationCodec;

//! Runtime side of the cellar catalog admin client: the reqwest transport,
//! image handle resolution, the handbook cache and the item form state
//! machine.

pub mod asset;
pub mod client;
pub mod config;
pub mod credentials;
pub mod error;
pub mod handbooks;
pub mod reconciler;

#[cfg(test)]
mod testing;

pub use asset::{AssetHandle, AssetResolver, HandleRegistry};
pub use client::ApiClient;
pub use config::ClientConfig;
pub use credentials::{EnvCredentials, StaticCredentials};
pub use error::{Error, Result};
pub use handbooks::HandbookCache;
pub use reconciler::{FormState, Reconciler};

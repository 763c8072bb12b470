//! Remote book catalog: item model and HTTP client.
//!
//! - [`types`] - `Item` and category metadata as sent by the service
//! - [`client`] - `CatalogClient` for the search, category, category-metadata and highlights endpoints

mod client;
mod types;

pub use client::{CatalogClient, RemoteQuery, RetrievalError, MAX_HIGHLIGHTS};
pub use types::{dedup_by_id, CategoryInfo, Item};

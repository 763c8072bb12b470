use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A book as returned by the catalog service.
///
/// `id` is the only identity: deduplication and favorites membership never
/// look at any other field. Optional locators are `None` when the provider
/// did not supply them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub author: Option<String>,
    /// Upstream provider label (e.g. "Gutenberg", "Open Library").
    pub source: String,
    #[serde(default)]
    pub preview_url: Option<String>,
    #[serde(default)]
    pub download_url: Option<String>,
    #[serde(default)]
    pub cover_url: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
}

impl Item {
    /// Minimal item with only the required fields set.
    pub fn new(id: impl Into<String>, title: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            author: None,
            source: source.into(),
            preview_url: None,
            download_url: None,
            cover_url: None,
            summary: None,
            language: None,
        }
    }

    pub fn has_cover(&self) -> bool {
        self.cover_url.as_deref().is_some_and(|u| !u.trim().is_empty())
    }

    pub fn has_preview(&self) -> bool {
        self.preview_url.as_deref().is_some_and(|u| !u.trim().is_empty())
    }

    pub fn has_download(&self) -> bool {
        self.download_url.as_deref().is_some_and(|u| !u.trim().is_empty())
    }
}

/// Drop repeated identifiers, keeping the first occurrence and the original order.
///
/// The catalog merges several providers and can repeat an item; the result set
/// must stay keyed by `id` without being re-sorted.
pub fn dedup_by_id(items: Vec<Item>) -> Vec<Item> {
    let mut seen = HashSet::with_capacity(items.len());
    let before = items.len();
    let deduped: Vec<Item> = items
        .into_iter()
        .filter(|item| seen.insert(item.id.clone()))
        .collect();
    if deduped.len() != before {
        tracing::debug!(
            removed = before - deduped.len(),
            "Dropped duplicate items from result set"
        );
    }
    deduped
}

/// Navigation metadata for a recognized category.
///
/// Field aliases accept the Portuguese names used by the catalog backend
/// (`nome`, `cor`, `adulto`).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CategoryInfo {
    #[serde(alias = "nome")]
    pub name: String,
    /// Display color as sent by the server (typically `#rrggbb`).
    #[serde(default, alias = "cor")]
    pub color: Option<String>,
    /// Category holds sensitive (adult) content.
    #[serde(default, alias = "adulto")]
    pub sensitive: bool,
}

impl CategoryInfo {
    pub fn plain(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            color: None,
            sensitive: false,
        }
    }
}

/// Envelope of the category metadata endpoint.
#[derive(Debug, Deserialize)]
pub(crate) struct CategoryList {
    #[serde(alias = "categorias")]
    pub categories: Vec<CategoryInfo>,
}

use crate::catalog::{dedup_by_id, Item};
use std::path::PathBuf;

use super::store::{FileStore, PersistenceStore, StoreError};

/// Fixed key holding the serialized favorites list.
pub const CURATED_KEY: &str = "favorites";

/// What `load` found in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Nothing stored yet (first run).
    Missing,
    /// A valid list with this many items.
    Loaded(usize),
    /// The stored document did not parse; treated as an empty list.
    Malformed,
    /// The store could not be read; the cached copy was kept.
    Unreadable,
}

/// Owner of the user's favorites list.
///
/// Holds one in-memory copy of the list and keeps it in step with the store:
/// every mutation re-reads the whole stored collection, applies the change and
/// writes the whole collection back. Mutations take `&mut self`, so two
/// toggles can never interleave their read-modify-write sequences.
///
/// A failed write is logged and remembered (see [`Self::take_write_error`]);
/// the in-memory copy keeps the change and may run ahead of the store.
pub struct CurationManager {
    store: Box<dyn PersistenceStore>,
    items: Vec<Item>,
    last_write_error: Option<StoreError>,
}

impl CurationManager {
    /// Wrap a store. The cache starts empty until [`Self::load`] runs.
    pub fn new(store: Box<dyn PersistenceStore>) -> Self {
        Self {
            store,
            items: Vec::new(),
            last_write_error: None,
        }
    }

    /// Open the favorites kept in `store` and load them.
    ///
    /// A corrupt document is copied aside before anything can overwrite it;
    /// the backup path is returned alongside the load outcome.
    pub fn open_file(store: FileStore) -> (Self, LoadOutcome, Option<PathBuf>) {
        let backup_store = store.clone();
        let mut manager = Self::new(Box::new(store));
        let outcome = manager.load();

        let backup = if outcome == LoadOutcome::Malformed {
            match backup_store.backup(CURATED_KEY) {
                Ok(path) => path,
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to back up corrupt favorites");
                    None
                }
            }
        } else {
            None
        };
        (manager, outcome, backup)
    }

    /// Refresh the in-memory copy from the store.
    pub fn load(&mut self) -> LoadOutcome {
        let (items, outcome) = self.read_stored();
        if let Some(items) = items {
            self.items = items;
        }
        outcome
    }

    /// Write the in-memory copy to the store.
    pub fn flush(&self) -> Result<(), StoreError> {
        // Serializing plain strings and options cannot fail.
        let json = serde_json::to_string(&self.items)
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        self.store.write(CURATED_KEY, &json)
    }

    /// Favorites in insertion order.
    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_curated(&self, id: &str) -> bool {
        self.items.iter().any(|item| item.id == id)
    }

    /// Append `item` unless its id is already present.
    pub fn add(&mut self, item: Item) {
        tracing::debug!(id = %item.id, "Adding favorite");
        self.mutate(|items| {
            if !items.iter().any(|existing| existing.id == item.id) {
                items.push(item);
            }
        });
    }

    /// Remove every item with this id. Absent ids are a no-op.
    pub fn remove(&mut self, id: &str) {
        tracing::debug!(id, "Removing favorite");
        self.mutate(|items| items.retain(|existing| existing.id != id));
    }

    /// Flip membership of `item` and return the new state (`true` = curated).
    pub fn toggle(&mut self, item: &Item) -> bool {
        // Decide against the stored collection, not a possibly stale cache.
        self.load();
        if self.is_curated(&item.id) {
            self.remove(&item.id);
            false
        } else {
            self.add(item.clone());
            true
        }
    }

    /// Last write failure since the previous call, if any.
    pub fn take_write_error(&mut self) -> Option<StoreError> {
        self.last_write_error.take()
    }

    fn mutate(&mut self, apply: impl FnOnce(&mut Vec<Item>)) {
        let (stored, _) = self.read_stored();
        let mut items = stored.unwrap_or_else(|| self.items.clone());
        apply(&mut items);
        self.items = items;

        if let Err(e) = self.flush() {
            tracing::warn!(error = %e, count = self.items.len(), "Failed to persist favorites");
            self.last_write_error = Some(e);
        }
    }

    /// Read and parse the stored list.
    ///
    /// Returns `None` for the items only when the store itself failed, in
    /// which case callers keep their cached copy instead of wiping it.
    fn read_stored(&self) -> (Option<Vec<Item>>, LoadOutcome) {
        let raw = match self.store.read(CURATED_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return (Some(Vec::new()), LoadOutcome::Missing),
            Err(e @ StoreError::NotText(_)) => {
                tracing::warn!(error = %e, "Stored favorites are malformed, treating as empty");
                return (Some(Vec::new()), LoadOutcome::Malformed);
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read favorites, keeping cached copy");
                return (None, LoadOutcome::Unreadable);
            }
        };

        if raw.trim().is_empty() {
            return (Some(Vec::new()), LoadOutcome::Missing);
        }

        match serde_json::from_str::<Vec<Item>>(&raw) {
            Ok(items) => {
                let items = dedup_by_id(items);
                let count = items.len();
                (Some(items), LoadOutcome::Loaded(count))
            }
            Err(e) => {
                tracing::warn!(error = %e, "Stored favorites are malformed, treating as empty");
                (Some(Vec::new()), LoadOutcome::Malformed)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn item(id: &str) -> Item {
        Item::new(id, format!("Title {}", id), "Gutenberg")
    }

    fn manager_with(store: &MemoryStore) -> CurationManager {
        let mut manager = CurationManager::new(Box::new(store.clone()));
        manager.load();
        manager
    }

    fn stored_ids(store: &MemoryStore) -> Vec<String> {
        let raw = store.raw(CURATED_KEY).unwrap_or_else(|| "[]".to_string());
        serde_json::from_str::<Vec<Item>>(&raw)
            .unwrap()
            .into_iter()
            .map(|i| i.id)
            .collect()
    }

    #[test]
    fn test_empty_store_is_empty_list() {
        let store = MemoryStore::new();
        let mut manager = CurationManager::new(Box::new(store));
        assert_eq!(manager.load(), LoadOutcome::Missing);
        assert!(manager.is_empty());
        assert!(!manager.is_curated("anything"));
    }

    #[test]
    fn test_malformed_store_is_empty_list() {
        let store = MemoryStore::with_entry(CURATED_KEY, "{definitely not json");
        let mut manager = CurationManager::new(Box::new(store));
        assert_eq!(manager.load(), LoadOutcome::Malformed);
        assert!(!manager.is_curated("a"));
    }

    #[test]
    fn test_wrong_shape_is_malformed() {
        let store = MemoryStore::with_entry(CURATED_KEY, r#"{"id": "a"}"#);
        let mut manager = CurationManager::new(Box::new(store));
        assert_eq!(manager.load(), LoadOutcome::Malformed);
    }

    #[test]
    fn test_add_persists_whole_collection() {
        let store = MemoryStore::new();
        let mut manager = manager_with(&store);
        manager.add(item("a"));
        manager.add(item("b"));
        assert!(manager.is_curated("a"));
        assert_eq!(stored_ids(&store), vec!["a", "b"]);
    }

    #[test]
    fn test_add_existing_id_does_not_duplicate() {
        let store = MemoryStore::new();
        let mut manager = manager_with(&store);
        manager.add(item("a"));
        manager.add(Item::new("a", "Other title", "Other source"));
        assert_eq!(manager.len(), 1);
        assert_eq!(manager.items()[0].title, "Title a");
        assert_eq!(stored_ids(&store), vec!["a"]);
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let store = MemoryStore::new();
        let mut manager = manager_with(&store);
        manager.add(item("a"));
        manager.remove("zzz");
        assert_eq!(stored_ids(&store), vec!["a"]);
        assert!(manager.take_write_error().is_none());
    }

    #[test]
    fn test_remove_drops_every_matching_entry() {
        let raw = serde_json::to_string(&vec![item("a"), item("b"), item("a")]).unwrap();
        let store = MemoryStore::with_entry(CURATED_KEY, &raw);
        let mut manager = manager_with(&store);
        manager.remove("a");
        assert!(!manager.is_curated("a"));
        assert_eq!(stored_ids(&store), vec!["b"]);
    }

    #[test]
    fn test_toggle_reports_new_state() {
        let store = MemoryStore::new();
        let mut manager = manager_with(&store);
        assert!(manager.toggle(&item("a")));
        assert!(manager.is_curated("a"));
        assert!(!manager.toggle(&item("a")));
        assert!(!manager.is_curated("a"));
        assert!(stored_ids(&store).is_empty());
    }

    #[test]
    fn test_mutation_rereads_store() {
        let store = MemoryStore::new();
        let mut manager = manager_with(&store);
        manager.add(item("a"));

        // Another writer replaced the document behind our back.
        let raw = serde_json::to_string(&vec![item("x")]).unwrap();
        store.write(CURATED_KEY, &raw).unwrap();

        manager.add(item("b"));
        assert_eq!(stored_ids(&store), vec!["x", "b"]);
        assert!(!manager.is_curated("a"));
    }

    #[test]
    fn test_malformed_store_is_overwritten_on_first_mutation() {
        let store = MemoryStore::with_entry(CURATED_KEY, "garbage");
        let mut manager = manager_with(&store);
        manager.toggle(&item("a"));
        assert_eq!(stored_ids(&store), vec!["a"]);
    }

    #[test]
    fn test_write_failure_is_recorded_and_cache_keeps_change() {
        let store = MemoryStore::new();
        let mut manager = manager_with(&store);
        store.set_fail_writes(true);

        assert!(manager.toggle(&item("a")));
        assert!(manager.is_curated("a"));
        assert!(matches!(
            manager.take_write_error(),
            Some(StoreError::Unavailable(_))
        ));
        assert!(manager.take_write_error().is_none());
        assert!(store.raw(CURATED_KEY).is_none());
    }

    #[test]
    fn test_load_keeps_insertion_order() {
        let raw = serde_json::to_string(&vec![item("c"), item("a"), item("b")]).unwrap();
        let store = MemoryStore::with_entry(CURATED_KEY, &raw);
        let mut manager = CurationManager::new(Box::new(store));
        assert_eq!(manager.load(), LoadOutcome::Loaded(3));
        let ids: Vec<_> = manager.items().iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
    }

    proptest! {
        #[test]
        fn toggle_twice_restores_membership(
            seed in proptest::collection::vec("[a-e]", 0..6),
            id in "[a-e]",
        ) {
            let store = MemoryStore::new();
            let mut manager = manager_with(&store);
            for s in &seed {
                manager.add(item(s));
            }
            let before = manager.is_curated(&id);
            manager.toggle(&item(&id));
            manager.toggle(&item(&id));
            prop_assert_eq!(manager.is_curated(&id), before);
        }

        #[test]
        fn add_then_remove_laws(id in "[a-z]{1,8}") {
            let store = MemoryStore::new();
            let mut manager = manager_with(&store);
            manager.add(item(&id));
            prop_assert!(manager.is_curated(&id));
            manager.remove(&id);
            prop_assert!(!manager.is_curated(&id));
        }
    }
}

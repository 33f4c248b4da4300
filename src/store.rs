// Todo list store: in-memory list mirrored to a blob store

use crate::blob::BlobStore;
use crate::filter::{Filter, compute_visible};
use crate::item::{Item, new_id, normalize_text};
use eyre::{Context, Result};
use std::collections::HashSet;
use tracing::{debug, error, info, warn};

/// Blob key holding the serialized list
pub const STORAGE_KEY: &str = "todos-v1";

/// Authoritative todo list plus the active view filter
///
/// Every mutation that changes the list is persisted before it returns.
/// Mutations return `true` when the list changed and the view should
/// redraw. If persisting fails, the list is rolled back to its state before
/// the call and the error is returned.
pub struct Store<B: BlobStore> {
    blob: B,
    items: Vec<Item>,
    filter: Filter,
}

impl<B: BlobStore> Store<B> {
    /// Open a store over `blob`, loading whatever list it holds
    pub fn open(blob: B) -> Self {
        let items = Self::load(&blob);
        info!(count = items.len(), "Loaded todo list");
        Self {
            blob,
            items,
            filter: Filter::default(),
        }
    }

    /// Read the persisted list from `blob`
    ///
    /// Never fails: a missing entry yields an empty list, and a read or parse
    /// failure is logged and also yields an empty list.
    pub fn load(blob: &B) -> Vec<Item> {
        let raw = match blob.get(STORAGE_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                error!(key = STORAGE_KEY, error = ?e, "Failed to read persisted list, starting empty");
                return Vec::new();
            }
        };

        let items: Vec<Item> = match serde_json::from_str(&raw) {
            Ok(items) => items,
            Err(e) => {
                error!(key = STORAGE_KEY, error = ?e, "Failed to parse persisted list, starting empty");
                return Vec::new();
            }
        };

        sanitize(items)
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn filter(&self) -> Filter {
        self.filter
    }

    /// Get an item by id
    pub fn get(&self, id: &str) -> Option<&Item> {
        self.items.iter().find(|item| item.id == id)
    }

    /// Items passing the active filter
    pub fn visible(&self) -> Vec<&Item> {
        compute_visible(&self.items, self.filter)
    }

    /// Number of items not yet completed
    pub fn items_left(&self) -> usize {
        self.items.iter().filter(|item| !item.completed).count()
    }

    pub fn blob(&self) -> &B {
        &self.blob
    }

    pub fn blob_mut(&mut self) -> &mut B {
        &mut self.blob
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    /// Add an item at the front of the list
    ///
    /// Returns the new item's id, or `None` if `text` was blank.
    pub fn add(&mut self, text: &str) -> Result<Option<String>> {
        let Some(mut item) = Item::new(text) else {
            debug!("add: blank text ignored");
            return Ok(None);
        };
        while self.get(&item.id).is_some() {
            item.id = new_id();
        }

        let id = item.id.clone();
        let snapshot = self.items.clone();
        self.items.insert(0, item);
        self.persist(snapshot)?;

        debug!(id, "add: created item");
        Ok(Some(id))
    }

    /// Flip the completed flag of an item
    pub fn toggle(&mut self, id: &str) -> Result<bool> {
        let Some(pos) = self.position(id) else {
            debug!(id, "toggle: unknown id");
            return Ok(false);
        };

        let snapshot = self.items.clone();
        self.items[pos].completed = !self.items[pos].completed;
        self.persist(snapshot)?;
        Ok(true)
    }

    /// Remove an item
    pub fn delete(&mut self, id: &str) -> Result<bool> {
        let Some(pos) = self.position(id) else {
            debug!(id, "delete: unknown id");
            return Ok(false);
        };

        let snapshot = self.items.clone();
        self.items.remove(pos);
        self.persist(snapshot)?;
        Ok(true)
    }

    /// Replace an item's text
    ///
    /// Blank text keeps the previous value.
    pub fn edit(&mut self, id: &str, new_text: &str) -> Result<bool> {
        let Some(pos) = self.position(id) else {
            debug!(id, "edit: unknown id");
            return Ok(false);
        };
        let Some(text) = normalize_text(new_text) else {
            debug!(id, "edit: blank text ignored, keeping previous value");
            return Ok(false);
        };
        if self.items[pos].text == text {
            return Ok(false);
        }

        let snapshot = self.items.clone();
        self.items[pos].text = text;
        self.persist(snapshot)?;
        Ok(true)
    }

    /// Remove every completed item
    pub fn clear_completed(&mut self) -> Result<bool> {
        if !self.items.iter().any(|item| item.completed) {
            return Ok(false);
        }

        let snapshot = self.items.clone();
        self.items.retain(|item| !item.completed);
        let removed = snapshot.len() - self.items.len();
        self.persist(snapshot)?;

        debug!(removed, "clear_completed: removed completed items");
        Ok(true)
    }

    /// Change the active filter; never persisted
    pub fn set_filter(&mut self, filter: Filter) {
        debug!(%filter, "set_filter");
        self.filter = filter;
    }

    // ========================================================================
    // Helper methods
    // ========================================================================

    fn position(&self, id: &str) -> Option<usize> {
        self.items.iter().position(|item| item.id == id)
    }

    /// Write the current list, restoring `snapshot` if the write fails
    fn persist(&mut self, snapshot: Vec<Item>) -> Result<()> {
        let result = serde_json::to_string(&self.items)
            .context("Failed to serialize todo list")
            .and_then(|json| self.blob.set(STORAGE_KEY, &json));

        if let Err(e) = result {
            warn!(error = ?e, "Failed to persist todo list, rolling back");
            self.items = snapshot;
            return Err(e.wrap_err("Failed to save todo list"));
        }
        Ok(())
    }
}

/// Drop entries that break list invariants: blank text or a repeated id
fn sanitize(items: Vec<Item>) -> Vec<Item> {
    let mut seen = HashSet::new();
    let mut result = Vec::with_capacity(items.len());

    for mut item in items {
        let Some(text) = normalize_text(&item.text) else {
            warn!(id = %item.id, "Skipping persisted item with blank text");
            continue;
        };
        if !seen.insert(item.id.clone()) {
            warn!(id = %item.id, "Skipping persisted item with duplicate id");
            continue;
        }
        item.text = text;
        result.push(item);
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob::{FileBlobStore, MemoryBlobStore};
    use std::fs;
    use tempfile::TempDir;

    fn store() -> Store<MemoryBlobStore> {
        Store::open(MemoryBlobStore::new())
    }

    fn texts<B: BlobStore>(store: &Store<B>) -> Vec<String> {
        store.items().iter().map(|i| i.text.clone()).collect()
    }

    fn persisted(store: &Store<MemoryBlobStore>) -> Option<String> {
        store.blob().get(STORAGE_KEY).unwrap()
    }

    #[test]
    fn test_open_empty() {
        let store = store();
        assert!(store.items().is_empty());
        assert_eq!(store.filter(), Filter::All);
        assert_eq!(persisted(&store), None);
    }

    #[test]
    fn test_add_prepends_newest_first() {
        let mut store = store();

        for text in ["one", "two", "three"] {
            assert!(store.add(text).unwrap().is_some());
        }

        assert_eq!(texts(&store), ["three", "two", "one"]);
        assert!(store.items().iter().all(|i| !i.completed));
    }

    #[test]
    fn test_add_blank_is_noop() {
        let mut store = store();

        assert_eq!(store.add("").unwrap(), None);
        assert_eq!(store.add("   ").unwrap(), None);

        assert!(store.items().is_empty());
        assert_eq!(persisted(&store), None);
    }

    #[test]
    fn test_add_counts_only_non_blank() {
        let mut store = store();
        let inputs = ["a", " ", "b", "", "\t c \n"];
        for text in inputs {
            store.add(text).unwrap();
        }
        assert_eq!(texts(&store), ["c", "b", "a"]);
    }

    #[test]
    fn test_add_returns_unique_ids() {
        let mut store = store();
        for i in 0..200 {
            store.add(&format!("item {}", i)).unwrap();
        }
        let ids: HashSet<&str> = store.items().iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids.len(), 200);
    }

    #[test]
    fn test_toggle_is_involution() {
        let mut store = store();
        let id = store.add("Buy milk").unwrap().unwrap();

        assert!(store.toggle(&id).unwrap());
        assert!(store.get(&id).unwrap().completed);

        assert!(store.toggle(&id).unwrap());
        assert!(!store.get(&id).unwrap().completed);
    }

    #[test]
    fn test_toggle_unknown_id() {
        let mut store = store();
        store.add("Buy milk").unwrap();
        let before = persisted(&store);

        assert!(!store.toggle("nope").unwrap());
        assert_eq!(persisted(&store), before);
    }

    #[test]
    fn test_delete_is_idempotent() {
        let mut store = store();
        let id = store.add("Buy milk").unwrap().unwrap();
        store.add("Walk dog").unwrap();

        assert!(store.delete(&id).unwrap());
        let after_first = store.items().to_vec();

        assert!(!store.delete(&id).unwrap());
        assert_eq!(store.items(), after_first.as_slice());
        assert_eq!(texts(&store), ["Walk dog"]);
    }

    #[test]
    fn test_edit_replaces_trimmed_text() {
        let mut store = store();
        let id = store.add("Buy milk").unwrap().unwrap();

        assert!(store.edit(&id, "  Buy oat milk ").unwrap());
        assert_eq!(store.get(&id).unwrap().text, "Buy oat milk");
    }

    #[test]
    fn test_edit_blank_keeps_previous_text() {
        let mut store = store();
        let id = store.add("Buy milk").unwrap().unwrap();

        assert!(!store.edit(&id, "   ").unwrap());
        assert_eq!(store.get(&id).unwrap().text, "Buy milk");
    }

    #[test]
    fn test_edit_unchanged_or_unknown() {
        let mut store = store();
        let id = store.add("Buy milk").unwrap().unwrap();

        assert!(!store.edit(&id, "Buy milk ").unwrap());
        assert!(!store.edit("nope", "Something").unwrap());
        assert_eq!(texts(&store), ["Buy milk"]);
    }

    #[test]
    fn test_clear_completed_is_idempotent() {
        let mut store = store();
        let a = store.add("a").unwrap().unwrap();
        store.add("b").unwrap();
        let c = store.add("c").unwrap().unwrap();
        store.toggle(&a).unwrap();
        store.toggle(&c).unwrap();

        assert!(store.clear_completed().unwrap());
        let once = store.items().to_vec();

        assert!(!store.clear_completed().unwrap());
        assert_eq!(store.items(), once.as_slice());
        assert_eq!(texts(&store), ["b"]);
    }

    #[test]
    fn test_set_filter_does_not_persist() {
        let mut store = store();
        store.add("a").unwrap();
        let before = persisted(&store);

        store.set_filter(Filter::Completed);
        assert_eq!(store.filter(), Filter::Completed);
        assert!(store.visible().is_empty());
        assert_eq!(persisted(&store), before);
    }

    #[test]
    fn test_round_trip() {
        let mut store = store();
        for i in 0..5 {
            store.add(&format!("item <{}> & 'quotes'", i)).unwrap();
        }
        let second = store.items()[1].id.clone();
        store.toggle(&second).unwrap();

        let reloaded = Store::load(store.blob());
        assert_eq!(reloaded, store.items());
    }

    #[test]
    fn test_round_trip_empty_list() {
        let mut store = store();
        let id = store.add("only").unwrap().unwrap();
        store.delete(&id).unwrap();

        assert_eq!(persisted(&store).as_deref(), Some("[]"));
        assert!(Store::load(store.blob()).is_empty());
    }

    #[test]
    fn test_round_trip_file_store() {
        let temp = TempDir::new().unwrap();
        let ids = {
            let mut store = Store::open(FileBlobStore::open(temp.path()).unwrap());
            let first = store.add("first").unwrap().unwrap();
            store.add("second").unwrap();
            store.toggle(&first).unwrap();
            store.items().iter().map(|i| i.id.clone()).collect::<Vec<_>>()
        };

        let store = Store::open(FileBlobStore::open(temp.path()).unwrap());
        let reloaded: Vec<String> = store.items().iter().map(|i| i.id.clone()).collect();
        assert_eq!(reloaded, ids);
        assert_eq!(texts(&store), ["second", "first"]);
        assert!(store.items()[1].completed);
        assert!(temp.path().join("todos-v1.json").exists());
    }

    #[test]
    fn test_failed_file_write_keeps_saved_list() {
        let temp = TempDir::new().unwrap();
        let mut store = Store::open(FileBlobStore::open(temp.path()).unwrap());
        store.add("Buy milk").unwrap();
        store.add("Walk dog").unwrap();

        // A directory where the lock file belongs makes every write fail
        let lock_path = temp.path().join("todos-v1.lock");
        fs::remove_file(&lock_path).unwrap();
        fs::create_dir(&lock_path).unwrap();

        assert!(store.add(&"x".repeat(64 * 1024)).is_err());
        assert_eq!(store.items().len(), 2);

        let reloaded = Store::open(FileBlobStore::open(temp.path()).unwrap());
        assert_eq!(texts(&reloaded), ["Walk dog", "Buy milk"]);
    }

    #[test]
    fn test_load_malformed_fails_soft() {
        let mut blob = MemoryBlobStore::new();
        blob.insert(STORAGE_KEY, "{not json");

        let store = Store::open(blob);
        assert!(store.items().is_empty());
    }

    #[test]
    fn test_load_original_format() {
        let mut blob = MemoryBlobStore::new();
        blob.insert(
            STORAGE_KEY,
            r#"[{"id":"1697040000001","text":"Walk dog","completed":false},{"id":"1697040000000","text":"Buy milk","completed":true}]"#,
        );

        let store = Store::open(blob);
        assert_eq!(texts(&store), ["Walk dog", "Buy milk"]);
        assert_eq!(store.items_left(), 1);
    }

    #[test]
    fn test_load_drops_invalid_entries() {
        let mut blob = MemoryBlobStore::new();
        blob.insert(
            STORAGE_KEY,
            r#"[{"id":"1","text":" a ","completed":false},{"id":"2","text":"  ","completed":false},{"id":"1","text":"dup","completed":true}]"#,
        );

        let store = Store::open(blob);
        assert_eq!(store.items().len(), 1);
        assert_eq!(store.items()[0].text, "a");
    }

    #[test]
    fn test_write_failure_rolls_back() {
        let mut store = store();
        let id = store.add("Buy milk").unwrap().unwrap();
        let before_items = store.items().to_vec();
        let before_blob = persisted(&store);

        store.blob_mut().set_quota(Some(0));

        assert!(store.add("Walk dog").is_err());
        assert!(store.toggle(&id).is_err());
        assert!(store.edit(&id, "Buy bread").is_err());
        assert!(store.delete(&id).is_err());

        assert_eq!(store.items(), before_items.as_slice());
        assert_eq!(persisted(&store), before_blob);

        store.blob_mut().set_quota(None);
        assert!(store.toggle(&id).unwrap());
        assert!(store.get(&id).unwrap().completed);
    }

    #[test]
    fn test_clear_completed_failure_rolls_back() {
        let mut store = store();
        let id = store.add("done").unwrap().unwrap();
        store.toggle(&id).unwrap();

        store.blob_mut().set_quota(Some(1));
        let err = store.clear_completed().unwrap_err();
        assert!(format!("{:#}", err).contains("Quota exceeded"));
        assert_eq!(store.items().len(), 1);
    }

    #[test]
    fn test_scenario() {
        let mut store = store();

        let milk = store.add("Buy milk").unwrap().unwrap();
        assert_eq!(texts(&store), ["Buy milk"]);
        assert_eq!(store.items_left(), 1);

        store.add("Walk dog").unwrap();
        assert_eq!(texts(&store), ["Walk dog", "Buy milk"]);

        store.toggle(&milk).unwrap();
        assert_eq!(store.items_left(), 1);
        assert!(store.get(&milk).unwrap().completed);

        store.set_filter(Filter::Completed);
        let visible: Vec<&str> = store.visible().iter().map(|i| i.text.as_str()).collect();
        assert_eq!(visible, ["Buy milk"]);

        store.clear_completed().unwrap();
        assert_eq!(texts(&store), ["Walk dog"]);
    }
}

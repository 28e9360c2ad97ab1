use crate::document::{Document, is_reserved};
use crate::error::{ErrorKind, Result};
use crate::models::{Collection, CollectionStatus, Item, ItemKey, MediaType, PendingCollection};
use exn::ResultExt;
use std::collections::HashSet;
use std::io::ErrorKind as IoErrorKind;
use std::ops::Deref;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::{Mutex, MutexGuard};
use tracing::instrument;

/// Owner of every collection and the only way to change them.
///
/// All reads, writes and snapshot serialization go through one mutex, so a
/// snapshot never observes a half-applied merge. Nothing inside the lock
/// talks to the network; callers take what they need (see
/// [`pending`](Self::pending)) and come back with results.
///
/// Share it between workers behind an [`Arc`](std::sync::Arc).
#[derive(Debug)]
pub struct Store {
    path: Option<PathBuf>,
    state: Mutex<Document>,
}

impl Store {
    /// Loads the store from `path`.
    ///
    /// Never fails: a missing or unreadable file gives an empty store, and a
    /// file that can't be parsed is moved aside to `<file>.corrupt` before an
    /// empty store is substituted.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub async fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let document = match fs::read(&path).await {
            Ok(bytes) => match Document::from_slice(&bytes) {
                Ok(document) => {
                    tracing::info!(collections = document.collections.len(), "Loaded collections");
                    document
                },
                Err(e) => {
                    tracing::warn!(error = %e.deref(), "Collections file is corrupt; starting empty");
                    Self::quarantine(&path).await;
                    Document::default()
                },
            },
            Err(e) if e.kind() == IoErrorKind::NotFound => {
                tracing::info!("No collections file yet; starting empty");
                Document::default()
            },
            Err(e) => {
                tracing::warn!(error = %e, "Collections file could not be read; starting empty");
                Document::default()
            },
        };
        Self { path: Some(path), state: Mutex::new(document) }
    }

    /// A store without a backing file. Snapshots are no-ops.
    ///
    /// Do NOT apply `#[cfg(test)]` so that other crates can also use this in their tests.
    pub fn in_memory() -> Self {
        Self { path: None, state: Mutex::new(Document::default()) }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Keep the unusable file around for a human to look at; the next
    /// snapshot would overwrite it otherwise.
    async fn quarantine(path: &Path) {
        let mut backup = path.as_os_str().to_owned();
        backup.push(".corrupt");
        let backup = PathBuf::from(backup);
        if let Err(e) = fs::rename(path, &backup).await {
            tracing::warn!(error = %e, backup = %backup.display(), "Could not move corrupt collections file aside");
        }
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Merges `items` into the collection called `name`, creating it if
    /// needed.
    ///
    /// Returns the items that were actually added: items whose [`ItemKey`]
    /// already exists (or repeats earlier in `items`) are dropped, so merging
    /// the same list twice adds nothing the second time.
    ///
    /// # Errors
    /// [`ErrorKind::MediaTypeMismatch`] if the collection exists with a
    /// different media type. The store is left untouched.
    #[instrument(skip(self, items), fields(items = items.len()))]
    pub async fn merge(&self, name: &str, media_type: MediaType, items: Vec<Item>) -> Result<Vec<Item>> {
        if is_reserved(name) || name.trim().is_empty() {
            exn::bail!(ErrorKind::InvalidName(name.to_string()));
        }
        let mut state = self.state.lock().await;
        let mut created = false;
        let added = match state.collections.get_mut(name) {
            Some(existing) if existing.media_type != media_type => {
                exn::bail!(ErrorKind::MediaTypeMismatch {
                    collection: name.to_string(),
                    existing: existing.media_type,
                    requested: media_type,
                });
            },
            Some(existing) => {
                let added = Self::dedupe(existing.items.iter().map(Item::key).collect(), items);
                existing.items.extend(added.iter().cloned());
                tracing::info!(added = added.len(), "Merged into existing collection");
                added
            },
            None => {
                let added = Self::dedupe(HashSet::new(), items);
                let mut collection = Collection::new(media_type);
                collection.items = added.clone();
                state.collections.insert(name.to_string(), collection);
                tracing::info!(added = added.len(), "Created collection");
                created = true;
                added
            },
        };
        if created || !added.is_empty() {
            self.persist(&state).await;
        }
        Ok(added)
    }

    fn dedupe(mut seen: HashSet<ItemKey>, items: Vec<Item>) -> Vec<Item> {
        items.into_iter().filter(|item| seen.insert(item.key())).collect()
    }

    /// Sets an item's found state. Returns `false` (and does nothing) if the
    /// collection or item doesn't exist, or the state was already `found`.
    pub async fn mark_found(&self, name: &str, key: &ItemKey, found: bool) -> bool {
        let mut state = self.state.lock().await;
        let Some(item) = state
            .collections
            .get_mut(name)
            .and_then(|c| c.items.iter_mut().find(|i| &i.key() == key))
        else {
            return false;
        };
        if item.found == found {
            return false;
        }
        item.found = found;
        self.persist(&state).await;
        true
    }

    /// Removes a collection and everything in it.
    pub async fn delete(&self, name: &str) -> Option<Collection> {
        let mut state = self.state.lock().await;
        let removed = state.collections.remove(name);
        if removed.is_some() {
            tracing::info!(collection = name, "Deleted collection");
            self.persist(&state).await;
        }
        removed
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub async fn collection(&self, name: &str) -> Option<Collection> {
        self.state.lock().await.collections.get(name).cloned()
    }

    /// Whether the item exists and hasn't been found yet. Passes check this
    /// right before each item, since another pass may have found it since
    /// their list was taken.
    pub async fn is_pending(&self, name: &str, key: &ItemKey) -> bool {
        let state = self.state.lock().await;
        state
            .collections
            .get(name)
            .and_then(|c| c.items.iter().find(|i| &i.key() == key))
            .is_some_and(Item::is_pending)
    }

    pub async fn names(&self) -> Vec<String> {
        self.state.lock().await.collections.keys().cloned().collect()
    }

    pub async fn status(&self) -> Vec<CollectionStatus> {
        let state = self.state.lock().await;
        state
            .collections
            .iter()
            .map(|(name, c)| CollectionStatus {
                name: name.clone(),
                media_type: c.media_type,
                found: c.found(),
                total: c.items.len(),
            })
            .collect()
    }

    /// Clones the pending items of one collection (`Some(name)`) or all of
    /// them (`None`), in stored order. Collections with nothing pending are
    /// left out.
    pub async fn pending(&self, target: Option<&str>) -> Vec<PendingCollection> {
        let state = self.state.lock().await;
        state
            .collections
            .iter()
            .filter(|(name, _)| target.is_none_or(|t| t == name.as_str()))
            .map(|(name, c)| PendingCollection {
                name: name.clone(),
                media_type: c.media_type,
                items: c.items.iter().filter(|i| i.is_pending()).cloned().collect(),
            })
            .filter(|p| !p.items.is_empty())
            .collect()
    }

    // =========================================================================
    // Persistence
    // =========================================================================

    /// Writes the current state to disk.
    pub async fn snapshot(&self) -> Result<()> {
        let state = self.state.lock().await;
        self.write(&state).await
    }

    /// Snapshot from inside a mutation. The in-memory state stays the source
    /// of truth if the write fails; the next successful snapshot catches up.
    async fn persist(&self, state: &MutexGuard<'_, Document>) {
        if let Err(e) = self.write(state).await {
            tracing::warn!(error = ?e, "Failed to persist collections");
        }
    }

    async fn write(&self, document: &Document) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let bytes = document.to_vec()?;
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).await.or_raise(|| ErrorKind::Io(parent.to_path_buf()))?;
        }
        let mut temporary = path.as_os_str().to_owned();
        temporary.push(".tmp");
        let temporary = PathBuf::from(temporary);
        fs::write(&temporary, &bytes).await.or_raise(|| ErrorKind::Io(temporary.clone()))?;
        fs::rename(&temporary, path).await.or_raise(|| ErrorKind::Io(path.clone()))?;
        tracing::debug!(bytes = bytes.len(), path = %path.display(), "Persisted collections");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn items(list: &[(&str, i32)]) -> Vec<Item> {
        list.iter().map(|(t, y)| Item::new(*t, *y)).collect()
    }

    #[tokio::test]
    async fn test_merge_creates_collection() {
        let store = Store::in_memory();
        let added = store.merge("Marvel", MediaType::Movie, items(&[("Iron Man", 2008), ("Thor", 2011)])).await.unwrap();
        assert_eq!(added.len(), 2);
        let collection = store.collection("Marvel").await.unwrap();
        assert_eq!(collection.media_type, MediaType::Movie);
        assert_eq!(collection.items, added);
    }

    #[tokio::test]
    async fn test_merge_is_idempotent() {
        let store = Store::in_memory();
        let list = items(&[("Iron Man", 2008), ("Thor", 2011)]);
        assert_eq!(store.merge("Marvel", MediaType::Movie, list.clone()).await.unwrap().len(), 2);
        assert!(store.merge("Marvel", MediaType::Movie, list).await.unwrap().is_empty());
        assert_eq!(store.collection("Marvel").await.unwrap().items.len(), 2);
    }

    #[tokio::test]
    async fn test_merge_appends_only_new_keys() {
        let store = Store::in_memory();
        store.merge("Marvel", MediaType::Movie, items(&[("Iron Man", 2008)])).await.unwrap();
        let added = store
            .merge("Marvel", MediaType::Movie, items(&[("IRON MAN", 2008), ("Iron Man", 2010), ("Thor", 2011)]))
            .await
            .unwrap();
        assert_eq!(added, items(&[("Iron Man", 2010), ("Thor", 2011)]));
        let titles: Vec<_> = store.collection("Marvel").await.unwrap().items.into_iter().map(|i| i.to_string()).collect();
        assert_eq!(titles, ["Iron Man (2008)", "Iron Man (2010)", "Thor (2011)"]);
    }

    #[tokio::test]
    async fn test_merge_collapses_duplicates_on_create() {
        let store = Store::in_memory();
        let added = store.merge("Marvel", MediaType::Movie, items(&[("Thor", 2011), ("thor", 2011)])).await.unwrap();
        assert_eq!(added, items(&[("Thor", 2011)]));
    }

    #[tokio::test]
    async fn test_merge_rejects_media_type_mismatch() {
        let store = Store::in_memory();
        store.merge("Marvel", MediaType::Movie, items(&[("Iron Man", 2008)])).await.unwrap();
        let before = store.collection("Marvel").await.unwrap();
        let err = store.merge("Marvel", MediaType::Show, items(&[("Loki", 2021)])).await.unwrap_err();
        assert!(matches!(
            err.deref(),
            ErrorKind::MediaTypeMismatch { existing: MediaType::Movie, requested: MediaType::Show, .. }
        ));
        assert_eq!(store.collection("Marvel").await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_merge_rejects_reserved_name() {
        let store = Store::in_memory();
        let err = store.merge("_schema", MediaType::Movie, items(&[("Alien", 1979)])).await.unwrap_err();
        assert!(matches!(err.deref(), ErrorKind::InvalidName(_)));
        assert!(store.names().await.is_empty());
    }

    #[tokio::test]
    async fn test_mark_found() {
        let store = Store::in_memory();
        store.merge("Marvel", MediaType::Movie, items(&[("Iron Man", 2008)])).await.unwrap();
        let key = ItemKey::new("iron man", 2008);
        assert!(store.mark_found("Marvel", &key, true).await);
        // Already found, nothing changes.
        assert!(!store.mark_found("Marvel", &key, true).await);
        assert!(store.collection("Marvel").await.unwrap().items[0].found);
        // Missing item or collection is a no-op.
        assert!(!store.mark_found("Marvel", &ItemKey::new("Thor", 2011), true).await);
        assert!(!store.mark_found("DC", &key, true).await);
    }

    #[tokio::test]
    async fn test_is_pending() {
        let store = Store::in_memory();
        store.merge("Marvel", MediaType::Movie, items(&[("Iron Man", 2008), ("Thor", 2011)])).await.unwrap();
        store.mark_found("Marvel", &ItemKey::new("Thor", 2011), true).await;
        assert!(store.is_pending("Marvel", &ItemKey::new("IRON MAN", 2008)).await);
        assert!(!store.is_pending("Marvel", &ItemKey::new("Thor", 2011)).await);
        assert!(!store.is_pending("Marvel", &ItemKey::new("Loki", 2021)).await);
        assert!(!store.is_pending("DC", &ItemKey::new("Iron Man", 2008)).await);
    }

    #[tokio::test]
    async fn test_delete() {
        let store = Store::in_memory();
        store.merge("Marvel", MediaType::Movie, items(&[("Iron Man", 2008)])).await.unwrap();
        assert!(store.delete("Marvel").await.is_some());
        assert!(store.delete("Marvel").await.is_none());
        assert!(store.collection("Marvel").await.is_none());
    }

    #[tokio::test]
    async fn test_pending_and_status() {
        let store = Store::in_memory();
        store.merge("Marvel", MediaType::Movie, items(&[("Iron Man", 2008), ("Thor", 2011)])).await.unwrap();
        store.merge("Dark", MediaType::Show, items(&[("Dark", 2017)])).await.unwrap();
        store.mark_found("Dark", &ItemKey::new("Dark", 2017), true).await;

        let pending = store.pending(None).await;
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].name, "Marvel");
        assert_eq!(pending[0].items.len(), 2);
        assert!(store.pending(Some("Dark")).await.is_empty());
        assert!(store.pending(Some("Nope")).await.is_empty());

        let status = store.status().await;
        let dark = status.iter().find(|s| s.name == "Dark").unwrap();
        assert_eq!((dark.found, dark.total, dark.percent()), (1, 1, 100));
    }

    #[tokio::test]
    async fn test_persist_and_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/collections.json");
        let store = Store::load(&path).await;
        assert_eq!(store.path(), Some(path.as_path()));
        assert_eq!(Store::in_memory().path(), None);
        store.merge("Marvel", MediaType::Movie, items(&[("Iron Man", 2008)])).await.unwrap();
        store.mark_found("Marvel", &ItemKey::new("Iron Man", 2008), true).await;

        let reloaded = Store::load(&path).await;
        let collection = reloaded.collection("Marvel").await.unwrap();
        assert!(collection.items[0].found);
        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains(r#""_schema""#));
    }

    #[tokio::test]
    async fn test_load_corrupt_file_substitutes_empty_store() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("collections.json");
        std::fs::write(&path, b"definitely not json").unwrap();

        let store = Store::load(&path).await;
        assert!(store.names().await.is_empty());
        let mut backup = path.as_os_str().to_owned();
        backup.push(".corrupt");
        assert_eq!(std::fs::read(PathBuf::from(backup)).unwrap(), b"definitely not json");

        // The store is still usable, and writes a fresh document.
        store.merge("Marvel", MediaType::Movie, items(&[("Iron Man", 2008)])).await.unwrap();
        assert!(Store::load(&path).await.collection("Marvel").await.is_some());
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let dir = TempDir::new().unwrap();
        let store = Store::load(dir.path().join("missing.json")).await;
        assert!(store.names().await.is_empty());
        store.snapshot().await.unwrap();
        assert!(dir.path().join("missing.json").exists());
    }

    #[tokio::test]
    async fn test_empty_merge_persists_new_collection() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("collections.json");
        let store = Store::load(&path).await;
        assert!(store.merge("Marvel", MediaType::Movie, Vec::new()).await.unwrap().is_empty());

        let reloaded = Store::load(&path).await;
        let collection = reloaded.collection("Marvel").await.unwrap();
        assert_eq!(collection.media_type, MediaType::Movie);
        assert!(collection.items.is_empty());
    }

    #[tokio::test]
    async fn test_load_unreadable_path_is_not_quarantined() {
        let dir = TempDir::new().unwrap();
        // Reading a directory fails with an I/O error, not a parse error.
        let path = dir.path().join("collections.json");
        std::fs::create_dir(&path).unwrap();

        let store = Store::load(&path).await;
        assert!(store.names().await.is_empty());
        assert!(path.is_dir());
        let mut backup = path.as_os_str().to_owned();
        backup.push(".corrupt");
        assert!(!PathBuf::from(backup).exists());
    }
}

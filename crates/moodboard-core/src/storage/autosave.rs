//! Debounced layout persistence for the open board.
//!
//! Every observed store mutation restarts a quiet-period timer; the layout is
//! written once the timer runs out. Hosts drive the timer by calling
//! [`AutoSaveManager::maybe_save`] from their frame or tick loop.

use crate::items::{CanvasItem, ItemStore};
use crate::layout::{hydrate_records, serialize_items};
use crate::storage::{LayoutStorage, StorageError, StorageResult};
use std::sync::Arc;
use std::time::Duration;

#[cfg(not(target_arch = "wasm32"))]
use std::time::Instant;

#[cfg(target_arch = "wasm32")]
use web_time::Instant;

/// Outcome of a layout write.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaveReport {
    /// Records written.
    pub written: usize,
    /// Ids of items left out because they could not be serialized.
    pub skipped: Vec<String>,
}

/// Debounce coordinator between the item store and a [`LayoutStorage`].
pub struct AutoSaveManager<S: LayoutStorage + ?Sized> {
    /// Storage backend.
    storage: Arc<S>,
    owner_id: String,
    board_id: String,
    /// Quiet period after the last mutation before a write.
    delay: Duration,
    /// Whether the store has unsaved changes.
    dirty: bool,
    /// Set while the store is being hydrated; mutations are ignored.
    loading: bool,
    last_mutation: Option<Instant>,
    last_save: Option<Instant>,
}

impl<S: LayoutStorage + ?Sized> AutoSaveManager<S> {
    pub fn new(storage: Arc<S>, owner_id: impl Into<String>, board_id: impl Into<String>, delay: Duration) -> Self {
        Self {
            storage,
            owner_id: owner_id.into(),
            board_id: board_id.into(),
            delay,
            dirty: false,
            loading: false,
            last_mutation: None,
            last_save: None,
        }
    }

    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    pub fn board_id(&self) -> &str {
        &self.board_id
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn last_save(&self) -> Option<Instant> {
        self.last_save
    }

    /// Get a reference to the storage backend.
    pub fn storage(&self) -> &Arc<S> {
        &self.storage
    }

    /// Enter the loading phase. Mutations are not tracked until [`finish_loading`](Self::finish_loading).
    pub fn begin_loading(&mut self) {
        self.loading = true;
    }

    /// Leave the loading phase with a clean slate.
    pub fn finish_loading(&mut self) {
        self.loading = false;
        self.dirty = false;
        self.last_mutation = None;
    }

    /// Record a store mutation now.
    pub fn mark_dirty(&mut self) {
        self.mark_dirty_at(Instant::now());
    }

    /// Record a store mutation at `now`, restarting the quiet period.
    pub fn mark_dirty_at(&mut self, now: Instant) {
        if self.loading {
            log::debug!("Ignoring mutation while board {} is loading", self.board_id);
            return;
        }
        self.dirty = true;
        self.last_mutation = Some(now);
    }

    /// Time left before a pending save fires, if one is pending.
    pub fn time_until_save_at(&self, now: Instant) -> Option<Duration> {
        if !self.dirty || self.loading {
            return None;
        }
        let last = self.last_mutation?;
        Some(self.delay.saturating_sub(now.saturating_duration_since(last)))
    }

    /// Whether the quiet period has elapsed since the last mutation.
    pub fn should_save_at(&self, now: Instant) -> bool {
        self.time_until_save_at(now).is_some_and(|left| left.is_zero())
    }

    pub fn should_save(&self) -> bool {
        self.should_save_at(Instant::now())
    }

    /// Save if the quiet period has elapsed. Returns `Ok(None)` if nothing was due.
    pub async fn maybe_save(&mut self, store: &ItemStore) -> StorageResult<Option<SaveReport>> {
        self.maybe_save_at(store, Instant::now()).await
    }

    pub async fn maybe_save_at(&mut self, store: &ItemStore, now: Instant) -> StorageResult<Option<SaveReport>> {
        if !self.should_save_at(now) {
            return Ok(None);
        }
        self.write(store, None, now).await.map(Some)
    }

    /// Write immediately, bypassing the debounce. A thumbnail URL, if given,
    /// is stored on the board alongside the layout.
    pub async fn save(&mut self, store: &ItemStore, thumbnail_url: Option<&str>) -> StorageResult<SaveReport> {
        if self.loading {
            return Err(StorageError::Other(format!("board {} is still loading", self.board_id)));
        }
        self.write(store, thumbnail_url, Instant::now()).await
    }

    async fn write(&mut self, store: &ItemStore, thumbnail_url: Option<&str>, now: Instant) -> StorageResult<SaveReport> {
        let (records, failures) = serialize_items(store);
        let skipped: Vec<String> = failures.iter().map(|e| e.item_id().to_string()).collect();

        match self
            .storage
            .save(&self.owner_id, &self.board_id, &records, thumbnail_url)
            .await
        {
            Ok(()) => {
                self.dirty = false;
                self.last_save = Some(now);
                log::info!("Saved board {} ({} items)", self.board_id, records.len());
                if !skipped.is_empty() {
                    log::error!("Board {} saved without items {:?}", self.board_id, skipped);
                }
                Ok(SaveReport {
                    written: records.len(),
                    skipped,
                })
            }
            Err(e) => {
                // Stay dirty and retry after another quiet period.
                log::error!("Failed to save board {}: {e}", self.board_id);
                self.last_mutation = Some(now);
                Err(e)
            }
        }
    }

    /// Load the board's items. A failed load yields an empty layout.
    pub async fn load(&mut self) -> Vec<CanvasItem> {
        match self.storage.load(&self.owner_id, &self.board_id).await {
            Ok(Some(records)) => {
                let items = hydrate_records(&records);
                log::info!("Loaded board {} ({} items)", self.board_id, items.len());
                items
            }
            Ok(None) => {
                log::info!("Board {} has no saved layout", self.board_id);
                Vec::new()
            }
            Err(e) => {
                log::error!("Failed to load board {}: {e}", self.board_id);
                Vec::new()
            }
        }
    }
}

#[cfg(all(test, not(target_arch = "wasm32")))]
mod tests {
    use super::*;
    use crate::board::BoardSummary;
    use crate::coords::CanvasPoint;
    use crate::items::{ItemContent, ItemId};
    use crate::layout::LayoutRecord;
    use crate::storage::{BoxFuture, MemoryStorage};
    use pollster::block_on;
    use std::sync::atomic::{AtomicBool, Ordering};

    const DELAY: Duration = Duration::from_millis(1000);

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn setup() -> (Arc<MemoryStorage>, AutoSaveManager<MemoryStorage>) {
        let storage = Arc::new(MemoryStorage::new());
        let board = block_on(storage.create_board("owner", "Board")).unwrap();
        let manager = AutoSaveManager::new(storage.clone(), "owner", board.id, DELAY);
        (storage, manager)
    }

    fn note(id: &str, x: f64) -> CanvasItem {
        CanvasItem {
            id: ItemId::new(id),
            position: CanvasPoint::new(x, 0.0),
            content: ItemContent::note(id),
        }
    }

    #[test]
    fn test_clean_manager_does_not_save() {
        let (_, manager) = setup();
        assert!(!manager.is_dirty());
        assert!(!manager.should_save());
    }

    #[test]
    fn test_debounce_coalesces_mutations() {
        let (storage, mut manager) = setup();
        let mut store = ItemStore::new();
        let t0 = Instant::now();

        // Five mutations 200 ms apart.
        for i in 0..5u64 {
            store.insert(note(&format!("n{i}"), i as f64));
            manager.mark_dirty_at(t0 + ms(200 * i));
            let saved = block_on(manager.maybe_save_at(&store, t0 + ms(200 * i + 100))).unwrap();
            assert!(saved.is_none());
        }

        // 999 ms after the last mutation: still quiet.
        assert!(!manager.should_save_at(t0 + ms(800 + 999)));
        let report = block_on(manager.maybe_save_at(&store, t0 + ms(1800))).unwrap();
        assert_eq!(report.map(|r| r.written), Some(5));
        assert_eq!(storage.save_count(), 1);
        assert!(!manager.is_dirty());

        // Nothing further is due.
        assert!(block_on(manager.maybe_save_at(&store, t0 + ms(5000))).unwrap().is_none());
        assert_eq!(storage.save_count(), 1);
    }

    #[test]
    fn test_loading_guard() {
        let (storage, mut manager) = setup();
        let t0 = Instant::now();

        manager.begin_loading();
        manager.mark_dirty_at(t0);
        assert!(!manager.is_dirty());
        assert!(block_on(manager.save(&ItemStore::new(), None)).is_err());

        manager.finish_loading();
        assert!(block_on(manager.maybe_save_at(&ItemStore::new(), t0 + ms(5000))).unwrap().is_none());
        assert_eq!(storage.save_count(), 0);
    }

    #[test]
    fn test_skipped_items_are_reported() {
        let (storage, mut manager) = setup();
        let mut store = ItemStore::new();
        store.insert(note("good", 1.0));
        store.insert(note("bad", f64::NAN));

        let report = block_on(manager.save(&store, None)).unwrap();
        assert_eq!(report.written, 1);
        assert_eq!(report.skipped, vec!["bad".to_string()]);

        let saved = storage.board("owner", manager.board_id()).unwrap().items.unwrap();
        assert_eq!(saved.len(), 1);
    }

    /// Fails the first `save` call, then delegates.
    struct FlakyStorage {
        inner: MemoryStorage,
        failed: AtomicBool,
    }

    impl LayoutStorage for FlakyStorage {
        fn load(&self, owner_id: &str, board_id: &str) -> BoxFuture<'_, StorageResult<Option<Vec<LayoutRecord>>>> {
            self.inner.load(owner_id, board_id)
        }

        fn save(
            &self,
            owner_id: &str,
            board_id: &str,
            records: &[LayoutRecord],
            thumbnail_url: Option<&str>,
        ) -> BoxFuture<'_, StorageResult<()>> {
            if !self.failed.swap(true, Ordering::SeqCst) {
                return Box::pin(async { Err(StorageError::Io("disk full".to_string())) });
            }
            self.inner.save(owner_id, board_id, records, thumbnail_url)
        }

        fn list_boards(&self, owner_id: &str) -> BoxFuture<'_, StorageResult<Vec<BoardSummary>>> {
            self.inner.list_boards(owner_id)
        }

        fn create_board(&self, owner_id: &str, name: &str) -> BoxFuture<'_, StorageResult<BoardSummary>> {
            self.inner.create_board(owner_id, name)
        }

        fn rename_board(&self, owner_id: &str, board_id: &str, name: &str) -> BoxFuture<'_, StorageResult<()>> {
            self.inner.rename_board(owner_id, board_id, name)
        }

        fn delete_board(&self, owner_id: &str, board_id: &str) -> BoxFuture<'_, StorageResult<()>> {
            self.inner.delete_board(owner_id, board_id)
        }
    }

    #[test]
    fn test_failed_save_stays_dirty_and_retries() {
        let _ = env_logger::builder().is_test(true).try_init();
        let storage = Arc::new(FlakyStorage {
            inner: MemoryStorage::new(),
            failed: AtomicBool::new(false),
        });
        let board = block_on(storage.create_board("owner", "b")).unwrap();
        let mut manager = AutoSaveManager::new(storage.clone(), "owner", board.id, DELAY);
        let mut store = ItemStore::new();
        store.insert(note("a", 0.0));
        let t0 = Instant::now();

        manager.mark_dirty_at(t0);
        assert!(block_on(manager.maybe_save_at(&store, t0 + ms(1000))).is_err());
        assert!(manager.is_dirty());

        // The failure re-armed the timer.
        assert!(!manager.should_save_at(t0 + ms(1500)));
        let report = block_on(manager.maybe_save_at(&store, t0 + ms(2000))).unwrap();
        assert_eq!(report.map(|r| r.written), Some(1));
        assert_eq!(storage.inner.save_count(), 1);
    }

    #[test]
    fn test_load_failure_yields_empty_layout() {
        let storage = Arc::new(MemoryStorage::new());
        let mut manager = AutoSaveManager::new(storage, "owner", "missing", DELAY);
        assert!(block_on(manager.load()).is_empty());
    }

    #[test]
    fn test_idempotent_reload() {
        let (_, mut manager) = setup();
        let mut store = ItemStore::new();
        store.insert(note("a", 10.0));
        store.insert(note("b", -20.0));
        block_on(manager.save(&store, None)).unwrap();

        let mut restored = ItemStore::new();
        restored.hydrate(block_on(manager.load()));
        let before: Vec<&CanvasItem> = store.iter().collect();
        let after: Vec<&CanvasItem> = restored.iter().collect();
        assert_eq!(before, after);
    }
}

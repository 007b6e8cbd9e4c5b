//! Boards, the board directory and the open-board session.

use crate::canvas::{Canvas, Notice};
use crate::config::CanvasConfig;
use crate::input::{HeadlessSurface, InputSurface};
use crate::items::ItemId;
use crate::layout::LayoutRecord;
use crate::snapshot::{Overlay, SnapshotError, capture_thumbnail};
use crate::storage::{AutoSaveManager, BlobStorage, LayoutStorage, SaveReport, StorageResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

#[cfg(not(target_arch = "wasm32"))]
use std::time::Instant;

#[cfg(target_arch = "wasm32")]
use web_time::Instant;

/// A named moodboard as stored by a [`LayoutStorage`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Board {
    pub id: String,
    pub owner_id: String,
    pub name: String,
    /// Saved layout. `None` until the board is first saved.
    #[serde(default)]
    pub items: Option<Vec<LayoutRecord>>,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl Board {
    /// A new, never-saved board with a fresh id.
    pub fn new(owner_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            owner_id: owner_id.into(),
            name: name.into(),
            items: None,
            thumbnail_url: None,
            updated_at: Utc::now(),
        }
    }

    pub fn rename(&mut self, name: impl Into<String>) {
        self.name = name.into();
        self.touch();
    }

    /// Refresh `updated_at`.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub fn summary(&self) -> BoardSummary {
        BoardSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            thumbnail_url: self.thumbnail_url.clone(),
            updated_at: self.updated_at,
        }
    }
}

/// Board metadata for listings. Does not include items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardSummary {
    pub id: String,
    pub name: String,
    pub thumbnail_url: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// An owner's boards.
pub struct BoardDirectory<S: LayoutStorage + ?Sized> {
    storage: Arc<S>,
    blobs: Arc<dyn BlobStorage>,
    owner_id: String,
    config: CanvasConfig,
}

impl<S: LayoutStorage + ?Sized> BoardDirectory<S> {
    pub fn new(
        storage: Arc<S>,
        blobs: Arc<dyn BlobStorage>,
        owner_id: impl Into<String>,
        config: CanvasConfig,
    ) -> Self {
        Self {
            storage,
            blobs,
            owner_id: owner_id.into(),
            config,
        }
    }

    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    pub async fn list(&self) -> StorageResult<Vec<BoardSummary>> {
        self.storage.list_boards(&self.owner_id).await
    }

    /// Create an empty board and return its id.
    pub async fn create(&self, name: &str) -> StorageResult<String> {
        let summary = self.storage.create_board(&self.owner_id, name).await?;
        log::info!("Created board {} ({name})", summary.id);
        Ok(summary.id)
    }

    pub async fn rename(&self, board_id: &str, name: &str) -> StorageResult<()> {
        self.storage.rename_board(&self.owner_id, board_id, name).await
    }

    pub async fn delete(&self, board_id: &str) -> StorageResult<()> {
        self.storage.delete_board(&self.owner_id, board_id).await?;
        log::info!("Deleted board {board_id}");
        Ok(())
    }

    /// Open a board with a headless input surface.
    pub async fn open(&self, board_id: &str) -> BoardSession<S> {
        self.open_with_surface(board_id, Box::new(HeadlessSurface::new())).await
    }

    /// Load a board and hydrate a fresh canvas from it.
    ///
    /// A failed load opens the board empty; the error is logged.
    pub async fn open_with_surface(&self, board_id: &str, surface: Box<dyn InputSurface>) -> BoardSession<S> {
        let mut autosave = AutoSaveManager::new(
            self.storage.clone(),
            self.owner_id.clone(),
            board_id,
            self.config.autosave_delay(),
        );
        let mut canvas = Canvas::with_surface(self.config.clone(), surface);

        autosave.begin_loading();
        let items = autosave.load().await;
        canvas.hydrate(items);
        canvas.take_changes();
        autosave.finish_loading();

        log::info!("Opened board {board_id}");
        BoardSession {
            canvas,
            autosave,
            blobs: self.blobs.clone(),
            closed: false,
        }
    }

    /// Close a session: forced save with a fresh thumbnail, then teardown.
    pub async fn close(&self, session: &mut BoardSession<S>, overlays: &[Overlay]) -> StorageResult<SaveReport> {
        session.close(overlays).await
    }
}

/// The open board: canvas state plus its autosave coordinator.
pub struct BoardSession<S: LayoutStorage + ?Sized> {
    canvas: Canvas,
    autosave: AutoSaveManager<S>,
    blobs: Arc<dyn BlobStorage>,
    closed: bool,
}

impl<S: LayoutStorage + ?Sized> BoardSession<S> {
    pub fn board_id(&self) -> &str {
        self.autosave.board_id()
    }

    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    pub fn canvas_mut(&mut self) -> &mut Canvas {
        &mut self.canvas
    }

    pub fn autosave(&self) -> &AutoSaveManager<S> {
        &self.autosave
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Feed store mutations since the last call into the debounce timer.
    /// Returns the number of mutations observed.
    pub fn observe_changes_at(&mut self, now: Instant) -> usize {
        let changes = self.canvas.take_changes();
        if !changes.is_empty() {
            self.autosave.mark_dirty_at(now);
        }
        changes.len()
    }

    /// Observe mutations and write if the quiet period has elapsed.
    ///
    /// Save failures are logged and retried after another quiet period.
    pub async fn tick(&mut self) -> Option<SaveReport> {
        self.tick_at(Instant::now()).await
    }

    pub async fn tick_at(&mut self, now: Instant) -> Option<SaveReport> {
        if self.closed {
            return None;
        }
        self.observe_changes_at(now);
        self.autosave.maybe_save_at(self.canvas.items(), now).await.ok().flatten()
    }

    /// Write any pending changes now, without waiting for the quiet period.
    ///
    /// Hosts call this from a page-unload or window-close hook.
    pub async fn flush(&mut self) -> StorageResult<Option<SaveReport>> {
        if self.closed {
            return Ok(None);
        }
        self.observe_changes_at(Instant::now());
        if !self.autosave.is_dirty() {
            return Ok(None);
        }
        self.autosave.save(self.canvas.items(), None).await.map(Some)
    }

    /// Upload pasted image bytes and place the image on the canvas.
    pub async fn paste_image(&mut self, bytes: &[u8], content_type: &str) -> Option<ItemId> {
        let owner_id = self.autosave.owner_id().to_string();
        self.canvas
            .paste_image(self.blobs.as_ref(), &owner_id, bytes, content_type)
            .await
    }

    /// Render and upload a thumbnail of the current view.
    pub async fn capture_thumbnail(&self, overlays: &[Overlay]) -> Result<String, SnapshotError> {
        capture_thumbnail(&self.canvas, overlays, self.blobs.as_ref(), self.autosave.owner_id()).await
    }

    /// Capture a thumbnail and force a save of the layout with it.
    ///
    /// A failed capture is reported as a notice; the layout is still saved.
    pub async fn capture_and_save(&mut self, overlays: &[Overlay]) -> StorageResult<SaveReport> {
        let thumbnail_url = match self.capture_thumbnail(overlays).await {
            Ok(url) => Some(url),
            Err(e) => {
                log::error!("Thumbnail capture failed for board {}: {e}", self.board_id());
                self.canvas.push_notice(Notice::error(format!("Thumbnail capture failed: {e}")));
                None
            }
        };
        self.observe_changes_at(Instant::now());
        self.autosave.save(self.canvas.items(), thumbnail_url.as_deref()).await
    }

    /// Final save with thumbnail, then tear down the canvas.
    ///
    /// The canvas is torn down even if the save fails.
    pub async fn close(&mut self, overlays: &[Overlay]) -> StorageResult<SaveReport> {
        if self.closed {
            return Ok(SaveReport::default());
        }
        // Abandon any gesture so the thumbnail shows committed positions.
        self.canvas.teardown();
        let result = self.capture_and_save(overlays).await;
        self.canvas.reset();
        self.closed = true;
        log::info!("Closed board {}", self.board_id());
        result
    }
}

//! Persistence collaborators for board layouts and uploaded blobs.

mod autosave;
mod memory;

#[cfg(not(target_arch = "wasm32"))]
mod file;

pub use autosave::{AutoSaveManager, SaveReport};
pub use memory::MemoryStorage;

#[cfg(not(target_arch = "wasm32"))]
pub use file::FileStorage;

use crate::board::BoardSummary;
use crate::layout::LayoutRecord;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Storage errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Board not found: {0}")]
    NotFound(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("IO error: {0}")]
    Io(String),
    #[error("Storage error: {0}")]
    Other(String),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Boxed future for async operations (compatible with WASM).
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

/// Document store holding each owner's boards and their saved layouts.
///
/// Boards are keyed by `(owner_id, board_id)`.
pub trait LayoutStorage: Send + Sync {
    /// Load a board's saved layout. `Ok(None)` means the board exists but has
    /// never been saved.
    fn load(&self, owner_id: &str, board_id: &str) -> BoxFuture<'_, StorageResult<Option<Vec<LayoutRecord>>>>;

    /// Replace a board's layout, and its thumbnail when one is given.
    fn save(
        &self,
        owner_id: &str,
        board_id: &str,
        records: &[LayoutRecord],
        thumbnail_url: Option<&str>,
    ) -> BoxFuture<'_, StorageResult<()>>;

    /// Boards belonging to an owner, most recently updated first. Items are not included.
    fn list_boards(&self, owner_id: &str) -> BoxFuture<'_, StorageResult<Vec<BoardSummary>>>;

    /// Create an empty board.
    fn create_board(&self, owner_id: &str, name: &str) -> BoxFuture<'_, StorageResult<BoardSummary>>;

    fn rename_board(&self, owner_id: &str, board_id: &str, name: &str) -> BoxFuture<'_, StorageResult<()>>;

    fn delete_board(&self, owner_id: &str, board_id: &str) -> BoxFuture<'_, StorageResult<()>>;
}

/// Blob store for pasted images and thumbnails.
pub trait BlobStorage: Send + Sync {
    /// Store the bytes and return a URL they can be fetched from.
    fn upload(&self, owner_id: &str, bytes: &[u8], content_type: &str) -> BoxFuture<'_, StorageResult<String>>;
}

/// File extension for a blob content type.
pub(crate) fn extension_for(content_type: &str) -> &'static str {
    match content_type {
        "image/png" => "png",
        "image/jpeg" => "jpg",
        "image/gif" => "gif",
        "image/webp" => "webp",
        _ => "bin",
    }
}

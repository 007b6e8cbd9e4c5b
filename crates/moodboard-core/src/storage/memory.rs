//! In-memory storage implementation.

use super::{BlobStorage, BoxFuture, LayoutStorage, StorageError, StorageResult, extension_for};
use crate::board::{Board, BoardSummary};
use crate::layout::LayoutRecord;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};
use uuid::Uuid;

type BoardKey = (String, String);

fn lock_error(e: impl std::fmt::Display) -> StorageError {
    StorageError::Other(format!("Lock error: {}", e))
}

/// In-memory storage for testing and ephemeral use.
#[derive(Default)]
pub struct MemoryStorage {
    boards: RwLock<HashMap<BoardKey, Board>>,
    blobs: RwLock<HashMap<String, (String, Vec<u8>)>>,
    saves: AtomicUsize,
}

impl MemoryStorage {
    /// Create a new empty memory storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful layout saves.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// Full board document, including items.
    pub fn board(&self, owner_id: &str, board_id: &str) -> Option<Board> {
        let boards = self.boards.read().ok()?;
        boards.get(&(owner_id.to_string(), board_id.to_string())).cloned()
    }

    /// Content type and bytes of an uploaded blob.
    pub fn blob(&self, url: &str) -> Option<(String, Vec<u8>)> {
        self.blobs.read().ok()?.get(url).cloned()
    }
}

impl LayoutStorage for MemoryStorage {
    fn load(&self, owner_id: &str, board_id: &str) -> BoxFuture<'_, StorageResult<Option<Vec<LayoutRecord>>>> {
        let key = (owner_id.to_string(), board_id.to_string());
        Box::pin(async move {
            let boards = self.boards.read().map_err(lock_error)?;
            boards
                .get(&key)
                .map(|board| board.items.clone())
                .ok_or(StorageError::NotFound(key.1))
        })
    }

    fn save(
        &self,
        owner_id: &str,
        board_id: &str,
        records: &[LayoutRecord],
        thumbnail_url: Option<&str>,
    ) -> BoxFuture<'_, StorageResult<()>> {
        let key = (owner_id.to_string(), board_id.to_string());
        let records = records.to_vec();
        let thumbnail_url = thumbnail_url.map(str::to_string);
        Box::pin(async move {
            let mut boards = self.boards.write().map_err(lock_error)?;
            let board = boards.get_mut(&key).ok_or_else(|| StorageError::NotFound(key.1.clone()))?;
            board.items = Some(records);
            if thumbnail_url.is_some() {
                board.thumbnail_url = thumbnail_url;
            }
            board.updated_at = Utc::now();
            self.saves.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    }

    fn list_boards(&self, owner_id: &str) -> BoxFuture<'_, StorageResult<Vec<BoardSummary>>> {
        let owner_id = owner_id.to_string();
        Box::pin(async move {
            let boards = self.boards.read().map_err(lock_error)?;
            let mut summaries: Vec<BoardSummary> = boards
                .iter()
                .filter(|((owner, _), _)| *owner == owner_id)
                .map(|(_, board)| board.summary())
                .collect();
            summaries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
            Ok(summaries)
        })
    }

    fn create_board(&self, owner_id: &str, name: &str) -> BoxFuture<'_, StorageResult<BoardSummary>> {
        let board = Board::new(owner_id, name);
        Box::pin(async move {
            let mut boards = self.boards.write().map_err(lock_error)?;
            let summary = board.summary();
            boards.insert((board.owner_id.clone(), board.id.clone()), board);
            Ok(summary)
        })
    }

    fn rename_board(&self, owner_id: &str, board_id: &str, name: &str) -> BoxFuture<'_, StorageResult<()>> {
        let key = (owner_id.to_string(), board_id.to_string());
        let name = name.to_string();
        Box::pin(async move {
            let mut boards = self.boards.write().map_err(lock_error)?;
            let board = boards.get_mut(&key).ok_or_else(|| StorageError::NotFound(key.1.clone()))?;
            board.rename(name);
            Ok(())
        })
    }

    fn delete_board(&self, owner_id: &str, board_id: &str) -> BoxFuture<'_, StorageResult<()>> {
        let key = (owner_id.to_string(), board_id.to_string());
        Box::pin(async move {
            let mut boards = self.boards.write().map_err(lock_error)?;
            boards.remove(&key);
            Ok(())
        })
    }
}

impl BlobStorage for MemoryStorage {
    fn upload(&self, owner_id: &str, bytes: &[u8], content_type: &str) -> BoxFuture<'_, StorageResult<String>> {
        let url = format!(
            "memory://{}/{}.{}",
            owner_id,
            Uuid::new_v4().simple(),
            extension_for(content_type)
        );
        let blob = (content_type.to_string(), bytes.to_vec());
        Box::pin(async move {
            let mut blobs = self.blobs.write().map_err(lock_error)?;
            blobs.insert(url.clone(), blob);
            Ok(url)
        })
    }
}

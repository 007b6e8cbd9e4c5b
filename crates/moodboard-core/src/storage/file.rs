//! File-based storage implementation for native platforms.

use super::{BlobStorage, BoxFuture, LayoutStorage, StorageError, StorageResult, extension_for};
use crate::board::{Board, BoardSummary};
use crate::layout::LayoutRecord;
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// File-based storage for native platforms.
///
/// Each board is a JSON document at `<base>/<owner>/<board>.json`. Uploaded
/// blobs live under `<base>/<owner>/blobs/` and are addressed by `file://` URLs.
pub struct FileStorage {
    /// Base directory for board storage.
    base_path: PathBuf,
}

/// Replace anything that is not safe in a file name.
fn sanitize(id: &str) -> String {
    id.chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

fn read_board(path: &Path) -> StorageResult<Board> {
    let json = fs::read_to_string(path)
        .map_err(|e| StorageError::Io(format!("Failed to read {}: {}", path.display(), e)))?;
    serde_json::from_str(&json)
        .map_err(|e| StorageError::Serialization(format!("Failed to parse {}: {}", path.display(), e)))
}

fn write_board(path: &Path, board: &Board) -> StorageResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| StorageError::Io(format!("Failed to create {}: {}", parent.display(), e)))?;
    }
    let json = serde_json::to_string_pretty(board).map_err(|e| StorageError::Serialization(e.to_string()))?;
    fs::write(path, json).map_err(|e| StorageError::Io(format!("Failed to write {}: {}", path.display(), e)))
}

impl FileStorage {
    /// Create a new file storage with the given base directory.
    ///
    /// Creates the directory if it doesn't exist.
    pub fn new(base_path: PathBuf) -> StorageResult<Self> {
        if !base_path.exists() {
            fs::create_dir_all(&base_path)
                .map_err(|e| StorageError::Io(format!("Failed to create storage directory: {}", e)))?;
        }
        Ok(Self { base_path })
    }

    /// Create file storage in the default location.
    ///
    /// On Linux: `~/.local/share/moodboard/`
    /// On Windows: `%LOCALAPPDATA%\moodboard\`
    pub fn default_location() -> StorageResult<Self> {
        let base = dirs::data_local_dir()
            .or_else(dirs::home_dir)
            .ok_or_else(|| StorageError::Io("Could not determine home directory".to_string()))?;

        Self::new(base.join("moodboard"))
    }

    /// Get the base path.
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn owner_dir(&self, owner_id: &str) -> PathBuf {
        self.base_path.join(sanitize(owner_id))
    }

    fn board_path(&self, owner_id: &str, board_id: &str) -> PathBuf {
        self.owner_dir(owner_id).join(format!("{}.json", sanitize(board_id)))
    }

    fn existing_board(&self, owner_id: &str, board_id: &str) -> StorageResult<(PathBuf, Board)> {
        let path = self.board_path(owner_id, board_id);
        if !path.exists() {
            return Err(StorageError::NotFound(board_id.to_string()));
        }
        let board = read_board(&path)?;
        Ok((path, board))
    }
}

impl LayoutStorage for FileStorage {
    fn load(&self, owner_id: &str, board_id: &str) -> BoxFuture<'_, StorageResult<Option<Vec<LayoutRecord>>>> {
        let result = self.existing_board(owner_id, board_id).map(|(_, board)| board.items);
        Box::pin(async move { result })
    }

    fn save(
        &self,
        owner_id: &str,
        board_id: &str,
        records: &[LayoutRecord],
        thumbnail_url: Option<&str>,
    ) -> BoxFuture<'_, StorageResult<()>> {
        let records = records.to_vec();
        let thumbnail_url = thumbnail_url.map(str::to_string);
        let (owner_id, board_id) = (owner_id.to_string(), board_id.to_string());

        Box::pin(async move {
            let (path, mut board) = self.existing_board(&owner_id, &board_id)?;
            board.items = Some(records);
            if thumbnail_url.is_some() {
                board.thumbnail_url = thumbnail_url;
            }
            board.touch();
            write_board(&path, &board)
        })
    }

    fn list_boards(&self, owner_id: &str) -> BoxFuture<'_, StorageResult<Vec<BoardSummary>>> {
        let dir = self.owner_dir(owner_id);

        Box::pin(async move {
            if !dir.exists() {
                return Ok(vec![]);
            }

            let entries =
                fs::read_dir(&dir).map_err(|e| StorageError::Io(format!("Failed to read directory: {}", e)))?;

            let mut summaries = Vec::new();
            for entry in entries.flatten() {
                let path = entry.path();
                // Only include .json files
                if path.extension().is_none_or(|e| e != "json") {
                    continue;
                }
                match read_board(&path) {
                    Ok(board) => summaries.push(board.summary()),
                    Err(e) => log::warn!("Skipping unreadable board file: {e}"),
                }
            }
            summaries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
            Ok(summaries)
        })
    }

    fn create_board(&self, owner_id: &str, name: &str) -> BoxFuture<'_, StorageResult<BoardSummary>> {
        let board = Board::new(owner_id, name);
        let path = self.board_path(owner_id, &board.id);

        Box::pin(async move {
            write_board(&path, &board)?;
            Ok(board.summary())
        })
    }

    fn rename_board(&self, owner_id: &str, board_id: &str, name: &str) -> BoxFuture<'_, StorageResult<()>> {
        let result = self.existing_board(owner_id, board_id).and_then(|(path, mut board)| {
            board.rename(name);
            write_board(&path, &board)
        });
        Box::pin(async move { result })
    }

    fn delete_board(&self, owner_id: &str, board_id: &str) -> BoxFuture<'_, StorageResult<()>> {
        let path = self.board_path(owner_id, board_id);

        Box::pin(async move {
            if path.exists() {
                fs::remove_file(&path)
                    .map_err(|e| StorageError::Io(format!("Failed to delete {}: {}", path.display(), e)))?;
            }
            Ok(())
        })
    }
}

impl BlobStorage for FileStorage {
    fn upload(&self, owner_id: &str, bytes: &[u8], content_type: &str) -> BoxFuture<'_, StorageResult<String>> {
        let dir = self.owner_dir(owner_id).join("blobs");
        let path = dir.join(format!("{}.{}", Uuid::new_v4().simple(), extension_for(content_type)));
        let bytes = bytes.to_vec();

        Box::pin(async move {
            fs::create_dir_all(&dir)
                .map_err(|e| StorageError::Io(format!("Failed to create {}: {}", dir.display(), e)))?;
            fs::write(&path, bytes)
                .map_err(|e| StorageError::Io(format!("Failed to write {}: {}", path.display(), e)))?;
            Ok(format!("file://{}", path.display()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pollster::block_on;
    use tempfile::tempdir;

    fn record(id: &str, x: f64) -> LayoutRecord {
        LayoutRecord {
            id: id.to_string(),
            kind: "image".to_string(),
            x,
            y: 0.0,
            text: None,
            video_id: None,
            image_url: Some("https://img/a.png".to_string()),
            video_data: None,
            width: None,
            height: None,
            color: None,
        }
    }

    #[test]
    fn test_file_storage_save_load() {
        let dir = tempdir().unwrap();
        let storage = FileStorage::new(dir.path().to_path_buf()).unwrap();
        let board = block_on(storage.create_board("owner", "Test Board")).unwrap();

        assert_eq!(block_on(storage.load("owner", &board.id)).unwrap(), None);

        block_on(storage.save("owner", &board.id, &[record("a", 12.5)], None)).unwrap();
        let loaded = block_on(storage.load("owner", &board.id)).unwrap().unwrap();
        assert_eq!(loaded, vec![record("a", 12.5)]);
    }

    #[test]
    fn test_file_storage_not_found() {
        let dir = tempdir().unwrap();
        let storage = FileStorage::new(dir.path().to_path_buf()).unwrap();

        let result = block_on(storage.load("owner", "nonexistent"));
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }

    #[test]
    fn test_file_storage_corrupt_document() {
        let dir = tempdir().unwrap();
        let storage = FileStorage::new(dir.path().to_path_buf()).unwrap();
        let board = block_on(storage.create_board("owner", "b")).unwrap();
        fs::write(storage.board_path("owner", &board.id), "{not json").unwrap();

        let result = block_on(storage.load("owner", &board.id));
        assert!(matches!(result, Err(StorageError::Serialization(_))));
    }

    #[test]
    fn test_file_storage_list_rename_delete() {
        let dir = tempdir().unwrap();
        let storage = FileStorage::new(dir.path().to_path_buf()).unwrap();

        let first = block_on(storage.create_board("owner", "first")).unwrap();
        block_on(storage.create_board("owner", "second")).unwrap();
        block_on(storage.create_board("someone-else", "third")).unwrap();

        let list = block_on(storage.list_boards("owner")).unwrap();
        assert_eq!(list.len(), 2);

        block_on(storage.rename_board("owner", &first.id, "renamed")).unwrap();
        let list = block_on(storage.list_boards("owner")).unwrap();
        assert!(list.iter().any(|b| b.name == "renamed"));

        block_on(storage.delete_board("owner", &first.id)).unwrap();
        let list = block_on(storage.list_boards("owner")).unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].name, "second");
    }

    #[test]
    fn test_file_storage_sanitizes_ids() {
        let dir = tempdir().unwrap();
        let storage = FileStorage::new(dir.path().to_path_buf()).unwrap();

        let path = storage.board_path("../escape", "a/b:c*d");
        assert!(path.starts_with(dir.path()));
        assert_eq!(path.file_name().unwrap(), "a_b_c_d.json");
    }

    #[test]
    fn test_file_blob_upload() {
        let dir = tempdir().unwrap();
        let storage = FileStorage::new(dir.path().to_path_buf()).unwrap();

        let url = block_on(storage.upload("owner", b"\x89PNG", "image/png")).unwrap();
        let path = url.strip_prefix("file://").unwrap();
        assert!(path.ends_with(".png"));
        assert_eq!(fs::read(path).unwrap(), b"\x89PNG");
    }
}

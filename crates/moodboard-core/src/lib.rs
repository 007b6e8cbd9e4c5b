//! Moodboard Core Library
//!
//! Platform-agnostic canvas interaction engine for moodboards: an infinite
//! pan/zoom workspace holding video, image and note items, with marquee
//! selection, group drag and debounced layout persistence.

pub mod board;
pub mod canvas;
pub mod config;
pub mod coords;
pub mod dnd;
pub mod input;
pub mod interaction;
pub mod items;
pub mod layout;
pub mod selection;
pub mod snapshot;
pub mod storage;
pub mod viewport;

pub use board::{Board, BoardDirectory, BoardSession, BoardSummary};
pub use canvas::{Canvas, Notice, NoticeLevel};
pub use config::{CanvasConfig, ConfigError, ZoomSettings};
pub use coords::{CanvasPoint, ContainerPoint, ContainerRect, ScreenPoint};
pub use dnd::{DragBridge, DragData, DragEnd, DragStart, DropOutcome};
pub use input::{CursorIcon, HeadlessSurface, InputSurface, Key, KeyEvent, Modifiers, MouseButton, PointerEvent};
pub use interaction::{DragKind, GestureMode, InteractionState};
pub use items::{CanvasItem, ItemContent, ItemId, ItemKind, ItemStore, MediaRef, StoreChange};
pub use layout::{LayoutError, LayoutRecord};
pub use selection::SelectionSet;
pub use snapshot::{Overlay, SceneLayer, SnapshotError};
pub use storage::{AutoSaveManager, BlobStorage, LayoutStorage, MemoryStorage, SaveReport, StorageError, StorageResult};
pub use viewport::Viewport;

#[cfg(not(target_arch = "wasm32"))]
pub use storage::FileStorage;

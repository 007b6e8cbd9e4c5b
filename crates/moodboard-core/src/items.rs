//! Canvas items and the store that owns them.

use crate::coords::CanvasPoint;
use kurbo::{Rect, Size, Vec2};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

/// Nominal footprint of a note, in canvas units.
pub const NOTE_SIZE: Size = Size::new(200.0, 100.0);
/// Nominal footprint of a video or image card, in canvas units.
pub const MEDIA_SIZE: Size = Size::new(256.0, 144.0);

/// Unique identifier of a canvas item within a board.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    /// Wrap an existing id (e.g. one read from a saved layout).
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh id: creation timestamp plus a random suffix.
    pub fn generate() -> Self {
        let millis = chrono::Utc::now().timestamp_millis();
        let suffix = Uuid::new_v4().simple().to_string();
        Self(format!("{millis}-{}", &suffix[..9]))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ItemId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Item kinds, as written to the saved layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Video,
    Image,
    Note,
}

impl ItemKind {
    /// Fixed hit-test and render footprint for this kind.
    pub fn footprint(self) -> Size {
        match self {
            ItemKind::Note => NOTE_SIZE,
            ItemKind::Video | ItemKind::Image => MEDIA_SIZE,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ItemKind::Video => "video",
            ItemKind::Image => "image",
            ItemKind::Note => "note",
        }
    }
}

/// Opaque reference to a library video or an uploaded image.
///
/// Known fields are typed; anything else the library attaches rides along
/// in `extra` and is written back untouched.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaRef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<f64>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl MediaRef {
    /// A reference to an image living at `url`.
    pub fn image(url: impl Into<String>) -> Self {
        Self {
            image_url: Some(url.into()),
            ..Self::default()
        }
    }

    /// A reference to a library video.
    pub fn video(id: impl Into<String>, video_url: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            video_url: Some(video_url.into()),
            ..Self::default()
        }
    }
}

/// What an item shows. The variant fixes the item's kind at creation time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ItemContent {
    Video(MediaRef),
    Image(MediaRef),
    Note { text: String, color: Option<String> },
}

impl ItemContent {
    pub fn note(text: impl Into<String>) -> Self {
        ItemContent::Note {
            text: text.into(),
            color: None,
        }
    }

    pub fn kind(&self) -> ItemKind {
        match self {
            ItemContent::Video(_) => ItemKind::Video,
            ItemContent::Image(_) => ItemKind::Image,
            ItemContent::Note { .. } => ItemKind::Note,
        }
    }
}

/// An item placed on the canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanvasItem {
    pub id: ItemId,
    /// Top-left corner in canvas space.
    pub position: CanvasPoint,
    pub content: ItemContent,
}

impl CanvasItem {
    /// Create an item with a freshly generated id.
    pub fn new(position: CanvasPoint, content: ItemContent) -> Self {
        Self {
            id: ItemId::generate(),
            position,
            content,
        }
    }

    pub fn kind(&self) -> ItemKind {
        self.content.kind()
    }

    /// Canvas-space bounds using the kind footprint.
    pub fn bounds(&self) -> Rect {
        Rect::from_origin_size(self.position.to_point(), self.kind().footprint())
    }

    pub fn center(&self) -> CanvasPoint {
        self.bounds().center().into()
    }

    /// Note text, if this is a note.
    pub fn text(&self) -> Option<&str> {
        match &self.content {
            ItemContent::Note { text, .. } => Some(text),
            _ => None,
        }
    }

    /// Media reference, if this is a video or image.
    pub fn media(&self) -> Option<&MediaRef> {
        match &self.content {
            ItemContent::Video(media) | ItemContent::Image(media) => Some(media),
            ItemContent::Note { .. } => None,
        }
    }
}

/// A mutation observed on the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreChange {
    Added(ItemId),
    Removed(ItemId),
    Moved(ItemId),
    TextEdited(ItemId),
}

impl StoreChange {
    pub fn item_id(&self) -> &ItemId {
        match self {
            StoreChange::Added(id)
            | StoreChange::Removed(id)
            | StoreChange::Moved(id)
            | StoreChange::TextEdited(id) => id,
        }
    }
}

/// Ordered collection of the items on the open board.
///
/// Every mutating method records a [`StoreChange`]; observers drain them with
/// [`ItemStore::take_changes`]. Hydration replaces the contents without
/// recording changes.
#[derive(Debug, Clone, Default)]
pub struct ItemStore {
    items: HashMap<ItemId, CanvasItem>,
    /// Insertion order, back to front.
    order: Vec<ItemId>,
    changes: Vec<StoreChange>,
}

impl ItemStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole contents, e.g. after loading a board.
    pub fn hydrate(&mut self, items: impl IntoIterator<Item = CanvasItem>) {
        self.items.clear();
        self.order.clear();
        self.changes.clear();
        for item in items {
            if self.items.contains_key(&item.id) {
                log::warn!("Duplicate item id {} in loaded layout, keeping the first", item.id);
                continue;
            }
            self.order.push(item.id.clone());
            self.items.insert(item.id.clone(), item);
        }
    }

    /// Add an item on top of the others. An existing item with the same id is replaced in place.
    pub fn insert(&mut self, item: CanvasItem) -> ItemId {
        let id = item.id.clone();
        if self.items.insert(id.clone(), item).is_none() {
            self.order.push(id.clone());
        }
        self.changes.push(StoreChange::Added(id.clone()));
        id
    }

    pub fn remove(&mut self, id: &ItemId) -> Option<CanvasItem> {
        let removed = self.items.remove(id)?;
        self.order.retain(|other| other != id);
        self.changes.push(StoreChange::Removed(id.clone()));
        Some(removed)
    }

    /// Set a note's text. Returns false for unknown ids and non-note items.
    pub fn set_text(&mut self, id: &ItemId, new_text: impl Into<String>) -> bool {
        let Some(item) = self.items.get_mut(id) else {
            return false;
        };
        let ItemContent::Note { text, .. } = &mut item.content else {
            return false;
        };
        let new_text = new_text.into();
        if *text != new_text {
            *text = new_text;
            self.changes.push(StoreChange::TextEdited(id.clone()));
        }
        true
    }

    /// Move an item to a new canvas position. Returns false for unknown ids.
    pub fn set_position(&mut self, id: &ItemId, position: CanvasPoint) -> bool {
        let Some(item) = self.items.get_mut(id) else {
            return false;
        };
        if item.position != position {
            item.position = position;
            self.changes.push(StoreChange::Moved(id.clone()));
        }
        true
    }

    /// Move an item by a canvas-space delta.
    pub fn translate(&mut self, id: &ItemId, delta: Vec2) -> bool {
        match self.items.get(id).map(|item| item.position.offset(delta)) {
            Some(position) => self.set_position(id, position),
            None => false,
        }
    }

    pub fn get(&self, id: &ItemId) -> Option<&CanvasItem> {
        self.items.get(id)
    }

    pub fn contains(&self, id: &ItemId) -> bool {
        self.items.contains_key(id)
    }

    /// Items back to front.
    pub fn iter(&self) -> impl Iterator<Item = &CanvasItem> {
        self.order.iter().filter_map(|id| self.items.get(id))
    }

    /// Topmost item whose footprint contains the canvas point.
    pub fn item_at(&self, point: CanvasPoint) -> Option<&ItemId> {
        let point = point.to_point();
        self.order
            .iter()
            .rev()
            .find(|id| self.items.get(*id).is_some_and(|item| item.bounds().contains(point)))
    }

    /// Bounding box of all items.
    pub fn bounds(&self) -> Option<Rect> {
        self.iter()
            .map(CanvasItem::bounds)
            .reduce(|acc, bounds| acc.union(bounds))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Drop all items and pending changes.
    pub fn clear(&mut self) {
        self.items.clear();
        self.order.clear();
        self.changes.clear();
    }

    pub fn has_changes(&self) -> bool {
        !self.changes.is_empty()
    }

    /// Drain the mutations recorded since the last call.
    pub fn take_changes(&mut self) -> Vec<StoreChange> {
        std::mem::take(&mut self.changes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note_at(id: &str, x: f64, y: f64) -> CanvasItem {
        CanvasItem {
            id: ItemId::new(id),
            position: CanvasPoint::new(x, y),
            content: ItemContent::note("hello"),
        }
    }

    #[test]
    fn test_generated_ids_are_unique() {
        let a = ItemId::generate();
        let b = ItemId::generate();
        assert_ne!(a, b);
        assert!(a.as_str().contains('-'));
    }

    #[test]
    fn test_footprints() {
        assert_eq!(ItemKind::Note.footprint(), Size::new(200.0, 100.0));
        assert_eq!(ItemKind::Video.footprint(), Size::new(256.0, 144.0));
        assert_eq!(ItemKind::Image.footprint(), ItemKind::Video.footprint());
    }

    #[test]
    fn test_insert_and_remove() {
        let mut store = ItemStore::new();
        let id = store.insert(note_at("a", 0.0, 0.0));
        store.insert(note_at("b", 10.0, 10.0));
        assert_eq!(store.len(), 2);

        let removed = store.remove(&id).unwrap();
        assert_eq!(removed.id, ItemId::new("a"));
        assert_eq!(store.len(), 1);
        assert!(store.remove(&id).is_none());

        let changes = store.take_changes();
        assert_eq!(
            changes,
            vec![
                StoreChange::Added(ItemId::new("a")),
                StoreChange::Added(ItemId::new("b")),
                StoreChange::Removed(ItemId::new("a")),
            ]
        );
        assert!(!store.has_changes());
    }

    #[test]
    fn test_set_text_only_for_notes() {
        let mut store = ItemStore::new();
        let note = store.insert(note_at("n", 0.0, 0.0));
        let video = store.insert(CanvasItem {
            id: ItemId::new("v"),
            position: CanvasPoint::ORIGIN,
            content: ItemContent::Video(MediaRef::video("vid-1", "https://cdn/v.mp4")),
        });
        store.take_changes();

        assert!(store.set_text(&note, "updated"));
        assert_eq!(store.get(&note).unwrap().text(), Some("updated"));
        assert!(!store.set_text(&video, "nope"));
        assert!(!store.set_text(&ItemId::new("missing"), "nope"));
        assert_eq!(store.take_changes(), vec![StoreChange::TextEdited(note)]);
    }

    #[test]
    fn test_unchanged_mutations_are_not_recorded() {
        let mut store = ItemStore::new();
        let id = store.insert(note_at("a", 5.0, 5.0));
        store.take_changes();

        assert!(store.set_position(&id, CanvasPoint::new(5.0, 5.0)));
        assert!(store.set_text(&id, "hello"));
        assert!(!store.has_changes());
    }

    #[test]
    fn test_translate() {
        let mut store = ItemStore::new();
        let id = store.insert(note_at("a", 100.0, 100.0));
        assert!(store.translate(&id, Vec2::new(20.0, 10.0)));
        assert_eq!(store.get(&id).unwrap().position, CanvasPoint::new(120.0, 110.0));
        assert!(!store.translate(&ItemId::new("missing"), Vec2::new(1.0, 1.0)));
    }

    #[test]
    fn test_item_at_prefers_topmost() {
        let mut store = ItemStore::new();
        store.insert(note_at("bottom", 0.0, 0.0));
        store.insert(note_at("top", 50.0, 50.0));

        assert_eq!(store.item_at(CanvasPoint::new(60.0, 60.0)), Some(&ItemId::new("top")));
        assert_eq!(store.item_at(CanvasPoint::new(10.0, 10.0)), Some(&ItemId::new("bottom")));
        assert_eq!(store.item_at(CanvasPoint::new(500.0, 500.0)), None);
    }

    #[test]
    fn test_hydrate_does_not_record_changes() {
        let mut store = ItemStore::new();
        store.insert(note_at("old", 0.0, 0.0));
        store.hydrate(vec![note_at("a", 0.0, 0.0), note_at("b", 1.0, 1.0), note_at("a", 2.0, 2.0)]);

        assert_eq!(store.len(), 2);
        assert!(!store.contains(&ItemId::new("old")));
        assert_eq!(store.get(&ItemId::new("a")).unwrap().position, CanvasPoint::ORIGIN);
        assert!(!store.has_changes());
    }

    #[test]
    fn test_bounds() {
        let mut store = ItemStore::new();
        assert!(store.bounds().is_none());
        store.insert(note_at("a", 0.0, 0.0));
        store.insert(note_at("b", 300.0, 400.0));
        assert_eq!(store.bounds().unwrap(), Rect::new(0.0, 0.0, 500.0, 500.0));
    }
}

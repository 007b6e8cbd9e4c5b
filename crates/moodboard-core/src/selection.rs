//! Selection set and marquee hit-testing.

use crate::coords::ContainerPoint;
use crate::items::{ItemId, ItemStore};
use crate::viewport::Viewport;
use kurbo::Rect;
use std::collections::BTreeSet;

/// The ids selected in the current board session. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionSet {
    ids: BTreeSet<ItemId>,
}

impl SelectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: &ItemId) -> bool {
        self.ids.contains(id)
    }

    pub fn insert(&mut self, id: ItemId) -> bool {
        self.ids.insert(id)
    }

    pub fn remove(&mut self, id: &ItemId) -> bool {
        self.ids.remove(id)
    }

    /// Add the id if absent, remove it if present. Returns whether it is now selected.
    pub fn toggle(&mut self, id: &ItemId) -> bool {
        if self.ids.remove(id) {
            false
        } else {
            self.ids.insert(id.clone());
            true
        }
    }

    /// Replace the selection with a single id.
    pub fn select_only(&mut self, id: ItemId) {
        self.ids.clear();
        self.ids.insert(id);
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ItemId> {
        self.ids.iter()
    }

    /// Drop ids that no longer exist in the store.
    pub fn prune(&mut self, store: &ItemStore) {
        self.ids.retain(|id| store.contains(id));
    }
}

impl FromIterator<ItemId> for SelectionSet {
    fn from_iter<T: IntoIterator<Item = ItemId>>(iter: T) -> Self {
        Self {
            ids: iter.into_iter().collect(),
        }
    }
}

impl Extend<ItemId> for SelectionSet {
    fn extend<T: IntoIterator<Item = ItemId>>(&mut self, iter: T) {
        self.ids.extend(iter);
    }
}

/// Rubber-band rectangle in container space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarqueeRect {
    pub start: ContainerPoint,
    pub current: ContainerPoint,
}

impl MarqueeRect {
    pub fn new(start: ContainerPoint) -> Self {
        Self { start, current: start }
    }

    /// Normalized rectangle between the two corners.
    pub fn to_rect(&self) -> Rect {
        Rect::new(
            self.start.x.min(self.current.x),
            self.start.y.min(self.current.y),
            self.start.x.max(self.current.x),
            self.start.y.max(self.current.y),
        )
    }
}

/// Open-interval AABB overlap: rectangles that only touch along an edge do not intersect.
pub fn intersects_open(a: Rect, b: Rect) -> bool {
    a.x0 < b.x1 && a.x1 > b.x0 && a.y0 < b.y1 && a.y1 > b.y0
}

/// Ids of items whose projected footprint overlaps a container-space rectangle.
pub fn items_in_marquee(store: &ItemStore, viewport: &Viewport, marquee: Rect) -> Vec<ItemId> {
    store
        .iter()
        .filter(|item| intersects_open(viewport.canvas_rect_to_container(item.bounds()), marquee))
        .map(|item| item.id.clone())
        .collect()
}

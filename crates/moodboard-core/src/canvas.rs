//! Canvas runtime state and gesture dispatch.

use crate::config::CanvasConfig;
use crate::coords::{CanvasPoint, ContainerPoint, ContainerRect, ScreenPoint};
use crate::input::{
    ClickTracker, CursorIcon, HeadlessSurface, InputSurface, Key, KeyEvent, KeyTracker, Modifiers, MouseButton,
    PointerEvent,
};
use crate::interaction::{GestureMode, InteractionSnapshot, InteractionState, ItemDrag, background_mode};
use crate::items::{CanvasItem, ItemContent, ItemId, ItemStore, MediaRef, StoreChange};
use crate::selection::{MarqueeRect, SelectionSet};
use crate::storage::BlobStorage;
use crate::viewport::Viewport;
use kurbo::{Rect, Vec2};

/// Severity of a transient notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
}

/// A transient message for the host to show (toast/snackbar).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

/// Runtime state of the open board (not persisted apart from the items).
pub struct Canvas {
    /// View transform. Reset when the board closes.
    pub viewport: Viewport,
    items: ItemStore,
    selection: SelectionSet,
    interaction: InteractionState,
    keys: KeyTracker,
    clicks: ClickTracker,
    surface: Box<dyn InputSurface>,
    container: ContainerRect,
    config: CanvasConfig,
    /// Note whose text is being edited inline.
    editing: Option<ItemId>,
    notices: Vec<Notice>,
}

impl Default for Canvas {
    fn default() -> Self {
        Self::new(CanvasConfig::default())
    }
}

impl Canvas {
    /// Create an empty canvas with a headless input surface.
    pub fn new(config: CanvasConfig) -> Self {
        Self::with_surface(config, Box::new(HeadlessSurface::new()))
    }

    /// Create an empty canvas driving the given input surface.
    pub fn with_surface(config: CanvasConfig, surface: Box<dyn InputSurface>) -> Self {
        Self {
            viewport: Viewport::new(),
            items: ItemStore::new(),
            selection: SelectionSet::new(),
            interaction: InteractionState::Idle,
            keys: KeyTracker::new(),
            clicks: ClickTracker::new(config.double_click_interval(), config.double_click_distance),
            surface,
            container: ContainerRect::default(),
            config,
            editing: None,
            notices: Vec::new(),
        }
    }

    pub fn config(&self) -> &CanvasConfig {
        &self.config
    }

    pub fn items(&self) -> &ItemStore {
        &self.items
    }

    pub fn selection(&self) -> &SelectionSet {
        &self.selection
    }

    pub fn interaction(&self) -> &InteractionState {
        &self.interaction
    }

    pub fn keys(&self) -> &KeyTracker {
        &self.keys
    }

    pub fn surface(&self) -> &dyn InputSurface {
        self.surface.as_ref()
    }

    pub fn container(&self) -> ContainerRect {
        self.container
    }

    /// Update the container's on-screen rectangle (on layout or resize).
    pub fn set_container(&mut self, container: ContainerRect) {
        self.container = container;
    }

    /// Convert a host pointer position to canvas coordinates.
    pub fn screen_to_canvas(&self, point: ScreenPoint) -> CanvasPoint {
        self.viewport.container_to_canvas(self.container.to_container(point))
    }

    /// Convert a canvas position to host pointer coordinates.
    pub fn canvas_to_screen(&self, point: CanvasPoint) -> ScreenPoint {
        self.container.to_screen(self.viewport.canvas_to_container(point))
    }

    /// Position an item should be drawn at, including any drag preview.
    pub fn display_position(&self, id: &ItemId) -> Option<CanvasPoint> {
        if let Some(preview) = self
            .interaction
            .item_drag()
            .and_then(|drag| drag.preview_position(id, self.viewport.scale))
        {
            if self.items.contains(id) {
                return Some(preview);
            }
        }
        self.items.get(id).map(|item| item.position)
    }

    /// The visible marquee rectangle in container space, if selecting.
    pub fn marquee_rect(&self) -> Option<Rect> {
        self.interaction.marquee_rect()
    }

    // --- Event dispatch ---

    /// Process a pointer event from the host.
    pub fn handle_pointer_event(&mut self, event: PointerEvent) {
        match event {
            PointerEvent::Down {
                position,
                button,
                modifiers,
            } => {
                if !self.interaction.is_idle() {
                    log::debug!("Ignoring {button:?} press during {}", self.interaction.name());
                    return;
                }
                let local = self.container.to_container(position);
                let hit = self.items.item_at(self.viewport.container_to_canvas(local)).cloned();
                match hit {
                    Some(id) if button == MouseButton::Left && !self.keys.space_held() => {
                        self.press_item(&id, local, position, modifiers);
                    }
                    _ => self.press_background(local, button, modifiers),
                }
            }
            PointerEvent::Move { position } => {
                let local = self.container.to_container(position);
                self.pointer_move(local);
            }
            PointerEvent::Up { .. } => self.pointer_up(),
            PointerEvent::Wheel { position, delta } => {
                let anchor = self.container.to_container(position);
                self.viewport.zoom_by(delta.y, Some(anchor), &self.config.zoom);
            }
        }
    }

    /// Process a key event from the host.
    pub fn handle_key_event(&mut self, event: KeyEvent) {
        if event == KeyEvent::Pressed(Key::Escape) {
            if self.editing.is_some() {
                self.cancel_note_edit();
            } else {
                self.cancel_gesture();
            }
            return;
        }
        self.keys.handle_key_event(&event);
    }

    /// Start a pan or marquee gesture on the empty background.
    pub fn press_background(&mut self, local: ContainerPoint, button: MouseButton, modifiers: Modifiers) {
        let Some(mode) = background_mode(button, self.keys.space_held()) else {
            return;
        };
        let snapshot = InteractionSnapshot::new(local, mode, self.viewport, &self.selection, modifiers.shift);

        self.interaction = match mode {
            GestureMode::Pan => {
                self.surface.set_cursor(Some(CursorIcon::Grabbing));
                InteractionState::Panning(snapshot)
            }
            GestureMode::Marquee => {
                if !modifiers.shift {
                    self.selection.clear();
                }
                self.surface.set_cursor(Some(CursorIcon::Crosshair));
                InteractionState::MarqueeSelecting {
                    snapshot,
                    marquee: MarqueeRect::new(local),
                }
            }
        };
        self.surface.attach_pointer_listeners();
        log::debug!("Gesture started: {}", self.interaction.name());
    }

    fn press_item(&mut self, id: &ItemId, local: ContainerPoint, screen: ScreenPoint, modifiers: Modifiers) {
        if self.clicks.register_press(screen) {
            self.center_on_item(id);
            return;
        }
        let Some(mut drag) = ItemDrag::begin(id, local, &self.selection, &self.items, modifiers.shift) else {
            return;
        };
        drag.owns_listeners = true;
        self.interaction = InteractionState::Dragging(drag);
        self.surface.attach_pointer_listeners();
        log::debug!("Gesture started: {} on {id}", self.interaction.name());
    }

    fn pointer_move(&mut self, local: ContainerPoint) {
        match &mut self.interaction {
            InteractionState::Idle => {}
            InteractionState::Panning(snapshot) => {
                self.viewport = snapshot.panned_viewport(local);
            }
            InteractionState::MarqueeSelecting { snapshot, marquee } => {
                marquee.current = local;
                self.selection = snapshot.marquee_selection(marquee.to_rect(), &self.items, &self.viewport);
            }
            InteractionState::Dragging(drag) => {
                if drag.update(local, self.config.drag_activation_distance) {
                    self.surface.set_cursor(Some(CursorIcon::Move));
                }
            }
        }
    }

    fn pointer_up(&mut self) {
        match std::mem::take(&mut self.interaction) {
            InteractionState::Idle => return,
            InteractionState::Panning(_) | InteractionState::MarqueeSelecting { .. } => {
                self.release_pointer();
            }
            InteractionState::Dragging(drag) => {
                if drag.activated {
                    let moved = drag.commit(&mut self.items, self.viewport.scale);
                    log::debug!("Dropped {moved} item(s)");
                } else {
                    self.click_item(&drag.pressed, drag.shift);
                }
                if drag.owns_listeners {
                    self.release_pointer();
                }
            }
        }
        log::debug!("Gesture ended");
    }

    fn release_pointer(&mut self) {
        self.surface.set_cursor(None);
        self.surface.detach_pointer_listeners();
    }

    /// A press that never moved past the activation distance.
    fn click_item(&mut self, id: &ItemId, shift: bool) {
        if !self.items.contains(id) {
            return;
        }
        if shift {
            self.selection.toggle(id);
        } else if self.selection.len() == 1 && self.selection.contains(id) {
            self.selection.clear();
        } else {
            self.selection.select_only(id.clone());
        }
    }

    /// Abandon the current gesture without committing it.
    ///
    /// A pan restores the starting viewport, a marquee the starting selection.
    /// Item drags never touched the store, so nothing needs restoring.
    /// Returns false if no gesture was active.
    pub fn cancel_gesture(&mut self) -> bool {
        let owns_listeners = match std::mem::take(&mut self.interaction) {
            InteractionState::Idle => return false,
            InteractionState::Panning(snapshot) => {
                self.viewport = snapshot.initial_viewport;
                true
            }
            InteractionState::MarqueeSelecting { snapshot, .. } => {
                self.selection = snapshot.prior_selection;
                true
            }
            InteractionState::Dragging(drag) => drag.owns_listeners,
        };
        if owns_listeners {
            self.release_pointer();
        }
        log::debug!("Gesture cancelled");
        true
    }

    // --- Drags driven by an external drag-and-drop primitive ---

    /// Start an item drag whose activation was decided by the host's drag primitive.
    pub fn begin_item_drag(&mut self, id: &ItemId, modifiers: Modifiers) -> bool {
        if !self.interaction.is_idle() {
            return false;
        }
        let Some(mut drag) =
            ItemDrag::begin(id, ContainerPoint::ORIGIN, &self.selection, &self.items, modifiers.shift)
        else {
            return false;
        };
        drag.activated = true;
        self.interaction = InteractionState::Dragging(drag);
        true
    }

    /// Update the preview of a primitive-driven item drag.
    pub fn update_item_drag(&mut self, delta: Vec2) {
        if let InteractionState::Dragging(drag) = &mut self.interaction {
            drag.delta = delta;
        }
    }

    /// Finish a primitive-driven item drag. Returns the number of items moved.
    pub fn finish_item_drag(&mut self, delta: Vec2) -> usize {
        match std::mem::take(&mut self.interaction) {
            InteractionState::Dragging(mut drag) => {
                drag.delta = delta;
                let moved = drag.commit(&mut self.items, self.viewport.scale);
                if drag.owns_listeners {
                    self.release_pointer();
                }
                moved
            }
            other => {
                self.interaction = other;
                0
            }
        }
    }

    // --- Item operations ---

    /// Place a new item with its top-left corner at `position`.
    pub fn add_item(&mut self, position: CanvasPoint, content: ItemContent) -> ItemId {
        self.items.insert(CanvasItem::new(position, content))
    }

    /// Add an empty note under a screen position (context menu "add note").
    pub fn add_note_at(&mut self, position: ScreenPoint) -> ItemId {
        let at = self.screen_to_canvas(position);
        self.add_item(at, ItemContent::note(""))
    }

    /// Remove an item, pruning it from the selection.
    pub fn remove_item(&mut self, id: &ItemId) -> bool {
        if self.items.remove(id).is_none() {
            return false;
        }
        self.selection.remove(id);
        if self.editing.as_ref() == Some(id) {
            self.editing = None;
            self.keys.set_text_focus(false);
        }
        true
    }

    /// Remove every selected item. Returns how many were removed.
    pub fn remove_selected(&mut self) -> usize {
        let ids: Vec<ItemId> = self.selection.iter().cloned().collect();
        ids.iter().filter(|id| self.remove_item(id)).count()
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    /// Center the view on an item at zoom 1 (double-click action).
    pub fn center_on_item(&mut self, id: &ItemId) -> bool {
        let Some(center) = self.items.get(id).map(CanvasItem::center) else {
            return false;
        };
        self.viewport.center_on(center, self.container.size);
        true
    }

    /// Focus a note for inline editing. Space no longer pans while editing.
    pub fn begin_note_edit(&mut self, id: &ItemId) -> bool {
        if self.items.get(id).and_then(CanvasItem::text).is_none() {
            return false;
        }
        self.editing = Some(id.clone());
        self.keys.set_text_focus(true);
        true
    }

    /// Commit the inline editor's text to the focused note.
    pub fn commit_note_text(&mut self, text: impl Into<String>) -> bool {
        let Some(id) = self.editing.take() else {
            return false;
        };
        self.keys.set_text_focus(false);
        self.items.set_text(&id, text)
    }

    pub fn cancel_note_edit(&mut self) {
        self.editing = None;
        self.keys.set_text_focus(false);
    }

    pub fn editing(&self) -> Option<&ItemId> {
        self.editing.as_ref()
    }

    /// Upload pasted image bytes and place the image at the center of the view.
    ///
    /// On upload failure nothing is created and an error notice is queued.
    pub async fn paste_image<B: BlobStorage + ?Sized>(
        &mut self,
        blobs: &B,
        owner_id: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> Option<ItemId> {
        match blobs.upload(owner_id, bytes, content_type).await {
            Ok(url) => {
                let center = self.viewport.container_to_canvas(self.container.center());
                let size = crate::items::MEDIA_SIZE;
                let at = CanvasPoint::new(center.x - size.width / 2.0, center.y - size.height / 2.0);
                let id = self.add_item(at, ItemContent::Image(MediaRef::image(url)));
                log::info!("Pasted image as item {id}");
                Some(id)
            }
            Err(e) => {
                log::error!("Image upload failed: {e}");
                self.notices.push(Notice::error(format!("Image upload failed: {e}")));
                None
            }
        }
    }

    pub(crate) fn push_notice(&mut self, notice: Notice) {
        self.notices.push(notice);
    }

    /// Drain queued notices.
    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    /// Drain store mutations since the last call.
    pub fn take_changes(&mut self) -> Vec<StoreChange> {
        self.items.take_changes()
    }

    // --- Lifecycle ---

    /// Replace the items with a loaded layout.
    pub fn hydrate(&mut self, items: Vec<CanvasItem>) {
        self.items.hydrate(items);
        self.selection.prune(&self.items);
    }

    /// Abort any gesture and detach its listeners (component teardown).
    pub fn teardown(&mut self) {
        self.cancel_gesture();
        self.cancel_note_edit();
        self.keys = KeyTracker::new();
        self.clicks.reset();
    }

    /// Tear down and clear items, selection and viewport (board close).
    pub fn reset(&mut self) {
        self.teardown();
        self.items.clear();
        self.selection.clear();
        self.viewport.reset();
        self.notices.clear();
    }
}

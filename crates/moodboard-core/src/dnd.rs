//! Bridge between an external drag-and-drop primitive and the canvas.
//!
//! The primitive decides when a drag activates and reports the start and
//! the total screen-space travel at the drop. Library entries dropped over
//! the canvas become new items under the cursor; canvas items being dragged
//! are routed to the canvas' item-drag handling.

use crate::canvas::Canvas;
use crate::coords::ScreenPoint;
use crate::input::Modifiers;
use crate::items::{ItemContent, ItemId, MediaRef};
use kurbo::Vec2;

/// Payload carried by a draggable.
#[derive(Debug, Clone, PartialEq)]
pub enum DragData {
    /// A video from the side library.
    LibraryVideo(MediaRef),
    /// An image from the side library.
    LibraryImage(MediaRef),
    /// An item already on the canvas.
    CanvasItem(ItemId),
}

/// Reported by the primitive when a drag activates.
#[derive(Debug, Clone, PartialEq)]
pub struct DragStart {
    /// The primitive's id for the draggable.
    pub id: String,
    pub data: DragData,
    /// Pointer position when the drag started.
    pub origin: ScreenPoint,
    pub modifiers: Modifiers,
}

/// Reported by the primitive on drop.
#[derive(Debug, Clone, PartialEq)]
pub struct DragEnd {
    pub id: String,
    pub data: DragData,
    /// Total pointer travel in screen pixels.
    pub delta: Vec2,
}

/// What a drop did.
#[derive(Debug, Clone, PartialEq)]
pub enum DropOutcome {
    /// A library entry became a new item.
    Created(ItemId),
    /// Canvas items were moved; the count of items moved.
    Moved(usize),
    /// Dropped outside the canvas, or without a matching start.
    Ignored,
}

#[derive(Debug, Clone)]
struct ActiveDrag {
    id: String,
    origin: ScreenPoint,
    /// Started for canvas items, so the canvas holds a matching item drag.
    moves_items: bool,
}

/// Tracks the drag in flight and applies drops to a [`Canvas`].
#[derive(Debug, Clone, Default)]
pub struct DragBridge {
    active: Option<ActiveDrag>,
}

impl DragBridge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_dragging(&self) -> bool {
        self.active.is_some()
    }

    pub fn drag_start(&mut self, canvas: &mut Canvas, start: DragStart) {
        if let DragData::CanvasItem(item_id) = &start.data {
            if !canvas.begin_item_drag(item_id, start.modifiers) {
                log::debug!("Item drag for {item_id} not started");
                return;
            }
        }
        self.active = Some(ActiveDrag {
            moves_items: matches!(start.data, DragData::CanvasItem(_)),
            id: start.id,
            origin: start.origin,
        });
    }

    /// Pointer travel so far, for previewing canvas item drags.
    pub fn drag_move(&mut self, canvas: &mut Canvas, delta: Vec2) {
        if self.active.as_ref().is_some_and(|active| active.moves_items) {
            canvas.update_item_drag(delta);
        }
    }

    pub fn drag_end(&mut self, canvas: &mut Canvas, end: DragEnd) -> DropOutcome {
        let Some(active) = self.active.take() else {
            log::warn!("Drop of {} without a drag start, ignoring", end.id);
            return DropOutcome::Ignored;
        };
        if active.id != end.id {
            log::warn!("Drop id {} does not match drag start {}", end.id, active.id);
        }

        let content = match end.data {
            DragData::CanvasItem(_) if active.moves_items => {
                return DropOutcome::Moved(canvas.finish_item_drag(end.delta));
            }
            DragData::CanvasItem(id) => {
                log::warn!("Drop of item {id} for a library drag, ignoring");
                return DropOutcome::Ignored;
            }
            DragData::LibraryVideo(media) => ItemContent::Video(media),
            DragData::LibraryImage(media) => ItemContent::Image(media),
        };

        let drop_point = active.origin.offset(end.delta);
        if !canvas.container().contains(drop_point) {
            log::debug!("Library drop outside the canvas at ({}, {})", drop_point.x, drop_point.y);
            return DropOutcome::Ignored;
        }
        let position = canvas.screen_to_canvas(drop_point);
        DropOutcome::Created(canvas.add_item(position, content))
    }

    /// Abandon the drag. Only item drags cancel the canvas gesture.
    pub fn drag_cancel(&mut self, canvas: &mut Canvas) {
        if self.active.take().is_some_and(|active| active.moves_items) {
            canvas.cancel_gesture();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CanvasConfig;
    use crate::coords::{CanvasPoint, ContainerRect};
    use crate::input::{MouseButton, PointerEvent};
    use crate::interaction::InteractionState;
    use crate::viewport::Viewport;
    use kurbo::Size;

    fn library_video() -> DragData {
        DragData::LibraryVideo(MediaRef::video("vid-1", "https://cdn/v.mp4"))
    }

    fn start(data: DragData, x: f64, y: f64) -> DragStart {
        DragStart {
            id: "drag-1".to_string(),
            data,
            origin: ScreenPoint::new(x, y),
            modifiers: Modifiers::NONE,
        }
    }

    fn end(data: DragData, dx: f64, dy: f64) -> DragEnd {
        DragEnd {
            id: "drag-1".to_string(),
            data,
            delta: Vec2::new(dx, dy),
        }
    }

    #[test]
    fn test_drop_placement_uses_viewport() {
        let mut canvas = Canvas::new(CanvasConfig::default());
        canvas.viewport = Viewport { x: 50.0, y: 50.0, scale: 1.5 };
        let mut bridge = DragBridge::new();

        bridge.drag_start(&mut canvas, start(library_video(), 250.0, 150.0));
        let outcome = bridge.drag_end(&mut canvas, end(library_video(), 50.0, 50.0));

        let DropOutcome::Created(id) = outcome else {
            panic!("expected an item, got {outcome:?}");
        };
        let item = canvas.items().get(&id).unwrap();
        assert!((item.position.x - 166.666_666).abs() < 1e-3);
        assert!((item.position.y - 100.0).abs() < 1e-9);
        assert_eq!(item.media().unwrap().id.as_deref(), Some("vid-1"));
    }

    #[test]
    fn test_same_visual_spot_lands_under_cursor() {
        let mut bridge = DragBridge::new();
        for viewport in [
            Viewport { x: 0.0, y: 0.0, scale: 1.0 },
            Viewport { x: -300.0, y: 120.0, scale: 0.25 },
            Viewport { x: 75.0, y: -40.0, scale: 4.0 },
        ] {
            let mut canvas = Canvas::default();
            canvas.set_container(ContainerRect::new(ScreenPoint::new(240.0, 64.0), Size::new(800.0, 600.0)));
            canvas.viewport = viewport;

            bridge.drag_start(&mut canvas, start(library_video(), 10.0, 400.0));
            let DropOutcome::Created(id) = bridge.drag_end(&mut canvas, end(library_video(), 500.0, -100.0)) else {
                panic!("drop inside the canvas should create an item");
            };
            let placed = canvas.items().get(&id).unwrap().position;
            let on_screen = canvas.canvas_to_screen(placed);
            assert!((on_screen.x - 510.0).abs() < 1e-9);
            assert!((on_screen.y - 300.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_drop_outside_canvas_is_ignored() {
        let mut canvas = Canvas::default();
        canvas.set_container(ContainerRect::new(ScreenPoint::new(300.0, 0.0), Size::new(800.0, 600.0)));
        let mut bridge = DragBridge::new();

        bridge.drag_start(&mut canvas, start(library_video(), 100.0, 100.0));
        assert_eq!(bridge.drag_end(&mut canvas, end(library_video(), 50.0, 0.0)), DropOutcome::Ignored);
        assert!(canvas.items().is_empty());
    }

    #[test]
    fn test_drop_without_start_is_ignored() {
        let mut canvas = Canvas::default();
        let mut bridge = DragBridge::new();
        let image = DragData::LibraryImage(MediaRef::image("https://img"));
        assert_eq!(bridge.drag_end(&mut canvas, end(image, 10.0, 10.0)), DropOutcome::Ignored);
    }

    #[test]
    fn test_canvas_item_drag_routes_to_canvas() {
        let mut canvas = Canvas::default();
        canvas.viewport.scale = 2.0;
        let id = canvas.add_item(CanvasPoint::new(100.0, 100.0), ItemContent::note("n"));
        let mut bridge = DragBridge::new();

        bridge.drag_start(&mut canvas, start(DragData::CanvasItem(id.clone()), 0.0, 0.0));
        bridge.drag_move(&mut canvas, Vec2::new(20.0, 0.0));
        assert_eq!(canvas.display_position(&id), Some(CanvasPoint::new(110.0, 100.0)));

        let outcome = bridge.drag_end(&mut canvas, end(DragData::CanvasItem(id.clone()), 40.0, 20.0));
        assert_eq!(outcome, DropOutcome::Moved(1));
        assert_eq!(canvas.items().get(&id).unwrap().position, CanvasPoint::new(120.0, 110.0));
        assert!(!bridge.is_dragging());
    }

    #[test]
    fn test_cancel_leaves_items_in_place() {
        let mut canvas = Canvas::default();
        let id = canvas.add_item(CanvasPoint::ORIGIN, ItemContent::note("n"));
        let mut bridge = DragBridge::new();

        bridge.drag_start(&mut canvas, start(DragData::CanvasItem(id.clone()), 0.0, 0.0));
        bridge.drag_move(&mut canvas, Vec2::new(300.0, 0.0));
        bridge.drag_cancel(&mut canvas);

        assert!(canvas.interaction().is_idle());
        assert_eq!(canvas.items().get(&id).unwrap().position, CanvasPoint::ORIGIN);
    }

    #[test]
    fn test_library_cancel_leaves_pointer_gesture_alone() {
        let mut canvas = Canvas::default();
        canvas.handle_pointer_event(PointerEvent::Down {
            position: ScreenPoint::new(500.0, 500.0),
            button: MouseButton::Middle,
            modifiers: Modifiers::NONE,
        });
        canvas.handle_pointer_event(PointerEvent::Move {
            position: ScreenPoint::new(540.0, 520.0),
        });
        let mut bridge = DragBridge::new();

        bridge.drag_start(&mut canvas, start(library_video(), 10.0, 10.0));
        bridge.drag_move(&mut canvas, Vec2::new(30.0, 0.0));
        bridge.drag_cancel(&mut canvas);

        assert!(!bridge.is_dragging());
        assert!(matches!(canvas.interaction(), InteractionState::Panning(_)));
        assert_eq!(canvas.viewport, Viewport { x: 40.0, y: 20.0, scale: 1.0 });
        assert_eq!(canvas.surface().active_listeners(), 1);
    }
}

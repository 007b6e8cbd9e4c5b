//! Interaction state machine for canvas gestures.
//!
//! A press on the background starts a pan or a marquee selection; a press on
//! an item starts an item drag. The state lives in [`InteractionState`] and is
//! owned by the [`Canvas`](crate::canvas::Canvas), which applies the side effects.

use crate::coords::{CanvasPoint, ContainerPoint};
use crate::input::MouseButton;
use crate::items::{ItemId, ItemStore};
use crate::selection::{MarqueeRect, SelectionSet, items_in_marquee};
use crate::viewport::Viewport;
use kurbo::{Rect, Vec2};

/// Background gesture kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureMode {
    Pan,
    Marquee,
}

/// Which background gesture a press starts, if any.
///
/// Middle button pans. Left button pans while space is held, otherwise it
/// starts a marquee. Other buttons are left to the host (context menu).
pub fn background_mode(button: MouseButton, space_held: bool) -> Option<GestureMode> {
    match button {
        MouseButton::Middle => Some(GestureMode::Pan),
        MouseButton::Left if space_held => Some(GestureMode::Pan),
        MouseButton::Left => Some(GestureMode::Marquee),
        MouseButton::Right => None,
    }
}

/// State captured when a background gesture starts.
#[derive(Debug, Clone, PartialEq)]
pub struct InteractionSnapshot {
    /// Pointer-down position in container space.
    pub start: ContainerPoint,
    pub mode: GestureMode,
    /// Viewport at gesture start.
    pub initial_viewport: Viewport,
    /// Selection the marquee result is unioned with: the prior selection when
    /// shift was held, empty otherwise.
    pub initial_selected: SelectionSet,
    /// Selection before the gesture, restored on cancel.
    pub prior_selection: SelectionSet,
}

impl InteractionSnapshot {
    pub fn new(
        start: ContainerPoint,
        mode: GestureMode,
        viewport: Viewport,
        selection: &SelectionSet,
        shift: bool,
    ) -> Self {
        let initial_selected = if shift {
            selection.clone()
        } else {
            SelectionSet::new()
        };
        Self {
            start,
            mode,
            initial_viewport: viewport,
            initial_selected,
            prior_selection: selection.clone(),
        }
    }

    /// Viewport for a pan whose pointer is now at `current`. Scale is untouched.
    pub fn panned_viewport(&self, current: ContainerPoint) -> Viewport {
        let delta = current.delta_from(self.start);
        Viewport {
            x: self.initial_viewport.x + delta.x,
            y: self.initial_viewport.y + delta.y,
            scale: self.initial_viewport.scale,
        }
    }

    /// Selection for a marquee covering `marquee`: the seed plus every intersecting item.
    pub fn marquee_selection(&self, marquee: Rect, store: &ItemStore, viewport: &Viewport) -> SelectionSet {
        let mut selection = self.initial_selected.clone();
        selection.extend(items_in_marquee(store, viewport, marquee));
        selection
    }
}

/// Whether an item drag moves one item or the whole selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragKind {
    Single,
    Group,
}

/// An in-flight item drag.
///
/// Items are not moved in the store until the drag is committed; until then
/// the renderer shows [`ItemDrag::preview_position`].
#[derive(Debug, Clone, PartialEq)]
pub struct ItemDrag {
    /// The item under the pointer at press time.
    pub pressed: ItemId,
    pub kind: DragKind,
    /// Press position in container space.
    pub start: ContainerPoint,
    /// Pointer travel since the press, in container (screen) pixels.
    pub delta: Vec2,
    /// Canvas positions of the moving items at press time.
    pub origins: Vec<(ItemId, CanvasPoint)>,
    /// Whether the pointer travelled past the activation distance.
    pub activated: bool,
    /// Shift state at press time, used when the press resolves to a click.
    pub shift: bool,
    /// Whether the canvas attached its own pointer listeners for this drag.
    pub owns_listeners: bool,
}

impl ItemDrag {
    /// Start a drag on `pressed`. Returns `None` if the item does not exist.
    ///
    /// Pressing a member of a multi-item selection drags the whole selection.
    /// Anything else drags only the pressed item and leaves the selection alone.
    pub fn begin(
        pressed: &ItemId,
        start: ContainerPoint,
        selection: &SelectionSet,
        store: &ItemStore,
        shift: bool,
    ) -> Option<Self> {
        let pressed_item = store.get(pressed)?;
        let group = selection.contains(pressed) && selection.len() > 1;

        let origins = if group {
            selection
                .iter()
                .filter_map(|id| store.get(id).map(|item| (id.clone(), item.position)))
                .collect()
        } else {
            vec![(pressed.clone(), pressed_item.position)]
        };

        Some(Self {
            pressed: pressed.clone(),
            kind: if group { DragKind::Group } else { DragKind::Single },
            start,
            delta: Vec2::ZERO,
            origins,
            activated: false,
            shift,
            owns_listeners: false,
        })
    }

    /// Track the pointer. Returns true on the move that activates the drag.
    pub fn update(&mut self, current: ContainerPoint, activation_distance: f64) -> bool {
        self.delta = current.delta_from(self.start);
        if !self.activated && self.delta.hypot() >= activation_distance {
            self.activated = true;
            return true;
        }
        false
    }

    /// Pointer travel converted to canvas units.
    pub fn canvas_delta(&self, scale: f64) -> Vec2 {
        self.delta / scale
    }

    pub fn moves(&self, id: &ItemId) -> bool {
        self.origins.iter().any(|(moving, _)| moving == id)
    }

    /// Where a moving item should be drawn right now.
    pub fn preview_position(&self, id: &ItemId, scale: f64) -> Option<CanvasPoint> {
        self.origins
            .iter()
            .find(|(moving, _)| moving == id)
            .map(|(_, origin)| origin.offset(self.canvas_delta(scale)))
    }

    /// Apply the drag to the store. Items deleted mid-drag are skipped.
    /// Returns the number of items moved.
    pub fn commit(&self, store: &mut ItemStore, scale: f64) -> usize {
        let delta = self.canvas_delta(scale);
        let mut moved = 0;
        for (id, origin) in &self.origins {
            if store.set_position(id, origin.offset(delta)) {
                moved += 1;
            } else {
                log::debug!("Dropped item {id} no longer exists, skipping");
            }
        }
        moved
    }
}

/// The gesture currently in progress.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum InteractionState {
    #[default]
    Idle,
    Panning(InteractionSnapshot),
    MarqueeSelecting {
        snapshot: InteractionSnapshot,
        marquee: MarqueeRect,
    },
    Dragging(ItemDrag),
}

impl InteractionState {
    pub fn is_idle(&self) -> bool {
        matches!(self, InteractionState::Idle)
    }

    pub fn name(&self) -> &'static str {
        match self {
            InteractionState::Idle => "idle",
            InteractionState::Panning(_) => "panning",
            InteractionState::MarqueeSelecting { .. } => "marquee",
            InteractionState::Dragging(drag) => match drag.kind {
                DragKind::Single => "drag-single",
                DragKind::Group => "drag-group",
            },
        }
    }

    /// The visible marquee rectangle in container space.
    pub fn marquee_rect(&self) -> Option<Rect> {
        match self {
            InteractionState::MarqueeSelecting { marquee, .. } => Some(marquee.to_rect()),
            _ => None,
        }
    }

    pub fn item_drag(&self) -> Option<&ItemDrag> {
        match self {
            InteractionState::Dragging(drag) => Some(drag),
            _ => None,
        }
    }
}

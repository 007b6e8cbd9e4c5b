//! Pointer and keyboard input for the canvas.
//!
//! Hosts translate their native events into [`PointerEvent`] and [`KeyEvent`]
//! and provide an [`InputSurface`] for the side effects a gesture needs:
//! document-level move/up listeners and a cursor override.

use crate::coords::ScreenPoint;
use kurbo::Vec2;
use serde::{Deserialize, Serialize};

use std::time::Duration;

// Use web_time for WASM compatibility
#[cfg(target_arch = "wasm32")]
use web_time::Instant;
#[cfg(not(target_arch = "wasm32"))]
use std::time::Instant;

/// Mouse button identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

/// Modifier keys state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Self = Self {
        shift: false,
        ctrl: false,
        alt: false,
        meta: false,
    };

    pub const SHIFT: Self = Self {
        shift: true,
        ctrl: false,
        alt: false,
        meta: false,
    };
}

/// Pointer event type for unified mouse/touch handling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PointerEvent {
    Down {
        position: ScreenPoint,
        button: MouseButton,
        modifiers: Modifiers,
    },
    Up {
        position: ScreenPoint,
        button: MouseButton,
    },
    Move {
        position: ScreenPoint,
    },
    Wheel {
        position: ScreenPoint,
        delta: Vec2,
    },
}

/// Keys the canvas reacts to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Key {
    Space,
    Escape,
    Other(String),
}

/// Keyboard event type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyEvent {
    Pressed(Key),
    Released(Key),
}

/// Document-level key tracking for the pan modifier.
///
/// While a text input has focus, key events are ignored and space never
/// counts as held.
#[derive(Debug, Clone, Default)]
pub struct KeyTracker {
    space_held: bool,
    text_focus: bool,
}

impl KeyTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process a key event. Returns true if the event was consumed by the tracker.
    pub fn handle_key_event(&mut self, event: &KeyEvent) -> bool {
        if self.text_focus {
            return false;
        }
        match event {
            KeyEvent::Pressed(Key::Space) => {
                self.space_held = true;
                true
            }
            KeyEvent::Released(Key::Space) => {
                self.space_held = false;
                true
            }
            _ => false,
        }
    }

    /// Whether space is held and counts toward pan eligibility.
    pub fn space_held(&self) -> bool {
        self.space_held && !self.text_focus
    }

    /// Mark whether focus is inside a text input.
    pub fn set_text_focus(&mut self, focused: bool) {
        self.text_focus = focused;
        if focused {
            self.space_held = false;
        }
    }

    pub fn has_text_focus(&self) -> bool {
        self.text_focus
    }
}

/// Double-click detection from successive presses.
#[derive(Debug, Clone)]
pub struct ClickTracker {
    interval: Duration,
    max_distance: f64,
    last_click_time: Option<Instant>,
    last_click_position: Option<ScreenPoint>,
}

impl ClickTracker {
    pub fn new(interval: Duration, max_distance: f64) -> Self {
        Self {
            interval,
            max_distance,
            last_click_time: None,
            last_click_position: None,
        }
    }

    /// Register a press. Returns true if it completes a double-click.
    pub fn register_press(&mut self, position: ScreenPoint) -> bool {
        self.register_press_at(position, Instant::now())
    }

    pub fn register_press_at(&mut self, position: ScreenPoint, now: Instant) -> bool {
        if let (Some(last_time), Some(last_pos)) = (self.last_click_time, self.last_click_position) {
            let elapsed = now.saturating_duration_since(last_time);
            let distance = position.delta_from(last_pos).hypot();
            if elapsed < self.interval && distance < self.max_distance {
                // Reset so a triple press does not count twice
                self.reset();
                return true;
            }
        }
        self.last_click_time = Some(now);
        self.last_click_position = Some(position);
        false
    }

    pub fn reset(&mut self) {
        self.last_click_time = None;
        self.last_click_position = None;
    }
}

/// Cursor overrides applied during a gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CursorIcon {
    Grabbing,
    Crosshair,
    Move,
}

/// Host-side effects of a gesture.
///
/// Implementations attach document-level pointer move/up listeners on
/// [`attach_pointer_listeners`](InputSurface::attach_pointer_listeners) and remove
/// them on [`detach_pointer_listeners`](InputSurface::detach_pointer_listeners).
pub trait InputSurface {
    fn attach_pointer_listeners(&mut self);

    fn detach_pointer_listeners(&mut self);

    /// Set or clear (`None`) the cursor override.
    fn set_cursor(&mut self, cursor: Option<CursorIcon>);

    /// Number of listener sets currently attached.
    fn active_listeners(&self) -> usize;
}

/// Surface for headless hosts and tests: counts listeners and records the cursor.
#[derive(Debug, Clone, Default)]
pub struct HeadlessSurface {
    attached: usize,
    total_attached: usize,
    cursor: Option<CursorIcon>,
}

impl HeadlessSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of attach calls over the surface's lifetime.
    pub fn total_attached(&self) -> usize {
        self.total_attached
    }

    pub fn cursor(&self) -> Option<CursorIcon> {
        self.cursor
    }
}

impl InputSurface for HeadlessSurface {
    fn attach_pointer_listeners(&mut self) {
        self.attached += 1;
        self.total_attached += 1;
    }

    fn detach_pointer_listeners(&mut self) {
        if self.attached == 0 {
            log::warn!("Detaching pointer listeners that were never attached");
            return;
        }
        self.attached -= 1;
    }

    fn set_cursor(&mut self, cursor: Option<CursorIcon>) {
        self.cursor = cursor;
    }

    fn active_listeners(&self) -> usize {
        self.attached
    }
}

//! Coordinate spaces used by the canvas.
//!
//! Three spaces are kept apart by type so they cannot be mixed by accident:
//!
//! - [`ScreenPoint`]: pointer position as reported by the host (page/window pixels).
//! - [`ContainerPoint`]: position relative to the canvas container's top-left corner.
//! - [`CanvasPoint`]: canvas-local position, before the pan/zoom transform.
//!
//! [`ContainerRect`] converts between screen and container space. Only
//! [`Viewport`](crate::viewport::Viewport) converts between container and canvas space.

use kurbo::{Point, Rect, Size, Vec2};
use serde::{Deserialize, Serialize};

macro_rules! coordinate_space {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
        pub struct $name {
            pub x: f64,
            pub y: f64,
        }

        impl $name {
            pub const ORIGIN: Self = Self { x: 0.0, y: 0.0 };

            pub const fn new(x: f64, y: f64) -> Self {
                Self { x, y }
            }

            /// The raw kurbo point, for geometry helpers.
            pub fn to_point(self) -> Point {
                Point::new(self.x, self.y)
            }

            /// Vector from `origin` to this point.
            pub fn delta_from(self, origin: Self) -> Vec2 {
                Vec2::new(self.x - origin.x, self.y - origin.y)
            }

            /// Translate the point by a vector expressed in the same space.
            pub fn offset(self, delta: Vec2) -> Self {
                Self::new(self.x + delta.x, self.y + delta.y)
            }

            pub fn is_finite(self) -> bool {
                self.x.is_finite() && self.y.is_finite()
            }
        }

        impl From<Point> for $name {
            fn from(point: Point) -> Self {
                Self::new(point.x, point.y)
            }
        }
    };
}

coordinate_space!(
    /// Pointer position in host (page/window) pixels.
    ScreenPoint
);
coordinate_space!(
    /// Position relative to the canvas container element, after pan and zoom.
    ContainerPoint
);
coordinate_space!(
    /// Position in the unscaled, unpanned canvas workspace.
    CanvasPoint
);

/// The on-screen rectangle occupied by the canvas container.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ContainerRect {
    /// Top-left corner of the container in screen space.
    pub origin: ScreenPoint,
    /// Container size in screen pixels.
    pub size: Size,
}

impl Default for ContainerRect {
    fn default() -> Self {
        Self {
            origin: ScreenPoint::ORIGIN,
            size: Size::new(1280.0, 800.0),
        }
    }
}

impl ContainerRect {
    pub fn new(origin: ScreenPoint, size: Size) -> Self {
        Self { origin, size }
    }

    pub fn to_container(&self, point: ScreenPoint) -> ContainerPoint {
        ContainerPoint::new(point.x - self.origin.x, point.y - self.origin.y)
    }

    pub fn to_screen(&self, point: ContainerPoint) -> ScreenPoint {
        ScreenPoint::new(point.x + self.origin.x, point.y + self.origin.y)
    }

    /// Whether a screen point lies inside the container.
    pub fn contains(&self, point: ScreenPoint) -> bool {
        let local = self.to_container(point);
        local.x >= 0.0 && local.y >= 0.0 && local.x <= self.size.width && local.y <= self.size.height
    }

    /// Center of the container in container space.
    pub fn center(&self) -> ContainerPoint {
        ContainerPoint::new(self.size.width / 2.0, self.size.height / 2.0)
    }

    /// The container bounds in container space (origin at zero).
    pub fn local_bounds(&self) -> Rect {
        Rect::from_origin_size(Point::ZERO, self.size)
    }
}

//! Viewport module for pan/zoom transforms.

use crate::config::ZoomSettings;
use crate::coords::{CanvasPoint, ContainerPoint};
use kurbo::{Affine, Rect, Size, Vec2};
use serde::{Deserialize, Serialize};

/// Viewport holds the view transform for the canvas.
///
/// `(x, y)` is the pan offset in container pixels and `scale` the zoom factor.
/// A canvas point `p` is drawn at `p * scale + (x, y)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    /// Horizontal pan offset.
    pub x: f64,
    /// Vertical pan offset.
    pub y: f64,
    /// Zoom factor, kept within the configured limits.
    pub scale: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            scale: 1.0,
        }
    }
}

impl Viewport {
    /// Create a viewport at the origin with scale 1.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current pan offset as a vector.
    pub fn offset(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    /// Affine transform from canvas space to container space.
    pub fn transform(&self) -> Affine {
        Affine::translate(self.offset()) * Affine::scale(self.scale)
    }

    /// Convert a canvas point to container coordinates.
    pub fn canvas_to_container(&self, point: CanvasPoint) -> ContainerPoint {
        ContainerPoint::new(point.x * self.scale + self.x, point.y * self.scale + self.y)
    }

    /// Convert a container point to canvas coordinates.
    pub fn container_to_canvas(&self, point: ContainerPoint) -> CanvasPoint {
        CanvasPoint::new((point.x - self.x) / self.scale, (point.y - self.y) / self.scale)
    }

    /// Project a canvas-space rectangle into container space.
    pub fn canvas_rect_to_container(&self, rect: Rect) -> Rect {
        let p0 = self.canvas_to_container(CanvasPoint::new(rect.x0, rect.y0));
        let p1 = self.canvas_to_container(CanvasPoint::new(rect.x1, rect.y1));
        Rect::new(p0.x, p0.y, p1.x, p1.y)
    }

    /// Convert a container-space vector (e.g. a drag delta) to canvas units.
    pub fn container_delta_to_canvas(&self, delta: Vec2) -> Vec2 {
        delta / self.scale
    }

    /// Pan the viewport by a delta in container pixels.
    pub fn pan(&mut self, delta: Vec2) {
        self.x += delta.x;
        self.y += delta.y;
    }

    /// Zoom by a wheel delta. Positive deltas zoom out.
    ///
    /// The new scale is `scale - delta * sensitivity`, clamped to the limits.
    /// Unless `anchor_to_cursor` is set, the anchor is ignored and zoom scales
    /// from the transform origin.
    pub fn zoom_by(&mut self, wheel_delta: f64, anchor: Option<ContainerPoint>, settings: &ZoomSettings) {
        if !wheel_delta.is_finite() {
            return;
        }
        let new_scale = settings.clamp(self.scale - wheel_delta * settings.sensitivity);
        if (new_scale - self.scale).abs() < f64::EPSILON {
            return;
        }

        match anchor.filter(|_| settings.anchor_to_cursor) {
            Some(anchor) => {
                let fixed = self.container_to_canvas(anchor);
                self.scale = new_scale;
                self.x = anchor.x - fixed.x * new_scale;
                self.y = anchor.y - fixed.y * new_scale;
            }
            None => self.scale = new_scale,
        }
    }

    /// Set the scale directly, clamped to the limits.
    pub fn set_scale(&mut self, scale: f64, settings: &ZoomSettings) {
        if scale.is_finite() {
            self.scale = settings.clamp(scale);
        }
    }

    /// Reset zoom to 1 and place `canvas_center` at the middle of the container.
    pub fn center_on(&mut self, canvas_center: CanvasPoint, container_size: Size) {
        self.scale = 1.0;
        self.x = container_size.width / 2.0 - canvas_center.x;
        self.y = container_size.height / 2.0 - canvas_center.y;
    }

    /// Reset to the origin with scale 1.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_viewport() {
        let viewport = Viewport::new();
        assert_eq!(viewport.offset(), Vec2::ZERO);
        assert!((viewport.scale - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_container_to_canvas_with_offset_and_scale() {
        let viewport = Viewport {
            x: 50.0,
            y: 50.0,
            scale: 1.5,
        };
        let canvas = viewport.container_to_canvas(ContainerPoint::new(300.0, 200.0));
        assert!((canvas.x - 250.0 / 1.5).abs() < 1e-9);
        assert!((canvas.y - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_roundtrip_conversion() {
        let viewports = [
            Viewport::default(),
            Viewport { x: 30.0, y: -20.0, scale: 1.5 },
            Viewport { x: -1234.5, y: 987.25, scale: 0.1 },
            Viewport { x: 0.001, y: 1e5, scale: 5.0 },
            Viewport { x: 17.0, y: 3.0, scale: 0.37 },
        ];
        let points = [
            CanvasPoint::new(0.0, 0.0),
            CanvasPoint::new(123.0, 456.0),
            CanvasPoint::new(-9999.5, 42.125),
            CanvasPoint::new(1e6, -1e6),
        ];

        for viewport in &viewports {
            for &original in &points {
                let back = viewport.container_to_canvas(viewport.canvas_to_container(original));
                let tolerance = 1e-6 * original.x.abs().max(original.y.abs()).max(1.0);
                assert!((back.x - original.x).abs() < tolerance, "{viewport:?} {original:?}");
                assert!((back.y - original.y).abs() < tolerance, "{viewport:?} {original:?}");
            }
        }
    }

    #[test]
    fn test_transform_matches_conversion() {
        let viewport = Viewport { x: 12.0, y: 7.0, scale: 2.5 };
        let p = CanvasPoint::new(10.0, -4.0);
        let via_affine = viewport.transform() * p.to_point();
        let direct = viewport.canvas_to_container(p);
        assert!((via_affine.x - direct.x).abs() < 1e-9);
        assert!((via_affine.y - direct.y).abs() < 1e-9);
    }

    #[test]
    fn test_zoom_clamp() {
        let settings = ZoomSettings::default();
        let mut viewport = Viewport::new();

        viewport.zoom_by(1e9, None, &settings);
        assert!((viewport.scale - settings.min_scale).abs() < f64::EPSILON);

        viewport.zoom_by(-1e9, None, &settings);
        assert!((viewport.scale - settings.max_scale).abs() < f64::EPSILON);
    }

    #[test]
    fn test_zoom_sequence_stays_in_range() {
        let settings = ZoomSettings::default();
        let mut viewport = Viewport::new();
        let deltas = [120.0, -480.0, 3000.0, -9000.0, 53.0, -1.0, 100_000.0, -7.5, f64::NAN, -250.0];
        for &delta in deltas.iter().cycle().take(200) {
            viewport.zoom_by(delta, None, &settings);
            assert!(viewport.scale >= 0.1 && viewport.scale <= 5.0, "scale {}", viewport.scale);
        }
    }

    #[test]
    fn test_zoom_ignores_anchor_by_default() {
        let settings = ZoomSettings::default();
        let mut viewport = Viewport { x: 10.0, y: 20.0, scale: 1.0 };
        viewport.zoom_by(-500.0, Some(ContainerPoint::new(400.0, 300.0)), &settings);
        assert!((viewport.scale - 1.5).abs() < 1e-9);
        assert!((viewport.x - 10.0).abs() < f64::EPSILON);
        assert!((viewport.y - 20.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_zoom_anchored_keeps_point_fixed() {
        let settings = ZoomSettings {
            anchor_to_cursor: true,
            ..ZoomSettings::default()
        };
        let mut viewport = Viewport { x: 10.0, y: 20.0, scale: 1.0 };
        let anchor = ContainerPoint::new(400.0, 300.0);
        let before = viewport.container_to_canvas(anchor);
        viewport.zoom_by(-500.0, Some(anchor), &settings);
        let after = viewport.container_to_canvas(anchor);
        assert!((before.x - after.x).abs() < 1e-9);
        assert!((before.y - after.y).abs() < 1e-9);
    }

    #[test]
    fn test_pan() {
        let mut viewport = Viewport::new();
        viewport.pan(Vec2::new(10.0, 20.0));
        viewport.pan(Vec2::new(-4.0, 1.0));
        assert!((viewport.x - 6.0).abs() < f64::EPSILON);
        assert!((viewport.y - 21.0).abs() < f64::EPSILON);
        assert!((viewport.scale - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_center_on() {
        let mut viewport = Viewport { x: -300.0, y: 80.0, scale: 3.2 };
        viewport.center_on(CanvasPoint::new(228.0, 172.0), Size::new(1000.0, 600.0));
        assert!((viewport.scale - 1.0).abs() < f64::EPSILON);
        let on_screen = viewport.canvas_to_container(CanvasPoint::new(228.0, 172.0));
        assert!((on_screen.x - 500.0).abs() < 1e-9);
        assert!((on_screen.y - 300.0).abs() < 1e-9);
    }
}

//! Board thumbnail capture.
//!
//! The visible canvas region is rasterised with tiny-skia: every item is
//! drawn as its footprint at its on-screen position, scaled down to the
//! configured thumbnail size, and the pixmap is encoded as PNG. Host chrome
//! drawn over the canvas is passed in as [`Overlay`]s and left out by the
//! [`exclude_chrome`] filter.

use crate::canvas::Canvas;
use crate::items::{ItemContent, ItemId};
use crate::storage::{BlobStorage, StorageError};
use kurbo::Rect;
use thiserror::Error;
use tiny_skia::{Color, Paint, Pixmap, Rect as SkRect, Transform};

/// RGBA color.
pub type Rgba = [u8; 4];

const BACKGROUND: Rgba = [250, 250, 250, 255];
const NOTE_COLOR: Rgba = [255, 235, 59, 255];
const VIDEO_COLOR: Rgba = [38, 50, 56, 255];
const IMAGE_COLOR: Rgba = [96, 125, 139, 255];
const MARQUEE_COLOR: Rgba = [33, 150, 243, 64];
const CHROME_COLOR: Rgba = [66, 66, 66, 255];

/// Errors raised while capturing a thumbnail.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("capture region is empty")]
    EmptyRegion,
    #[error("PNG encoding failed: {0}")]
    Encode(#[from] png::EncodingError),
    #[error("thumbnail upload failed: {0}")]
    Upload(#[from] StorageError),
}

/// What a drawn rectangle belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SceneLayer {
    Item(ItemId),
    Marquee,
    Toolbar,
    ContextMenu,
    LibraryPanel,
}

impl SceneLayer {
    /// Host UI drawn over the canvas rather than canvas content.
    pub fn is_chrome(&self) -> bool {
        matches!(self, SceneLayer::Toolbar | SceneLayer::ContextMenu | SceneLayer::LibraryPanel)
    }
}

/// A host chrome element covering part of the canvas, in container space.
#[derive(Debug, Clone, PartialEq)]
pub struct Overlay {
    pub layer: SceneLayer,
    pub rect: Rect,
}

/// One rectangle of the rendered scene, in container space.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneNode {
    pub layer: SceneLayer,
    pub rect: Rect,
    pub color: Rgba,
}

/// Filter that keeps canvas content and drops chrome.
pub fn exclude_chrome(node: &SceneNode) -> bool {
    !node.layer.is_chrome()
}

/// Parse a `#rrggbb` color.
fn parse_hex_color(s: &str) -> Option<Rgba> {
    let hex = s.trim().strip_prefix('#')?;
    if hex.len() != 6 {
        return None;
    }
    let r = u8::from_str_radix(hex.get(0..2)?, 16).ok()?;
    let g = u8::from_str_radix(hex.get(2..4)?, 16).ok()?;
    let b = u8::from_str_radix(hex.get(4..6)?, 16).ok()?;
    Some([r, g, b, 255])
}

fn item_color(content: &ItemContent) -> Rgba {
    match content {
        ItemContent::Note { color, .. } => color.as_deref().and_then(parse_hex_color).unwrap_or(NOTE_COLOR),
        ItemContent::Video(_) => VIDEO_COLOR,
        ItemContent::Image(_) => IMAGE_COLOR,
    }
}

/// Everything drawn over the container, back to front: items, the marquee, then overlays.
pub fn scene_nodes(canvas: &Canvas, overlays: &[Overlay]) -> Vec<SceneNode> {
    let mut nodes: Vec<SceneNode> = canvas
        .items()
        .iter()
        .filter_map(|item| {
            let position = canvas.display_position(&item.id)?;
            let bounds = Rect::from_origin_size(position.to_point(), item.kind().footprint());
            Some(SceneNode {
                layer: SceneLayer::Item(item.id.clone()),
                rect: canvas.viewport.canvas_rect_to_container(bounds),
                color: item_color(&item.content),
            })
        })
        .collect();

    if let Some(rect) = canvas.marquee_rect() {
        nodes.push(SceneNode {
            layer: SceneLayer::Marquee,
            rect,
            color: MARQUEE_COLOR,
        });
    }

    nodes.extend(overlays.iter().map(|overlay| SceneNode {
        layer: overlay.layer.clone(),
        rect: overlay.rect,
        color: CHROME_COLOR,
    }));
    nodes
}

fn sk_color(color: Rgba) -> Color {
    Color::from_rgba8(color[0], color[1], color[2], color[3])
}

/// Rasterise the visible canvas region, drawing only the nodes `filter` keeps.
///
/// The image is scaled so that its longer edge is at most the configured
/// thumbnail size.
pub fn render_canvas(
    canvas: &Canvas,
    overlays: &[Overlay],
    filter: impl Fn(&SceneNode) -> bool,
) -> Result<Pixmap, SnapshotError> {
    let size = canvas.container().size;
    if !(size.width >= 1.0 && size.height >= 1.0 && size.width.is_finite() && size.height.is_finite()) {
        return Err(SnapshotError::EmptyRegion);
    }

    let max_edge = canvas.config().thumbnail_max_edge.max(1) as f64;
    let factor = (max_edge / size.width.max(size.height)).min(1.0);
    let width = (size.width * factor).round().max(1.0) as u32;
    let height = (size.height * factor).round().max(1.0) as u32;

    let mut pixmap = Pixmap::new(width, height).ok_or(SnapshotError::EmptyRegion)?;
    pixmap.fill(sk_color(BACKGROUND));

    // Container space -> thumbnail pixels
    let transform = Transform::from_scale(factor as f32, factor as f32);
    let mut paint = Paint::default();
    for node in scene_nodes(canvas, overlays).iter().filter(|node| filter(node)) {
        let r = node.rect;
        let Some(rect) = SkRect::from_ltrb(r.x0 as f32, r.y0 as f32, r.x1 as f32, r.y1 as f32) else {
            log::debug!("Skipping degenerate scene node {:?}", node.layer);
            continue;
        };
        paint.set_color(sk_color(node.color));
        pixmap.fill_rect(rect, &paint, transform, None);
    }
    Ok(pixmap)
}

/// Render the canvas without chrome, upload it as PNG and return its URL.
pub async fn capture_thumbnail<B: BlobStorage + ?Sized>(
    canvas: &Canvas,
    overlays: &[Overlay],
    blobs: &B,
    owner_id: &str,
) -> Result<String, SnapshotError> {
    let pixmap = render_canvas(canvas, overlays, exclude_chrome)?;
    let png_data = pixmap.encode_png()?;
    let url = blobs.upload(owner_id, &png_data, "image/png").await?;
    log::info!("Captured {}x{} thumbnail: {} bytes", pixmap.width(), pixmap.height(), png_data.len());
    Ok(url)
}

//! Persisted layout records.
//!
//! A board's items are saved as an array of flat JSON records. Media payloads
//! are cloned through a JSON round-trip before writing so that the record only
//! carries what survives serialization; anything that would be lost (non-finite
//! numbers serialize as `null`) is reported as a [`LayoutError`] instead.

use crate::coords::CanvasPoint;
use crate::items::{CanvasItem, ItemContent, ItemId, ItemKind, ItemStore, MediaRef, NOTE_SIZE};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while converting an item to its persisted record.
#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("item {item_id}: field `{field}` is not a finite number")]
    NonFiniteValue { item_id: String, field: &'static str },

    #[error("item {item_id}: payload does not round-trip through JSON: {source}")]
    Json {
        item_id: String,
        #[source]
        source: serde_json::Error,
    },
}

impl LayoutError {
    /// Id of the item that failed to serialize.
    pub fn item_id(&self) -> &str {
        match self {
            LayoutError::NonFiniteValue { item_id, .. } | LayoutError::Json { item_id, .. } => item_id,
        }
    }
}

/// One saved item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutRecord {
    pub id: String,
    /// `"video"`, `"image"` or `"note"`. Unknown values are skipped on load;
    /// records written without a type are inferred from their payload.
    #[serde(rename = "type", default)]
    pub kind: String,
    pub x: f64,
    pub y: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default)]
    pub video_id: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_data: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

fn finite(item_id: &ItemId, field: &'static str, value: f64) -> Result<f64, LayoutError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(LayoutError::NonFiniteValue {
            item_id: item_id.to_string(),
            field,
        })
    }
}

/// Deep-clone a media payload through JSON text.
fn clone_and_strip(item_id: &ItemId, media: &MediaRef) -> Result<serde_json::Value, LayoutError> {
    if let Some(duration) = media.duration_secs {
        finite(item_id, "videoData.durationSecs", duration)?;
    }
    let json_err = |source| LayoutError::Json {
        item_id: item_id.to_string(),
        source,
    };
    let text = serde_json::to_string(media).map_err(json_err)?;
    serde_json::from_str(&text).map_err(json_err)
}

impl LayoutRecord {
    /// Convert a live item into its persisted form.
    pub fn from_item(item: &CanvasItem) -> Result<Self, LayoutError> {
        let x = finite(&item.id, "x", item.position.x)?;
        let y = finite(&item.id, "y", item.position.y)?;

        let record = match &item.content {
            ItemContent::Note { text, color } => Self {
                id: item.id.to_string(),
                kind: ItemKind::Note.as_str().to_string(),
                x,
                y,
                text: Some(text.clone()),
                video_id: None,
                image_url: None,
                video_data: None,
                width: Some(NOTE_SIZE.width),
                height: Some(NOTE_SIZE.height),
                color: color.clone(),
            },
            ItemContent::Video(media) | ItemContent::Image(media) => {
                let kind = item.kind();
                Self {
                    id: item.id.to_string(),
                    kind: kind.as_str().to_string(),
                    x,
                    y,
                    text: None,
                    video_id: if kind == ItemKind::Video { media.id.clone() } else { None },
                    image_url: media.image_url.clone(),
                    video_data: Some(clone_and_strip(&item.id, media)?),
                    width: None,
                    height: None,
                    color: None,
                }
            }
        };
        Ok(record)
    }

    /// Rebuild a live item. Returns `None` for unknown record types.
    pub fn to_item(&self) -> Option<CanvasItem> {
        let content = match self.kind.as_str() {
            "note" => ItemContent::Note {
                text: self.text.clone().unwrap_or_default(),
                color: self.color.clone(),
            },
            "video" => ItemContent::Video(self.media()),
            "image" => ItemContent::Image(self.media()),
            "" => {
                let media = self.media();
                if media.video_url.is_some() || self.video_id.is_some() {
                    ItemContent::Video(media)
                } else if media.image_url.is_some() {
                    ItemContent::Image(media)
                } else {
                    log::warn!("Skipping untyped item {} without media", self.id);
                    return None;
                }
            }
            other => {
                log::warn!("Skipping item {} with unknown type {other:?}", self.id);
                return None;
            }
        };
        Some(CanvasItem {
            id: ItemId::new(self.id.clone()),
            position: CanvasPoint::new(self.x, self.y),
            content,
        })
    }

    fn media(&self) -> MediaRef {
        let mut media = match self.video_data.clone().map(serde_json::from_value::<MediaRef>) {
            Some(Ok(media)) => media,
            Some(Err(e)) => {
                log::warn!("Item {} has an unreadable media payload: {e}", self.id);
                MediaRef::default()
            }
            None => MediaRef::default(),
        };
        if media.id.is_none() {
            media.id = self.video_id.clone();
        }
        if media.image_url.is_none() {
            media.image_url = self.image_url.clone();
        }
        media
    }
}

/// Serialize every item in store order.
///
/// Items that fail are left out of the returned records and reported in the
/// second vector; each failure is logged with the item id.
pub fn serialize_items(store: &ItemStore) -> (Vec<LayoutRecord>, Vec<LayoutError>) {
    let mut records = Vec::with_capacity(store.len());
    let mut failures = Vec::new();
    for item in store.iter() {
        match LayoutRecord::from_item(item) {
            Ok(record) => records.push(record),
            Err(e) => {
                log::warn!("Not saving item {}: {e}", e.item_id());
                failures.push(e);
            }
        }
    }
    (records, failures)
}

/// Rebuild items from saved records, skipping unknown types.
pub fn hydrate_records(records: &[LayoutRecord]) -> Vec<CanvasItem> {
    records.iter().filter_map(LayoutRecord::to_item).collect()
}

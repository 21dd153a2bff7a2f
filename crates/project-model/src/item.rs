//! Render items: one image held on screen with an optional caption.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// A decoded RGBA bitmap.
///
/// Items hold bitmaps behind an `Arc` so the host application, the
/// sequence, and the render loop all share one copy of the pixels.
pub type Bitmap = Arc<image::RgbaImage>;

/// Opaque identifier of a render item, unique within a sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(uuid::Uuid);

impl ItemId {
    /// Generate a fresh random identifier.
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    /// Wrap an identifier supplied by the host (e.g. a UI row key).
    pub fn from_uuid(id: uuid::Uuid) -> Self {
        Self(id)
    }

    pub fn as_uuid(&self) -> &uuid::Uuid {
        &self.0
    }
}

impl Default for ItemId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// One slide: an image, a transition hold pad, and a caption.
#[derive(Debug, Clone)]
pub struct RenderItem {
    id: ItemId,
    image: Bitmap,
    transition_pad_secs: f64,
    caption: String,
}

impl RenderItem {
    /// Create an item with a fresh id.
    ///
    /// Negative or non-finite pads are clamped to zero.
    pub fn new(image: Bitmap, transition_pad_secs: f64, caption: impl Into<String>) -> Self {
        Self::with_id(ItemId::new(), image, transition_pad_secs, caption)
    }

    /// Create an item with a caller-chosen id.
    pub fn with_id(
        id: ItemId,
        image: Bitmap,
        transition_pad_secs: f64,
        caption: impl Into<String>,
    ) -> Self {
        Self {
            id,
            image,
            transition_pad_secs: clamp_pad(transition_pad_secs),
            caption: caption.into(),
        }
    }

    pub fn id(&self) -> ItemId {
        self.id
    }

    pub fn image(&self) -> &Bitmap {
        &self.image
    }

    /// Extra hold time in seconds, always `>= 0`.
    pub fn transition_pad_secs(&self) -> f64 {
        self.transition_pad_secs
    }

    pub fn caption(&self) -> &str {
        &self.caption
    }

    /// Whether the caption has any non-whitespace content.
    pub fn has_caption(&self) -> bool {
        !self.caption.trim().is_empty()
    }

    /// Image dimensions as `(width, height)`.
    pub fn image_size(&self) -> (u32, u32) {
        self.image.dimensions()
    }
}

fn clamp_pad(secs: f64) -> f64 {
    if secs.is_finite() {
        secs.max(0.0)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bitmap(w: u32, h: u32) -> Bitmap {
        Arc::new(image::RgbaImage::new(w, h))
    }

    #[test]
    fn test_negative_pad_is_clamped() {
        let item = RenderItem::new(bitmap(4, 4), -2.5, "caption");
        assert_eq!(item.transition_pad_secs(), 0.0);
    }

    #[test]
    fn test_non_finite_pad_is_clamped() {
        assert_eq!(RenderItem::new(bitmap(1, 1), f64::NAN, "").transition_pad_secs(), 0.0);
        assert_eq!(
            RenderItem::new(bitmap(1, 1), f64::INFINITY, "").transition_pad_secs(),
            0.0
        );
    }

    #[test]
    fn test_has_caption_ignores_whitespace() {
        assert!(!RenderItem::new(bitmap(1, 1), 0.0, "  \t\n").has_caption());
        assert!(RenderItem::new(bitmap(1, 1), 0.0, " hello ").has_caption());
    }

    #[test]
    fn test_clone_shares_bitmap() {
        let item = RenderItem::new(bitmap(8, 2), 1.0, "");
        let copy = item.clone();
        assert!(Arc::ptr_eq(item.image(), copy.image()));
        assert_eq!(copy.image_size(), (8, 2));
    }

    #[test]
    fn test_ids_are_unique() {
        assert_ne!(ItemId::new(), ItemId::new());
    }
}

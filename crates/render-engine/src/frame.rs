//! Frame renderer: letterboxes one image into the frame target.
//!
//! Every call repaints the whole target from the source image. Nothing is
//! cached between calls, so whatever the recorder samples is always a
//! complete frame.

use image::imageops::{self, FilterType};
use image::RgbaImage;
use slidecast_project_model::frame::{FrameTarget, BACKGROUND};

/// Uniform fit of an image inside a target, centered.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    /// `min(target_w / image_w, target_h / image_h)`.
    pub scale: f64,
    /// Scaled image width.
    pub scaled_width: f64,
    /// Scaled image height.
    pub scaled_height: f64,
    /// Left offset of the scaled image.
    pub x: f64,
    /// Top offset of the scaled image.
    pub y: f64,
}

/// Integer pixel rectangle inside the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Placement {
    /// Fit an `image_w x image_h` image into `target_w x target_h`.
    ///
    /// Returns `None` when either side has a zero dimension.
    pub fn fit(image_w: u32, image_h: u32, target_w: u32, target_h: u32) -> Option<Self> {
        if image_w == 0 || image_h == 0 || target_w == 0 || target_h == 0 {
            return None;
        }

        let (iw, ih) = (f64::from(image_w), f64::from(image_h));
        let (tw, th) = (f64::from(target_w), f64::from(target_h));
        let scale = (tw / iw).min(th / ih);
        let scaled_width = iw * scale;
        let scaled_height = ih * scale;

        Some(Self {
            scale,
            scaled_width,
            scaled_height,
            x: (tw - scaled_width) / 2.0,
            y: (th - scaled_height) / 2.0,
        })
    }

    /// Rounded rectangle, clamped to the target and at least one pixel.
    pub fn pixel_rect(&self, target_w: u32, target_h: u32) -> PixelRect {
        let width = (self.scaled_width.round() as u32).clamp(1, target_w.max(1));
        let height = (self.scaled_height.round() as u32).clamp(1, target_h.max(1));
        PixelRect {
            x: (target_w - width) / 2,
            y: (target_h - height) / 2,
            width,
            height,
        }
    }
}

/// Draws scaled, centered images onto a [`FrameTarget`].
#[derive(Debug, Clone)]
pub struct FrameRenderer {
    filter: FilterType,
}

impl FrameRenderer {
    pub fn new(filter: FilterType) -> Self {
        Self { filter }
    }

    /// Fill the target with black and draw `image` letterboxed into it.
    ///
    /// Returns the placement used, or `None` if the image is empty and
    /// the frame was left black.
    pub fn render(&self, image: &RgbaImage, target: &mut FrameTarget) -> Option<Placement> {
        target.fill(BACKGROUND);

        let (target_w, target_h) = target.dimensions();
        let placement = Placement::fit(image.width(), image.height(), target_w, target_h)?;
        let rect = placement.pixel_rect(target_w, target_h);

        if (rect.width, rect.height) == image.dimensions() {
            imageops::overlay(target.surface_mut(), image, i64::from(rect.x), i64::from(rect.y));
        } else {
            let scaled = imageops::resize(image, rect.width, rect.height, self.filter);
            imageops::overlay(target.surface_mut(), &scaled, i64::from(rect.x), i64::from(rect.y));
        }

        Some(placement)
    }
}

impl Default for FrameRenderer {
    fn default() -> Self {
        Self::new(FilterType::Triangle)
    }
}

//! The frame target: the surface every frame is drawn into before encoding.

use image::{Rgba, RgbaImage};

/// Opaque black, the letterbox color.
pub const BACKGROUND: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// Fixed-size RGBA rendering surface.
///
/// The renderer takes it by `&mut` and the recorder by `&`, so within one
/// render turn there is exactly one writer and the reader only sees
/// finished frames.
#[derive(Debug, Clone)]
pub struct FrameTarget {
    surface: RgbaImage,
}

impl FrameTarget {
    /// Create an opaque black surface of the given size.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            surface: RgbaImage::from_pixel(width, height, BACKGROUND),
        }
    }

    pub fn width(&self) -> u32 {
        self.surface.width()
    }

    pub fn height(&self) -> u32 {
        self.surface.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.surface.dimensions()
    }

    /// Raw RGBA bytes, row-major, `width * height * 4` long.
    pub fn as_bytes(&self) -> &[u8] {
        self.surface.as_raw()
    }

    pub fn surface(&self) -> &RgbaImage {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut RgbaImage {
        &mut self.surface
    }

    /// Paint every pixel with `color`.
    pub fn fill(&mut self, color: Rgba<u8>) {
        for pixel in self.surface.pixels_mut() {
            *pixel = color;
        }
    }
}

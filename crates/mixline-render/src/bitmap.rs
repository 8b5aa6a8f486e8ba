//! CPU-side RGBA bitmaps produced by the waveform renderer.

use mixline_core::Color;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_BITMAP_ID: AtomicU64 = AtomicU64::new(1);

/// Straight-alpha RGBA8 image, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct TileBitmap {
    id: u64,
    width: u32,
    height: u32,
    pixels: Vec<Color>,
}

impl TileBitmap {
    /// Create a fully transparent bitmap with a fresh id.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            id: NEXT_BITMAP_ID.fetch_add(1, Ordering::Relaxed),
            width,
            height,
            pixels: vec![Color::TRANSPARENT; width as usize * height as usize],
        }
    }

    /// Process-unique id, used by hosts to key uploaded textures.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[Color] {
        &self.pixels
    }

    /// Raw RGBA bytes for texture upload.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.pixels)
    }

    /// Memory footprint in bytes.
    pub fn memory_size(&self) -> usize {
        self.pixels.len() * std::mem::size_of::<Color>()
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Color> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels.get(self.index(x, y)).copied()
    }

    /// Source-over blend `color` onto one pixel. Out-of-bounds writes are
    /// dropped.
    #[inline]
    pub fn blend_pixel(&mut self, x: u32, y: u32, color: Color) {
        if x >= self.width || y >= self.height {
            return;
        }
        let i = self.index(x, y);
        let [r, g, b, a] = color.blend_over(self.pixels[i].to_array());
        self.pixels[i] = Color::new(r, g, b, a);
    }

    /// Blend a solid rectangle, clipped to the bitmap.
    pub fn fill_rect(&mut self, x: u32, y: u32, width: u32, height: u32, color: Color) {
        let x_end = x.saturating_add(width).min(self.width);
        let y_end = y.saturating_add(height).min(self.height);
        for py in y..y_end {
            for px in x..x_end {
                self.blend_pixel(px, py, color);
            }
        }
    }

    #[inline]
    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }
}

//! 8-bit RGBA colors used for waveform rendering.
//!
//! Colors are part of the tile cache key, so unlike float colors they must be
//! hashable and compare exactly.

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

/// Straight (non-premultiplied) 8-bit RGBA color.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Pod, Zeroable,
)]
#[repr(C)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    /// Create a new color from RGBA components.
    #[inline]
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Opaque color from RGB.
    #[inline]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const TRANSPARENT: Self = Self::new(0, 0, 0, 0);
    pub const WHITE: Self = Self::rgb(255, 255, 255);

    /// Default single-color waveform tint.
    pub const WAVEFORM: Self = Self::rgb(86, 130, 255);

    /// Bass-dominant bars in frequency-color mode.
    pub const BAND_LOW: Self = Self::rgb(255, 82, 82);
    /// Mid-dominant bars in frequency-color mode.
    pub const BAND_MID: Self = Self::rgb(255, 196, 64);
    /// Treble-dominant bars in frequency-color mode.
    pub const BAND_HIGH: Self = Self::rgb(64, 200, 255);

    /// Scale the alpha channel by `factor` (clamped to [0, 1]).
    #[inline]
    pub fn scale_alpha(self, factor: f32) -> Self {
        let a = (self.a as f32 * factor.clamp(0.0, 1.0)).round() as u8;
        Self { a, ..self }
    }

    /// Convert to an `[r, g, b, a]` array.
    #[inline]
    pub fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }

    /// Source-over blend of `self` on top of `dst`.
    pub fn blend_over(self, dst: [u8; 4]) -> [u8; 4] {
        let sa = self.a as f32 / 255.0;
        if sa <= 0.0 {
            return dst;
        }
        let da = dst[3] as f32 / 255.0;
        let out_a = sa + da * (1.0 - sa);
        if out_a <= 0.0 {
            return [0, 0, 0, 0];
        }
        let mix = |s: u8, d: u8| -> u8 {
            let v = (s as f32 * sa + d as f32 * da * (1.0 - sa)) / out_a;
            v.round().clamp(0.0, 255.0) as u8
        };
        [
            mix(self.r, dst[0]),
            mix(self.g, dst[1]),
            mix(self.b, dst[2]),
            (out_a * 255.0).round() as u8,
        ]
    }
}

//! Geometric primitives for canvas hit testing.

use glam::DVec2;
use serde::{Deserialize, Serialize};

/// 2D point/vector in canvas pixels.
pub type Vec2 = DVec2;

/// Axis-aligned rectangle in canvas pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    /// Create a new rectangle.
    #[inline]
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Rectangle centered horizontally on `center_x`.
    pub fn centered_x(center_x: f64, y: f64, width: f64, height: f64) -> Self {
        Self::new(center_x - width * 0.5, y, width, height)
    }

    #[inline]
    pub fn right(self) -> f64 {
        self.x + self.width
    }

    #[inline]
    pub fn bottom(self) -> f64 {
        self.y + self.height
    }

    /// Check whether a point lies inside (left/top inclusive, right/bottom exclusive).
    #[inline]
    pub fn contains(self, p: Vec2) -> bool {
        p.x >= self.x && p.x < self.right() && p.y >= self.y && p.y < self.bottom()
    }

    /// Check if two rectangles overlap.
    pub fn intersects(self, other: Self) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }

    /// Horizontal overlap with the span `[start, end)`, if any.
    pub fn clip_x(self, start: f64, end: f64) -> Option<Self> {
        let left = self.x.max(start);
        let right = self.right().min(end);
        if right <= left {
            return None;
        }
        Some(Self::new(left, self.y, right - left, self.height))
    }
}

//! Whole-timeline overview strip.
//!
//! Every track is drawn at reduced scale using the same max-pooling
//! downsampler as the main waveform. The current viewport is shown as a
//! rectangle, and clicks map back to a main-view scroll that centers the
//! clicked point.

use crate::bitmap::TileBitmap;
use mixline_core::peaks::slice_range;
use mixline_core::{downsample_max, Color, PeakSet, Rect, Track, TrackId};
use mixline_timeline::TrackLayout;

/// One track in minimap coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct MinimapTrack {
    pub track_id: TrackId,
    pub left: f64,
    pub width: f64,
    /// One peak per minimap pixel.
    pub peaks: Vec<f32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Minimap {
    width: f64,
    height: f64,
    /// Minimap pixels per timeline pixel.
    scale: f64,
    total_width: f64,
    tracks: Vec<MinimapTrack>,
}

impl Minimap {
    /// Build the overview of `layout` at `width × height`. `tracks` are the
    /// tracks the layout was computed from and `peaks_for` supplies the
    /// overall peaks of each one.
    pub fn build<'a>(
        layout: &TrackLayout,
        tracks: &[Track],
        width: f64,
        height: f64,
        peaks_for: impl Fn(TrackId) -> Option<&'a PeakSet>,
    ) -> Self {
        let total_width = layout.total_width();
        let scale = if total_width > 0.0 && width > 0.0 {
            width / total_width
        } else {
            0.0
        };
        let overview = layout
            .positions()
            .iter()
            .map(|p| {
                let w = p.width * scale;
                let bins = w.round().max(0.0) as usize;
                let peaks = tracks
                    .iter()
                    .find(|t| t.id == p.track_id)
                    .zip(peaks_for(p.track_id))
                    .map(|(track, set)| trimmed_overview(track, set, bins.max(1)))
                    .unwrap_or_default();
                MinimapTrack {
                    track_id: p.track_id,
                    left: p.left * scale,
                    width: w,
                    peaks,
                }
            })
            .collect();
        Self {
            width: width.max(0.0),
            height: height.max(0.0),
            scale,
            total_width,
            tracks: overview,
        }
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn tracks(&self) -> &[MinimapTrack] {
        &self.tracks
    }

    /// Rectangle marking the main viewport.
    pub fn viewport_rect(&self, scroll: f64, viewport_width: f64) -> Rect {
        let x = (scroll * self.scale).clamp(0.0, self.width);
        let w = (viewport_width * self.scale).min(self.width - x).max(0.0);
        Rect::new(x, 0.0, w, self.height)
    }

    /// Main-view scroll that centers the timeline point under minimap `x`.
    pub fn scroll_for_x(&self, x: f64, viewport_width: f64) -> f64 {
        if self.scale <= 0.0 {
            return 0.0;
        }
        let max = (self.total_width - viewport_width).max(0.0);
        (x / self.scale - viewport_width / 2.0).clamp(0.0, max)
    }

    /// Draw the overview into a bitmap.
    pub fn render(&self, color: Color) -> TileBitmap {
        let w = self.width.round() as u32;
        let h = self.height.round() as u32;
        let mut bitmap = TileBitmap::new(w, h);
        if w == 0 || h == 0 {
            return bitmap;
        }
        let center = h as f64 / 2.0;
        for track in &self.tracks {
            for (i, &peak) in track.peaks.iter().enumerate() {
                let x = (track.left + i as f64).floor();
                if x < 0.0 {
                    continue;
                }
                let half = (peak.clamp(0.0, 1.0) as f64 * center).max(0.5);
                let top = (center - half).floor().max(0.0) as u32;
                let bottom = (center + half).ceil() as u32;
                bitmap.fill_rect(x as u32, top, 1, bottom.saturating_sub(top), color.scale_alpha(0.8));
            }
        }
        bitmap
    }
}

/// Overall peaks of the audible part of `track`, pooled into `bins`.
fn trimmed_overview(track: &Track, set: &PeakSet, bins: usize) -> Vec<f32> {
    if !(track.duration > 0.0) {
        return downsample_max(&set.overall, bins);
    }
    let range = slice_range(
        set.overall.len(),
        track.trim_start / track.duration,
        track.effective_trim_end() / track.duration,
    );
    downsample_max(&set.overall[range], bins)
}

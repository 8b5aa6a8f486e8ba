//! Track layout: ordered tracks and crossfades → absolute pixel spans.
//!
//! Each track starts where the previous one ends minus its crossfade, so
//! neighbours overlap by exactly the crossfade duration. The final track has
//! nothing to fade into and contributes its full width.

use mixline_core::{Track, TrackId};

/// Horizontal span of one track on the timeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackPosition {
    pub track_id: TrackId,
    pub left: f64,
    pub width: f64,
    /// Source time shown at `left` (the track's trim start).
    pub start_time: f64,
    /// Overlap with the next track in pixels (0 for the last track).
    pub crossfade_width: f64,
}

impl TrackPosition {
    #[inline]
    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    /// Left edge of the crossfade region into the next track.
    #[inline]
    pub fn crossfade_left(&self) -> f64 {
        self.right() - self.crossfade_width
    }
}

/// Laid-out timeline at one zoom level.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackLayout {
    positions: Vec<TrackPosition>,
    pixels_per_second: f64,
}

impl TrackLayout {
    /// Lay out `tracks` in order.
    pub fn compute(tracks: &[Track], pixels_per_second: f64, default_crossfade: f64) -> Self {
        let pps = if pixels_per_second.is_finite() {
            pixels_per_second.max(0.0)
        } else {
            0.0
        };
        let mut positions = Vec::with_capacity(tracks.len());
        let mut offset = 0.0;
        let last = tracks.len().saturating_sub(1);

        for (i, track) in tracks.iter().enumerate() {
            let effective = track.effective_duration();
            let crossfade = if i < last {
                track.crossfade_or(default_crossfade)
            } else {
                0.0
            };
            positions.push(TrackPosition {
                track_id: track.id,
                left: offset,
                width: effective * pps,
                start_time: track.trim_start,
                crossfade_width: crossfade * pps,
            });
            if i < last {
                offset += (effective - crossfade) * pps;
            }
        }

        Self {
            positions,
            pixels_per_second: pps,
        }
    }

    pub fn positions(&self) -> &[TrackPosition] {
        &self.positions
    }

    pub fn pixels_per_second(&self) -> f64 {
        self.pixels_per_second
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Index and position of a track.
    pub fn find(&self, track_id: TrackId) -> Option<(usize, &TrackPosition)> {
        self.positions
            .iter()
            .enumerate()
            .find(|(_, p)| p.track_id == track_id)
    }

    pub fn get(&self, track_id: TrackId) -> Option<&TrackPosition> {
        self.find(track_id).map(|(_, p)| p)
    }

    /// Rightmost pixel covered by any track.
    pub fn total_width(&self) -> f64 {
        self.positions
            .iter()
            .map(TrackPosition::right)
            .fold(0.0, f64::max)
    }

    /// Timeline x of a source time inside a track.
    pub fn time_to_x(&self, track_id: TrackId, time: f64) -> Option<f64> {
        let pos = self.get(track_id)?;
        Some(pos.left + (time - pos.start_time) * self.pixels_per_second)
    }

    /// Source time of a timeline x inside a track.
    pub fn x_to_time(&self, track_id: TrackId, x: f64) -> Option<f64> {
        if self.pixels_per_second <= 0.0 {
            return None;
        }
        let pos = self.get(track_id)?;
        Some(pos.start_time + (x - pos.left) / self.pixels_per_second)
    }

    /// Track under timeline x. Inside a crossfade overlap the later track wins.
    pub fn track_at_x(&self, x: f64) -> Option<&TrackPosition> {
        self.positions
            .iter()
            .rev()
            .find(|p| x >= p.left && x < p.right())
    }
}

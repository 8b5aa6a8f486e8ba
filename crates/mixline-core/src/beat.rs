//! Beat grid quantization.

use serde::{Deserialize, Serialize};

/// Whether drags snap to the track's beat grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SnapMode {
    #[default]
    Off,
    Beat,
}

impl SnapMode {
    pub fn toggled(self) -> Self {
        match self {
            Self::Off => Self::Beat,
            Self::Beat => Self::Off,
        }
    }
}

/// A constant-tempo beat grid anchored at the first downbeat.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BeatGrid {
    bpm: f64,
    first_beat_offset: f64,
}

impl BeatGrid {
    /// Build a grid. Returns `None` for non-positive or non-finite input.
    pub fn new(bpm: f64, first_beat_offset: f64) -> Option<Self> {
        if !(bpm > 0.0) || !bpm.is_finite() || !first_beat_offset.is_finite() {
            return None;
        }
        Some(Self {
            bpm,
            first_beat_offset,
        })
    }

    #[inline]
    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    #[inline]
    pub fn first_beat_offset(&self) -> f64 {
        self.first_beat_offset
    }

    /// Seconds between beats.
    #[inline]
    pub fn interval(&self) -> f64 {
        60.0 / self.bpm
    }

    /// Nearest beat index to `time` (may be negative before the first beat).
    #[inline]
    pub fn beat_index(&self, time: f64) -> i64 {
        ((time - self.first_beat_offset) / self.interval()).round() as i64
    }

    /// Time of beat `index`.
    #[inline]
    pub fn beat_time(&self, index: i64) -> f64 {
        self.first_beat_offset + index as f64 * self.interval()
    }

    /// Quantize `time` to the nearest beat boundary.
    pub fn snap(&self, time: f64) -> f64 {
        self.beat_time(self.beat_index(time))
    }

    /// Quantize a duration to a whole number of beats.
    pub fn snap_length(&self, length: f64) -> f64 {
        (length / self.interval()).round() * self.interval()
    }

    /// Beat times inside `[start, end]`, for drawing grid lines.
    pub fn beats_in(&self, start: f64, end: f64) -> impl Iterator<Item = f64> + '_ {
        let first = ((start - self.first_beat_offset) / self.interval()).ceil() as i64;
        (first..)
            .map(move |i| self.beat_time(i))
            .take_while(move |t| *t <= end)
    }
}

/// Quantize `time` to the beat grid defined by `bpm` and `offset`.
///
/// Invalid grids (bpm ≤ 0) leave `time` untouched.
pub fn snap_to_beat(time: f64, bpm: f64, offset: f64) -> f64 {
    match BeatGrid::new(bpm, offset) {
        Some(grid) => grid.snap(time),
        None => time,
    }
}

/// Clamp, optionally snap, then clamp again.
///
/// Snapping may push a value outside `[min, max]`, so the range is enforced
/// on both sides of the quantization.
pub fn resolve_time(
    candidate: f64,
    min: f64,
    max: f64,
    grid: Option<BeatGrid>,
    mode: SnapMode,
) -> f64 {
    let (min, max) = if min <= max { (min, max) } else { (max, min) };
    let clamped = candidate.clamp(min, max);
    match (mode, grid) {
        (SnapMode::Beat, Some(grid)) => grid.snap(clamped).clamp(min, max),
        _ => clamped,
    }
}

//! Peak arrays and max-pooling downsampling.
//!
//! Peaks arrive pre-computed and normalized to [0, 1]. Downsampling always
//! keeps the loudest value of each window; averaging would flatten the
//! transients that give a waveform its silhouette.

use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Reduce `source` to at most `target` values by taking the max absolute
/// value of each window.
///
/// The output length is `min(target, source.len())`. Windows partition the
/// source proportionally, so every window holds at least one element and
/// no window is wider than `ceil(len / target)`.
pub fn downsample_max(source: &[f32], target: usize) -> Vec<f32> {
    if source.is_empty() || target == 0 {
        return Vec::new();
    }
    if target >= source.len() {
        return source.iter().map(|v| v.abs()).collect();
    }

    let len = source.len();
    let mut out = Vec::with_capacity(target);
    for i in 0..target {
        let window = window_bounds(i, len, target);
        let peak = source[window]
            .iter()
            .fold(0.0f32, |acc, v| acc.max(v.abs()));
        out.push(peak);
    }
    out
}

/// Source index range pooled into output slot `i`.
#[inline]
pub fn window_bounds(i: usize, len: usize, target: usize) -> Range<usize> {
    let start = i * len / target;
    let end = ((i + 1) * len / target).max(start + 1).min(len);
    start..end
}

/// Index range of `len` peaks covering the fraction `[start_frac, end_frac)`
/// of the timeline. Always non-empty when `len > 0` and the span is positive.
pub fn slice_range(len: usize, start_frac: f64, end_frac: f64) -> Range<usize> {
    if len == 0 || !(end_frac > start_frac) {
        return 0..0;
    }
    let start = ((start_frac.clamp(0.0, 1.0) * len as f64).floor() as usize).min(len - 1);
    let end = ((end_frac.clamp(0.0, 1.0) * len as f64).ceil() as usize).clamp(start + 1, len);
    start..end
}

/// Low/mid/high band peaks, co-indexed with the overall peaks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PeakBands {
    pub low: Vec<f32>,
    pub mid: Vec<f32>,
    pub high: Vec<f32>,
}

impl PeakBands {
    /// True if every band has exactly `len` entries.
    pub fn matches_len(&self, len: usize) -> bool {
        self.low.len() == len && self.mid.len() == len && self.high.len() == len
    }
}

/// All peak data supplied for one track.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PeakSet {
    pub overall: Vec<f32>,
    pub bands: Option<PeakBands>,
}

impl PeakSet {
    pub fn new(overall: Vec<f32>) -> Self {
        Self {
            overall,
            bands: None,
        }
    }

    pub fn with_bands(overall: Vec<f32>, low: Vec<f32>, mid: Vec<f32>, high: Vec<f32>) -> Self {
        Self {
            overall,
            bands: Some(PeakBands { low, mid, high }),
        }
    }

    pub fn len(&self) -> usize {
        self.overall.len()
    }

    pub fn is_empty(&self) -> bool {
        self.overall.is_empty()
    }

    /// Band data, only if it lines up with the overall peaks.
    pub fn usable_bands(&self) -> Option<&PeakBands> {
        self.bands
            .as_ref()
            .filter(|b| b.matches_len(self.overall.len()))
    }
}

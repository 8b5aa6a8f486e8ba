//! Waveform bar rendering.
//!
//! Bars are drawn mirrored around the vertical center with a gradient that
//! is fully opaque at the peak edges and fades to 40% at the centerline.
//! In frequency mode each bar takes the color of its dominant band; bars
//! are grouped by color and drawn one batch at a time.

use crate::bitmap::TileBitmap;
use mixline_core::peaks::slice_range;
use mixline_core::{downsample_max, Color, PeakSet};
use smallvec::SmallVec;

/// Alpha factor at the centerline.
const CENTER_ALPHA: f32 = 0.4;

/// Visual parameters shared by every tile of one waveform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaveformStyle {
    pub color: Color,
    pub frequency_colors: bool,
    /// Device pixels between bar starts.
    pub bar_stride: f32,
    /// Frequency-mode bars quieter than this are skipped.
    pub min_peak: f32,
}

impl Default for WaveformStyle {
    fn default() -> Self {
        Self {
            color: Color::WAVEFORM,
            frequency_colors: false,
            bar_stride: 3.0,
            min_peak: 0.01,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Bar {
    x: u32,
    width: u32,
    amplitude: f32,
}

type Batch = SmallVec<[Bar; 64]>;

/// Index of the dominant band. Ties favor low, then mid.
#[inline]
fn dominant_band(low: f32, mid: f32, high: f32) -> usize {
    if low >= mid && low >= high {
        0
    } else if mid >= high {
        1
    } else {
        2
    }
}

/// Number of bars that fit in `width_px` device pixels.
pub fn bar_count(width_px: u32, bar_stride: f32) -> usize {
    if width_px == 0 || !(bar_stride > 0.0) {
        return 0;
    }
    ((width_px as f32 / bar_stride).round() as usize).max(1)
}

/// Render the peaks in `[start_frac, end_frac)` of the timeline into a
/// `width_px × height_px` bitmap.
pub fn render_waveform(
    peaks: &PeakSet,
    start_frac: f64,
    end_frac: f64,
    width_px: u32,
    height_px: u32,
    style: &WaveformStyle,
) -> TileBitmap {
    let mut bitmap = TileBitmap::new(width_px, height_px);
    let range = slice_range(peaks.len(), start_frac, end_frac);
    let target = bar_count(width_px, style.bar_stride);
    if range.is_empty() || target == 0 || height_px == 0 {
        return bitmap;
    }

    let overall = downsample_max(&peaks.overall[range.clone()], target);
    let n = overall.len();
    let step = width_px as f32 / n as f32;
    let bar_width = ((step - 1.0).floor() as u32).max(1);
    let bar_at = |i: usize, amplitude: f32| Bar {
        x: (i as f32 * step).floor() as u32,
        width: bar_width,
        amplitude,
    };

    match peaks.usable_bands().filter(|_| style.frequency_colors) {
        Some(bands) => {
            let low = downsample_max(&bands.low[range.clone()], target);
            let mid = downsample_max(&bands.mid[range.clone()], target);
            let high = downsample_max(&bands.high[range], target);
            let mut batches: [Batch; 3] = Default::default();
            for (i, &amp) in overall.iter().enumerate() {
                let (l, m, h) = (low[i], mid[i], high[i]);
                if l.max(m).max(h) < style.min_peak {
                    continue;
                }
                batches[dominant_band(l, m, h)].push(bar_at(i, amp));
            }
            let colors = [Color::BAND_LOW, Color::BAND_MID, Color::BAND_HIGH];
            for (batch, color) in batches.iter().zip(colors) {
                draw_bars(&mut bitmap, batch, color);
            }
        }
        None => {
            let batch: Batch = overall
                .iter()
                .enumerate()
                .map(|(i, &amp)| bar_at(i, amp))
                .collect();
            draw_bars(&mut bitmap, &batch, style.color);
        }
    }
    bitmap
}

fn draw_bars(bitmap: &mut TileBitmap, bars: &[Bar], color: Color) {
    let height = bitmap.height() as f32;
    let center = height / 2.0;
    for bar in bars {
        let half = bar.amplitude.clamp(0.0, 1.0) * center;
        if half <= 0.0 {
            continue;
        }
        let top = (center - half).floor().max(0.0) as u32;
        let bottom = ((center + half).ceil() as u32).min(bitmap.height());
        for y in top..bottom {
            let dist = ((y as f32 + 0.5) - center).abs();
            let t = (dist / half).min(1.0);
            let shaded = color.scale_alpha(CENTER_ALPHA + (1.0 - CENTER_ALPHA) * t);
            for x in bar.x..bar.x + bar.width {
                bitmap.blend_pixel(x, y, shaded);
            }
        }
    }
}

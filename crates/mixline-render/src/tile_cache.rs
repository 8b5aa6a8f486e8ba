//! Shared LRU cache of rendered waveform tiles.
//!
//! A waveform is cut into fixed-width horizontal tiles so that only the
//! visible part of a long track needs bitmaps at high zoom. Tiles are keyed
//! by every parameter that affects their pixels; any change produces a new
//! key and therefore a miss. One cache serves every track and is bounded by
//! a global tile count. Evicted bitmaps are handed to a [`TileDisposer`] so
//! the host can free the matching GPU texture.

use crate::bitmap::TileBitmap;
use crate::renderer::{render_waveform, WaveformStyle};
use mixline_core::{Color, EngineConfig, PeakSet, TrackId};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::ops::Range;
use std::sync::Arc;
use tracing::debug;

/// Every parameter that affects a tile's pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileKey {
    pub track_id: TrackId,
    pub tile_index: usize,
    /// Tile width budget in device pixels.
    pub tile_width: u32,
    pub height: u32,
    pub color: Color,
    pub frequency_colors: bool,
    pub peak_count: usize,
    total_width_bits: u64,
    density_bits: u32,
}

impl TileKey {
    pub fn total_width(&self) -> f64 {
        f64::from_bits(self.total_width_bits)
    }

    pub fn density(&self) -> f32 {
        f32::from_bits(self.density_bits)
    }
}

/// One rendered tile, positioned relative to the track's left edge.
#[derive(Debug, Clone)]
pub struct Tile {
    pub key: TileKey,
    pub x_offset: f64,
    pub width: f64,
    pub bitmap: Arc<TileBitmap>,
}

/// What to draw for one track.
#[derive(Debug, Clone, Copy)]
pub struct TileRequest<'a> {
    pub track_id: TrackId,
    pub peaks: &'a PeakSet,
    /// Track width in logical pixels.
    pub total_width: f64,
    pub height: f64,
    pub color: Color,
    pub frequency_colors: bool,
    /// Device pixels per logical pixel.
    pub density: f32,
}

impl TileRequest<'_> {
    fn is_drawable(&self) -> bool {
        self.total_width.is_finite()
            && self.total_width > 0.0
            && self.height.is_finite()
            && self.height > 0.0
            && self.density.is_finite()
            && self.density > 0.0
            && !self.peaks.is_empty()
    }
}

/// Receives bitmaps leaving the cache.
pub trait TileDisposer: Send {
    fn dispose(&mut self, key: &TileKey, bitmap: &TileBitmap);
}

/// [`TileDisposer`] that queues bitmap ids for the host to free on its
/// next frame.
#[derive(Debug, Clone, Default)]
pub struct DisposalQueue {
    ids: Arc<Mutex<Vec<u64>>>,
}

impl DisposalQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take every queued bitmap id.
    pub fn drain(&self) -> Vec<u64> {
        std::mem::take(&mut *self.ids.lock())
    }

    pub fn len(&self) -> usize {
        self.ids.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.lock().is_empty()
    }
}

impl TileDisposer for DisposalQueue {
    fn dispose(&mut self, _key: &TileKey, bitmap: &TileBitmap) {
        self.ids.lock().push(bitmap.id());
    }
}

/// Hit/miss/eviction counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

struct Entry {
    tile: Tile,
    last_used: u64,
}

/// Global waveform tile cache.
pub struct TileCache {
    tile_width: u32,
    max_tiles: usize,
    bar_stride: f32,
    min_peak: f32,
    entries: HashMap<TileKey, Entry>,
    tick: u64,
    stats: CacheStats,
    disposer: Option<Box<dyn TileDisposer>>,
}

impl TileCache {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            tile_width: config.tile_width.max(1),
            max_tiles: config.max_cached_tiles.max(1),
            bar_stride: config.bar_stride,
            min_peak: config.min_peak,
            entries: HashMap::new(),
            tick: 0,
            stats: CacheStats::default(),
            disposer: None,
        }
    }

    pub fn with_disposer(mut self, disposer: impl TileDisposer + 'static) -> Self {
        self.disposer = Some(Box::new(disposer));
        self
    }

    /// Tile width budget in device pixels.
    pub fn tile_width(&self) -> u32 {
        self.tile_width
    }

    /// Logical tile width at `density`, sized so the bitmap stays within the
    /// device pixel budget.
    pub fn logical_tile_width(&self, density: f32) -> f64 {
        let density = if density.is_finite() && density > 0.0 {
            density as f64
        } else {
            1.0
        };
        (self.tile_width as f64 / density).floor().max(1.0)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    pub fn contains(&self, key: &TileKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of tiles needed to cover `total_width` at `density`.
    pub fn tile_count(&self, total_width: f64, density: f32) -> usize {
        if !(total_width > 0.0) || !total_width.is_finite() {
            return 0;
        }
        (total_width / self.logical_tile_width(density)).ceil() as usize
    }

    /// Tile indices of a track (left edge at `track_left`, `track_width`
    /// wide) that intersect the viewport `[scroll, scroll + viewport)`.
    pub fn visible_tile_range(
        &self,
        scroll: f64,
        viewport: f64,
        track_left: f64,
        track_width: f64,
        density: f32,
    ) -> Range<usize> {
        let start = (scroll - track_left).max(0.0);
        let end = (scroll + viewport - track_left).min(track_width);
        if !(end > start) {
            return 0..0;
        }
        let tw = self.logical_tile_width(density);
        let first = (start / tw).floor() as usize;
        let last = ((end / tw).ceil() as usize).min(self.tile_count(track_width, density));
        first..last.max(first)
    }

    /// All tiles covering `[0, total_width)` of the request.
    pub fn get_tiles(&mut self, request: &TileRequest<'_>) -> Vec<Tile> {
        let count = self.tile_count(request.total_width, request.density);
        self.get_tiles_in(request, 0..count)
    }

    /// Tiles with indices in `range`, rendering any that are missing.
    ///
    /// Every tile of the batch is touched before eviction runs, and none of
    /// them is evicted by it.
    pub fn get_tiles_in(&mut self, request: &TileRequest<'_>, range: Range<usize>) -> Vec<Tile> {
        if !request.is_drawable() {
            return Vec::new();
        }
        let count = self.tile_count(request.total_width, request.density);
        let range = range.start.min(count)..range.end.min(count);

        let mut tiles = Vec::with_capacity(range.len());
        let mut batch = HashSet::with_capacity(range.len());
        for index in range {
            let tile = self.tile(request, index);
            batch.insert(tile.key);
            tiles.push(tile);
        }
        self.evict(&batch);
        tiles
    }

    fn key_for(&self, request: &TileRequest<'_>, index: usize) -> TileKey {
        TileKey {
            track_id: request.track_id,
            tile_index: index,
            tile_width: self.tile_width,
            height: request.height.round() as u32,
            color: request.color,
            frequency_colors: request.frequency_colors,
            peak_count: request.peaks.len(),
            total_width_bits: request.total_width.to_bits(),
            density_bits: request.density.to_bits(),
        }
    }

    fn tile(&mut self, request: &TileRequest<'_>, index: usize) -> Tile {
        let key = self.key_for(request, index);
        self.tick += 1;
        if let Some(entry) = self.entries.get_mut(&key) {
            entry.last_used = self.tick;
            self.stats.hits += 1;
            return entry.tile.clone();
        }

        self.stats.misses += 1;
        let tw = self.logical_tile_width(request.density);
        let x_offset = index as f64 * tw;
        let width = (request.total_width - x_offset).min(tw);
        let density = request.density as f64;
        let width_px = ((width * density).round() as u32).max(1);
        let height_px = ((request.height * density).round() as u32).max(1);
        let style = WaveformStyle {
            color: request.color,
            frequency_colors: request.frequency_colors,
            bar_stride: self.bar_stride,
            min_peak: self.min_peak,
        };
        let bitmap = render_waveform(
            request.peaks,
            x_offset / request.total_width,
            (x_offset + width) / request.total_width,
            width_px,
            height_px,
            &style,
        );
        debug!(track = %request.track_id, tile = index, width_px, height_px, "Tile rendered");

        let tile = Tile {
            key,
            x_offset,
            width,
            bitmap: Arc::new(bitmap),
        };
        self.entries.insert(
            key,
            Entry {
                tile: tile.clone(),
                last_used: self.tick,
            },
        );
        tile
    }

    fn evict(&mut self, batch: &HashSet<TileKey>) {
        while self.entries.len() > self.max_tiles {
            let victim = self
                .entries
                .iter()
                .filter(|(k, _)| !batch.contains(*k))
                .min_by_key(|(_, e)| e.last_used)
                .map(|(k, _)| *k);
            let Some(key) = victim else {
                // The batch alone exceeds the budget; trim on the next call.
                break;
            };
            self.remove(&key);
            self.stats.evictions += 1;
            debug!(tile = key.tile_index, track = %key.track_id, "Tile evicted");
        }
    }

    fn remove(&mut self, key: &TileKey) {
        if let Some(entry) = self.entries.remove(key) {
            if let Some(disposer) = self.disposer.as_mut() {
                disposer.dispose(key, &entry.tile.bitmap);
            }
        }
    }

    /// Dispose every tile of one track.
    pub fn invalidate(&mut self, track_id: TrackId) -> usize {
        let keys: Vec<TileKey> = self
            .entries
            .keys()
            .filter(|k| k.track_id == track_id)
            .copied()
            .collect();
        for key in &keys {
            self.remove(key);
        }
        if !keys.is_empty() {
            debug!(track = %track_id, tiles = keys.len(), "Track tiles invalidated");
        }
        keys.len()
    }

    /// Dispose every tile.
    pub fn clear(&mut self) {
        let keys: Vec<TileKey> = self.entries.keys().copied().collect();
        for key in &keys {
            self.remove(key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn config(max_tiles: usize) -> EngineConfig {
        EngineConfig {
            tile_width: 100,
            max_cached_tiles: max_tiles,
            ..Default::default()
        }
    }

    fn request(track_id: TrackId, peaks: &PeakSet, total_width: f64) -> TileRequest<'_> {
        TileRequest {
            track_id,
            peaks,
            total_width,
            height: 40.0,
            color: Color::WAVEFORM,
            frequency_colors: false,
            density: 1.0,
        }
    }

    #[test]
    fn test_tiles_cover_width() {
        let mut cache = TileCache::new(&config(48));
        let peaks = PeakSet::new(vec![0.5; 1000]);
        let tiles = cache.get_tiles(&request(Uuid::new_v4(), &peaks, 250.0));
        assert_eq!(tiles.len(), 3);
        assert_eq!(tiles[2].x_offset, 200.0);
        assert_eq!(tiles[2].width, 50.0);
        assert_eq!(tiles[2].bitmap.width(), 50);
        assert_eq!(tiles[0].bitmap.height(), 40);
    }

    #[test]
    fn test_same_key_same_bitmap() {
        let mut cache = TileCache::new(&config(48));
        let peaks = PeakSet::new(vec![0.5; 1000]);
        let id = Uuid::new_v4();
        let a = cache.get_tiles(&request(id, &peaks, 250.0));
        let b = cache.get_tiles(&request(id, &peaks, 250.0));
        assert!(Arc::ptr_eq(&a[0].bitmap, &b[0].bitmap));
        assert_eq!(cache.stats().hits, 3);
        assert_eq!(cache.stats().misses, 3);

        let mut req = request(id, &peaks, 250.0);
        req.color = Color::WHITE;
        let c = cache.get_tiles(&req);
        assert!(!Arc::ptr_eq(&a[0].bitmap, &c[0].bitmap));
    }

    #[test]
    fn test_lru_eviction_disposes() {
        let queue = DisposalQueue::new();
        let mut cache = TileCache::new(&config(4)).with_disposer(queue.clone());
        let peaks = PeakSet::new(vec![0.5; 100]);
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        cache.get_tiles(&request(a, &peaks, 300.0));
        cache.get_tiles(&request(b, &peaks, 300.0));
        assert_eq!(cache.len(), 4);
        assert_eq!(cache.stats().evictions, 2);
        // The oldest two tiles of `a` went first.
        let disposed = queue.drain();
        assert_eq!(disposed.len(), 2);
        let ra = request(a, &peaks, 300.0);
        assert!(!cache.contains(&cache.key_for(&ra, 0)));
        assert!(!cache.contains(&cache.key_for(&ra, 1)));
        assert!(cache.contains(&cache.key_for(&ra, 2)));
    }

    #[test]
    fn test_batch_never_evicts_itself() {
        let mut cache = TileCache::new(&config(2));
        let peaks = PeakSet::new(vec![0.5; 100]);
        let tiles = cache.get_tiles(&request(Uuid::new_v4(), &peaks, 500.0));
        assert_eq!(tiles.len(), 5);
        assert_eq!(cache.len(), 5);
        // A later batch trims the overflow.
        cache.get_tiles(&request(Uuid::new_v4(), &peaks, 100.0));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_invalidate_track() {
        let queue = DisposalQueue::new();
        let mut cache = TileCache::new(&config(48)).with_disposer(queue.clone());
        let peaks = PeakSet::new(vec![0.5; 100]);
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        cache.get_tiles(&request(a, &peaks, 300.0));
        cache.get_tiles(&request(b, &peaks, 100.0));
        assert_eq!(cache.invalidate(a), 3);
        assert_eq!(queue.len(), 3);
        assert_eq!(cache.len(), 1);
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(queue.len(), 4);
    }

    #[test]
    fn test_degenerate_requests() {
        let mut cache = TileCache::new(&config(48));
        let peaks = PeakSet::new(vec![0.5; 100]);
        let empty = PeakSet::new(vec![]);
        let id = Uuid::new_v4();
        assert!(cache.get_tiles(&request(id, &empty, 300.0)).is_empty());
        assert!(cache.get_tiles(&request(id, &peaks, 0.0)).is_empty());
        let mut req = request(id, &peaks, 300.0);
        req.height = 0.0;
        assert!(cache.get_tiles(&req).is_empty());
        req.height = 40.0;
        req.density = f32::NAN;
        assert!(cache.get_tiles(&req).is_empty());
    }

    #[test]
    fn test_visible_tile_range() {
        let cache = TileCache::new(&config(48));
        assert_eq!(cache.visible_tile_range(0.0, 150.0, 0.0, 1000.0, 1.0), 0..2);
        assert_eq!(cache.visible_tile_range(250.0, 100.0, 0.0, 1000.0, 1.0), 2..4);
        // Track starts right of the viewport.
        assert_eq!(cache.visible_tile_range(0.0, 100.0, 500.0, 1000.0, 1.0), 0..0);
        assert_eq!(cache.visible_tile_range(950.0, 500.0, 0.0, 1000.0, 1.0), 9..10);
    }

    #[test]
    fn test_density_scales_bitmap() {
        let mut cache = TileCache::new(&config(48));
        let peaks = PeakSet::new(vec![0.5; 100]);
        let mut req = request(Uuid::new_v4(), &peaks, 100.0);
        req.density = 2.0;
        let tiles = cache.get_tiles(&req);
        // 100 device px per tile is 50 logical px at 2x.
        assert_eq!(tiles.len(), 2);
        assert_eq!(tiles[1].x_offset, 50.0);
        assert_eq!((tiles[0].bitmap.width(), tiles[0].bitmap.height()), (100, 80));
        assert_eq!(cache.visible_tile_range(60.0, 10.0, 0.0, 100.0, 2.0), 1..2);
    }

    #[test]
    fn test_high_density_tiles_stay_within_budget() {
        let config = EngineConfig::default();
        let mut cache = TileCache::new(&config);
        let peaks = PeakSet::new(vec![0.5; 10_000]);
        let mut req = request(Uuid::new_v4(), &peaks, 6000.0);
        req.density = 3.0;
        let tiles = cache.get_tiles(&req);
        assert_eq!(cache.logical_tile_width(3.0), 1365.0);
        assert_eq!(tiles.len(), 5);
        for tile in &tiles {
            assert!(tile.bitmap.width() <= config.tile_width);
        }
        let covered: f64 = tiles.iter().map(|t| t.width).sum();
        assert!((covered - 6000.0).abs() < 1e-9);
    }
}

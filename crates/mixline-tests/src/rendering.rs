//! Waveform tiles and the minimap drawn from engine layouts.

use mixline_core::{Color, EngineConfig, PeakSet, Track};
use mixline_render::{DisposalQueue, Minimap, TileCache, TileRequest};
use mixline_timeline::TrackLayout;
use std::sync::Arc;

fn ramp(n: usize) -> PeakSet {
    PeakSet::new((0..n).map(|i| i as f32 / n as f32).collect())
}

fn request<'a>(track: &'a Track, peaks: &'a PeakSet, pps: f64) -> TileRequest<'a> {
    TileRequest {
        track_id: track.id,
        peaks,
        total_width: track.duration * pps,
        height: 96.0,
        color: Color::WAVEFORM,
        frequency_colors: false,
        density: 1.0,
    }
}

// ── Tile cache ─────────────────────────────────────────────────

#[test]
fn same_key_returns_identical_bitmap() {
    let config = EngineConfig::default();
    let mut cache = TileCache::new(&config);
    let track = Track::new("song", 600.0);
    let peaks = ramp(6000);

    let first = cache.get_tiles(&request(&track, &peaks, 10.0));
    let second = cache.get_tiles(&request(&track, &peaks, 10.0));
    assert_eq!(first.len(), 2);
    for (a, b) in first.iter().zip(&second) {
        assert!(Arc::ptr_eq(&a.bitmap, &b.bitmap));
    }
    assert_eq!(cache.stats().hits, 2);
}

#[test]
fn zoom_change_renders_new_tiles() {
    let config = EngineConfig::default();
    let mut cache = TileCache::new(&config);
    let track = Track::new("song", 600.0);
    let peaks = ramp(6000);

    let base = cache.get_tiles(&request(&track, &peaks, 10.0));
    let zoomed = cache.get_tiles(&request(&track, &peaks, 20.0));
    assert!(!Arc::ptr_eq(&base[0].bitmap, &zoomed[0].bitmap));
    assert_eq!(zoomed.len(), 3);
}

#[test]
fn evicted_tiles_are_queued_for_disposal() {
    let config = EngineConfig {
        max_cached_tiles: 2,
        ..EngineConfig::default()
    };
    let queue = DisposalQueue::new();
    let mut cache = TileCache::new(&config).with_disposer(queue.clone());
    let peaks = ramp(1000);
    let tracks: Vec<Track> = (0..3).map(|i| Track::new(format!("t{}", i), 100.0)).collect();

    for track in &tracks {
        cache.get_tiles(&request(track, &peaks, 10.0));
    }
    assert_eq!(cache.len(), 2);
    assert_eq!(queue.drain().len(), 1);
    assert!(queue.is_empty());
}

#[test]
fn only_visible_tiles_are_rendered() {
    let config = EngineConfig::default();
    let mut cache = TileCache::new(&config);
    let track = Track::new("long", 3600.0);
    let peaks = ramp(36_000);
    let req = request(&track, &peaks, 50.0);

    let range = cache.visible_tile_range(100_000.0, 1200.0, 0.0, req.total_width, req.density);
    let tiles = cache.get_tiles_in(&req, range.clone());
    assert_eq!(tiles.len(), range.len());
    assert!(tiles.len() <= 2);
    assert_eq!(cache.stats().misses, tiles.len() as u64);
}

// ── Minimap ────────────────────────────────────────────────────

#[test]
fn minimap_navigation_matches_layout() {
    let mut a = Track::new("a", 300.0);
    a.crossfade_duration = Some(0.0);
    let tracks = vec![a, Track::new("b", 300.0)];
    let peaks: Vec<PeakSet> = tracks.iter().map(|_| ramp(3000)).collect();
    let layout = TrackLayout::compute(&tracks, 10.0, 8.0);

    let minimap = Minimap::build(&layout, &tracks, 600.0, 24.0, |id| {
        tracks.iter().position(|t| t.id == id).map(|i| &peaks[i])
    });
    assert_eq!(minimap.scale(), 0.1);
    assert_eq!(minimap.tracks()[1].left, 300.0);

    // Clicking the middle centers the seam between the two tracks.
    assert_eq!(minimap.scroll_for_x(300.0, 1000.0), 2500.0);
    let rect = minimap.viewport_rect(2500.0, 1000.0);
    assert_eq!((rect.x, rect.width), (250.0, 100.0));
}

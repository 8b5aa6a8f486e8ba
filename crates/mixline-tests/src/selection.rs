//! Region selection against the shared view store.

use mixline_core::{EngineConfig, Track, TrackId, TrackUpdate, Vec2};
use mixline_timeline::{
    EditSession, ElementRole, HitTester, RegionSelector, SharedStore, StateContainer, TrackLayout,
    Transport, ViewState,
};
use std::sync::Arc;
use std::time::Instant;

// ── Helpers ────────────────────────────────────────────────────

#[derive(Default)]
struct RecordingTransport {
    played: Vec<(TrackId, f64)>,
    looped: Option<(f64, f64)>,
}

impl Transport for RecordingTransport {
    fn play(&mut self, track_id: TrackId, at: f64) {
        self.played.push((track_id, at));
    }
    fn stop(&mut self) {}
    fn set_loop_region(&mut self, start: f64, end: f64) {
        self.looped = Some((start, end));
    }
}

fn setup() -> (Vec<Track>, TrackLayout, Arc<dyn StateContainer<ViewState>>, RegionSelector) {
    let config = EngineConfig::default();
    let tracks = vec![Track::new("song", 120.0)];
    let layout = TrackLayout::compute(&tracks, 10.0, config.default_crossfade_seconds);
    let store = SharedStore::shared(ViewState::default());
    let selector = RegionSelector::new(Arc::clone(&store), &config);
    (tracks, layout, store, selector)
}

/// Press on the body at `x0`, drag to `x1`, release.
fn select(
    selector: &mut RegionSelector,
    tracks: &[Track],
    layout: &TrackLayout,
    x0: f64,
    x1: f64,
) -> Option<mixline_timeline::SelectionRegion> {
    let hit = HitTester::default().hit_test(layout, tracks, None, Vec2::new(x0, 60.0));
    assert_eq!(hit.role, ElementRole::TrackBody);
    let track = &tracks[0];
    selector.press(hit.role, track.id, hit.time.unwrap_or_default(), x0);
    let time = layout.x_to_time(track.id, x1).unwrap_or_default();
    selector.drag(track, time, x1);
    selector.release()
}

// ── Promotion ──────────────────────────────────────────────────

#[test]
fn short_region_never_promotes() {
    let (tracks, layout, store, mut selector) = setup();
    // 3 px at 10 px/s clears the drag threshold but spans only 0.3 s.
    let result = select(&mut selector, &tracks, &layout, 100.0, 103.0);
    assert!(result.is_none());
    assert!(store.get().selection.is_none());
}

#[test]
fn long_region_promotes_into_store() {
    let (tracks, layout, store, mut selector) = setup();
    let sel = select(&mut selector, &tracks, &layout, 400.0, 200.0).expect("promoted");
    assert_eq!((sel.start, sel.end), (20.0, 40.0));
    assert_eq!(store.get().selection, Some(sel));
}

#[test]
fn region_clamped_to_track_window() {
    let (tracks, layout, _, mut selector) = setup();
    let sel = select(&mut selector, &tracks, &layout, 1000.0, 5000.0).expect("promoted");
    assert_eq!(sel.end, 120.0);
}

// ── Actions on the selection ───────────────────────────────────

#[test]
fn trim_to_selection_commits_bounds() {
    let (mut tracks, layout, _, mut selector) = setup();
    select(&mut selector, &tracks, &layout, 300.0, 900.0).expect("promoted");
    let (track_id, update) = selector.trim_to_selection(&tracks[0]).expect("active selection");

    let mut session = EditSession::new(&EngineConfig::default());
    session.propose(track_id, update, Instant::now());
    let mut save = |id: TrackId, u: &TrackUpdate| -> mixline_core::Result<()> {
        if let Some(t) = tracks.iter_mut().find(|t| t.id == id) {
            u.apply_to(t);
        }
        Ok(())
    };
    session.flush(&mut save);
    assert_eq!(tracks[0].trim_start, 30.0);
    assert_eq!(tracks[0].trim_end, Some(90.0));
}

#[test]
fn trim_to_short_selection_keeps_minimum_gap() {
    let config = EngineConfig::default();
    let (mut tracks, layout, _, mut selector) = setup();
    // 0.7 s is long enough to select but shorter than the trim gap.
    select(&mut selector, &tracks, &layout, 300.0, 307.0).expect("promoted");
    let (track_id, update) = selector.trim_to_selection(&tracks[0]).expect("active selection");

    let mut session = EditSession::new(&config);
    session.propose(track_id, update, Instant::now());
    let mut save = |id: TrackId, u: &TrackUpdate| -> mixline_core::Result<()> {
        if let Some(t) = tracks.iter_mut().find(|t| t.id == id) {
            u.apply_to(t);
        }
        Ok(())
    };
    session.flush(&mut save);
    assert_eq!(tracks[0].trim_start, 30.0);
    assert_eq!(tracks[0].trim_end, Some(30.0 + config.min_trim_gap));
}

#[test]
fn play_selection_loops_region() {
    let (tracks, layout, _, mut selector) = setup();
    select(&mut selector, &tracks, &layout, 300.0, 900.0).expect("promoted");
    let mut transport = RecordingTransport::default();
    assert!(selector.play_selection(&mut transport));
    assert_eq!(transport.looped, Some((30.0, 90.0)));
    assert_eq!(transport.played, vec![(tracks[0].id, 30.0)]);

    selector.clear();
    assert!(!selector.play_selection(&mut transport));
}

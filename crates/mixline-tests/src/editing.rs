//! Drag editing from pointer events to committed track updates.
//!
//! Exercises mixline-timeline gestures, hit testing and the commit
//! debouncer against tracks from mixline-core.

use mixline_core::{EngineConfig, MixlineError, SnapMode, Track, TrackId, TrackUpdate, Vec2};
use mixline_timeline::{
    DragGesture, EditDrag, EditSession, EditTarget, ElementRole, HitTester, PointerHost, PointerId,
    TrackLayout, TrimEdge,
};
use std::time::{Duration, Instant};

// ── Helpers ────────────────────────────────────────────────────

#[derive(Default)]
struct Host {
    captured: Option<PointerId>,
    selection_enabled: bool,
}

impl PointerHost for Host {
    fn capture_pointer(&mut self, pointer: PointerId) {
        self.captured = Some(pointer);
    }
    fn release_pointer(&mut self, _pointer: PointerId) {
        self.captured = None;
    }
    fn set_text_selection_enabled(&mut self, enabled: bool) {
        self.selection_enabled = enabled;
    }
}

/// Press at `from`, move through `path`, release at the last point.
#[allow(clippy::too_many_arguments)]
fn drag(
    session: &mut EditSession,
    tracks: &[Track],
    index: usize,
    target: EditTarget,
    snap: SnapMode,
    now: Instant,
    from: Vec2,
    path: &[Vec2],
) {
    let config = EngineConfig::default();
    let mut gesture = DragGesture::new(config.drag_threshold);
    let mut host = Host::default();
    let pointer = PointerId(1);
    gesture.pointer_down(pointer, from, &mut host);
    let mut handler = EditDrag {
        session,
        track: &tracks[index],
        next: tracks.get(index + 1),
        target,
        pixels_per_second: config.base_pixels_per_second,
        snap,
        now,
    };
    let (last, moves) = path.split_last().expect("non-empty path");
    for p in moves {
        gesture.pointer_move(pointer, *p, &mut host, &mut handler);
    }
    gesture.pointer_up(pointer, *last, &mut host, &mut handler);
    assert!(host.captured.is_none());
}

fn saving(tracks: &mut [Track]) -> impl FnMut(TrackId, &TrackUpdate) -> mixline_core::Result<()> + '_ {
    move |id: TrackId, update: &TrackUpdate| -> mixline_core::Result<()> {
        let track = tracks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or(MixlineError::TrackNotFound(id))?;
        update.apply_to(track);
        Ok(())
    }
}

// ── Trim handles ───────────────────────────────────────────────

#[test]
fn trim_end_drag_commits_after_debounce() {
    let config = EngineConfig::default();
    let mut tracks = vec![Track::new("song", 200.0)];
    let layout = TrackLayout::compute(&tracks, config.base_pixels_per_second, config.default_crossfade_seconds);

    let press = Vec2::new(1998.0, 60.0);
    let hit = HitTester::default().hit_test(&layout, &tracks, None, press);
    assert_eq!(hit.role, ElementRole::TrimHandle(TrimEdge::End));

    let t0 = Instant::now();
    let mut session = EditSession::new(&config);
    let path = [
        Vec2::new(1900.0, 60.0),
        Vec2::new(1600.0, 60.0),
        Vec2::new(1498.0, 60.0),
    ];
    let snapshot = tracks.clone();
    drag(&mut session, &snapshot, 0, EditTarget::TrimEnd, SnapMode::Off, t0, press, &path);

    // Preview shows the new end while the store is untouched.
    let shown = session.effective_track(&tracks[0]);
    assert!((shown.effective_trim_end() - 150.0).abs() < 1e-9);
    assert_eq!(tracks[0].trim_end, None);

    let early = session.poll(t0 + Duration::from_millis(100), &mut saving(&mut tracks));
    assert!(early.is_empty());

    let fired = session.poll(t0 + config.commit_debounce(), &mut saving(&mut tracks));
    assert_eq!(fired.len(), 1);
    assert!(fired[0].is_committed());
    let committed = tracks[0].trim_end.expect("trim end saved");
    assert!((committed - 150.0).abs() < 1e-9);
    assert!(session.preview(tracks[0].id).is_none());
}

#[test]
fn trim_end_snaps_to_beat() {
    let config = EngineConfig::default();
    let mut tracks = vec![Track::new("song", 200.0).with_beat_grid(120.0, 0.0)];
    let t0 = Instant::now();
    let mut session = EditSession::new(&config);

    // -498 px at 10 px/s lands at 150.2 s before snapping.
    let press = Vec2::new(1998.0, 60.0);
    let snapshot = tracks.clone();
    drag(
        &mut session,
        &snapshot,
        0,
        EditTarget::TrimEnd,
        SnapMode::Beat,
        t0,
        press,
        &[Vec2::new(1500.0, 60.0)],
    );
    session.flush(&mut saving(&mut tracks));

    let end = tracks[0].trim_end.expect("trim end saved");
    assert_eq!(end, 150.0);
}

#[test]
fn trim_start_respects_minimum_gap() {
    let config = EngineConfig::default();
    let mut track = Track::new("short", 20.0);
    track.trim_end = Some(10.0);
    let mut tracks = vec![track];
    let t0 = Instant::now();
    let mut session = EditSession::new(&config);

    let snapshot = tracks.clone();
    drag(
        &mut session,
        &snapshot,
        0,
        EditTarget::TrimStart,
        SnapMode::Off,
        t0,
        Vec2::new(2.0, 60.0),
        &[Vec2::new(500.0, 60.0)],
    );
    session.flush(&mut saving(&mut tracks));
    assert_eq!(tracks[0].trim_start, 10.0 - config.min_trim_gap);
}

#[test]
fn short_press_does_not_edit() {
    let config = EngineConfig::default();
    let tracks = vec![Track::new("song", 200.0)];
    let mut session = EditSession::new(&config);
    drag(
        &mut session,
        &tracks,
        0,
        EditTarget::TrimEnd,
        SnapMode::Off,
        Instant::now(),
        Vec2::new(1998.0, 60.0),
        &[Vec2::new(1996.0, 60.0)],
    );
    assert!(!session.has_pending_commit(tracks[0].id));
    assert!(session.preview(tracks[0].id).is_none());
}

// ── Crossfades ─────────────────────────────────────────────────

#[test]
fn crossfade_drag_widens_overlap() {
    let config = EngineConfig::default();
    let mut a = Track::new("a", 120.0);
    a.crossfade_duration = Some(8.0);
    let mut tracks = vec![a, Track::new("b", 90.0)];
    let layout = TrackLayout::compute(&tracks, config.base_pixels_per_second, config.default_crossfade_seconds);
    let edge_x = layout.positions()[0].crossfade_left();
    let press = Vec2::new(edge_x, 115.0);
    let hit = HitTester::default().hit_test(&layout, &tracks, None, press);
    assert_eq!(hit.role, ElementRole::CrossfadeEdge);
    assert_eq!(hit.track_id, Some(tracks[0].id));

    let mut session = EditSession::new(&config);
    let snapshot = tracks.clone();
    drag(
        &mut session,
        &snapshot,
        0,
        EditTarget::Crossfade,
        SnapMode::Off,
        Instant::now(),
        press,
        &[Vec2::new(edge_x - 40.0, 115.0)],
    );
    session.flush(&mut saving(&mut tracks));
    assert_eq!(tracks[0].crossfade_duration, Some(12.0));

    // The second track moved left by the extra overlap.
    let after = TrackLayout::compute(&tracks, config.base_pixels_per_second, config.default_crossfade_seconds);
    assert_eq!(after.positions()[1].left, (120.0 - 12.0) * config.base_pixels_per_second);
}

// ── Rejection ──────────────────────────────────────────────────

#[test]
fn rejected_commit_keeps_preview() {
    let config = EngineConfig::default();
    let tracks = vec![Track::new("song", 200.0)];
    let mut session = EditSession::new(&config);
    let t0 = Instant::now();
    drag(
        &mut session,
        &tracks,
        0,
        EditTarget::TrimEnd,
        SnapMode::Off,
        t0,
        Vec2::new(1998.0, 60.0),
        &[Vec2::new(1798.0, 60.0)],
    );

    let mut refuse = |id: TrackId, _: &TrackUpdate| -> mixline_core::Result<()> {
        Err(MixlineError::Commit {
            track: id,
            reason: "read-only project".into(),
        })
    };
    let results = session.poll(t0 + config.commit_debounce(), &mut refuse);
    assert_eq!(results.len(), 1);
    assert!(!results[0].is_committed());
    let shown = session.effective_track(&tracks[0]);
    assert!((shown.effective_trim_end() - 180.0).abs() < 1e-9);
}

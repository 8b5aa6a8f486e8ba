//! Zoom, scroll sync and the playhead across layout and view state.

use mixline_core::{EngineConfig, Track};
use mixline_timeline::{
    PlaybackPosition, PlayheadClock, PlayheadTransform, ScrollEvent, SharedStore, StateContainer,
    TrackLayout, ViewState, ViewportSync,
};
use parking_lot::Mutex;
use std::sync::Arc;

fn mix() -> Vec<Track> {
    let mut a = Track::new("a", 240.0);
    a.crossfade_duration = Some(10.0);
    let mut b = Track::new("b", 180.0);
    b.trim_start = 15.0;
    vec![a, b, Track::new("c", 200.0)]
}

fn viewport(store: &Arc<dyn StateContainer<ViewState>>, width: f64) -> ViewportSync {
    let mut sync = ViewportSync::new(Arc::clone(store), &EngineConfig::default());
    sync.set_viewport_width(width);
    sync
}

// ── Zoom ───────────────────────────────────────────────────────

#[test]
fn zoom_keeps_time_under_cursor() {
    let config = EngineConfig::default();
    let tracks = mix();
    let store = SharedStore::shared(ViewState::default());
    let mut sync = viewport(&store, 800.0);
    let total_at = |pps: f64| TrackLayout::compute(&tracks, pps, config.default_crossfade_seconds).total_width();
    let layout_at = |pps: f64| TrackLayout::compute(&tracks, pps, config.default_crossfade_seconds);

    let before = layout_at(store.get().pixels_per_second(&config));
    sync.scroll_to(2000.0, before.total_width());
    sync.on_view_scroll(2000.0, false);

    let cursor = 100.0;
    let x = store.get().scroll_position + cursor;
    let pos = before.track_at_x(x).expect("track under cursor");
    let time = before.x_to_time(pos.track_id, x).expect("time under cursor");

    for zoom in [2.0, 3.7, 0.5] {
        let scroll = sync.zoom_around(zoom, cursor, &total_at);
        let after = layout_at(store.get().pixels_per_second(&config));
        let x_after = after.time_to_x(pos.track_id, time).expect("same track");
        assert!(
            (x_after - (scroll + cursor)).abs() < 1.0,
            "zoom {}: drifted to {}",
            zoom,
            x_after - scroll
        );
        sync.on_view_scroll(scroll, false);
    }
}

#[test]
fn programmatic_scroll_echo_is_ignored_once() {
    let store = SharedStore::shared(ViewState::default());
    let mut sync = viewport(&store, 500.0);
    let target = sync.scroll_to(700.0, 5000.0);
    assert_eq!(sync.on_view_scroll(target, true), ScrollEvent::Ignored);
    assert!(!sync.user_scrolled());

    // The next event is the user's own.
    let event = sync.on_view_scroll(900.0, true);
    assert_eq!(event, ScrollEvent::Published { user_scrolled: true });
    assert_eq!(store.get().scroll_position, 900.0);
}

// ── Playhead ───────────────────────────────────────────────────

#[test]
fn playhead_follows_until_user_scrolls() {
    let config = EngineConfig::default();
    let tracks = mix();
    let layout = TrackLayout::compute(&tracks, 10.0, config.default_crossfade_seconds);
    let store = SharedStore::shared(ViewState::default());
    let mut sync = viewport(&store, 1000.0);

    let position = PlaybackPosition {
        track_id: Some(tracks[1].id),
        time: 60.0,
        playing: true,
    };
    let transform = PlayheadTransform::from_position(&layout, &position);
    assert!(transform.visible);

    let total = layout.total_width();
    let scroll = sync
        .follow_playhead(transform.x, &position, total)
        .expect("follow scroll");
    assert_eq!(scroll, transform.x - 1000.0 * config.follow_target);
    assert_eq!(sync.on_view_scroll(scroll, true), ScrollEvent::Ignored);

    // A manual scroll pauses following for this track.
    sync.on_view_scroll(0.0, true);
    assert!(sync.follow_playhead(transform.x, &position, total).is_none());

    // Moving on to the next track resumes it.
    let next = PlaybackPosition {
        track_id: Some(tracks[2].id),
        time: 5.0,
        playing: true,
    };
    let next_x = PlayheadTransform::from_position(&layout, &next).x;
    assert!(sync.follow_playhead(next_x, &next, total).is_some());
}

#[test]
fn clock_updates_bound_transform() {
    let tracks = mix();
    let layout = Arc::new(Mutex::new(TrackLayout::compute(&tracks, 10.0, 8.0)));
    let transform = Arc::new(Mutex::new(PlayheadTransform::default()));
    let clock = PlayheadClock::new();
    let sub = clock.bind_transform(Arc::clone(&layout), Arc::clone(&transform));

    clock.publish(PlaybackPosition {
        track_id: Some(tracks[0].id),
        time: 12.5,
        playing: true,
    });
    assert!(transform.lock().visible);
    assert_eq!(transform.lock().x, 125.0);

    assert!(clock.unsubscribe(sub));
    clock.publish(PlaybackPosition {
        track_id: Some(tracks[0].id),
        time: 20.0,
        playing: true,
    });
    assert_eq!(transform.lock().x, 125.0);
}

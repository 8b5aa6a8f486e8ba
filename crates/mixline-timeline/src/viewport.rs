//! Two-way sync between the scroll container and the view store, zoom
//! anchoring and playhead auto-follow.
//!
//! Scroll positions written by the engine (zoom, follow, minimap jumps) are
//! remembered as the programmatic target. When the view reports a scroll at
//! that position it is the echo of our own write and is not republished and
//! not treated as a user scroll.

use crate::clock::PlaybackPosition;
use crate::store::{StateContainer, ViewState};
use mixline_core::{EngineConfig, TrackId};
use std::sync::Arc;
use tracing::debug;

/// Distance (px) within which a view scroll counts as the echo of a
/// programmatic write.
const ECHO_TOLERANCE: f64 = 0.5;

/// How a view scroll event was handled.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScrollEvent {
    /// Echo of a programmatic scroll.
    Ignored,
    /// Published to the store.
    Published { user_scrolled: bool },
}

/// Scroll and zoom controller.
pub struct ViewportSync {
    store: Arc<dyn StateContainer<ViewState>>,
    config: EngineConfig,
    programmatic: Option<f64>,
    user_scrolled: bool,
    playing_track: Option<TrackId>,
}

impl ViewportSync {
    pub fn new(store: Arc<dyn StateContainer<ViewState>>, config: &EngineConfig) -> Self {
        Self {
            store,
            config: config.clone(),
            programmatic: None,
            user_scrolled: false,
            playing_track: None,
        }
    }

    pub fn store(&self) -> &Arc<dyn StateContainer<ViewState>> {
        &self.store
    }

    pub fn user_scrolled(&self) -> bool {
        self.user_scrolled
    }

    /// Scroll position the view should be moved to, if one is outstanding.
    pub fn programmatic_target(&self) -> Option<f64> {
        self.programmatic
    }

    /// Record the measured width of the scroll container.
    pub fn set_viewport_width(&mut self, width: f64) {
        let width = if width.is_finite() { width.max(0.0) } else { 0.0 };
        self.store
            .update(&mut |state: &mut ViewState| state.viewport_width = width);
    }

    /// Scroll from code, clamped to `[0, max(0, total - viewport)]`.
    pub fn scroll_to(&mut self, target: f64, total_width: f64) -> f64 {
        let max = max_scroll(total_width, self.store.get().viewport_width);
        let target = if target.is_finite() { target.clamp(0.0, max) } else { 0.0 };
        self.write_scroll(target);
        target
    }

    /// Scroll event reported by the view.
    pub fn on_view_scroll(&mut self, scroll: f64, playing: bool) -> ScrollEvent {
        if let Some(target) = self.programmatic.take() {
            if (scroll - target).abs() <= ECHO_TOLERANCE {
                return ScrollEvent::Ignored;
            }
        }
        let scroll = scroll.max(0.0);
        self.store
            .update(&mut |state: &mut ViewState| state.scroll_position = scroll);
        if playing && !self.user_scrolled {
            debug!(scroll, "User scrolled during playback, auto-follow paused");
            self.user_scrolled = true;
        }
        ScrollEvent::Published {
            user_scrolled: self.user_scrolled,
        }
    }

    /// Change zoom keeping the timeline point under `cursor` (px from the
    /// viewport's left edge) fixed. `total_width_at` returns the timeline
    /// width for a given pixels-per-second. Returns the new scroll.
    pub fn zoom_around(
        &mut self,
        zoom: f64,
        cursor: f64,
        total_width_at: &dyn Fn(f64) -> f64,
    ) -> f64 {
        let state = self.store.get();
        let before = total_width_at(state.pixels_per_second(&self.config));
        let fraction = if before > 0.0 {
            (state.scroll_position + cursor) / before
        } else {
            0.0
        };
        let zoom = self.config.clamp_zoom(zoom);
        let after = total_width_at(self.config.pixels_per_second(zoom));
        let scroll = (fraction * after - cursor).max(0.0);
        let applied = scroll.min(max_scroll(after, state.viewport_width));
        debug!(zoom, scroll, applied, "Zoom");
        self.programmatic = Some(applied);
        self.store.update(&mut |state: &mut ViewState| {
            state.zoom_level = zoom;
            state.scroll_position = applied;
        });
        scroll
    }

    /// One zoom step in, anchored at the viewport center.
    pub fn zoom_in(&mut self, total_width_at: &dyn Fn(f64) -> f64) -> f64 {
        let state = self.store.get();
        let zoom = state.zoom_level * self.config.zoom_step;
        self.zoom_around(zoom, state.viewport_width / 2.0, total_width_at)
    }

    /// One zoom step out, anchored at the viewport center.
    pub fn zoom_out(&mut self, total_width_at: &dyn Fn(f64) -> f64) -> f64 {
        let state = self.store.get();
        let zoom = state.zoom_level / self.config.zoom_step;
        self.zoom_around(zoom, state.viewport_width / 2.0, total_width_at)
    }

    /// Keep the playhead inside the comfort zone. Returns the new scroll if
    /// a follow scroll happened.
    pub fn follow_playhead(
        &mut self,
        playhead_x: f64,
        position: &PlaybackPosition,
        total_width: f64,
    ) -> Option<f64> {
        if position.track_id != self.playing_track {
            self.playing_track = position.track_id;
            self.user_scrolled = false;
        }
        if !position.playing || self.user_scrolled || !playhead_x.is_finite() {
            return None;
        }
        let state = self.store.get();
        let vw = state.viewport_width;
        if vw <= 0.0 {
            return None;
        }
        let margin = vw * self.config.follow_margin;
        let lo = state.scroll_position + margin;
        let hi = state.scroll_position + vw - margin;
        if playhead_x >= lo && playhead_x <= hi {
            return None;
        }
        let target = (playhead_x - vw * self.config.follow_target).max(0.0);
        let applied = target.min(max_scroll(total_width, vw));
        if (applied - state.scroll_position).abs() <= ECHO_TOLERANCE {
            // Already pinned at the end of the timeline.
            return None;
        }
        self.write_scroll(applied);
        Some(target)
    }

    fn write_scroll(&mut self, scroll: f64) {
        self.programmatic = Some(scroll);
        self.store
            .update(&mut |state: &mut ViewState| state.scroll_position = scroll);
    }
}

/// Largest offset the scroll container can reach.
fn max_scroll(total_width: f64, viewport_width: f64) -> f64 {
    if total_width.is_finite() {
        (total_width - viewport_width).max(0.0)
    } else {
        f64::INFINITY
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SharedStore;
    use uuid::Uuid;

    fn sync(viewport: f64) -> ViewportSync {
        let mut v = ViewportSync::new(
            SharedStore::shared(ViewState::default()),
            &EngineConfig::default(),
        );
        v.set_viewport_width(viewport);
        v
    }

    fn playing(track: TrackId) -> PlaybackPosition {
        PlaybackPosition {
            track_id: Some(track),
            time: 0.0,
            playing: true,
        }
    }

    #[test]
    fn test_programmatic_echo_ignored() {
        let mut v = sync(1000.0);
        assert_eq!(v.scroll_to(400.0, 5000.0), 400.0);
        assert_eq!(v.on_view_scroll(400.0, true), ScrollEvent::Ignored);
        assert!(!v.user_scrolled());
        // The guard is one-shot.
        assert_eq!(
            v.on_view_scroll(420.0, true),
            ScrollEvent::Published { user_scrolled: true }
        );
        assert_eq!(v.store().get().scroll_position, 420.0);
    }

    #[test]
    fn test_scroll_to_clamps() {
        let mut v = sync(1000.0);
        assert_eq!(v.scroll_to(9000.0, 5000.0), 4000.0);
        assert_eq!(v.scroll_to(-20.0, 5000.0), 0.0);
        assert_eq!(v.scroll_to(300.0, 500.0), 0.0);
    }

    #[test]
    fn test_zoom_keeps_cursor_anchor() {
        let mut v = sync(1000.0);
        let width = |pps: f64| 600.0 * pps; // ten minutes of audio
        v.scroll_to(1000.0, width(10.0));
        let cursor = 100.0;
        let t_before = (1000.0 + cursor) / 10.0;
        v.zoom_around(2.0, cursor, &width);
        let state = v.store().get();
        assert_eq!(state.zoom_level, 2.0);
        let t_after = (state.scroll_position + cursor) / 20.0;
        assert!((t_after - t_before).abs() * 20.0 <= 1.0);
    }

    #[test]
    fn test_zoom_clamped_and_steps() {
        let mut v = sync(800.0);
        let width = |pps: f64| 60.0 * pps;
        v.zoom_around(1000.0, 0.0, &width);
        assert_eq!(v.store().get().zoom_level, 50.0);
        v.zoom_out(&width);
        assert_eq!(v.store().get().zoom_level, 40.0);
        v.zoom_around(0.0, 0.0, &width);
        assert_eq!(v.store().get().zoom_level, 0.25);
        v.zoom_in(&width);
        assert!((v.store().get().zoom_level - 0.3125).abs() < 1e-12);
    }

    #[test]
    fn test_follow_scrolls_when_leaving_zone() {
        let mut v = sync(1000.0);
        let track = Uuid::new_v4();
        assert_eq!(v.follow_playhead(500.0, &playing(track), 5000.0), None);
        assert_eq!(v.follow_playhead(900.0, &playing(track), 5000.0), Some(600.0));
        assert_eq!(v.store().get().scroll_position, 600.0);
        assert_eq!(v.on_view_scroll(600.0, true), ScrollEvent::Ignored);
    }

    #[test]
    fn test_user_scroll_pauses_follow_until_track_changes() {
        let mut v = sync(1000.0);
        let a = Uuid::new_v4();
        v.follow_playhead(0.0, &playing(a), 5000.0);
        v.on_view_scroll(2000.0, true);
        assert!(v.user_scrolled());
        assert_eq!(v.follow_playhead(100.0, &playing(a), 5000.0), None);

        let b = Uuid::new_v4();
        assert_eq!(v.follow_playhead(100.0, &playing(b), 5000.0), Some(0.0));
        assert!(!v.user_scrolled());
    }

    #[test]
    fn test_zoom_past_end_echo_ignored() {
        let mut v = sync(1000.0);
        let width = |pps: f64| 500.0 * pps;
        v.scroll_to(4000.0, width(10.0));
        v.on_view_scroll(4000.0, true);
        let scroll = v.zoom_around(0.5, 900.0, &width);
        assert_eq!(scroll, 1550.0);
        // The view can only reach total - viewport.
        assert_eq!(v.programmatic_target(), Some(1500.0));
        assert_eq!(v.on_view_scroll(1500.0, true), ScrollEvent::Ignored);
        assert!(!v.user_scrolled());
        assert_eq!(v.store().get().scroll_position, 1500.0);
    }

    #[test]
    fn test_follow_near_end_echo_ignored() {
        let mut v = sync(1000.0);
        let track = Uuid::new_v4();
        let target = v.follow_playhead(4800.0, &playing(track), 5000.0);
        assert_eq!(target, Some(4500.0));
        assert_eq!(v.programmatic_target(), Some(4000.0));
        assert_eq!(v.on_view_scroll(4000.0, true), ScrollEvent::Ignored);
        assert!(!v.user_scrolled());
        // Pinned at the end: no further writes.
        assert_eq!(v.follow_playhead(4950.0, &playing(track), 5000.0), None);
    }

    #[test]
    fn test_scroll_while_stopped_does_not_pause_follow() {
        let mut v = sync(1000.0);
        assert_eq!(
            v.on_view_scroll(50.0, false),
            ScrollEvent::Published { user_scrolled: false }
        );
    }
}

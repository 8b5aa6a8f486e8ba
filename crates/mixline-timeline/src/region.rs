//! Region selection within one track.
//!
//! A press on the track body records an anchor. Once the pointer moves past
//! the drag threshold the selection is *pending* and follows the pointer,
//! always ordered `start < end`. On release a pending selection shorter than
//! the minimum region length is discarded; otherwise it is promoted to the
//! *active* selection held in the view store, where its edges can be dragged
//! and the trim/play actions operate on it.

use crate::collab::Transport;
use crate::hit::{ElementRole, SelectionEdge};
use crate::store::{StateContainer, ViewState};
use mixline_core::beat::resolve_time;
use mixline_core::{EngineConfig, SnapMode, Track, TrackId, TrackUpdate};
use std::sync::Arc;
use tracing::debug;

/// A time span within one track.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelectionRegion {
    pub track_id: TrackId,
    pub start: f64,
    pub end: f64,
}

impl SelectionRegion {
    /// Build a region, ordering the endpoints.
    pub fn new(track_id: TrackId, a: f64, b: f64) -> Self {
        Self {
            track_id,
            start: a.min(b),
            end: a.max(b),
        }
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    pub fn contains(&self, time: f64) -> bool {
        time >= self.start && time <= self.end
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Phase {
    Idle,
    Pressed {
        track_id: TrackId,
        anchor: f64,
        origin_x: f64,
    },
    Pending {
        region: SelectionRegion,
        anchor: f64,
    },
}

#[derive(Debug, Clone, Copy)]
struct EdgeDrag {
    edge: SelectionEdge,
    reference: f64,
}

/// Region selection controller.
pub struct RegionSelector {
    store: Arc<dyn StateContainer<ViewState>>,
    threshold: f64,
    min_region: f64,
    min_trim_gap: f64,
    phase: Phase,
    edge: Option<EdgeDrag>,
}

impl RegionSelector {
    pub fn new(store: Arc<dyn StateContainer<ViewState>>, config: &EngineConfig) -> Self {
        Self {
            store,
            threshold: config.drag_threshold,
            min_region: config.min_region_seconds,
            min_trim_gap: config.min_trim_gap,
            phase: Phase::Idle,
            edge: None,
        }
    }

    /// Selection currently being dragged out, if any.
    pub fn pending(&self) -> Option<SelectionRegion> {
        match self.phase {
            Phase::Pending { region, .. } => Some(region),
            _ => None,
        }
    }

    /// Promoted selection from the view store.
    pub fn active(&self) -> Option<SelectionRegion> {
        self.store.get().selection
    }

    /// Pointer pressed on an element. Returns `true` if a selection may start.
    pub fn press(&mut self, role: ElementRole, track_id: TrackId, time: f64, x: f64) -> bool {
        if !role.starts_selection() {
            return false;
        }
        self.phase = Phase::Pressed {
            track_id,
            anchor: time,
            origin_x: x,
        };
        true
    }

    /// Pointer moved to timeline `x`, which is source `time` in `track`.
    pub fn drag(&mut self, track: &Track, time: f64, x: f64) -> Option<SelectionRegion> {
        let (track_id, anchor) = match self.phase {
            Phase::Pressed {
                track_id,
                anchor,
                origin_x,
            } => {
                if (x - origin_x).abs() < self.threshold {
                    return None;
                }
                (track_id, anchor)
            }
            Phase::Pending { region, anchor } => (region.track_id, anchor),
            Phase::Idle => return None,
        };
        if track_id != track.id {
            return self.pending();
        }
        let time = time.clamp(track.trim_start, track.effective_trim_end().max(track.trim_start));
        let region = SelectionRegion::new(track_id, anchor, time);
        self.phase = Phase::Pending { region, anchor };
        Some(region)
    }

    /// Pointer released. Returns the promoted selection.
    pub fn release(&mut self) -> Option<SelectionRegion> {
        let phase = std::mem::replace(&mut self.phase, Phase::Idle);
        let Phase::Pending { region, .. } = phase else {
            return None;
        };
        if region.duration() < self.min_region {
            debug!(duration = region.duration(), "Selection too short, discarded");
            return None;
        }
        debug!(track = %region.track_id, start = region.start, end = region.end, "Selection active");
        self.store
            .update(&mut |state: &mut ViewState| state.selection = Some(region));
        Some(region)
    }

    /// Start dragging an edge of the active selection.
    pub fn begin_edge(&mut self, edge: SelectionEdge) -> bool {
        let Some(sel) = self.active() else {
            return false;
        };
        let reference = match edge {
            SelectionEdge::Start => sel.start,
            SelectionEdge::End => sel.end,
        };
        self.edge = Some(EdgeDrag { edge, reference });
        true
    }

    /// Move the dragged edge. The span never shrinks below the minimum
    /// region length and stays within the track's trim window.
    pub fn drag_edge(
        &mut self,
        track: &Track,
        dx: f64,
        pixels_per_second: f64,
        snap: SnapMode,
    ) -> Option<SelectionRegion> {
        let drag = self.edge?;
        let mut sel = self.active().filter(|s| s.track_id == track.id)?;
        if !(pixels_per_second > 0.0) {
            return None;
        }
        let candidate = drag.reference + dx / pixels_per_second;
        let grid = track.beat_grid();
        match drag.edge {
            SelectionEdge::Start => {
                let max = (sel.end - self.min_region).max(track.trim_start);
                sel.start = resolve_time(candidate, track.trim_start, max, grid, snap);
            }
            SelectionEdge::End => {
                let min = (sel.start + self.min_region).min(track.effective_trim_end());
                sel.end = resolve_time(candidate, min, track.effective_trim_end(), grid, snap);
            }
        }
        self.store
            .update(&mut |state: &mut ViewState| state.selection = Some(sel));
        Some(sel)
    }

    pub fn end_edge(&mut self) {
        self.edge = None;
    }

    pub fn is_dragging_edge(&self) -> bool {
        self.edge.is_some()
    }

    /// Trim fields that crop `track` to the active selection. `None` without
    /// an active selection on that track.
    pub fn trim_to_selection(&self, track: &Track) -> Option<(TrackId, TrackUpdate)> {
        let sel = self.active().filter(|s| s.track_id == track.id)?;
        Some((
            sel.track_id,
            track.propose_trim(sel.start, sel.end, self.min_trim_gap),
        ))
    }

    /// Loop the active selection and start playback at its start.
    pub fn play_selection(&self, transport: &mut dyn Transport) -> bool {
        let Some(sel) = self.active() else {
            return false;
        };
        transport.set_loop_region(sel.start, sel.end);
        transport.play(sel.track_id, sel.start);
        true
    }

    pub fn clear(&mut self) {
        self.phase = Phase::Idle;
        self.edge = None;
        self.store
            .update(&mut |state: &mut ViewState| state.selection = None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hit::TrimEdge;
    use crate::store::SharedStore;
    use mixline_core::{CueKind, CuePoint};

    fn selector() -> RegionSelector {
        RegionSelector::new(
            SharedStore::shared(ViewState::default()),
            &EngineConfig::default(),
        )
    }

    #[derive(Default)]
    struct Deck {
        calls: Vec<String>,
    }

    impl Transport for Deck {
        fn play(&mut self, _track_id: TrackId, at: f64) {
            self.calls.push(format!("play {at}"));
        }
        fn stop(&mut self) {
            self.calls.push("stop".into());
        }
        fn set_loop_region(&mut self, start: f64, end: f64) {
            self.calls.push(format!("loop {start}-{end}"));
        }
    }

    #[test]
    fn test_only_body_starts_selection() {
        let mut s = selector();
        let track = Track::new("a", 100.0);
        assert!(!s.press(ElementRole::TrimHandle(TrimEdge::Start), track.id, 10.0, 100.0));
        assert!(!s.press(ElementRole::CrossfadeEdge, track.id, 10.0, 100.0));
        assert!(s.drag(&track, 20.0, 200.0).is_none());
        assert!(s.press(ElementRole::TrackBody, track.id, 10.0, 100.0));
    }

    #[test]
    fn test_backwards_drag_is_ordered_and_promoted() {
        let mut s = selector();
        let track = Track::new("a", 100.0);
        s.press(ElementRole::TrackBody, track.id, 40.0, 400.0);
        // Below the threshold nothing is pending.
        assert!(s.drag(&track, 39.9, 399.0).is_none());
        let pending = s.drag(&track, 25.0, 250.0).unwrap();
        assert_eq!((pending.start, pending.end), (25.0, 40.0));
        let active = s.release().unwrap();
        assert_eq!(s.active(), Some(active));
        assert!(s.pending().is_none());
    }

    #[test]
    fn test_short_region_discarded() {
        let mut s = selector();
        let track = Track::new("a", 100.0);
        s.press(ElementRole::TrackBody, track.id, 10.0, 100.0);
        s.drag(&track, 10.3, 103.0);
        assert!(s.pending().is_some());
        assert!(s.release().is_none());
        assert!(s.active().is_none());
    }

    #[test]
    fn test_selection_clamped_to_trim() {
        let mut s = selector();
        let mut track = Track::new("a", 100.0);
        track.trim_end = Some(60.0);
        s.press(ElementRole::TrackBody, track.id, 50.0, 500.0);
        let pending = s.drag(&track, 90.0, 900.0).unwrap();
        assert_eq!(pending.end, 60.0);
    }

    #[test]
    fn test_edge_drag_keeps_min_span() {
        let mut s = selector();
        let track = Track::new("a", 100.0);
        s.press(ElementRole::TrackBody, track.id, 10.0, 100.0);
        s.drag(&track, 20.0, 200.0);
        s.release();

        assert!(s.begin_edge(SelectionEdge::Start));
        let sel = s.drag_edge(&track, 1000.0, 10.0, SnapMode::Off).unwrap();
        assert_eq!(sel.start, 19.5);
        s.end_edge();

        s.begin_edge(SelectionEdge::End);
        let sel = s.drag_edge(&track, 500.0, 10.0, SnapMode::Off).unwrap();
        assert_eq!(sel.end, 70.0);
    }

    #[test]
    fn test_actions() {
        let mut s = selector();
        let track = Track::new("a", 100.0);
        let mut deck = Deck::default();
        assert!(!s.play_selection(&mut deck));

        s.press(ElementRole::TrackBody, track.id, 10.0, 100.0);
        s.drag(&track, 30.0, 300.0);
        s.release();

        let (id, update) = s.trim_to_selection(&track).unwrap();
        assert_eq!(id, track.id);
        assert_eq!((update.trim_start, update.trim_end), (Some(10.0), Some(30.0)));

        assert!(s.play_selection(&mut deck));
        assert_eq!(deck.calls, vec!["loop 10-30", "play 10"]);

        s.clear();
        assert!(s.active().is_none());
        assert!(s.trim_to_selection(&track).is_none());
    }

    #[test]
    fn test_trim_to_short_selection_keeps_gap() {
        let mut s = selector();
        let mut track = Track::new("a", 100.0);
        track.cue_points = vec![
            CuePoint::new(2.0, "in", CueKind::TrimStart),
            CuePoint::new(95.0, "out", CueKind::TrimEnd),
        ];
        s.press(ElementRole::TrackBody, track.id, 10.0, 100.0);
        s.drag(&track, 10.7, 107.0);
        s.release().unwrap();

        let (_, update) = s.trim_to_selection(&track).unwrap();
        let (start, end) = (update.trim_start.unwrap(), update.trim_end.unwrap());
        assert!(end - start >= EngineConfig::default().min_trim_gap);
        let cues = update.cue_points.unwrap();
        assert_eq!(cues[0].timestamp, start);
        assert_eq!(cues[1].timestamp, end);

        let other = Track::new("b", 100.0);
        assert!(s.trim_to_selection(&other).is_none());
    }
}

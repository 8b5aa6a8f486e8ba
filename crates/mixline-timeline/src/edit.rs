//! Time-domain drag editing of trims, cue points and crossfades.
//!
//! Every editable affordance follows the same cycle:
//! 1. `begin` snapshots the current value (committed, or the still-pending
//!    preview of an earlier edit) as the reference.
//! 2. `drag_to` converts the pixel delta to seconds, clamps, optionally
//!    snaps to the beat grid, clamps again, and publishes a preview.
//! 3. `end` schedules a debounced commit. The preview stays visible until
//!    the commit is acknowledged, so the handle never jumps back to the
//!    stale committed value.
//!
//! Trim-kind cue points and the trim fields move in lock-step and are
//! committed together.

use crate::collab::TrackUpdater;
use crate::debounce::{CommitDebouncer, CommitResult};
use crate::drag::DragHandler;
use mixline_core::beat::resolve_time;
use mixline_core::{
    CueId, CueKind, CuePoint, CurveType, EngineConfig, MixlineError, Result, SnapMode, Track, TrackId,
    TrackUpdate,
};
use std::collections::HashMap;
use std::time::Instant;
use tracing::{debug, warn};

/// What a drag is editing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EditTarget {
    TrimStart,
    TrimEnd,
    Cue(CueId),
    /// Overlap between this track and the next one.
    Crossfade,
}

/// Uncommitted values shown in place of the committed ones.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackPreview {
    pub trim_start: Option<f64>,
    pub trim_end: Option<f64>,
    pub crossfade_duration: Option<f64>,
    pub crossfade_curve: Option<CurveType>,
    /// Replacement cue list from an add/remove that is not committed yet.
    pub cue_points: Option<Vec<CuePoint>>,
    /// Dragged cue positions.
    pub cues: HashMap<CueId, f64>,
}

impl TrackPreview {
    pub fn is_empty(&self) -> bool {
        self.trim_start.is_none()
            && self.trim_end.is_none()
            && self.crossfade_duration.is_none()
            && self.crossfade_curve.is_none()
            && self.cue_points.is_none()
            && self.cues.is_empty()
    }

    /// Overlay the preview on a copy of the committed track.
    pub fn apply_to(&self, track: &mut Track) {
        if let Some(v) = self.trim_start {
            track.trim_start = v;
        }
        if let Some(v) = self.trim_end {
            track.trim_end = Some(v);
        }
        if let Some(v) = self.crossfade_duration {
            track.crossfade_duration = Some(v);
        }
        if let Some(c) = self.crossfade_curve {
            track.crossfade_curve = c;
        }
        if let Some(cues) = &self.cue_points {
            track.cue_points = cues.clone();
        }
        for cue in &mut track.cue_points {
            if let Some(t) = self.cues.get(&cue.id) {
                cue.timestamp = *t;
            }
        }
    }

    fn record_update(&mut self, update: &TrackUpdate) {
        if let Some(v) = update.trim_start {
            self.trim_start = Some(v);
        }
        if let Some(v) = update.trim_end {
            self.trim_end = Some(v);
        }
        if let Some(v) = update.crossfade_duration {
            self.crossfade_duration = Some(v);
        }
        if let Some(c) = update.crossfade_curve {
            self.crossfade_curve = Some(c);
        }
        if let Some(cues) = &update.cue_points {
            self.cue_points = Some(cues.clone());
            self.cues.clear();
        }
    }
}

#[derive(Debug, Clone)]
struct ActiveEdit {
    track_id: TrackId,
    target: EditTarget,
    reference: f64,
    /// Pending update taken over from the debouncer when the drag began.
    carried: Option<TrackUpdate>,
}

/// Drag-editing state for all tracks.
#[derive(Debug)]
pub struct EditSession {
    min_trim_gap: f64,
    default_crossfade: f64,
    previews: HashMap<TrackId, TrackPreview>,
    debouncer: CommitDebouncer,
    active: Option<ActiveEdit>,
}

impl EditSession {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            min_trim_gap: config.min_trim_gap,
            default_crossfade: config.default_crossfade_seconds,
            previews: HashMap::new(),
            debouncer: CommitDebouncer::new(config.commit_debounce()),
            active: None,
        }
    }

    pub fn is_editing(&self) -> bool {
        self.active.is_some()
    }

    pub fn active_target(&self) -> Option<(TrackId, EditTarget)> {
        self.active.as_ref().map(|a| (a.track_id, a.target))
    }

    pub fn preview(&self, track_id: TrackId) -> Option<&TrackPreview> {
        self.previews.get(&track_id)
    }

    pub fn has_pending_commit(&self, track_id: TrackId) -> bool {
        self.debouncer.is_pending(track_id)
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.debouncer.next_deadline()
    }

    /// Committed track with any preview applied.
    pub fn effective_track(&self, track: &Track) -> Track {
        let mut t = track.clone();
        if let Some(p) = self.previews.get(&track.id) {
            p.apply_to(&mut t);
        }
        t
    }

    /// [`Self::effective_track`] for a whole track list.
    pub fn effective_tracks(&self, tracks: &[Track]) -> Vec<Track> {
        tracks.iter().map(|t| self.effective_track(t)).collect()
    }

    /// Start editing `target` on `track`.
    ///
    /// `next` is the following track, required for crossfade edits.
    pub fn begin(&mut self, track: &Track, next: Option<&Track>, target: EditTarget) -> Result<()> {
        if target == EditTarget::Crossfade && next.is_none() {
            return Err(MixlineError::InvalidParameter(
                "the last track has no crossfade".into(),
            ));
        }
        let effective = self.effective_track(track);
        let reference = self.current_value(&effective, target)?;
        let carried = self.debouncer.take(track.id);
        debug!(track = %track.id, ?target, reference, "Edit started");
        self.active = Some(ActiveEdit {
            track_id: track.id,
            target,
            reference,
            carried,
        });
        Ok(())
    }

    /// Move the active edit by `dx` pixels from the press point.
    ///
    /// Returns the new preview value, or `None` if nothing is being edited
    /// on this track.
    pub fn drag_to(
        &mut self,
        track: &Track,
        next: Option<&Track>,
        dx: f64,
        pixels_per_second: f64,
        snap: SnapMode,
    ) -> Option<f64> {
        let active = self.active.as_ref().filter(|a| a.track_id == track.id)?;
        if !(pixels_per_second > 0.0) {
            return None;
        }
        let (target, reference) = (active.target, active.reference);
        let effective = self.effective_track(track);
        let delta = dx / pixels_per_second;

        let value = match target {
            EditTarget::Crossfade => {
                // Dragging the crossfade edge left widens the overlap.
                let max = self.crossfade_max(&effective, next);
                let mut v = (reference - delta).clamp(0.0, max);
                if let (SnapMode::Beat, Some(grid)) = (snap, effective.beat_grid()) {
                    v = grid.snap_length(v).clamp(0.0, max);
                }
                v
            }
            _ => {
                let (min, max) = self.bounds(&effective, target)?;
                resolve_time(reference + delta, min, max, effective.beat_grid(), snap)
            }
        };

        self.write_preview(&effective, target, value);
        Some(value)
    }

    /// Finish the active edit and schedule its commit.
    pub fn end(&mut self, track: &Track, now: Instant) -> Option<TrackUpdate> {
        let active = self.active.take()?;
        if active.track_id != track.id {
            self.active = Some(active);
            return None;
        }
        let effective = self.effective_track(track);
        let mut update = active.carried.unwrap_or_default();
        update.merge(self.update_for(&effective, active.target));
        self.debouncer.schedule(track.id, update.clone(), now);
        Some(update)
    }

    /// Schedule a non-drag edit (cue add/remove, trim-to-selection, curve
    /// change). Trim and crossfade fields are previewed until committed.
    pub fn propose(&mut self, track_id: TrackId, update: TrackUpdate, now: Instant) {
        if update.is_empty() {
            return;
        }
        self.previews
            .entry(track_id)
            .or_default()
            .record_update(&update);
        self.debouncer.schedule(track_id, update, now);
    }

    /// Fire due commits. Acknowledged tracks drop their previews unless a new
    /// drag on them is already under way; rejected ones keep them.
    pub fn poll(&mut self, now: Instant, updater: &mut dyn TrackUpdater) -> Vec<CommitResult> {
        let results = self.debouncer.poll(now, updater);
        self.settle(&results);
        results
    }

    /// Fire every pending commit now, e.g. before the host shuts down.
    pub fn flush(&mut self, updater: &mut dyn TrackUpdater) -> Vec<CommitResult> {
        let results = self.debouncer.flush(updater);
        self.settle(&results);
        results
    }

    fn settle(&mut self, results: &[CommitResult]) {
        for result in results {
            if let CommitResult::Committed { track_id, .. } = result {
                let editing = self
                    .active
                    .as_ref()
                    .is_some_and(|a| a.track_id == *track_id);
                if !editing && !self.debouncer.is_pending(*track_id) {
                    self.previews.remove(track_id);
                }
            }
        }
    }

    /// Drop a track's preview and any pending commit, reverting the display
    /// to the committed values.
    pub fn discard(&mut self, track_id: TrackId) {
        self.previews.remove(&track_id);
        self.debouncer.take(track_id);
        if self.active.as_ref().is_some_and(|a| a.track_id == track_id) {
            self.active = None;
        }
    }

    fn current_value(&self, effective: &Track, target: EditTarget) -> Result<f64> {
        Ok(match target {
            EditTarget::TrimStart => effective.trim_start,
            EditTarget::TrimEnd => effective.effective_trim_end(),
            EditTarget::Crossfade => effective.crossfade_or(self.default_crossfade),
            EditTarget::Cue(id) => {
                effective
                    .cue(id)
                    .ok_or_else(|| {
                        MixlineError::InvalidParameter(format!("unknown cue point {}", id))
                    })?
                    .timestamp
            }
        })
    }

    fn bounds(&self, effective: &Track, target: EditTarget) -> Option<(f64, f64)> {
        let kind = match target {
            EditTarget::TrimStart => CueKind::TrimStart,
            EditTarget::TrimEnd => CueKind::TrimEnd,
            EditTarget::Cue(id) => effective.cue(id)?.kind,
            EditTarget::Crossfade => return None,
        };
        Some(effective.trim_bounds(kind, self.min_trim_gap))
    }

    fn crossfade_max(&self, effective: &Track, next: Option<&Track>) -> f64 {
        let next_len = next
            .map(|n| self.effective_track(n).effective_duration())
            .unwrap_or(0.0);
        effective.effective_duration().min(next_len).max(0.0)
    }

    fn write_preview(&mut self, effective: &Track, target: EditTarget, value: f64) {
        let preview = self.previews.entry(effective.id).or_default();
        let coupled_cue = |kind: CueKind| effective.trim_cue(kind).map(|c| c.id);
        match target {
            EditTarget::TrimStart => {
                preview.trim_start = Some(value);
                if let Some(id) = coupled_cue(CueKind::TrimStart) {
                    preview.cues.insert(id, value);
                }
            }
            EditTarget::TrimEnd => {
                preview.trim_end = Some(value);
                if let Some(id) = coupled_cue(CueKind::TrimEnd) {
                    preview.cues.insert(id, value);
                }
            }
            EditTarget::Cue(id) => {
                preview.cues.insert(id, value);
                match effective.cue(id).map(|c| c.kind) {
                    Some(CueKind::TrimStart) => preview.trim_start = Some(value),
                    Some(CueKind::TrimEnd) => preview.trim_end = Some(value),
                    _ => {}
                }
            }
            EditTarget::Crossfade => preview.crossfade_duration = Some(value),
        }
    }

    fn update_for(&self, effective: &Track, target: EditTarget) -> TrackUpdate {
        let sorted_cues = || {
            let mut cues = effective.cue_points.clone();
            cues.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));
            cues
        };
        let mut update = TrackUpdate::default();
        match target {
            EditTarget::TrimStart => {
                update.trim_start = Some(effective.trim_start);
                if effective.trim_cue(CueKind::TrimStart).is_some() {
                    update.cue_points = Some(sorted_cues());
                }
            }
            EditTarget::TrimEnd => {
                update.trim_end = Some(effective.effective_trim_end());
                if effective.trim_cue(CueKind::TrimEnd).is_some() {
                    update.cue_points = Some(sorted_cues());
                }
            }
            EditTarget::Cue(id) => {
                update.cue_points = Some(sorted_cues());
                match effective.cue(id).map(|c| c.kind) {
                    Some(CueKind::TrimStart) => update.trim_start = Some(effective.trim_start),
                    Some(CueKind::TrimEnd) => {
                        update.trim_end = Some(effective.effective_trim_end())
                    }
                    _ => {}
                }
            }
            EditTarget::Crossfade => {
                update.crossfade_duration = Some(effective.crossfade_or(self.default_crossfade))
            }
        }
        update
    }
}

/// Adapter feeding [`DragGesture`](crate::drag::DragGesture) callbacks into an
/// [`EditSession`].
pub struct EditDrag<'a> {
    pub session: &'a mut EditSession,
    pub track: &'a Track,
    pub next: Option<&'a Track>,
    pub target: EditTarget,
    pub pixels_per_second: f64,
    pub snap: SnapMode,
    pub now: Instant,
}

impl DragHandler for EditDrag<'_> {
    fn on_drag_start(&mut self) {
        if let Err(e) = self.session.begin(self.track, self.next, self.target) {
            warn!(track = %self.track.id, error = %e, "Edit could not start");
        }
    }

    fn on_drag_move(&mut self, dx: f64) {
        self.session
            .drag_to(self.track, self.next, dx, self.pixels_per_second, self.snap);
    }

    fn on_drag_end(&mut self, dx: f64) {
        self.on_drag_move(dx);
        self.session.end(self.track, self.now);
    }
}

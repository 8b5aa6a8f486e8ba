//! Element-role hit testing on the track lane.
//!
//! The lane is split vertically into a cue strip on top, the waveform body,
//! and a crossfade strip along the bottom. Interactive elements take
//! precedence over the body so a press on a handle never starts a region
//! selection.

use crate::layout::TrackLayout;
use crate::region::SelectionRegion;
use mixline_core::{CueId, Rect, Track, TrackId, Vec2};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrimEdge {
    Start,
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SelectionEdge {
    Start,
    End,
}

/// What sits under the pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementRole {
    TrackBody,
    TrimHandle(TrimEdge),
    CueMarker(CueId),
    /// Boundary between a track and the next one.
    CrossfadeEdge,
    SelectionEdge(SelectionEdge),
    Empty,
}

impl ElementRole {
    /// Only a press on the bare waveform may begin a region selection.
    pub fn starts_selection(self) -> bool {
        matches!(self, Self::TrackBody)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    pub role: ElementRole,
    pub track_id: Option<TrackId>,
    /// Source time under the pointer within `track_id`.
    pub time: Option<f64>,
}

impl Hit {
    fn empty() -> Self {
        Self {
            role: ElementRole::Empty,
            track_id: None,
            time: None,
        }
    }
}

/// Lane geometry for hit testing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitTester {
    pub lane_height: f64,
    pub cue_strip_height: f64,
    pub crossfade_strip_height: f64,
    pub handle_width: f64,
    pub cue_radius: f64,
}

impl Default for HitTester {
    fn default() -> Self {
        Self {
            lane_height: 120.0,
            cue_strip_height: 16.0,
            crossfade_strip_height: 14.0,
            handle_width: 6.0,
            cue_radius: 5.0,
        }
    }
}

impl HitTester {
    /// Resolve the element at `pos` (timeline coordinates, y relative to the
    /// lane top). `tracks` must be the effective (preview-applied) tracks the
    /// layout was computed from.
    pub fn hit_test(
        &self,
        layout: &TrackLayout,
        tracks: &[Track],
        selection: Option<&SelectionRegion>,
        pos: Vec2,
    ) -> Hit {
        let lane = Rect::new(0.0, 0.0, layout.total_width(), self.lane_height);
        if !lane.contains(pos) {
            return Hit::empty();
        }
        let x = pos.x;

        if let Some(sel) = selection {
            for (edge, t) in [(SelectionEdge::Start, sel.start), (SelectionEdge::End, sel.end)] {
                if let Some(ex) = layout.time_to_x(sel.track_id, t) {
                    if (x - ex).abs() <= self.handle_width / 2.0 {
                        return Hit {
                            role: ElementRole::SelectionEdge(edge),
                            track_id: Some(sel.track_id),
                            time: Some(t),
                        };
                    }
                }
            }
        }

        if pos.y < self.cue_strip_height {
            for track in tracks.iter().rev() {
                for cue in &track.cue_points {
                    let Some(cx) = layout.time_to_x(track.id, cue.timestamp) else {
                        continue;
                    };
                    if (x - cx).abs() <= self.cue_radius {
                        return Hit {
                            role: ElementRole::CueMarker(cue.id),
                            track_id: Some(track.id),
                            time: Some(cue.timestamp),
                        };
                    }
                }
            }
        }

        if pos.y >= self.lane_height - self.crossfade_strip_height {
            for p in layout.positions().iter() {
                if p.crossfade_width > 0.0
                    && (x - p.crossfade_left()).abs() <= self.handle_width / 2.0
                {
                    return Hit {
                        role: ElementRole::CrossfadeEdge,
                        track_id: Some(p.track_id),
                        time: layout.x_to_time(p.track_id, x),
                    };
                }
            }
        }

        let Some(p) = layout.track_at_x(x) else {
            return Hit::empty();
        };
        let role = if x - p.left < self.handle_width {
            ElementRole::TrimHandle(TrimEdge::Start)
        } else if p.right() - x <= self.handle_width {
            ElementRole::TrimHandle(TrimEdge::End)
        } else {
            ElementRole::TrackBody
        };
        Hit {
            role,
            track_id: Some(p.track_id),
            time: layout.x_to_time(p.track_id, x),
        }
    }
}

//! Track and cue point data model.
//!
//! Tracks are owned by the host's project store. The engine reads them and
//! proposes partial updates through [`TrackUpdate`]; it never mutates the
//! authoritative copy itself.

use crate::beat::BeatGrid;
use crate::crossfade::CurveType;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique track identifier.
pub type TrackId = Uuid;

/// Cue point identifier, unique within its track.
pub type CueId = Uuid;

/// Kind of cue point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CueKind {
    Marker,
    TrimStart,
    TrimEnd,
}

impl CueKind {
    /// Trim-kind cue points are singletons and drive the matching trim field.
    pub fn is_trim(self) -> bool {
        matches!(self, Self::TrimStart | Self::TrimEnd)
    }
}

/// A labelled position inside a track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CuePoint {
    pub id: CueId,
    /// Seconds from the start of the source audio.
    pub timestamp: f64,
    pub label: String,
    pub kind: CueKind,
}

impl CuePoint {
    /// Create a new cue point with a fresh id.
    pub fn new(timestamp: f64, label: impl Into<String>, kind: CueKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp,
            label: label.into(),
            kind,
        }
    }
}

/// A track in the mix, as seen by the timeline engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: TrackId,
    pub name: String,
    /// Source duration in seconds.
    pub duration: f64,
    pub trim_start: f64,
    /// `None` means "play to the end of the source".
    pub trim_end: Option<f64>,
    /// Overlap with the following track; `None` uses the engine default.
    pub crossfade_duration: Option<f64>,
    pub crossfade_curve: CurveType,
    pub bpm: Option<f64>,
    pub first_beat_offset: Option<f64>,
    pub cue_points: Vec<CuePoint>,
}

impl Track {
    /// Create an untrimmed track.
    pub fn new(name: impl Into<String>, duration: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            duration: duration.max(0.0),
            trim_start: 0.0,
            trim_end: None,
            crossfade_duration: None,
            crossfade_curve: CurveType::default(),
            bpm: None,
            first_beat_offset: None,
            cue_points: Vec::new(),
        }
    }

    /// Builder-style beat grid setup.
    pub fn with_beat_grid(mut self, bpm: f64, first_beat_offset: f64) -> Self {
        self.bpm = Some(bpm);
        self.first_beat_offset = Some(first_beat_offset);
        self
    }

    /// Trim end, falling back to the full source duration.
    #[inline]
    pub fn effective_trim_end(&self) -> f64 {
        self.trim_end.unwrap_or(self.duration)
    }

    /// Audible length after trimming. Never negative.
    #[inline]
    pub fn effective_duration(&self) -> f64 {
        (self.effective_trim_end() - self.trim_start).max(0.0)
    }

    /// Crossfade length into the next track.
    #[inline]
    pub fn crossfade_or(&self, default: f64) -> f64 {
        self.crossfade_duration.unwrap_or(default).max(0.0)
    }

    /// Beat grid, if the track has a usable bpm and first-beat offset.
    pub fn beat_grid(&self) -> Option<BeatGrid> {
        BeatGrid::new(self.bpm?, self.first_beat_offset?)
    }

    /// Range a trim point of `kind` may take while staying `min_gap` seconds
    /// away from the opposite trim point. Markers may sit anywhere inside
    /// the trimmed window.
    pub fn trim_bounds(&self, kind: CueKind, min_gap: f64) -> (f64, f64) {
        match kind {
            CueKind::TrimStart => (0.0, (self.effective_trim_end() - min_gap).max(0.0)),
            CueKind::TrimEnd => ((self.trim_start + min_gap).min(self.duration), self.duration),
            CueKind::Marker => (self.trim_start, self.effective_trim_end()),
        }
    }

    /// Propose cropping the track to `[start, end]`.
    ///
    /// The span is widened to `min_gap` if needed, growing the end first and
    /// then the start. Existing trim cues move with their trim points.
    pub fn propose_trim(&self, start: f64, end: f64, min_gap: f64) -> TrackUpdate {
        let mut start = start.clamp(0.0, self.duration);
        let mut end = end.clamp(start, self.duration);
        if end - start < min_gap {
            end = (start + min_gap).min(self.duration);
            start = (end - min_gap).max(0.0);
        }

        let mut update = TrackUpdate {
            trim_start: Some(start),
            trim_end: Some(end),
            ..Default::default()
        };
        if self.cue_points.iter().any(|c| c.kind.is_trim()) {
            let mut cues = self.cue_points.clone();
            for cue in &mut cues {
                match cue.kind {
                    CueKind::TrimStart => cue.timestamp = start,
                    CueKind::TrimEnd => cue.timestamp = end,
                    CueKind::Marker => {}
                }
            }
            cues.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));
            update.cue_points = Some(cues);
        }
        update
    }

    /// Find a cue point by id.
    pub fn cue(&self, id: CueId) -> Option<&CuePoint> {
        self.cue_points.iter().find(|c| c.id == id)
    }

    /// The committed trim-kind cue of the given kind, if any.
    pub fn trim_cue(&self, kind: CueKind) -> Option<&CuePoint> {
        self.cue_points.iter().find(|c| c.kind == kind)
    }

    /// Propose adding a cue point.
    ///
    /// Markers are appended. A trim-kind cue replaces any existing cue of the
    /// same kind and also proposes the matching trim field, moved inside
    /// [`trim_bounds`](Self::trim_bounds) first.
    pub fn propose_cue_point(&self, mut cue: CuePoint, min_gap: f64) -> TrackUpdate {
        if cue.kind.is_trim() {
            let (lo, hi) = self.trim_bounds(cue.kind, min_gap);
            cue.timestamp = cue.timestamp.clamp(lo, hi.max(lo));
        }
        let mut cues: Vec<CuePoint> = if cue.kind.is_trim() {
            self.cue_points
                .iter()
                .filter(|c| c.kind != cue.kind)
                .cloned()
                .collect()
        } else {
            self.cue_points.clone()
        };

        let mut update = TrackUpdate::default();
        match cue.kind {
            CueKind::TrimStart => update.trim_start = Some(cue.timestamp),
            CueKind::TrimEnd => update.trim_end = Some(cue.timestamp),
            CueKind::Marker => {}
        }
        cues.push(cue);
        cues.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));
        update.cue_points = Some(cues);
        update
    }

    /// Propose removing a cue point. Returns `None` if the id is unknown.
    pub fn propose_cue_removal(&self, id: CueId) -> Option<TrackUpdate> {
        self.cue(id)?;
        let cues = self
            .cue_points
            .iter()
            .filter(|c| c.id != id)
            .cloned()
            .collect();
        Some(TrackUpdate {
            cue_points: Some(cues),
            ..Default::default()
        })
    }
}

/// Partial set of track fields proposed by the engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trim_start: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trim_end: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crossfade_duration: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crossfade_curve: Option<CurveType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cue_points: Option<Vec<CuePoint>>,
}

impl TrackUpdate {
    /// True if no field is set.
    pub fn is_empty(&self) -> bool {
        self.trim_start.is_none()
            && self.trim_end.is_none()
            && self.crossfade_duration.is_none()
            && self.crossfade_curve.is_none()
            && self.cue_points.is_none()
    }

    /// Merge a newer update into this one. Fields set in `newer` win.
    pub fn merge(&mut self, newer: TrackUpdate) {
        if newer.trim_start.is_some() {
            self.trim_start = newer.trim_start;
        }
        if newer.trim_end.is_some() {
            self.trim_end = newer.trim_end;
        }
        if newer.crossfade_duration.is_some() {
            self.crossfade_duration = newer.crossfade_duration;
        }
        if newer.crossfade_curve.is_some() {
            self.crossfade_curve = newer.crossfade_curve;
        }
        if newer.cue_points.is_some() {
            self.cue_points = newer.cue_points;
        }
    }

    /// Apply the proposed fields to a track copy.
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
        if let Some(v) = self.crossfade_curve {
            track.crossfade_curve = v;
        }
        if let Some(ref cues) = self.cue_points {
            track.cue_points = cues.clone();
        }
    }
}

//! Interfaces to the collaborators that live outside the engine.

use mixline_core::{Result, TrackId, TrackUpdate};

/// Persists committed track edits (the host's project store).
pub trait TrackUpdater {
    /// Apply `update` to the authoritative track. An `Err` means the edit was
    /// rejected; the engine keeps showing its preview.
    fn update_track(&mut self, track_id: TrackId, update: &TrackUpdate) -> Result<()>;
}

/// Audio transport.
pub trait Transport {
    fn play(&mut self, track_id: TrackId, at: f64);
    fn stop(&mut self);
    fn set_loop_region(&mut self, start: f64, end: f64);
}

impl<F> TrackUpdater for F
where
    F: FnMut(TrackId, &TrackUpdate) -> Result<()>,
{
    fn update_track(&mut self, track_id: TrackId, update: &TrackUpdate) -> Result<()> {
        self(track_id, update)
    }
}

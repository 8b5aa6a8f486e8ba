//! Playback position clock.
//!
//! Position updates arrive at audio-callback rate. They bypass the view
//! store and go to a dedicated clock whose subscribers typically update a
//! single [`PlayheadTransform`], so the rest of the timeline is not redrawn
//! on every tick.

use crate::layout::TrackLayout;
use crate::store::{Listener, SharedStore, StateContainer, SubscriptionId};
use mixline_core::TrackId;
use parking_lot::Mutex;
use std::sync::Arc;

/// Where playback is.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PlaybackPosition {
    pub track_id: Option<TrackId>,
    /// Source time within `track_id`.
    pub time: f64,
    pub playing: bool,
}

/// Display state of the playhead line.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PlayheadTransform {
    /// Timeline x of the playhead.
    pub x: f64,
    pub visible: bool,
}

impl PlayheadTransform {
    pub fn from_position(layout: &TrackLayout, position: &PlaybackPosition) -> Self {
        position
            .track_id
            .and_then(|id| layout.time_to_x(id, position.time))
            .map(|x| Self { x, visible: true })
            .unwrap_or_default()
    }
}

/// Publish/subscribe channel for playback position.
pub struct PlayheadClock {
    position: SharedStore<PlaybackPosition>,
}

impl PlayheadClock {
    pub fn new() -> Self {
        Self {
            position: SharedStore::new(PlaybackPosition::default()),
        }
    }

    pub fn position(&self) -> PlaybackPosition {
        self.position.get()
    }

    pub fn publish(&self, position: PlaybackPosition) {
        self.position.set(position);
    }

    pub fn subscribe(&self, listener: Listener<PlaybackPosition>) -> SubscriptionId {
        self.position.subscribe(listener)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.position.unsubscribe(id)
    }

    /// Keep `transform` in sync with the clock against the layout in `layout`.
    pub fn bind_transform(
        &self,
        layout: Arc<Mutex<TrackLayout>>,
        transform: Arc<Mutex<PlayheadTransform>>,
    ) -> SubscriptionId {
        self.subscribe(Arc::new(move |pos: &PlaybackPosition| {
            let next = PlayheadTransform::from_position(&layout.lock(), pos);
            *transform.lock() = next;
        }))
    }
}

impl Default for PlayheadClock {
    fn default() -> Self {
        Self::new()
    }
}

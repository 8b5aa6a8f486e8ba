//! Debounced commits to the persistence collaborator.
//!
//! Each track has at most one pending commit. Scheduling again before the
//! deadline merges the new fields over the pending ones and restarts the
//! timer, so rapid consecutive edits produce a single write with the latest
//! values. Time is passed in explicitly; the host calls [`CommitDebouncer::poll`]
//! from its frame loop.

use crate::collab::TrackUpdater;
use mixline_core::{MixlineError, TrackId, TrackUpdate};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
struct Pending {
    update: TrackUpdate,
    due: Instant,
}

/// Outcome of one fired commit.
#[derive(Debug)]
pub enum CommitResult {
    Committed {
        track_id: TrackId,
        update: TrackUpdate,
    },
    Rejected {
        track_id: TrackId,
        update: TrackUpdate,
        error: MixlineError,
    },
}

impl CommitResult {
    pub fn track_id(&self) -> TrackId {
        match self {
            Self::Committed { track_id, .. } | Self::Rejected { track_id, .. } => *track_id,
        }
    }

    pub fn is_committed(&self) -> bool {
        matches!(self, Self::Committed { .. })
    }
}

/// Per-track last-write-wins commit timer.
#[derive(Debug)]
pub struct CommitDebouncer {
    delay: Duration,
    pending: HashMap<TrackId, Pending>,
}

impl CommitDebouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: HashMap::new(),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Schedule `update` for `track_id`, merging over any pending update and
    /// restarting its timer.
    pub fn schedule(&mut self, track_id: TrackId, update: TrackUpdate, now: Instant) {
        if update.is_empty() {
            return;
        }
        let due = now + self.delay;
        match self.pending.get_mut(&track_id) {
            Some(pending) => {
                pending.update.merge(update);
                pending.due = due;
            }
            None => {
                self.pending.insert(track_id, Pending { update, due });
            }
        }
        debug!(track = %track_id, delay_ms = self.delay.as_millis() as u64, "Commit scheduled");
    }

    /// Stop the timer for a track and hand back its pending update, if any.
    ///
    /// Used when a new drag starts on a track whose previous edit has not been
    /// written yet: the caller keeps the pending values as its reference and
    /// reschedules them together with the new edit.
    pub fn take(&mut self, track_id: TrackId) -> Option<TrackUpdate> {
        self.pending.remove(&track_id).map(|p| p.update)
    }

    pub fn pending(&self, track_id: TrackId) -> Option<&TrackUpdate> {
        self.pending.get(&track_id).map(|p| &p.update)
    }

    pub fn is_pending(&self, track_id: TrackId) -> bool {
        self.pending.contains_key(&track_id)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Earliest deadline among pending commits.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.values().map(|p| p.due).min()
    }

    /// Fire every commit whose deadline has passed.
    pub fn poll(&mut self, now: Instant, updater: &mut dyn TrackUpdater) -> Vec<CommitResult> {
        let mut due: Vec<(TrackId, Instant)> = self
            .pending
            .iter()
            .filter(|(_, p)| p.due <= now)
            .map(|(id, p)| (*id, p.due))
            .collect();
        due.sort_by_key(|(_, at)| *at);

        let mut results = Vec::with_capacity(due.len());
        for (track_id, _) in due {
            let Some(pending) = self.pending.remove(&track_id) else {
                continue;
            };
            match updater.update_track(track_id, &pending.update) {
                Ok(()) => {
                    info!(track = %track_id, "Track edit committed");
                    results.push(CommitResult::Committed {
                        track_id,
                        update: pending.update,
                    });
                }
                Err(error) => {
                    warn!(track = %track_id, error = %error, "Track edit rejected");
                    results.push(CommitResult::Rejected {
                        track_id,
                        update: pending.update,
                        error,
                    });
                }
            }
        }
        results
    }

    /// Fire everything immediately, regardless of deadlines.
    pub fn flush(&mut self, updater: &mut dyn TrackUpdater) -> Vec<CommitResult> {
        let latest = self.pending.values().map(|p| p.due).max();
        match latest {
            Some(at) => self.poll(at, updater),
            None => Vec::new(),
        }
    }
}

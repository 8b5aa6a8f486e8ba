//! Injected state container for view, zoom and selection state.
//!
//! Components never reach for globals: they hold an
//! `Arc<dyn StateContainer<ViewState>>` and read, write and subscribe
//! through it. Tests swap in a fresh [`SharedStore`] per case.

use crate::region::SelectionRegion;
use mixline_core::{EngineConfig, SnapMode};
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Handle returned by [`StateContainer::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Change listener.
pub type Listener<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// get/set/subscribe access to a piece of shared state.
pub trait StateContainer<T>: Send + Sync {
    /// Snapshot of the current value.
    fn get(&self) -> T;

    /// Replace the value. Listeners run only if the value changed.
    fn set(&self, value: T);

    /// Mutate the value in place. Listeners run only if it changed.
    fn update(&self, f: &mut dyn FnMut(&mut T));

    fn subscribe(&self, listener: Listener<T>) -> SubscriptionId;

    /// Returns `false` if the id was not registered.
    fn unsubscribe(&self, id: SubscriptionId) -> bool;
}

/// View state shared by every timeline component.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewState {
    /// Horizontal scroll in pixels, never negative.
    pub scroll_position: f64,
    /// Measured width of the scroll container.
    pub viewport_width: f64,
    /// Zoom multiplier, clamped to the configured range.
    pub zoom_level: f64,
    pub snap_mode: SnapMode,
    pub frequency_colors: bool,
    /// Active (promoted) region selection.
    pub selection: Option<SelectionRegion>,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            scroll_position: 0.0,
            viewport_width: 0.0,
            zoom_level: 1.0,
            snap_mode: SnapMode::Off,
            frequency_colors: false,
            selection: None,
        }
    }
}

impl ViewState {
    /// Pixels per second at the current zoom.
    pub fn pixels_per_second(&self, config: &EngineConfig) -> f64 {
        config.pixels_per_second(self.zoom_level)
    }

    /// Visible timeline span `[scroll, scroll + viewport)`.
    pub fn visible_span(&self) -> (f64, f64) {
        (
            self.scroll_position,
            self.scroll_position + self.viewport_width,
        )
    }
}

/// Thread-safe [`StateContainer`] backed by `parking_lot` locks.
pub struct SharedStore<T> {
    value: RwLock<T>,
    listeners: Mutex<Vec<(SubscriptionId, Listener<T>)>>,
    next_id: AtomicU64,
}

impl<T: Clone + PartialEq + Send + Sync> SharedStore<T> {
    pub fn new(value: T) -> Self {
        Self {
            value: RwLock::new(value),
            listeners: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Convenience constructor for the usual `Arc<dyn StateContainer>` handle.
    pub fn shared(value: T) -> Arc<dyn StateContainer<T>>
    where
        T: 'static,
    {
        Arc::new(Self::new(value))
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().len()
    }

    fn notify(&self, value: &T) {
        // Clone the list so listeners may subscribe/unsubscribe re-entrantly.
        let listeners: Vec<Listener<T>> = self
            .listeners
            .lock()
            .iter()
            .map(|(_, l)| Arc::clone(l))
            .collect();
        for listener in listeners {
            listener(value);
        }
    }
}

impl<T: Clone + PartialEq + Send + Sync> StateContainer<T> for SharedStore<T> {
    fn get(&self) -> T {
        self.value.read().clone()
    }

    fn set(&self, value: T) {
        let changed = {
            let mut guard = self.value.write();
            if *guard == value {
                false
            } else {
                *guard = value.clone();
                true
            }
        };
        if changed {
            self.notify(&value);
        }
    }

    fn update(&self, f: &mut dyn FnMut(&mut T)) {
        let changed = {
            let mut guard = self.value.write();
            let before = guard.clone();
            f(&mut *guard);
            (*guard != before).then(|| guard.clone())
        };
        if let Some(value) = changed {
            self.notify(&value);
        }
    }

    fn subscribe(&self, listener: Listener<T>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners.lock().push((id, listener));
        id
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = self.listeners.lock();
        let before = listeners.len();
        listeners.retain(|(sid, _)| *sid != id);
        listeners.len() != before
    }
}

//! Threshold-activated pointer drag gesture.
//!
//! A press only becomes a drag once the pointer has moved at least
//! `threshold` pixels from where it went down. Until then no drag callbacks
//! fire, so a plain click on the same element still reaches its click
//! handler. A release past the threshold with no move in between still
//! runs the full drag sequence. The pointer is captured on press and
//! released on every pointer-up, dragged or not.

use mixline_core::Vec2;
use tracing::debug;

/// Identifier of a pointer (mouse, pen or touch contact).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PointerId(pub u64);

/// Host-environment hooks a gesture needs.
pub trait PointerHost {
    /// Route all events for `pointer` to the gesture's element.
    fn capture_pointer(&mut self, pointer: PointerId);
    fn release_pointer(&mut self, pointer: PointerId);
    /// Global text selection toggle, disabled for the length of a drag.
    fn set_text_selection_enabled(&mut self, enabled: bool);
}

/// Receiver of drag callbacks. `dx` is always measured from the press.
pub trait DragHandler {
    fn on_drag_start(&mut self);
    fn on_drag_move(&mut self, dx: f64);
    fn on_drag_end(&mut self, dx: f64);
    /// Released without ever crossing the threshold.
    fn on_click(&mut self) {}
}

/// Result of a pointer-up.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DragOutcome {
    /// No press was in progress for this pointer.
    Ignored,
    Clicked,
    Dragged { dx: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Phase {
    Idle,
    Pressed { pointer: PointerId, origin: Vec2 },
    Dragging { pointer: PointerId, origin: Vec2 },
}

/// Pointer drag state machine.
#[derive(Debug, Clone)]
pub struct DragGesture {
    threshold: f64,
    phase: Phase,
}

impl DragGesture {
    /// Default activation distance in pixels.
    pub const DEFAULT_THRESHOLD: f64 = 3.0;

    pub fn new(threshold: f64) -> Self {
        Self {
            threshold: threshold.max(0.0),
            phase: Phase::Idle,
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// True between press and release.
    pub fn is_pressed(&self) -> bool {
        !matches!(self.phase, Phase::Idle)
    }

    /// True once the threshold has been crossed.
    pub fn is_dragging(&self) -> bool {
        matches!(self.phase, Phase::Dragging { .. })
    }

    pub fn pointer_down(&mut self, pointer: PointerId, pos: Vec2, host: &mut dyn PointerHost) {
        if self.is_pressed() {
            return;
        }
        host.capture_pointer(pointer);
        self.phase = Phase::Pressed {
            pointer,
            origin: pos,
        };
    }

    pub fn pointer_move(
        &mut self,
        pointer: PointerId,
        pos: Vec2,
        host: &mut dyn PointerHost,
        handler: &mut dyn DragHandler,
    ) {
        match self.phase {
            Phase::Pressed {
                pointer: p,
                origin,
            } if p == pointer => {
                if pos.distance(origin) >= self.threshold {
                    debug!(pointer = pointer.0, "Drag activated");
                    self.phase = Phase::Dragging { pointer, origin };
                    host.set_text_selection_enabled(false);
                    handler.on_drag_start();
                    handler.on_drag_move(pos.x - origin.x);
                }
            }
            Phase::Dragging {
                pointer: p,
                origin,
            } if p == pointer => {
                handler.on_drag_move(pos.x - origin.x);
            }
            _ => {}
        }
    }

    pub fn pointer_up(
        &mut self,
        pointer: PointerId,
        pos: Vec2,
        host: &mut dyn PointerHost,
        handler: &mut dyn DragHandler,
    ) -> DragOutcome {
        let outcome = match self.phase {
            Phase::Pressed {
                pointer: p,
                origin,
            } if p == pointer => {
                if pos.distance(origin) >= self.threshold {
                    // Crossed the threshold between the last move and the release.
                    let dx = pos.x - origin.x;
                    debug!(pointer = pointer.0, "Drag activated on release");
                    host.set_text_selection_enabled(false);
                    handler.on_drag_start();
                    handler.on_drag_move(dx);
                    handler.on_drag_end(dx);
                    host.set_text_selection_enabled(true);
                    DragOutcome::Dragged { dx }
                } else {
                    handler.on_click();
                    DragOutcome::Clicked
                }
            }
            Phase::Dragging {
                pointer: p,
                origin,
            } if p == pointer => {
                let dx = pos.x - origin.x;
                handler.on_drag_end(dx);
                host.set_text_selection_enabled(true);
                DragOutcome::Dragged { dx }
            }
            _ => return DragOutcome::Ignored,
        };
        host.release_pointer(pointer);
        self.phase = Phase::Idle;
        outcome
    }
}

impl Default for DragGesture {
    fn default() -> Self {
        Self::new(Self::DEFAULT_THRESHOLD)
    }
}

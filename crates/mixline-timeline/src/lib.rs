//! Mixline Timeline - Interaction state for the multi-track timeline
//!
//! Everything here is independent of the drawing toolkit:
//! - Track layout with crossfade overlaps
//! - Injected view-state container
//! - Threshold drag gestures and hit testing
//! - Trim, cue point, crossfade and region editing with debounced commits
//! - Viewport scroll/zoom synchronization and playhead follow

pub mod clock;
pub mod collab;
pub mod debounce;
pub mod drag;
pub mod edit;
pub mod hit;
pub mod layout;
pub mod region;
pub mod store;
pub mod viewport;

pub use clock::{PlaybackPosition, PlayheadClock, PlayheadTransform};
pub use collab::{TrackUpdater, Transport};
pub use debounce::{CommitDebouncer, CommitResult};
pub use drag::{DragGesture, DragHandler, DragOutcome, PointerHost, PointerId};
pub use edit::{EditDrag, EditSession, EditTarget, TrackPreview};
pub use hit::{ElementRole, Hit, HitTester, SelectionEdge, TrimEdge};
pub use layout::{TrackLayout, TrackPosition};
pub use region::{RegionSelector, SelectionRegion};
pub use store::{Listener, SharedStore, StateContainer, SubscriptionId, ViewState};
pub use viewport::{ScrollEvent, ViewportSync};

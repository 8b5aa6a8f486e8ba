//! Mixline UI - egui front end for the timeline engine
//!
//! Wires the toolkit-independent engine to egui:
//! - Timeline canvas with waveform tiles, handles, cue markers and selection
//! - Minimap strip with viewport navigation
//! - Dark theme

pub mod canvas;
pub mod minimap;
pub mod theme;

pub use canvas::{TimelineAction, TimelineCanvas, TimelineInput};
pub use minimap::MinimapView;
pub use theme::Theme;

//! Mixline Core - Foundation types for the timeline engine
//!
//! This crate provides the pieces every other Mixline crate builds on:
//! - Track and cue point data model, plus partial update proposals
//! - Crossfade gain curves
//! - Max-pooling peak downsampling
//! - Beat grid quantization
//! - Engine configuration and error types

pub mod beat;
pub mod color;
pub mod config;
pub mod crossfade;
pub mod error;
pub mod geometry;
pub mod peaks;
pub mod track;

pub use beat::{BeatGrid, SnapMode};
pub use color::Color;
pub use config::EngineConfig;
pub use crossfade::{gains, sample_curve, CurveSamples, CurveType, Gains};
pub use error::{MixlineError, Result};
pub use geometry::{Rect, Vec2};
pub use peaks::{downsample_max, PeakBands, PeakSet};
pub use track::{CueId, CueKind, CuePoint, Track, TrackId, TrackUpdate};

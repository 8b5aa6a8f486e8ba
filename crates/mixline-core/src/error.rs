//! Error types for Mixline.

use crate::track::TrackId;
use thiserror::Error;

/// Main error type for Mixline operations.
#[derive(Error, Debug)]
pub enum MixlineError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Track not found: {0}")]
    TrackNotFound(TrackId),

    #[error("Commit rejected for track {track}: {reason}")]
    Commit { track: TrackId, reason: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type alias for Mixline operations.
pub type Result<T> = std::result::Result<T, MixlineError>;

//! Error types for the tracker.

use thiserror::Error;

/// Result type alias used throughout the crate.
pub type Result<T> = std::result::Result<T, TrackerError>;

/// Errors surfaced to callers of the tracker.
///
/// Misses in any resolution stage (no motion sample, no gallery, no
/// appearance match) are not errors; only invalid inputs and resource
/// failures end up here.
#[derive(Error, Debug)]
pub enum TrackerError {
    #[error("detection {index} has invalid size {width}x{height}")]
    InvalidDetection { index: usize, width: u32, height: u32 },

    #[error("frame size changed: expected {expected:?}, got {actual:?}")]
    FrameSizeMismatch {
        expected: (u32, u32),
        actual: (u32, u32),
    },

    #[error("appearance model loading failed: {0}")]
    ModelLoad(String),

    #[error("appearance preprocessing failed: {0}")]
    Preprocessing(String),

    #[error("detection has no resolved identity")]
    Unresolved,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("detector failed: {0}")]
    Detection(String),
}

impl TrackerError {
    pub fn model_load<S: Into<String>>(msg: S) -> Self {
        Self::ModelLoad(msg.into())
    }

    pub fn preprocessing<S: Into<String>>(msg: S) -> Self {
        Self::Preprocessing(msg.into())
    }

    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::InvalidConfig(msg.into())
    }
}

//! Tutorial error type.
//!
//! Only construction can fail for good. Input and motion problems are
//! recovered where they happen and only show up in the logs.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TutorialError {
    #[error("invalid color {0:?}, expected #RRGGBB")]
    InvalidColor(String),

    #[error("palette needs {expected} colors, got {found}")]
    PaletteSize { expected: usize, found: usize },

    #[error("screen {width}x{height} cannot hold the dot grid: {reason}")]
    InvalidGeometry {
        width: i32,
        height: i32,
        reason: &'static str,
    },

    #[error("malformed accelerometer reading {0:?}")]
    MalformedSample(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
}

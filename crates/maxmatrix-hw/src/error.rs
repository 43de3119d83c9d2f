//! Error types for the MaxMatrix hardware library.

use embedded_hal::digital::ErrorKind;
use thiserror::Error;

use crate::bus::Line;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when driving the chain.
///
/// Coordinates are never an error: pixel and sprite operations clip
/// anything outside the chain.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A bus line rejected a level change.
    #[error("GPIO error on {line} line: {kind:?}")]
    Gpio { line: Line, kind: ErrorKind },

    /// Panel geometry outside what a column register can hold.
    #[error("Invalid panel geometry {width}x{height} (each side must be 1-8)")]
    InvalidGeometry { width: u8, height: u8 },

    /// Sprite asset too short to carry its width/height header.
    #[error("Sprite asset too short for header: {len} bytes")]
    SpriteHeader { len: usize },

    /// Sprite asset has fewer column bytes than its width.
    #[error("Sprite size mismatch: expected {expected} columns, got {actual}")]
    SpriteSize { expected: usize, actual: usize },

    /// Sprite taller than a column byte.
    #[error("Invalid sprite height (must be 0-8): {0}")]
    SpriteHeight(u8),

    /// Invalid shift direction name.
    #[error("Invalid direction: {0}")]
    InvalidDirection(String),
}

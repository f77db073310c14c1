//! Error types for the encoder core.
//!
//! These cover value construction only; session protocol errors live in
//! `encode-session`.

use thiserror::Error;

/// Main error type for the core value types.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Invalid parameter provided.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Frame dimensions are unusable.
    #[error("Invalid dimensions {width}x{height}: {reason}")]
    InvalidDimensions {
        width: u32,
        height: u32,
        reason: &'static str,
    },

    /// Plane buffer does not match the frame geometry.
    #[error("Buffer too small for plane {plane}: need {needed} bytes, have {available}")]
    BufferTooSmall {
        plane: usize,
        needed: usize,
        available: usize,
    },

    /// Codec-level failure reported by a collaborator.
    #[error("Codec error: {0}")]
    Codec(String),

    /// End of stream reached.
    #[error("End of stream")]
    EndOfStream,
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create an invalid parameter error.
    pub fn invalid_param(msg: impl Into<String>) -> Self {
        Error::InvalidParameter(msg.into())
    }

    /// Check if this is an end-of-stream error.
    #[must_use]
    pub fn is_eof(&self) -> bool {
        matches!(self, Error::EndOfStream)
    }
}

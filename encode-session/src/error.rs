//! Session error types.

use crate::session::SessionState;
use thiserror::Error;

/// Errors returned by the encoder session.
///
/// The first four variants are the session protocol; none of them is fatal.
/// Callers match on the variant, never on the message.
#[derive(Error, Debug)]
pub enum SessionError {
    /// Not enough buffered input to produce a packet; submit or flush.
    #[error("need more data")]
    NeedMoreData,

    /// Flush completed and every packet was delivered.
    #[error("end of stream")]
    EndOfStream,

    /// Operation not valid in the current state.
    #[error("{operation} is not allowed while the session is {state}")]
    InvalidState {
        /// Operation that was attempted.
        operation: &'static str,
        /// State the session was in.
        state: SessionState,
    },

    /// Input queue is full; poll packets before submitting more.
    #[error("input queue is full ({capacity} frames)")]
    CapacityExceeded {
        /// Configured queue capacity.
        capacity: usize,
    },

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Frame does not match the session geometry.
    #[error("Invalid frame: {0}")]
    InvalidFrame(String),

    /// Compressor failure or broken packet accounting.
    #[error("Compressor error: {0}")]
    Compressor(String),

    /// Error from the core value types.
    #[error(transparent)]
    Core(#[from] encode_core::Error),
}

impl SessionError {
    /// The caller must submit a frame or flush before polling again.
    #[must_use]
    pub fn is_need_more_data(&self) -> bool {
        matches!(self, SessionError::NeedMoreData)
    }

    /// Terminal end-of-stream signal.
    #[must_use]
    pub fn is_eof(&self) -> bool {
        matches!(self, SessionError::EndOfStream)
    }

    /// Queue full; draining packets makes room.
    #[must_use]
    pub fn is_backpressure(&self) -> bool {
        matches!(self, SessionError::CapacityExceeded { .. })
    }

    /// Caller programming errors that should not be swallowed.
    #[must_use]
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            SessionError::InvalidState { .. }
                | SessionError::InvalidFrame(_)
                | SessionError::InvalidConfig(_)
        )
    }
}

impl From<SessionError> for encode_core::Error {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::EndOfStream => encode_core::Error::EndOfStream,
            SessionError::Core(inner) => inner,
            other => encode_core::Error::Codec(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_messages() {
        assert_eq!(SessionError::NeedMoreData.to_string(), "need more data");
        assert_eq!(SessionError::EndOfStream.to_string(), "end of stream");

        let err = SessionError::InvalidState {
            operation: "submit_frame",
            state: SessionState::Draining,
        };
        assert_eq!(
            err.to_string(),
            "submit_frame is not allowed while the session is draining"
        );
    }

    #[test]
    fn test_classification() {
        assert!(SessionError::NeedMoreData.is_need_more_data());
        assert!(SessionError::EndOfStream.is_eof());
        assert!(SessionError::CapacityExceeded { capacity: 2 }.is_backpressure());
        assert!(SessionError::InvalidFrame("size".into()).is_caller_error());
        assert!(!SessionError::NeedMoreData.is_caller_error());
    }

    #[test]
    fn test_core_conversion() {
        let core: encode_core::Error = SessionError::EndOfStream.into();
        assert!(core.is_eof());

        let core: encode_core::Error = SessionError::Compressor("boom".into()).into();
        assert!(matches!(core, encode_core::Error::Codec(_)));
    }
}

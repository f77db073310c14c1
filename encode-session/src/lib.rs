//! Encoder session for bounded-lookahead video compression.
//!
//! This crate provides the state machine that sits between a caller pushing
//! raw frames and a compressor that needs to see future frames before it can
//! emit output.
//!
//! # Features
//!
//! - Bounded input queue with explicit backpressure (`CapacityExceeded`)
//! - Two-signal polling protocol: `NeedMoreData` and `EndOfStream`
//! - Packets delivered strictly in submission order, even from reordering
//!   compressors
//! - Pluggable [`Compressor`] with a deterministic built-in implementation
//! - [`SharedSession`] for producer/consumer threads
//!
//! # Example
//!
//! ```
//! use encode_session::{EncodeSession, SessionConfig, SessionError};
//!
//! let config = SessionConfig::new(64, 96)
//!     .with_lookahead(1)
//!     .with_queue_capacity(4);
//! let mut session = EncodeSession::new(config)?;
//!
//! let frame = session.new_frame()?;
//! for _ in 0..3 {
//!     session.submit_frame(frame.clone())?;
//! }
//! session.request_flush()?;
//!
//! let mut packets = Vec::new();
//! loop {
//!     match session.poll_packet() {
//!         Ok(packet) => packets.push(packet.describe()),
//!         Err(SessionError::EndOfStream) => break,
//!         Err(e) => return Err(e),
//!     }
//! }
//! assert_eq!(packets.len(), 3);
//! # Ok::<(), SessionError>(())
//! ```

mod compressor;
mod config;
mod error;
mod session;
mod shared;

pub use compressor::{Compressor, LookaheadCompressor, QueuedFrame};
pub use config::{Preset, SessionConfig, MAX_LOOKAHEAD};
pub use encode_core::{Frame, FrameType, Packet};
pub use error::SessionError;
pub use session::{EncodeSession, SessionState, SessionStats};
pub use shared::SharedSession;

/// Result type for session operations.
pub type Result<T> = std::result::Result<T, SessionError>;

/// Session crate information.
pub struct SessionInfo {
    /// Crate name.
    pub name: &'static str,
    /// Crate version.
    pub version: &'static str,
    /// Default lookahead depth.
    pub default_lookahead: usize,
    /// Maximum lookahead depth.
    pub max_lookahead: usize,
}

impl Default for SessionInfo {
    fn default() -> Self {
        Self {
            name: env!("CARGO_PKG_NAME"),
            version: env!("CARGO_PKG_VERSION"),
            default_lookahead: SessionConfig::default().lookahead_depth,
            max_lookahead: MAX_LOOKAHEAD,
        }
    }
}

/// Get session crate information.
pub fn get_info() -> SessionInfo {
    SessionInfo::default()
}

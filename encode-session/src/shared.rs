//! Thread-safe session handle.
//!
//! Each method holds the session lock for the whole operation, so two
//! operations on the same session never interleave.

use crate::compressor::{Compressor, LookaheadCompressor};
use crate::config::SessionConfig;
use crate::session::{EncodeSession, SessionState, SessionStats};
use crate::Result;
use encode_core::{Frame, Packet};
use parking_lot::Mutex;
use std::sync::Arc;

/// Cloneable handle to a session shared between threads.
pub struct SharedSession<C: Compressor = LookaheadCompressor> {
    inner: Arc<Mutex<EncodeSession<C>>>,
}

impl SharedSession<LookaheadCompressor> {
    /// Create a shared session with the built-in compressor.
    pub fn new(config: SessionConfig) -> Result<Self> {
        Ok(Self::from_session(EncodeSession::new(config)?))
    }
}

impl<C: Compressor> SharedSession<C> {
    /// Wrap an existing session.
    pub fn from_session(session: EncodeSession<C>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(session)),
        }
    }

    /// See [`EncodeSession::new_frame`].
    pub fn new_frame(&self) -> Result<Frame> {
        self.inner.lock().new_frame()
    }

    /// See [`EncodeSession::submit_frame`].
    pub fn submit_frame(&self, frame: Frame) -> Result<u64> {
        self.inner.lock().submit_frame(frame)
    }

    /// See [`EncodeSession::request_flush`].
    pub fn request_flush(&self) -> Result<()> {
        self.inner.lock().request_flush()
    }

    /// See [`EncodeSession::poll_packet`].
    pub fn poll_packet(&self) -> Result<Packet> {
        self.inner.lock().poll_packet()
    }

    /// See [`EncodeSession::close`].
    pub fn close(&self) -> SessionStats {
        self.inner.lock().close()
    }

    /// Current state.
    pub fn state(&self) -> SessionState {
        self.inner.lock().state()
    }

    /// Frames submitted but not yet delivered.
    pub fn frames_in_flight(&self) -> u64 {
        self.inner.lock().frames_in_flight()
    }

    /// Get session statistics.
    pub fn stats(&self) -> SessionStats {
        self.inner.lock().stats()
    }

    /// Run several steps under one lock.
    pub fn with_session<R>(&self, f: impl FnOnce(&mut EncodeSession<C>) -> R) -> R {
        f(&mut *self.inner.lock())
    }
}

impl<C: Compressor> Clone for SharedSession<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

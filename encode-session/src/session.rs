//! The encoder session state machine.
//!
//! A session accepts frames into a bounded FIFO queue, feeds them to its
//! [`Compressor`] when the caller polls, and hands packets back strictly in
//! submission order. Nothing happens in the background: every call returns
//! immediately with a value or a [`SessionError`].
//!
//! ```
//! use encode_session::{EncodeSession, SessionConfig, SessionError};
//!
//! let config = SessionConfig::new(64, 96).with_lookahead(0);
//! let mut session = EncodeSession::new(config)?;
//!
//! let frame = session.new_frame()?;
//! session.submit_frame(frame)?;
//! assert_eq!(session.poll_packet()?.seq, 0);
//!
//! session.request_flush()?;
//! assert!(matches!(session.poll_packet(), Err(SessionError::EndOfStream)));
//! # Ok::<(), SessionError>(())
//! ```

use crate::compressor::{Compressor, LookaheadCompressor, QueuedFrame};
use crate::config::SessionConfig;
use crate::error::SessionError;
use crate::Result;
use encode_core::{Frame, Packet};
use serde::Serialize;
use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use tracing::{debug, info, trace, warn};

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Frames may be submitted.
    Accepting,
    /// Flush requested; queued frames are still being compressed.
    Draining,
    /// Every packet has been delivered. Terminal.
    Exhausted,
    /// Torn down by [`EncodeSession::close`]. Terminal.
    Closed,
}

impl SessionState {
    /// Whether the session can never produce another packet.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Exhausted | Self::Closed)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Accepting => write!(f, "accepting"),
            SessionState::Draining => write!(f, "draining"),
            SessionState::Exhausted => write!(f, "exhausted"),
            SessionState::Closed => write!(f, "closed"),
        }
    }
}

/// Session statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SessionStats {
    /// Frames accepted by `submit_frame`.
    pub frames_submitted: u64,
    /// Packets handed to the caller.
    pub packets_delivered: u64,
    /// Bytes in delivered packets.
    pub bytes_delivered: u64,
    /// Delivered keyframes.
    pub keyframes: u64,
    /// Average bitrate of delivered packets in bits per second.
    pub avg_bitrate: f64,
}

/// An encoder session over a compressor `C`.
pub struct EncodeSession<C: Compressor = LookaheadCompressor> {
    config: SessionConfig,
    compressor: C,
    state: SessionState,
    capacity: usize,
    queue: VecDeque<QueuedFrame>,
    /// Packets emitted by the compressor, released in sequence order.
    ready: BTreeMap<u64, Packet>,
    next_seq: u64,
    next_delivery: u64,
    bytes_delivered: u64,
    keyframes: u64,
}

impl EncodeSession<LookaheadCompressor> {
    /// Create a session with the built-in compressor.
    pub fn new(config: SessionConfig) -> Result<Self> {
        config.validate()?;
        let compressor = LookaheadCompressor::new(&config);
        Self::with_compressor(config, compressor)
    }
}

impl<C: Compressor> EncodeSession<C> {
    /// Create a session driving a caller-supplied compressor.
    pub fn with_compressor(config: SessionConfig, compressor: C) -> Result<Self> {
        config.validate()?;
        let capacity = config.effective_queue_capacity();

        debug!(
            width = config.width,
            height = config.height,
            lookahead = config.lookahead_depth,
            capacity,
            "created encode session"
        );

        Ok(Self {
            config,
            compressor,
            state: SessionState::Accepting,
            capacity,
            queue: VecDeque::with_capacity(capacity),
            ready: BTreeMap::new(),
            next_seq: 0,
            next_delivery: 0,
            bytes_delivered: 0,
            keyframes: 0,
        })
    }

    /// Allocate a mid-grey frame matching the session geometry.
    pub fn new_frame(&self) -> Result<Frame> {
        Ok(Frame::new(self.config.width, self.config.height)?)
    }

    /// Queue a frame for compression and return its sequence number.
    ///
    /// Never produces a packet. Fails with `CapacityExceeded` when the queue
    /// is full; poll packets to make room.
    pub fn submit_frame(&mut self, frame: Frame) -> Result<u64> {
        if self.state != SessionState::Accepting {
            return Err(self.invalid_state("submit_frame"));
        }

        if frame.width() != self.config.width || frame.height() != self.config.height {
            return Err(SessionError::InvalidFrame(format!(
                "frame is {}x{}, session expects {}x{}",
                frame.width(),
                frame.height(),
                self.config.width,
                self.config.height
            )));
        }

        if self.queue.len() >= self.capacity {
            trace!(capacity = self.capacity, "input queue full");
            return Err(SessionError::CapacityExceeded {
                capacity: self.capacity,
            });
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        self.queue.push_back(QueuedFrame::new(seq, frame));
        trace!(seq, queued = self.queue.len(), "frame submitted");

        Ok(seq)
    }

    /// Stop accepting frames and start draining.
    ///
    /// Idempotent while draining.
    pub fn request_flush(&mut self) -> Result<()> {
        match self.state {
            SessionState::Accepting => {
                self.state = SessionState::Draining;
                debug!(
                    queued = self.queue.len(),
                    in_flight = self.frames_in_flight(),
                    "flush requested"
                );
                Ok(())
            }
            SessionState::Draining => Ok(()),
            SessionState::Exhausted | SessionState::Closed => {
                Err(self.invalid_state("request_flush"))
            }
        }
    }

    /// Produce the next packet in submission order.
    ///
    /// Returns `NeedMoreData` when the caller must submit or flush, and
    /// `EndOfStream` once a flushed session has delivered everything. Both
    /// are repeatable: polling again without other calls gives the same
    /// answer.
    pub fn poll_packet(&mut self) -> Result<Packet> {
        loop {
            if let Some(packet) = self.ready.remove(&self.next_delivery) {
                return Ok(self.deliver(packet));
            }

            if self.state.is_terminal() {
                return Err(SessionError::EndOfStream);
            }

            if let Some(frame) = self.queue.pop_front() {
                let seq = frame.seq;
                if let Some(packet) = self.compressor.consume_and_maybe_emit(frame)? {
                    self.park(packet)?;
                } else {
                    trace!(seq, buffered = self.compressor.buffered(), "compressor holding frame");
                }
                continue;
            }

            if self.state == SessionState::Accepting {
                trace!("need more data");
                return Err(SessionError::NeedMoreData);
            }

            match self.compressor.flush_next()? {
                Some(packet) => self.park(packet)?,
                None => return self.finish_drain(),
            }
        }
    }

    /// Tear the session down, discarding queued frames and undelivered
    /// packets. Valid in every state; afterwards polling reports
    /// `EndOfStream` and submitting or flushing is an `InvalidState` error.
    pub fn close(&mut self) -> SessionStats {
        let dropped_frames = self.queue.len() + self.compressor.buffered();
        let dropped_packets = self.ready.len();

        self.queue.clear();
        self.ready.clear();
        self.compressor.reset();
        let previous = std::mem::replace(&mut self.state, SessionState::Closed);

        info!(
            previous = %previous,
            dropped_frames,
            dropped_packets,
            delivered = self.next_delivery,
            "encode session closed"
        );

        self.stats()
    }

    /// Whether the next poll returns a packet without compressing anything.
    pub fn has_ready_packet(&self) -> bool {
        self.ready.contains_key(&self.next_delivery)
    }

    /// Current state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Whether a flush has been requested.
    pub fn is_flushing(&self) -> bool {
        self.state != SessionState::Accepting
    }

    /// Session configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Effective input queue capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Frames waiting in the input queue.
    pub fn queued_frames(&self) -> usize {
        self.queue.len()
    }

    /// Frames submitted but not yet delivered as packets.
    ///
    /// Zero once the session is closed.
    pub fn frames_in_flight(&self) -> u64 {
        if self.state == SessionState::Closed {
            return 0;
        }
        self.next_seq - self.next_delivery
    }

    /// Get session statistics.
    pub fn stats(&self) -> SessionStats {
        let framerate = f64::from(self.config.framerate_num) / f64::from(self.config.framerate_den);
        let duration = self.next_delivery as f64 / framerate;

        SessionStats {
            frames_submitted: self.next_seq,
            packets_delivered: self.next_delivery,
            bytes_delivered: self.bytes_delivered,
            keyframes: self.keyframes,
            avg_bitrate: if duration > 0.0 {
                (self.bytes_delivered as f64 * 8.0) / duration
            } else {
                0.0
            },
        }
    }

    fn deliver(&mut self, packet: Packet) -> Packet {
        self.next_delivery += 1;
        self.bytes_delivered += packet.size() as u64;
        if packet.is_keyframe() {
            self.keyframes += 1;
        }
        trace!(packet = %packet, "packet delivered");
        packet
    }

    /// Hold a compressor packet until its turn, rejecting accounting errors.
    fn park(&mut self, packet: Packet) -> Result<()> {
        let seq = packet.seq;
        if seq < self.next_delivery || seq >= self.next_seq || self.ready.contains_key(&seq) {
            warn!(
                seq,
                next_delivery = self.next_delivery,
                submitted = self.next_seq,
                "compressor emitted unexpected packet"
            );
            return Err(SessionError::Compressor(format!(
                "unexpected packet for frame {seq}"
            )));
        }
        self.ready.insert(seq, packet);
        Ok(())
    }

    fn finish_drain(&mut self) -> Result<Packet> {
        if self.next_delivery == self.next_seq {
            self.state = SessionState::Exhausted;
            debug!(delivered = self.next_delivery, "session exhausted");
            return Err(SessionError::EndOfStream);
        }

        warn!(
            missing = self.next_delivery,
            parked = self.ready.len(),
            "compressor drained without emitting every frame"
        );
        Err(SessionError::Compressor(format!(
            "no packet emitted for frame {}",
            self.next_delivery
        )))
    }

    fn invalid_state(&self, operation: &'static str) -> SessionError {
        SessionError::InvalidState {
            operation,
            state: self.state,
        }
    }
}

impl<C: Compressor> fmt::Debug for EncodeSession<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncodeSession")
            .field("state", &self.state)
            .field("queued", &self.queue.len())
            .field("buffered", &self.compressor.buffered())
            .field("ready", &self.ready.len())
            .field("next_seq", &self.next_seq)
            .field("next_delivery", &self.next_delivery)
            .finish()
    }
}

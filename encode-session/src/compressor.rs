//! Compression stage behind the session.
//!
//! The session talks to its compressor through [`Compressor`]. A compressor
//! receives frames in sequence order and may hold some of them back before
//! it emits anything; over the lifetime of a session it must emit exactly
//! one packet per frame it was given, counting both consumption and flush.
//!
//! [`LookaheadCompressor`] is the built-in implementation. Its payload is an
//! opaque, deterministic byte stream: a temporal delimiter, a small frame
//! header and run-length coded residuals. It is not an AV1 bitstream.

use crate::config::{Preset, SessionConfig};
use crate::error::SessionError;
use crate::Result;
use encode_core::{Frame, FrameType, Packet, PLANE_V, PLANE_Y};
use std::collections::VecDeque;
use tracing::trace;

/// Temporal delimiter OBU, starts every packet.
const TEMPORAL_DELIMITER: [u8; 2] = [0x12, 0x00];
/// Frame OBU header byte (type 6, has_size_field).
const FRAME_OBU_HEADER: u8 = 0x32;
/// Quantizer reduction for keyframes.
const KEY_QINDEX_BOOST: u8 = 16;
/// Upper bound on the complexity-driven quantizer offset.
const MAX_COMPLEXITY_OFFSET: f64 = 32.0;

/// A frame tagged with the sequence number assigned on submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedFrame {
    /// Sequence number, starting at 0.
    pub seq: u64,
    /// The picture.
    pub frame: Frame,
}

impl QueuedFrame {
    /// Tag a frame with its sequence number.
    pub fn new(seq: u64, frame: Frame) -> Self {
        Self { seq, frame }
    }
}

/// The compression step driven by the session.
pub trait Compressor: Send {
    /// Take the next frame. May return a packet for this or an earlier
    /// frame, or nothing while the lookahead window fills.
    fn consume_and_maybe_emit(&mut self, frame: QueuedFrame) -> Result<Option<Packet>>;

    /// Emit the next held-back packet after input has ended.
    ///
    /// Returns `None` once every frame has been emitted.
    fn flush_next(&mut self) -> Result<Option<Packet>>;

    /// Number of frames consumed but not yet emitted.
    fn buffered(&self) -> usize;

    /// Drop all held frames and return to the initial state.
    fn reset(&mut self);
}

/// Default compressor with a fixed-depth lookahead window.
///
/// A frame is encoded when it leaves the window, so the first packet
/// appears after `lookahead_depth + 1` frames have been consumed.
#[derive(Debug)]
pub struct LookaheadCompressor {
    depth: usize,
    preset: Preset,
    quantizer: u8,
    keyframe_interval: u64,
    min_keyframe_interval: u64,
    scene_threshold: u8,
    framerate_den: i64,
    window: VecDeque<QueuedFrame>,
    /// Last encoded frame, used for inter residuals and scene detection.
    reference: Option<Frame>,
    last_keyframe: Option<u64>,
    expected_seq: u64,
}

impl LookaheadCompressor {
    /// Create a compressor for the given configuration.
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            depth: config.lookahead_depth,
            preset: config.preset,
            quantizer: config.quantizer,
            keyframe_interval: u64::from(config.keyframe_interval),
            min_keyframe_interval: u64::from(config.min_keyframe_interval),
            scene_threshold: config.scene_threshold,
            framerate_den: i64::from(config.framerate_den),
            window: VecDeque::with_capacity(config.lookahead_depth + 1),
            reference: None,
            last_keyframe: None,
            expected_seq: 0,
        }
    }

    /// Configured lookahead depth.
    pub fn lookahead_depth(&self) -> usize {
        self.depth
    }

    fn choose_frame_type(&self, current: &QueuedFrame) -> FrameType {
        let Some(last_key) = self.last_keyframe else {
            return FrameType::Key;
        };

        let distance = current.seq - last_key;
        if distance >= self.keyframe_interval {
            return FrameType::Key;
        }

        if self.scene_threshold > 0 && distance >= self.min_keyframe_interval {
            let diff = self
                .reference
                .as_ref()
                .and_then(|reference| reference.mean_abs_luma_diff(&current.frame));
            if diff.is_some_and(|d| d >= f64::from(self.scene_threshold)) {
                return FrameType::Key;
            }
        }

        FrameType::Inter
    }

    fn choose_qindex(&self, current: &QueuedFrame, frame_type: FrameType) -> u8 {
        if frame_type.is_key() {
            return self.quantizer.saturating_sub(KEY_QINDEX_BOOST);
        }
        if !self.preset.uses_lookahead_analysis() || self.window.is_empty() {
            return self.quantizer;
        }

        // Busy upcoming content gets a coarser quantizer.
        let complexity = window_complexity(&current.frame, &self.window);
        let offset = (complexity / 4.0).min(MAX_COMPLEXITY_OFFSET) as u8;
        self.quantizer.saturating_add(offset)
    }

    fn encode(&mut self, current: QueuedFrame) -> Packet {
        let frame_type = self.choose_frame_type(&current);
        let qindex = self.choose_qindex(&current, frame_type);
        let step = quant_step(qindex);

        let mut data = Vec::with_capacity(64);
        data.extend_from_slice(&TEMPORAL_DELIMITER);
        data.push(FRAME_OBU_HEADER);
        data.push(frame_type.tag());
        write_leb128(&mut data, current.seq);
        data.push(qindex);

        let reference = if frame_type.is_key() {
            None
        } else {
            self.reference.as_ref()
        };

        for plane in PLANE_Y..=PLANE_V {
            let src = current.frame.plane(plane);
            match reference {
                Some(reference) => rle_encode(
                    &mut data,
                    src.iter()
                        .zip(reference.plane(plane))
                        .map(|(&s, &r)| residual(s, r, step)),
                ),
                None => rle_encode(&mut data, src.iter().map(|&s| s / step)),
            }
        }

        trace!(
            seq = current.seq,
            frame_type = %frame_type,
            qindex,
            bytes = data.len(),
            "encoded frame"
        );

        if frame_type.is_key() {
            self.last_keyframe = Some(current.seq);
        }
        let pts = current.seq as i64 * self.framerate_den;
        let seq = current.seq;
        self.reference = Some(current.frame);

        Packet::new(seq, frame_type, data)
            .with_qindex(qindex)
            .with_pts(pts)
    }
}

impl Compressor for LookaheadCompressor {
    fn consume_and_maybe_emit(&mut self, frame: QueuedFrame) -> Result<Option<Packet>> {
        if frame.seq != self.expected_seq {
            return Err(SessionError::Compressor(format!(
                "expected frame {}, got frame {}",
                self.expected_seq, frame.seq
            )));
        }
        self.expected_seq += 1;
        self.window.push_back(frame);

        if self.window.len() > self.depth {
            if let Some(next) = self.window.pop_front() {
                return Ok(Some(self.encode(next)));
            }
        }
        Ok(None)
    }

    fn flush_next(&mut self) -> Result<Option<Packet>> {
        Ok(self.window.pop_front().map(|next| self.encode(next)))
    }

    fn buffered(&self) -> usize {
        self.window.len()
    }

    fn reset(&mut self) {
        self.window.clear();
        self.reference = None;
        self.last_keyframe = None;
        self.expected_seq = 0;
    }
}

/// Average luma change across the current frame and the window behind it.
fn window_complexity(current: &Frame, window: &VecDeque<QueuedFrame>) -> f64 {
    let mut previous = current;
    let mut total = 0.0;
    for upcoming in window {
        total += previous
            .mean_abs_luma_diff(&upcoming.frame)
            .unwrap_or(0.0);
        previous = &upcoming.frame;
    }
    total / window.len() as f64
}

/// Quantizer step size, 1 through 8.
fn quant_step(qindex: u8) -> u8 {
    1 + qindex / 32
}

/// Quantized difference as a two's complement byte, saturating at the i8 range.
fn residual(sample: u8, reference: u8, step: u8) -> u8 {
    let diff = (i16::from(sample) - i16::from(reference)) / i16::from(step);
    diff.clamp(i16::from(i8::MIN), i16::from(i8::MAX)) as i8 as u8
}

fn write_leb128(out: &mut Vec<u8>, mut value: u64) {
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            return;
        }
        out.push(byte | 0x80);
    }
}

/// Run-length code a sample stream as `(run, value)` pairs.
fn rle_encode(out: &mut Vec<u8>, mut samples: impl Iterator<Item = u8>) {
    let Some(mut value) = samples.next() else {
        return;
    };
    let mut run: u8 = 1;
    for sample in samples {
        if sample == value && run < u8::MAX {
            run += 1;
        } else {
            out.push(run);
            out.push(value);
            value = sample;
            run = 1;
        }
    }
    out.push(run);
    out.push(value);
}

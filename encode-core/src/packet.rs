//! Encoded output units.
//!
//! A packet carries the compressed bytes of exactly one source frame,
//! identified by the sequence number the session assigned on submission.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Frame type of an encoded packet.
///
/// The built-in lookahead compressor emits only `Key` and `Inter`. The
/// other types are available to custom compressors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameType {
    /// Keyframe, decodable on its own.
    Key,
    /// Inter frame, predicted from earlier frames.
    Inter,
    /// Intra-only frame that does not reset references.
    IntraOnly,
    /// Switch frame.
    Switch,
}

impl FrameType {
    /// Whether this frame type starts a decodable point.
    pub fn is_key(self) -> bool {
        matches!(self, Self::Key)
    }

    /// One-byte tag used in packet headers.
    pub fn tag(self) -> u8 {
        match self {
            Self::Key => 0,
            Self::Inter => 1,
            Self::IntraOnly => 2,
            Self::Switch => 3,
        }
    }
}

impl fmt::Display for FrameType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key => write!(f, "Key frame"),
            Self::Inter => write!(f, "Inter frame"),
            Self::IntraOnly => write!(f, "Intra only frame"),
            Self::Switch => write!(f, "Switching frame"),
        }
    }
}

/// An encoded packet.
#[derive(Clone, PartialEq, Eq)]
pub struct Packet {
    data: Vec<u8>,
    /// Sequence number of the source frame.
    pub seq: u64,
    /// Frame type chosen by the compressor.
    pub frame_type: FrameType,
    /// Quantizer index used for this frame.
    pub qindex: u8,
    /// Presentation timestamp in time-base units.
    pub pts: i64,
}

impl Packet {
    /// Create a packet for source frame `seq`.
    ///
    /// The presentation timestamp defaults to the sequence number.
    pub fn new(seq: u64, frame_type: FrameType, data: Vec<u8>) -> Self {
        Self {
            data,
            seq,
            frame_type,
            qindex: 0,
            pts: seq as i64,
        }
    }

    /// Set the quantizer index.
    pub fn with_qindex(mut self, qindex: u8) -> Self {
        self.qindex = qindex;
        self
    }

    /// Set the presentation timestamp.
    pub fn with_pts(mut self, pts: i64) -> Self {
        self.pts = pts;
        self
    }

    /// Get the packet data.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Take ownership of the packet data.
    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    /// Size of the packet data in bytes.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Check if this packet carries no data.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Check if this is a keyframe packet.
    pub fn is_keyframe(&self) -> bool {
        self.frame_type.is_key()
    }

    /// Stable human-readable summary.
    ///
    /// Two packets with identical bytes but different sequence numbers
    /// describe differently.
    pub fn describe(&self) -> String {
        format!(
            "Frame {} - {} - {} bytes",
            self.seq,
            self.frame_type,
            self.data.len()
        )
    }
}

impl fmt::Display for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

impl fmt::Debug for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Packet")
            .field("seq", &self.seq)
            .field("frame_type", &self.frame_type)
            .field("size", &self.size())
            .field("qindex", &self.qindex)
            .field("pts", &self.pts)
            .finish()
    }
}

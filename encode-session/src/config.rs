//! Encoder session configuration.

use crate::error::SessionError;
use crate::Result;
use encode_core::{MAX_HEIGHT, MAX_WIDTH};
use serde::{Deserialize, Serialize};

/// Largest accepted lookahead depth.
pub const MAX_LOOKAHEAD: usize = 250;

/// Encoding speed preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Preset {
    /// Slowest encoding, best quality (speed 0-1).
    Placebo,
    /// Very slow encoding, excellent quality (speed 2).
    VerySlow,
    /// Slow encoding, great quality (speed 3).
    Slower,
    /// Below average speed, above average quality (speed 4).
    Slow,
    /// Balanced speed and quality (speed 5-6).
    #[default]
    Medium,
    /// Above average speed, below average quality (speed 7).
    Fast,
    /// Fast encoding, lower quality (speed 8).
    Faster,
    /// Very fast encoding, low quality (speed 9).
    VeryFast,
    /// Fastest encoding, lowest quality (speed 10).
    UltraFast,
}

impl Preset {
    /// Convert to a speed value (0-10).
    pub fn to_speed(self) -> u8 {
        match self {
            Self::Placebo => 0,
            Self::VerySlow => 2,
            Self::Slower => 3,
            Self::Slow => 4,
            Self::Medium => 6,
            Self::Fast => 7,
            Self::Faster => 8,
            Self::VeryFast => 9,
            Self::UltraFast => 10,
        }
    }

    /// Create from speed value.
    pub fn from_speed(speed: u8) -> Self {
        match speed {
            0..=1 => Self::Placebo,
            2 => Self::VerySlow,
            3 => Self::Slower,
            4 => Self::Slow,
            5..=6 => Self::Medium,
            7 => Self::Fast,
            8 => Self::Faster,
            9 => Self::VeryFast,
            _ => Self::UltraFast,
        }
    }

    /// Whether the preset spends time analysing the lookahead window.
    pub fn uses_lookahead_analysis(self) -> bool {
        self.to_speed() <= 6
    }
}

/// Session configuration, fixed at creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Frame width.
    pub width: u32,
    /// Frame height.
    pub height: u32,
    /// Framerate numerator.
    pub framerate_num: u32,
    /// Framerate denominator.
    pub framerate_den: u32,
    /// Frames the compressor holds back before emitting the first packet.
    pub lookahead_depth: usize,
    /// Input queue capacity (0 for `lookahead_depth + 1`).
    pub queue_capacity: usize,
    /// Encoding preset.
    pub preset: Preset,
    /// Base quantizer index (0-255, lower is better).
    pub quantizer: u8,
    /// Maximum distance between keyframes.
    pub keyframe_interval: u32,
    /// Minimum distance between scene-cut keyframes.
    pub min_keyframe_interval: u32,
    /// Mean absolute luma difference that counts as a scene cut (0 disables).
    pub scene_threshold: u8,
}

impl SessionConfig {
    /// Create a new configuration with required parameters.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            framerate_num: 30,
            framerate_den: 1,
            lookahead_depth: 40,
            queue_capacity: 0,
            preset: Preset::default(),
            quantizer: 100,
            keyframe_interval: 240,
            min_keyframe_interval: 12,
            scene_threshold: 30,
        }
    }

    /// Set the framerate.
    pub fn with_framerate(mut self, num: u32, den: u32) -> Self {
        self.framerate_num = num;
        self.framerate_den = den;
        self
    }

    /// Set the lookahead depth.
    pub fn with_lookahead(mut self, depth: usize) -> Self {
        self.lookahead_depth = depth;
        self
    }

    /// Set the input queue capacity.
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Set the encoding preset.
    pub fn with_preset(mut self, preset: Preset) -> Self {
        self.preset = preset;
        self
    }

    /// Set the base quantizer.
    pub fn with_quantizer(mut self, quantizer: u8) -> Self {
        self.quantizer = quantizer;
        self
    }

    /// Set the keyframe interval range.
    pub fn with_keyframe_interval(mut self, min: u32, max: u32) -> Self {
        self.min_keyframe_interval = min;
        self.keyframe_interval = max;
        self
    }

    /// Set the scene-cut threshold.
    pub fn with_scene_threshold(mut self, threshold: u8) -> Self {
        self.scene_threshold = threshold;
        self
    }

    /// Input queue capacity after resolving the automatic value.
    pub fn effective_queue_capacity(&self) -> usize {
        if self.queue_capacity == 0 {
            self.lookahead_depth + 1
        } else {
            self.queue_capacity
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(SessionError::InvalidConfig(
                "Width and height must be non-zero".into(),
            ));
        }

        if self.width > MAX_WIDTH || self.height > MAX_HEIGHT {
            return Err(SessionError::InvalidConfig(format!(
                "Resolution exceeds maximum ({MAX_WIDTH}x{MAX_HEIGHT})"
            )));
        }

        if self.framerate_num == 0 || self.framerate_den == 0 {
            return Err(SessionError::InvalidConfig("Invalid framerate".into()));
        }

        if self.lookahead_depth > MAX_LOOKAHEAD {
            return Err(SessionError::InvalidConfig(format!(
                "Lookahead depth {} exceeds maximum {MAX_LOOKAHEAD}",
                self.lookahead_depth
            )));
        }

        if self.queue_capacity != 0 && self.queue_capacity <= self.lookahead_depth {
            return Err(SessionError::InvalidConfig(format!(
                "Queue capacity {} must exceed lookahead depth {}",
                self.queue_capacity, self.lookahead_depth
            )));
        }

        if self.keyframe_interval == 0 {
            return Err(SessionError::InvalidConfig(
                "Keyframe interval must be non-zero".into(),
            ));
        }

        if self.min_keyframe_interval > self.keyframe_interval {
            return Err(SessionError::InvalidConfig(
                "Minimum keyframe interval exceeds maximum".into(),
            ));
        }

        Ok(())
    }

    /// Render the configuration as indented JSON for display.
    pub fn to_json(&self) -> Result<String> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.serialize(&mut ser)
            .map_err(|e| SessionError::InvalidConfig(e.to_string()))?;
        String::from_utf8(buf).map_err(|e| SessionError::InvalidConfig(e.to_string()))
    }

    /// Parse a configuration from JSON. Missing fields take defaults.
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| SessionError::InvalidConfig(e.to_string()))
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::new(64, 96)
    }
}

//! # Encode Core
//!
//! Value types shared by the encoder session and its drivers:
//! - Error handling types
//! - Raw YUV 4:2:0 frame buffers
//! - Encoded packets and frame types

pub mod error;
pub mod frame;
pub mod packet;

pub use error::{Error, Result};
pub use frame::{Frame, MAX_HEIGHT, MAX_WIDTH, PLANE_U, PLANE_V, PLANE_Y};
pub use packet::{FrameType, Packet};

//! Property-based tests for frame and packet values.

use encode_core::{Frame, FrameType, Packet, PLANE_U, PLANE_V, PLANE_Y};
use proptest::prelude::*;

// =============================================================================
// Frame Geometry
// =============================================================================

proptest! {
    /// Planes sized from the frame's own geometry are always accepted.
    #[test]
    fn from_planes_accepts_own_geometry(width in 1u32..=256, height in 1u32..=256) {
        let grey = Frame::new(width, height).unwrap();
        let rebuilt = Frame::from_planes(
            width,
            height,
            grey.plane(PLANE_Y).to_vec(),
            grey.plane(PLANE_U).to_vec(),
            grey.plane(PLANE_V).to_vec(),
        );
        prop_assert_eq!(rebuilt.unwrap(), grey);
    }

    /// Chroma planes cover the luma plane with 2x2 subsampling.
    #[test]
    fn chroma_covers_luma(width in 1u32..=512, height in 1u32..=512) {
        let frame = Frame::new(width, height).unwrap();
        let (cw, ch) = frame.plane_dimensions(PLANE_U);
        prop_assert!(cw * 2 >= width && cw * 2 <= width + 1);
        prop_assert!(ch * 2 >= height && ch * 2 <= height + 1);
    }

    /// A frame never differs from itself.
    #[test]
    fn luma_diff_reflexive(width in 1u32..=64, height in 1u32..=64, value in any::<u8>()) {
        let frame = Frame::filled(width, height, value, 0, 0).unwrap();
        prop_assert_eq!(frame.mean_abs_luma_diff(&frame), Some(0.0));
    }
}

// =============================================================================
// Packet Description
// =============================================================================

proptest! {
    /// Descriptions identify the source frame even for identical payloads.
    #[test]
    fn describe_separates_sequence_numbers(a in any::<u64>(), b in any::<u64>(), len in 0usize..64) {
        prop_assume!(a != b);
        let pa = Packet::new(a, FrameType::Inter, vec![0xAB; len]);
        let pb = Packet::new(b, FrameType::Inter, vec![0xAB; len]);
        prop_assert_ne!(pa.describe(), pb.describe());
    }

    /// Descriptions are deterministic.
    #[test]
    fn describe_is_stable(seq in any::<u64>(), len in 0usize..64) {
        let packet = Packet::new(seq, FrameType::Key, vec![1; len]);
        prop_assert_eq!(packet.describe(), packet.clone().describe());
        prop_assert_eq!(
            packet.describe(),
            format!("Frame {} - Key frame - {} bytes", seq, len)
        );
    }
}

//! Raw picture buffers submitted to the encoder.
//!
//! Frames are 8-bit planar YUV 4:2:0. A frame is a plain value: submitting
//! it moves it into the session, so reusing one picture for several
//! submissions means cloning it.

use crate::error::{Error, Result};
use std::fmt;

/// Maximum supported frame width.
pub const MAX_WIDTH: u32 = 8192;
/// Maximum supported frame height.
pub const MAX_HEIGHT: u32 = 4320;

/// Index of the luma plane.
pub const PLANE_Y: usize = 0;
/// Index of the blue-difference chroma plane.
pub const PLANE_U: usize = 1;
/// Index of the red-difference chroma plane.
pub const PLANE_V: usize = 2;

/// Neutral sample value for 8-bit content.
const MID_GREY: u8 = 128;

/// An uncompressed 8-bit YUV 4:2:0 picture.
#[derive(Clone, PartialEq, Eq)]
pub struct Frame {
    width: u32,
    height: u32,
    planes: [Vec<u8>; 3],
}

impl Frame {
    /// Allocate a mid-grey frame.
    pub fn new(width: u32, height: u32) -> Result<Self> {
        Self::filled(width, height, MID_GREY, MID_GREY, MID_GREY)
    }

    /// Allocate a frame with every sample of each plane set to a constant.
    pub fn filled(width: u32, height: u32, y: u8, u: u8, v: u8) -> Result<Self> {
        check_dimensions(width, height)?;
        let (cw, ch) = chroma_dimensions(width, height);
        let luma = width as usize * height as usize;
        let chroma = cw as usize * ch as usize;

        Ok(Self {
            width,
            height,
            planes: [vec![y; luma], vec![u; chroma], vec![v; chroma]],
        })
    }

    /// Build a frame from caller-owned planes.
    ///
    /// Each plane must hold exactly `plane_size` bytes for its index.
    pub fn from_planes(width: u32, height: u32, y: Vec<u8>, u: Vec<u8>, v: Vec<u8>) -> Result<Self> {
        check_dimensions(width, height)?;
        let frame = Self {
            width,
            height,
            planes: [y, u, v],
        };

        for plane in PLANE_Y..=PLANE_V {
            let needed = frame.plane_size(plane);
            let available = frame.planes[plane].len();
            if available < needed {
                return Err(Error::BufferTooSmall {
                    plane,
                    needed,
                    available,
                });
            }
            if available > needed {
                return Err(Error::invalid_param(format!(
                    "plane {plane} holds {available} bytes, expected {needed}"
                )));
            }
        }

        Ok(frame)
    }

    /// Frame width in luma samples.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Frame height in luma samples.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Dimensions `(width, height)` of a plane.
    pub fn plane_dimensions(&self, plane: usize) -> (u32, u32) {
        if plane == PLANE_Y {
            (self.width, self.height)
        } else {
            chroma_dimensions(self.width, self.height)
        }
    }

    /// Size of a plane in bytes.
    pub fn plane_size(&self, plane: usize) -> usize {
        let (w, h) = self.plane_dimensions(plane);
        w as usize * h as usize
    }

    /// Borrow a plane.
    ///
    /// # Panics
    ///
    /// Panics if `plane` is not one of `PLANE_Y`, `PLANE_U`, `PLANE_V`.
    pub fn plane(&self, plane: usize) -> &[u8] {
        &self.planes[plane]
    }

    /// Mutably borrow a plane.
    ///
    /// # Panics
    ///
    /// Panics if `plane` is not one of `PLANE_Y`, `PLANE_U`, `PLANE_V`.
    pub fn plane_mut(&mut self, plane: usize) -> &mut [u8] {
        &mut self.planes[plane]
    }

    /// Total size of all planes in bytes.
    pub fn total_size(&self) -> usize {
        self.planes.iter().map(Vec::len).sum()
    }

    /// Fill every plane with a constant value.
    pub fn fill(&mut self, y: u8, u: u8, v: u8) {
        self.planes[PLANE_Y].fill(y);
        self.planes[PLANE_U].fill(u);
        self.planes[PLANE_V].fill(v);
    }

    /// Check whether another frame has the same geometry.
    pub fn same_geometry(&self, other: &Frame) -> bool {
        self.width == other.width && self.height == other.height
    }

    /// Mean absolute difference of the luma planes.
    ///
    /// Returns `None` when the frames differ in size.
    pub fn mean_abs_luma_diff(&self, other: &Frame) -> Option<f64> {
        if !self.same_geometry(other) {
            return None;
        }
        let a = &self.planes[PLANE_Y];
        let b = &other.planes[PLANE_Y];
        let sum: u64 = a
            .iter()
            .zip(b)
            .map(|(&x, &y)| u64::from(x.abs_diff(y)))
            .sum();
        Some(sum as f64 / a.len() as f64)
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("size", &self.total_size())
            .finish()
    }
}

fn check_dimensions(width: u32, height: u32) -> Result<()> {
    if width == 0 || height == 0 {
        return Err(Error::InvalidDimensions {
            width,
            height,
            reason: "width and height must be non-zero",
        });
    }
    if width > MAX_WIDTH || height > MAX_HEIGHT {
        return Err(Error::InvalidDimensions {
            width,
            height,
            reason: "exceeds maximum 8192x4320",
        });
    }
    Ok(())
}

/// Chroma plane dimensions for 4:2:0 subsampling, rounding up.
fn chroma_dimensions(width: u32, height: u32) -> (u32, u32) {
    (width.div_ceil(2), height.div_ceil(2))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_new_is_grey() {
        let frame = Frame::new(64, 96).unwrap();
        assert_eq!(frame.plane(PLANE_Y).len(), 64 * 96);
        assert_eq!(frame.plane(PLANE_U).len(), 32 * 48);
        assert!(frame.plane(PLANE_V).iter().all(|&s| s == 128));
    }

    #[test]
    fn test_odd_dimensions_round_up() {
        let frame = Frame::new(17, 9).unwrap();
        assert_eq!(frame.plane_dimensions(PLANE_U), (9, 5));
        assert_eq!(frame.total_size(), 17 * 9 + 2 * 9 * 5);
    }

    #[test]
    fn test_zero_dimensions_rejected() {
        assert!(matches!(
            Frame::new(0, 96),
            Err(Error::InvalidDimensions { .. })
        ));
        assert!(Frame::new(9000, 96).is_err());
    }

    #[test]
    fn test_from_planes_checks_sizes() {
        let err = Frame::from_planes(4, 4, vec![0; 16], vec![0; 2], vec![0; 4]).unwrap_err();
        assert_eq!(
            err,
            Error::BufferTooSmall {
                plane: 1,
                needed: 4,
                available: 2
            }
        );

        assert!(Frame::from_planes(4, 4, vec![0; 17], vec![0; 4], vec![0; 4]).is_err());
        assert!(Frame::from_planes(4, 4, vec![0; 16], vec![0; 4], vec![0; 4]).is_ok());
    }

    #[test]
    fn test_mean_abs_luma_diff() {
        let a = Frame::filled(8, 8, 10, 128, 128).unwrap();
        let b = Frame::filled(8, 8, 40, 0, 0).unwrap();
        assert_eq!(a.mean_abs_luma_diff(&b), Some(30.0));
        assert_eq!(a.mean_abs_luma_diff(&a), Some(0.0));

        let c = Frame::new(16, 8).unwrap();
        assert_eq!(a.mean_abs_luma_diff(&c), None);
    }

    #[test]
    fn test_clone_is_independent() {
        let mut a = Frame::new(8, 8).unwrap();
        let b = a.clone();
        a.plane_mut(PLANE_Y)[0] = 0;
        assert_ne!(a, b);
        assert_eq!(b.plane(PLANE_Y)[0], 128);
    }
}

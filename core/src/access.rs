//! Read access shared by texture levels and surfaces.

use crate::math::{IVec4, Vec4};

/// Anything that can be read pixel by pixel as a 3D grid of RGBA values.
///
/// Comparators are generic over this trait so that 8-bit surfaces and
/// arbitrary-format texture levels can be compared with the same code.
pub trait PixelSource {
    fn width(&self) -> u32;
    fn height(&self) -> u32;
    fn depth(&self) -> u32 {
        1
    }

    /// Pixel as a float color.
    fn pixel(&self, x: u32, y: u32, z: u32) -> Vec4;

    /// Pixel as raw integer channel values.
    fn pixel_int(&self, x: u32, y: u32, z: u32) -> IVec4;

    /// `(width, height, depth)`.
    fn size(&self) -> (u32, u32, u32) {
        (self.width(), self.height(), self.depth())
    }
}

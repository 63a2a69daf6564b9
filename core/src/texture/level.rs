//! A single level of pixel data in an arbitrary format.

use crate::access::PixelSource;
use crate::error::{CoreError, CoreResult};
use crate::math::{IVec4, Vec4};

use super::format::TextureFormat;

/// Owned pixel storage for one mip level (or one 3D/array level).
///
/// Pixels are tightly packed: row pitch is `width * pixel_size` and slice
/// pitch is `row_pitch * height`.
#[derive(Debug, Clone, PartialEq)]
pub struct TextureLevel {
    format: TextureFormat,
    width: u32,
    height: u32,
    depth: u32,
    data: Vec<u8>,
}

impl TextureLevel {
    /// Allocate a zero-filled level.
    pub fn new(format: TextureFormat, width: u32, height: u32, depth: u32) -> CoreResult<Self> {
        Self::validate(format, width, height, depth)?;
        Ok(Self::zeroed(format, width, height, depth))
    }

    /// Wrap existing bytes. The length must match the format and size exactly.
    pub fn from_data(
        format: TextureFormat,
        width: u32,
        height: u32,
        depth: u32,
        data: Vec<u8>,
    ) -> CoreResult<Self> {
        Self::validate(format, width, height, depth)?;
        let expected = Self::byte_size(format, width, height, depth);
        if data.len() != expected {
            return Err(CoreError::DataSizeMismatch {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            format,
            width,
            height,
            depth,
            data,
        })
    }

    /// Allocate without validation. Callers must have checked dimensions.
    pub(crate) fn zeroed(format: TextureFormat, width: u32, height: u32, depth: u32) -> Self {
        Self {
            format,
            width,
            height,
            depth,
            data: vec![0; Self::byte_size(format, width, height, depth)],
        }
    }

    pub(crate) fn validate(
        format: TextureFormat,
        width: u32,
        height: u32,
        depth: u32,
    ) -> CoreResult<()> {
        if width == 0 || height == 0 || depth == 0 {
            return Err(CoreError::InvalidDimensions {
                width,
                height,
                depth,
            });
        }
        if !format.is_valid() {
            return Err(CoreError::UnsupportedFormat {
                format,
                operation: "texture storage",
            });
        }
        Ok(())
    }

    fn byte_size(format: TextureFormat, width: u32, height: u32, depth: u32) -> usize {
        format.pixel_size() * width as usize * height as usize * depth as usize
    }

    pub fn format(&self) -> TextureFormat {
        self.format
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn row_pitch(&self) -> usize {
        self.format.pixel_size() * self.width as usize
    }

    pub fn slice_pitch(&self) -> usize {
        self.row_pitch() * self.height as usize
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    fn offset(&self, x: u32, y: u32, z: u32) -> usize {
        debug_assert!(x < self.width && y < self.height && z < self.depth);
        z as usize * self.slice_pitch()
            + y as usize * self.row_pitch()
            + x as usize * self.format.pixel_size()
    }

    fn pixel_bytes(&self, x: u32, y: u32, z: u32) -> &[u8] {
        let start = self.offset(x, y, z);
        &self.data[start..start + self.format.pixel_size()]
    }

    fn pixel_bytes_mut(&mut self, x: u32, y: u32, z: u32) -> &mut [u8] {
        let start = self.offset(x, y, z);
        let size = self.format.pixel_size();
        &mut self.data[start..start + size]
    }

    pub fn pixel(&self, x: u32, y: u32, z: u32) -> Vec4 {
        self.format.decode(self.pixel_bytes(x, y, z))
    }

    pub fn pixel_int(&self, x: u32, y: u32, z: u32) -> IVec4 {
        self.format.decode_int(self.pixel_bytes(x, y, z))
    }

    /// Depth value of a depth or depth-stencil pixel.
    pub fn pixel_depth(&self, x: u32, y: u32, z: u32) -> f32 {
        self.pixel(x, y, z).x
    }

    pub fn set_pixel(&mut self, color: &Vec4, x: u32, y: u32, z: u32) {
        let format = self.format;
        format.encode(color, self.pixel_bytes_mut(x, y, z));
    }

    pub fn set_pixel_int(&mut self, color: &IVec4, x: u32, y: u32, z: u32) {
        let format = self.format;
        format.encode_int(color, self.pixel_bytes_mut(x, y, z));
    }

    /// Set every pixel to `color`.
    pub fn clear(&mut self, color: &Vec4) {
        let size = self.format.pixel_size();
        let mut encoded = vec![0u8; size];
        self.format.encode(color, &mut encoded);
        for pixel in self.data.chunks_exact_mut(size) {
            pixel.copy_from_slice(&encoded);
        }
    }

    /// Set every pixel from a function of its coordinates.
    pub fn fill_with(&mut self, mut f: impl FnMut(u32, u32, u32) -> Vec4) {
        for z in 0..self.depth {
            for y in 0..self.height {
                for x in 0..self.width {
                    let color = f(x, y, z);
                    self.set_pixel(&color, x, y, z);
                }
            }
        }
    }
}

impl PixelSource for TextureLevel {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn depth(&self) -> u32 {
        self.depth
    }

    fn pixel(&self, x: u32, y: u32, z: u32) -> Vec4 {
        TextureLevel::pixel(self, x, y, z)
    }

    fn pixel_int(&self, x: u32, y: u32, z: u32) -> IVec4 {
        TextureLevel::pixel_int(self, x, y, z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_dimensions() {
        let err = TextureLevel::new(TextureFormat::RGBA8, 0, 4, 1).unwrap_err();
        assert!(matches!(err, CoreError::InvalidDimensions { width: 0, .. }));
    }

    #[test]
    fn from_data_checks_length() {
        let err = TextureLevel::from_data(TextureFormat::RGBA8, 2, 2, 1, vec![0; 15]).unwrap_err();
        assert_eq!(
            err,
            CoreError::DataSizeMismatch {
                expected: 16,
                actual: 15
            }
        );
    }

    #[test]
    fn set_and_get_pixel() {
        let mut level = TextureLevel::new(TextureFormat::RGBA8, 3, 2, 2).unwrap();
        let color = Vec4::new(1.0, 0.0, 1.0, 1.0);
        level.set_pixel(&color, 2, 1, 1);
        assert_eq!(level.pixel(2, 1, 1), color);
        assert_eq!(level.pixel(0, 0, 0), Vec4::zeros());
        assert_eq!(level.pixel_int(2, 1, 1), IVec4::new(255, 0, 255, 255));
    }

    #[test]
    fn clear_fills_every_pixel() {
        let mut level = TextureLevel::new(TextureFormat::RGBA32F, 4, 4, 1).unwrap();
        let color = Vec4::new(0.5, 0.25, -1.0, 2.0);
        level.clear(&color);
        assert!((0..4).all(|y| (0..4).all(|x| level.pixel(x, y, 0) == color)));
    }
}

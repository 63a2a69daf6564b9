//! 8-bit RGBA image buffers.
//!
//! [`Surface`] is the readback and reference-image type. It wraps an
//! [`image::RgbaImage`] so results can be dumped to PNG when debugging a
//! failing comparison. Row 0 is the bottom row of the framebuffer, matching
//! `glReadPixels` ordering.

use std::path::Path;

use image::{ImageFormat, ImageResult, Rgba, RgbaImage};

use crate::access::PixelSource;
use crate::error::{CoreError, CoreResult};
use crate::math::{IVec4, Vec4};

/// Quantize a float color to 8 bits per channel: `round(c*255)` clamped.
pub fn color_to_rgba8(color: &Vec4) -> Rgba<u8> {
    let q = |c: f32| (c * 255.0).round().clamp(0.0, 255.0) as u8;
    Rgba([q(color.x), q(color.y), q(color.z), q(color.w)])
}

/// Normalize an 8-bit color to `[0, 1]`.
pub fn rgba8_to_color(p: Rgba<u8>) -> Vec4 {
    Vec4::new(
        p[0] as f32 / 255.0,
        p[1] as f32 / 255.0,
        p[2] as f32 / 255.0,
        p[3] as f32 / 255.0,
    )
}

/// Width x height RGBA8 image.
#[derive(Debug, Clone, PartialEq)]
pub struct Surface {
    image: RgbaImage,
}

impl Surface {
    /// Allocate a surface cleared to transparent black.
    pub fn new(width: u32, height: u32) -> CoreResult<Self> {
        if width == 0 || height == 0 {
            return Err(CoreError::InvalidDimensions {
                width,
                height,
                depth: 1,
            });
        }
        Ok(Self {
            image: RgbaImage::new(width, height),
        })
    }

    pub fn from_image(image: RgbaImage) -> CoreResult<Self> {
        if image.width() == 0 || image.height() == 0 {
            return Err(CoreError::InvalidDimensions {
                width: image.width(),
                height: image.height(),
                depth: 1,
            });
        }
        Ok(Self { image })
    }

    /// Build from tightly packed RGBA8 rows.
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> CoreResult<Self> {
        let expected = width as usize * height as usize * 4;
        let actual = data.len();
        let image = RgbaImage::from_raw(width, height, data)
            .ok_or(CoreError::DataSizeMismatch { expected, actual })?;
        Self::from_image(image)
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn pixel(&self, x: u32, y: u32) -> Rgba<u8> {
        *self.image.get_pixel(x, y)
    }

    pub fn set_pixel(&mut self, x: u32, y: u32, color: Rgba<u8>) {
        self.image.put_pixel(x, y, color);
    }

    /// Store a float color, quantized with [`color_to_rgba8`].
    pub fn set_pixel_color(&mut self, x: u32, y: u32, color: &Vec4) {
        self.image.put_pixel(x, y, color_to_rgba8(color));
    }

    pub fn clear(&mut self, color: Rgba<u8>) {
        for p in self.image.pixels_mut() {
            *p = color;
        }
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn into_image(self) -> RgbaImage {
        self.image
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.image.as_raw()
    }

    /// Write the surface as PNG.
    pub fn save_png(&self, path: impl AsRef<Path>) -> ImageResult<()> {
        self.image.save_with_format(path, ImageFormat::Png)
    }
}

impl PixelSource for Surface {
    fn width(&self) -> u32 {
        self.image.width()
    }

    fn height(&self) -> u32 {
        self.image.height()
    }

    fn pixel(&self, x: u32, y: u32, _z: u32) -> Vec4 {
        rgba8_to_color(*self.image.get_pixel(x, y))
    }

    fn pixel_int(&self, x: u32, y: u32, _z: u32) -> IVec4 {
        let p = self.image.get_pixel(x, y);
        IVec4::new(p[0] as i32, p[1] as i32, p[2] as i32, p[3] as i32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantization_rounds_and_clamps() {
        let p = color_to_rgba8(&Vec4::new(0.5, -0.2, 1.7, 1.0 / 255.0));
        assert_eq!(p, Rgba([128, 0, 255, 1]));
    }

    #[test]
    fn zero_size_is_rejected() {
        assert!(Surface::new(0, 1).is_err());
        assert!(Surface::from_raw(2, 2, vec![0; 15]).is_err());
    }

    #[test]
    fn clear_and_read() {
        let mut surface = Surface::new(3, 2).unwrap();
        surface.clear(Rgba([1, 2, 3, 4]));
        surface.set_pixel_color(2, 1, &Vec4::new(1.0, 0.0, 0.0, 1.0));
        assert_eq!(surface.pixel(0, 0), Rgba([1, 2, 3, 4]));
        assert_eq!(surface.pixel(2, 1), Rgba([255, 0, 0, 255]));
        assert_eq!(
            PixelSource::pixel_int(&surface, 2, 1, 0),
            IVec4::new(255, 0, 0, 255)
        );
        assert_eq!(surface.as_bytes().len(), 24);
    }
}

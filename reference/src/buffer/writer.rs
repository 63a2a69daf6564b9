use deqp_core::surface::Surface;
use image::Rgba;

use crate::backend::{BufferHandle, RenderContext};
use crate::error::{ensure, Result};

use super::segment_end;

/// Pathway used to write bytes into a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WriteType {
    BufferSubData,
    BufferWriteMap,
    TransformFeedback,
    PixelPack,
}

impl WriteType {
    pub const ALL: [WriteType; 4] = [
        WriteType::BufferSubData,
        WriteType::BufferWriteMap,
        WriteType::TransformFeedback,
        WriteType::PixelPack,
    ];

    pub fn description(self) -> &'static str {
        match self {
            WriteType::BufferSubData => "gl.bufferSubData()",
            WriteType::BufferWriteMap => "gl.mapBufferRange()",
            WriteType::TransformFeedback => "transform feedback",
            WriteType::PixelPack => "gl.readPixels() into PBO binding",
        }
    }
}

/// Writes byte ranges into a buffer through one [`WriteType`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferWriter {
    write_type: WriteType,
}

impl BufferWriter {
    pub fn new(write_type: WriteType) -> Self {
        Self { write_type }
    }

    pub fn write_type(&self) -> WriteType {
        self.write_type
    }

    /// Smallest number of bytes one write can cover.
    pub fn min_size(&self) -> usize {
        match self.write_type {
            WriteType::BufferSubData | WriteType::BufferWriteMap => 1,
            // One 32-bit word or one RGBA8 pixel.
            WriteType::TransformFeedback | WriteType::PixelPack => 4,
        }
    }

    /// Required alignment of the offset and the segment end.
    pub fn alignment(&self) -> usize {
        match self.write_type {
            WriteType::BufferSubData | WriteType::BufferWriteMap => 1,
            WriteType::TransformFeedback | WriteType::PixelPack => 4,
        }
    }

    /// Write `data` into `buffer` at `offset`. The buffer must already be
    /// large enough.
    pub fn write(&self, ctx: &mut dyn RenderContext, buffer: BufferHandle, offset: usize, data: &[u8]) -> Result<()> {
        ensure(data.len() >= self.min_size(), || {
            "Number of bytes to write is smaller than the minimum size.".to_string()
        })?;
        let end = segment_end(offset, data.len())?;
        ensure(offset % self.alignment() == 0, || "Offset is not aligned.".to_string())?;
        ensure(end % self.alignment() == 0, || {
            "Buffer segment is not aligned".to_string()
        })?;

        log::debug!(
            "Writing {} bytes at offset {} using {}",
            data.len(),
            offset,
            self.write_type.description()
        );
        match self.write_type {
            WriteType::BufferSubData => ctx.buffer_sub_data(buffer, offset, data),
            WriteType::BufferWriteMap => {
                ctx.map_buffer_range(buffer, offset, data.len())?.copy_from_slice(data);
                Ok(())
            }
            WriteType::TransformFeedback => {
                let words: Vec<u32> = data.chunks_exact(4).map(bytemuck::pod_read_unaligned).collect();
                ctx.transform_feedback_capture(&words, buffer, offset)
            }
            WriteType::PixelPack => write_pixel_pack(ctx, buffer, offset, data),
        }
    }
}

/// Put the bytes into the framebuffer as RGBA8 pixels one row at a time,
/// then read each row back into the buffer.
fn write_pixel_pack(ctx: &mut dyn RenderContext, buffer: BufferHandle, offset: usize, data: &[u8]) -> Result<()> {
    let row_len = ctx.viewport_size().0.max(1) as usize;
    for (row_ndx, row) in data.chunks(row_len * 4).enumerate() {
        let num_pixels = (row.len() / 4) as u32;
        let mut pixels = Surface::new(num_pixels, 1)?;
        for (x, px) in row.chunks_exact(4).enumerate() {
            pixels.set_pixel(x as u32, 0, Rgba([px[0], px[1], px[2], px[3]]));
        }
        ctx.write_pixels(0, 0, &pixels)?;
        ctx.read_pixels_into_buffer(0, 0, num_pixels, 1, buffer, offset + row_ndx * row_len * 4)?;
    }
    Ok(())
}

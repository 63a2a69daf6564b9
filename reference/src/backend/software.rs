//! Deterministic CPU render context.
//!
//! Buffers live in a hash map and the framebuffer is an RGBA8
//! [`Surface`]. Triangles and lines go through [`crate::raster`] and
//! textured quads through the reference renderer, so results are exact
//! and reproducible.

use std::collections::HashMap;

use deqp_core::math::{Vec2, Vec4};
use deqp_core::surface::Surface;
use image::Rgba;

use crate::error::{Error, Result};
use crate::params::ReferenceParams;
use crate::raster::{draw_line_strip, fill_triangle, to_window};
use crate::render::{render_reference, SurfaceAccess, TextureBinding};

use super::{
    BufferHandle, ColorVertex, ContextError, GridVertex, LineIndices, LineStripDraw,
    RenderContext, TriangleDraw,
};

/// Software render context.
#[derive(Debug)]
pub struct SoftwareContext {
    buffers: HashMap<BufferHandle, Vec<u8>>,
    next_handle: u64,
    buffer_limit: Option<usize>,
    framebuffer: Surface,
    viewport: (u32, u32),
    error: Option<ContextError>,
}

impl SoftwareContext {
    /// Create a context with a `width` x `height` framebuffer cleared to
    /// transparent black.
    pub fn new(width: u32, height: u32) -> Result<Self> {
        log::trace!("SoftwareContext: creating {}x{} framebuffer", width, height);
        Ok(Self {
            buffers: HashMap::new(),
            next_handle: 1,
            buffer_limit: None,
            framebuffer: Surface::new(width, height)?,
            viewport: (width, height),
            error: None,
        })
    }

    /// Fail buffer creation once `limit` buffers are alive.
    pub fn with_buffer_limit(mut self, limit: usize) -> Self {
        self.buffer_limit = Some(limit);
        self
    }

    /// Number of live buffers.
    pub fn num_buffers(&self) -> usize {
        self.buffers.len()
    }

    pub fn framebuffer(&self) -> &Surface {
        &self.framebuffer
    }

    fn record(&mut self, error: ContextError) {
        // Only the first error is kept until taken.
        if self.error.is_none() {
            self.error = Some(error);
        }
    }

    fn fail<T>(&mut self, error: ContextError, message: String) -> Result<T> {
        self.record(error);
        Err(Error::ResourceError(message))
    }

    fn store(&self, buffer: BufferHandle) -> Option<&Vec<u8>> {
        self.buffers.get(&buffer)
    }

    /// `len` bytes at `offset`, or an invalid-value error.
    fn range(&mut self, buffer: BufferHandle, offset: usize, len: usize) -> Result<&[u8]> {
        let size = match self.store(buffer) {
            Some(data) => data.len(),
            None => return self.fail(ContextError::InvalidOperation, format!("unknown buffer {}", buffer.0)),
        };
        match offset.checked_add(len) {
            Some(end) if end <= size => Ok(&self.buffers[&buffer][offset..end]),
            _ => self.fail(
                ContextError::InvalidValue,
                format!("range {offset}+{len} outside buffer {} of {size} bytes", buffer.0),
            ),
        }
    }

    fn range_mut(&mut self, buffer: BufferHandle, offset: usize, len: usize) -> Result<&mut [u8]> {
        self.range(buffer, offset, len)?;
        match self.buffers.get_mut(&buffer) {
            Some(data) => Ok(&mut data[offset..offset + len]),
            None => Err(Error::ResourceError(format!("unknown buffer {}", buffer.0))),
        }
    }

    fn check_rect(&mut self, x: u32, y: u32, width: u32, height: u32) -> Result<()> {
        let fits = x as u64 + width as u64 <= self.framebuffer.width() as u64
            && y as u64 + height as u64 <= self.framebuffer.height() as u64;
        if width == 0 || height == 0 || !fits {
            return self.fail(
                ContextError::InvalidValue,
                format!("rectangle {width}x{height} at ({x}, {y}) outside framebuffer"),
            );
        }
        Ok(())
    }

    fn window_position(&self, position: [f32; 2]) -> Vec2 {
        to_window(&Vec2::new(position[0], position[1]), self.viewport.0, self.viewport.1)
    }

    fn vertices<T: bytemuck::Pod>(&mut self, buffer: BufferHandle) -> Result<Vec<T>> {
        let stride = std::mem::size_of::<T>();
        let size = self.buffer_size(buffer)?;
        let bytes = self.range(buffer, 0, size - size % stride)?;
        Ok(bytes.chunks_exact(stride).map(bytemuck::pod_read_unaligned).collect())
    }
}

impl RenderContext for SoftwareContext {
    fn name(&self) -> &str {
        "Software Context"
    }

    fn viewport_size(&self) -> (u32, u32) {
        self.viewport
    }

    fn set_viewport(&mut self, width: u32, height: u32) -> Result<()> {
        log::trace!("SoftwareContext: viewport {}x{}", width, height);
        self.check_rect(0, 0, width, height)?;
        self.viewport = (width, height);
        Ok(())
    }

    fn create_buffer(&mut self) -> Result<BufferHandle> {
        if let Some(limit) = self.buffer_limit {
            if self.buffers.len() >= limit {
                return self.fail(
                    ContextError::OutOfMemory,
                    format!("buffer limit of {limit} reached"),
                );
            }
        }
        let handle = BufferHandle(self.next_handle);
        self.next_handle += 1;
        log::trace!("SoftwareContext: creating buffer {}", handle.0);
        self.buffers.insert(handle, Vec::new());
        Ok(handle)
    }

    fn delete_buffer(&mut self, buffer: BufferHandle) {
        log::trace!("SoftwareContext: deleting buffer {}", buffer.0);
        self.buffers.remove(&buffer);
    }

    fn buffer_data(&mut self, buffer: BufferHandle, data: &[u8]) -> Result<()> {
        log::trace!("SoftwareContext: buffer {} data ({} bytes)", buffer.0, data.len());
        match self.buffers.get_mut(&buffer) {
            Some(store) => {
                store.clear();
                store.extend_from_slice(data);
                Ok(())
            }
            None => self.fail(ContextError::InvalidOperation, format!("unknown buffer {}", buffer.0)),
        }
    }

    fn buffer_sub_data(&mut self, buffer: BufferHandle, offset: usize, data: &[u8]) -> Result<()> {
        log::trace!(
            "SoftwareContext: buffer {} sub data at {} ({} bytes)",
            buffer.0,
            offset,
            data.len()
        );
        self.range_mut(buffer, offset, data.len())?.copy_from_slice(data);
        Ok(())
    }

    fn buffer_size(&self, buffer: BufferHandle) -> Result<usize> {
        self.store(buffer)
            .map(Vec::len)
            .ok_or_else(|| Error::ResourceError(format!("unknown buffer {}", buffer.0)))
    }

    fn map_buffer_range(&mut self, buffer: BufferHandle, offset: usize, len: usize) -> Result<&mut [u8]> {
        log::trace!("SoftwareContext: mapping buffer {} range {}+{}", buffer.0, offset, len);
        self.range_mut(buffer, offset, len)
    }

    fn transform_feedback_capture(&mut self, words: &[u32], buffer: BufferHandle, offset: usize) -> Result<()> {
        log::trace!(
            "SoftwareContext: transform feedback of {} words into buffer {} at {}",
            words.len(),
            buffer.0,
            offset
        );
        let bytes: &[u8] = bytemuck::cast_slice(words);
        self.range_mut(buffer, offset, bytes.len())?.copy_from_slice(bytes);
        Ok(())
    }

    fn clear(&mut self, color: Rgba<u8>) {
        let (width, height) = self.viewport;
        for y in 0..height {
            for x in 0..width {
                self.framebuffer.set_pixel(x, y, color);
            }
        }
    }

    fn read_pixels(&self, x: u32, y: u32, width: u32, height: u32) -> Result<Surface> {
        let fits = x as u64 + width as u64 <= self.framebuffer.width() as u64
            && y as u64 + height as u64 <= self.framebuffer.height() as u64;
        if !fits {
            return Err(Error::ResourceError(format!(
                "read of {width}x{height} at ({x}, {y}) outside framebuffer"
            )));
        }
        let mut out = Surface::new(width, height)?;
        for row in 0..height {
            for col in 0..width {
                out.set_pixel(col, row, self.framebuffer.pixel(x + col, y + row));
            }
        }
        Ok(out)
    }

    fn read_pixels_into_buffer(
        &mut self,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        buffer: BufferHandle,
        offset: usize,
    ) -> Result<()> {
        log::trace!(
            "SoftwareContext: read {}x{} pixels into buffer {} at {}",
            width,
            height,
            buffer.0,
            offset
        );
        self.check_rect(x, y, width, height)?;
        let pixels = self.read_pixels(x, y, width, height)?;
        let bytes = pixels.as_bytes();
        self.range_mut(buffer, offset, bytes.len())?.copy_from_slice(bytes);
        Ok(())
    }

    fn write_pixels(&mut self, x: u32, y: u32, pixels: &Surface) -> Result<()> {
        self.check_rect(x, y, pixels.width(), pixels.height())?;
        for row in 0..pixels.height() {
            for col in 0..pixels.width() {
                self.framebuffer.set_pixel(x + col, y + row, pixels.pixel(col, row));
            }
        }
        Ok(())
    }

    fn draw_triangles(&mut self, draw: &TriangleDraw) -> Result<()> {
        log::trace!("SoftwareContext: drawing {} triangle indices", draw.index_count);
        let positions: Vec<GridVertex> = self.vertices(draw.positions)?;
        let indices: Vec<u16> = self
            .range(draw.indices, 0, draw.index_count * 2)?
            .chunks_exact(2)
            .map(bytemuck::pod_read_unaligned)
            .collect();

        let mut window = Vec::with_capacity(indices.len());
        let mut colors = Vec::with_capacity(indices.len());
        for &index in &indices {
            let index = index as usize;
            let Some(vertex) = positions.get(index) else {
                return self.fail(
                    ContextError::InvalidOperation,
                    format!("vertex index {index} outside position buffer"),
                );
            };
            let c = self.range(draw.colors.buffer, draw.colors.offset + index * 3, 3)?;
            colors.push(Vec4::new(
                c[0] as f32 / 255.0,
                c[1] as f32 / 255.0,
                c[2] as f32 / 255.0,
                1.0,
            ));
            window.push(self.window_position(vertex.position));
        }

        for (v, c) in window.chunks_exact(3).zip(colors.chunks_exact(3)) {
            fill_triangle(
                &mut self.framebuffer,
                self.viewport,
                &[v[0], v[1], v[2]],
                &[c[0], c[1], c[2]],
            );
        }
        Ok(())
    }

    fn draw_line_strip(&mut self, draw: &LineStripDraw) -> Result<()> {
        let vertices: Vec<ColorVertex> = self.vertices(draw.vertices)?;
        let LineIndices { buffer, offset, count } = draw.indices;
        let order: Vec<usize> = self.range(buffer, offset, count)?.iter().map(|&i| i as usize).collect();
        log::trace!("SoftwareContext: drawing line strip of {} vertices", order.len());

        let mut positions = Vec::with_capacity(order.len());
        let mut colors = Vec::with_capacity(order.len());
        for index in order {
            let Some(vertex) = vertices.get(index) else {
                return self.fail(
                    ContextError::InvalidOperation,
                    format!("vertex index {index} outside vertex buffer"),
                );
            };
            positions.push(self.window_position(vertex.position));
            colors.push(Vec4::from(vertex.color));
        }
        draw_line_strip(&mut self.framebuffer, self.viewport, &positions, &colors, draw.blend);
        Ok(())
    }

    fn draw_textured_quad(
        &mut self,
        binding: &TextureBinding<'_>,
        tex_coord: &[f32],
        params: &ReferenceParams,
    ) -> Result<()> {
        log::trace!(
            "SoftwareContext: drawing textured quad {:?}",
            params.base.texture_type
        );
        let (width, height) = self.viewport;
        let mut access = SurfaceAccess::new(&mut self.framebuffer, 0, 0, width, height)?;
        render_reference(&mut access, binding, tex_coord, params)
    }

    fn take_error(&mut self) -> Option<ContextError> {
        self.error.take()
    }
}

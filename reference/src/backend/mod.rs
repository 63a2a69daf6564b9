//! Render context abstraction
//!
//! Verifiers and test cases talk to the graphics API only through
//! [`RenderContext`], which is passed explicitly to every operation. The
//! [`software`] module provides a deterministic CPU implementation.

pub mod software;

use bytemuck::{Pod, Zeroable};
use deqp_core::surface::Surface;
use image::Rgba;
use thiserror::Error;

use crate::error::Result;
use crate::params::ReferenceParams;
use crate::raster::BlendMode;
use crate::render::TextureBinding;

pub use software::SoftwareContext;

/// Handle to a context buffer object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferHandle(pub(crate) u64);

impl BufferHandle {
    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// Sticky error reported by [`RenderContext::take_error`].
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContextError {
    #[error("GL_INVALID_VALUE")]
    InvalidValue,
    #[error("GL_INVALID_OPERATION")]
    InvalidOperation,
    #[error("GL_OUT_OF_MEMORY")]
    OutOfMemory,
}

/// Position-only vertex, as uploaded for grid draws.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct GridVertex {
    /// Normalized device coordinates.
    pub position: [f32; 2],
}

static_assertions::assert_eq_size!(GridVertex, [f32; 2]);

/// Vertex with position and color.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct ColorVertex {
    pub position: [f32; 2],
    pub color: [f32; 4],
}

static_assertions::assert_eq_size!(ColorVertex, [f32; 6]);

/// Per-vertex colors read as three normalized bytes per vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexColors {
    pub buffer: BufferHandle,
    pub offset: usize,
}

/// Indexed triangle list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriangleDraw {
    /// Buffer of [`GridVertex`].
    pub positions: BufferHandle,
    pub colors: VertexColors,
    /// Buffer of native-endian `u16` indices.
    pub indices: BufferHandle,
    pub index_count: usize,
}

/// Vertex order of a line strip: `count` unsigned byte indices starting at
/// `offset` in `buffer`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineIndices {
    pub buffer: BufferHandle,
    pub offset: usize,
    pub count: usize,
}

/// Line strip draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineStripDraw {
    /// Buffer of [`ColorVertex`].
    pub vertices: BufferHandle,
    pub indices: LineIndices,
    pub blend: BlendMode,
}

/// Graphics API surface used by verifiers and test cases.
///
/// All draws target the viewport at the framebuffer origin. Rows are
/// bottom-up, matching `glReadPixels`.
pub trait RenderContext {
    /// Get the context name
    fn name(&self) -> &str;

    fn viewport_size(&self) -> (u32, u32);

    /// Set the viewport; it must fit in the framebuffer.
    fn set_viewport(&mut self, width: u32, height: u32) -> Result<()>;

    // Buffers

    /// Create an empty buffer
    fn create_buffer(&mut self) -> Result<BufferHandle>;

    /// Delete a buffer. Unknown handles are ignored.
    fn delete_buffer(&mut self, buffer: BufferHandle);

    /// Replace the buffer store with `data`
    fn buffer_data(&mut self, buffer: BufferHandle, data: &[u8]) -> Result<()>;

    /// Overwrite `data.len()` bytes at `offset`
    fn buffer_sub_data(&mut self, buffer: BufferHandle, offset: usize, data: &[u8]) -> Result<()>;

    fn buffer_size(&self, buffer: BufferHandle) -> Result<usize>;

    /// Map `len` bytes at `offset` for reading and writing
    fn map_buffer_range(&mut self, buffer: BufferHandle, offset: usize, len: usize) -> Result<&mut [u8]>;

    /// Capture `words` into `buffer` at `offset` as transform feedback output
    fn transform_feedback_capture(&mut self, words: &[u32], buffer: BufferHandle, offset: usize) -> Result<()>;

    // Framebuffer

    /// Clear the viewport
    fn clear(&mut self, color: Rgba<u8>);

    fn read_pixels(&self, x: u32, y: u32, width: u32, height: u32) -> Result<Surface>;

    /// Read pixels as tightly packed RGBA8 into `buffer` at `offset`
    fn read_pixels_into_buffer(
        &mut self,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        buffer: BufferHandle,
        offset: usize,
    ) -> Result<()>;

    /// Copy `pixels` into the framebuffer at `(x, y)`
    fn write_pixels(&mut self, x: u32, y: u32, pixels: &Surface) -> Result<()>;

    // Draws

    fn draw_triangles(&mut self, draw: &TriangleDraw) -> Result<()>;

    fn draw_line_strip(&mut self, draw: &LineStripDraw) -> Result<()>;

    /// Draw a viewport-filling quad textured with `binding`
    fn draw_textured_quad(
        &mut self,
        binding: &TextureBinding<'_>,
        tex_coord: &[f32],
        params: &ReferenceParams,
    ) -> Result<()>;

    /// Take and clear the pending error
    fn take_error(&mut self) -> Option<ContextError>;
}

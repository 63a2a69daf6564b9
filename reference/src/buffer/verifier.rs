use deqp_core::math::{IVec3, UVec4, Vec2, Vec4};
use deqp_core::surface::Surface;
use image::Rgba;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::backend::{
    BufferHandle, ColorVertex, GridVertex, LineIndices, LineStripDraw, RenderContext,
    TriangleDraw, VertexColors,
};
use crate::compare::{int_threshold_position_deviation_compare, pixel_threshold_compare, CompareReport};
use crate::error::{ensure, Error, Result};
use crate::raster::{self, BlendMode};

use super::{
    compare_byte_arrays, segment_end, INDEX_ARRAY_DRAW_VIEWPORT_HEIGHT,
    INDEX_ARRAY_DRAW_VIEWPORT_WIDTH, MAX_LINES_PER_INDEX_ARRAY_DRAW, VERIFY_QUAD_SIZE,
};

const BYTES_PER_VERTEX: usize = 3;
const BYTES_PER_QUAD: usize = BYTES_PER_VERTEX * 4;
const MAX_QUADS_PER_AXIS: u32 = 128;
const INDEX_GRID_SIZE: usize = 16;
const INDEX_COLOR_SEED: u64 = 0xabc231;
const CLEAR_COLOR: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// Pathway used to read a buffer back for verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VerifyType {
    AsVertexArray,
    AsIndexArray,
    BufferReadMap,
}

impl VerifyType {
    pub const ALL: [VerifyType; 3] = [
        VerifyType::AsVertexArray,
        VerifyType::AsIndexArray,
        VerifyType::BufferReadMap,
    ];

    pub fn description(self) -> &'static str {
        match self {
            VerifyType::AsVertexArray => "rendering as vertex data",
            VerifyType::AsIndexArray => "rendering as index data",
            VerifyType::BufferReadMap => "reading back using glMapBufferRange()",
        }
    }
}

/// Outcome of one verification.
#[derive(Debug, Clone, PartialEq)]
pub struct VerifyReport {
    pub passed: bool,
    /// Byte range of the failing batch, or the byte comparison log.
    pub message: String,
    /// Image comparison of the failing batch for rendering verifiers.
    pub image: Option<CompareReport>,
}

impl VerifyReport {
    fn pass() -> Self {
        Self {
            passed: true,
            message: String::new(),
            image: None,
        }
    }

    fn image_failure(report: CompareReport) -> Self {
        Self {
            passed: false,
            message: format!("{}: {}", report.description, report.message),
            image: Some(report),
        }
    }

    /// `Ok(self)` when passed, [`Error::ComparisonFailure`] otherwise.
    pub fn into_result(self) -> Result<Self> {
        if self.passed {
            Ok(self)
        } else {
            Err(Error::ComparisonFailure(self.message))
        }
    }
}

/// Reads byte ranges of a buffer back through one [`VerifyType`] and
/// compares them against reference bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferVerifier {
    verify_type: VerifyType,
}

impl BufferVerifier {
    pub fn new(verify_type: VerifyType) -> Self {
        Self { verify_type }
    }

    pub fn verify_type(&self) -> VerifyType {
        self.verify_type
    }

    /// Smallest number of bytes one verification can cover.
    pub fn min_size(&self) -> usize {
        match self.verify_type {
            VerifyType::AsVertexArray => BYTES_PER_QUAD,
            VerifyType::AsIndexArray => 2,
            VerifyType::BufferReadMap => 1,
        }
    }

    pub fn alignment(&self) -> usize {
        1
    }

    /// Verify `num_bytes` of `buffer` starting at `offset` against the same
    /// range of `reference`, which holds the expected contents of the whole
    /// buffer.
    pub fn verify(
        &self,
        ctx: &mut dyn RenderContext,
        buffer: BufferHandle,
        reference: &[u8],
        offset: usize,
        num_bytes: usize,
    ) -> Result<VerifyReport> {
        ensure(num_bytes >= self.min_size(), || {
            "Number of bytes to verify is smaller than the minimum size.".to_string()
        })?;
        let end = segment_end(offset, num_bytes)?;
        ensure(offset % self.alignment() == 0, || "Offset is not aligned.".to_string())?;
        ensure(end % self.alignment() == 0, || {
            "Buffer segment is not aligned".to_string()
        })?;
        ensure(end <= reference.len(), || {
            format!(
                "Range {offset}+{num_bytes} is outside the {} byte reference",
                reference.len()
            )
        })?;

        log::debug!(
            "Verifying {} bytes at offset {} by {}",
            num_bytes,
            offset,
            self.verify_type.description()
        );
        match self.verify_type {
            VerifyType::AsVertexArray => verify_as_vertex_array(ctx, buffer, reference, offset, num_bytes),
            VerifyType::AsIndexArray => verify_as_index_array(ctx, buffer, reference, offset, num_bytes),
            VerifyType::BufferReadMap => verify_read_map(ctx, buffer, reference, offset, num_bytes),
        }
    }
}

fn batch_description(first: usize, len: usize) -> String {
    format!("Bytes {} to {}", first, first + len - 1)
}

/// Run `f` with the viewport temporarily set to `size`.
fn with_viewport<T>(
    ctx: &mut dyn RenderContext,
    size: (u32, u32),
    f: impl FnOnce(&mut dyn RenderContext) -> Result<T>,
) -> Result<T> {
    let saved = ctx.viewport_size();
    ctx.set_viewport(size.0, size.1)?;
    let result = f(ctx);
    ctx.set_viewport(saved.0, saved.1)?;
    result
}

/// Run `f` with `N` freshly created buffers, deleting them afterwards.
fn with_buffers<const N: usize, T>(
    ctx: &mut dyn RenderContext,
    f: impl FnOnce(&mut dyn RenderContext, [BufferHandle; N]) -> Result<T>,
) -> Result<T> {
    let mut handles = Vec::with_capacity(N);
    for _ in 0..N {
        match ctx.create_buffer() {
            Ok(handle) => handles.push(handle),
            Err(err) => {
                handles.into_iter().for_each(|h| ctx.delete_buffer(h));
                return Err(err);
            }
        }
    }
    let array: [BufferHandle; N] = std::array::from_fn(|i| handles[i]);
    let result = f(ctx, array);
    handles.into_iter().for_each(|h| ctx.delete_buffer(h));
    result
}

// ============================================================================
// Vertex array
// ============================================================================

/// Corner positions of a `grid_x` x `grid_y` quad grid in normalized device
/// coordinates, four vertices per quad in row-major quad order.
pub fn compute_positions(grid_x: usize, grid_y: usize) -> Vec<GridVertex> {
    let mut positions = Vec::with_capacity(grid_x * grid_y * 4);
    for y in 0..grid_y {
        for x in 0..grid_x {
            let fx0 = 2.0 * x as f32 / grid_x as f32 - 1.0;
            let fy0 = 2.0 * y as f32 / grid_y as f32 - 1.0;
            let fx1 = 2.0 * (x + 1) as f32 / grid_x as f32 - 1.0;
            let fy1 = 2.0 * (y + 1) as f32 / grid_y as f32 - 1.0;
            positions.extend([[fx0, fy0], [fx0, fy1], [fx1, fy0], [fx1, fy1]].map(|position| GridVertex { position }));
        }
    }
    positions
}

/// Triangle indices for [`compute_positions`], two triangles per quad.
pub fn compute_indices(grid_x: usize, grid_y: usize) -> Result<Vec<u16>> {
    let num_quads = grid_x * grid_y;
    ensure(num_quads * 4 <= 1 << 16, || {
        "Vertex index value won't fit into a 16-bit number".to_string()
    })?;
    let mut indices = Vec::with_capacity(num_quads * 6);
    for quad in 0..num_quads {
        let base = (quad * 4) as u16;
        let (v00, v01, v10, v11) = (base, base + 1, base + 2, base + 3);
        indices.extend([v10, v00, v01, v10, v01, v11]);
    }
    Ok(indices)
}

fn fetch_vertex_color(colors: &[u8], vertex: usize) -> Vec4 {
    let c = &colors[vertex * BYTES_PER_VERTEX..vertex * BYTES_PER_VERTEX + 3];
    Vec4::new(c[0] as f32 / 255.0, c[1] as f32 / 255.0, c[2] as f32 / 255.0, 1.0)
}

/// Expected image of `num_quads` quads laid out `row_length` per row, with
/// vertex colors read three bytes per vertex from `colors`.
pub fn render_quad_grid_reference(num_quads: usize, row_length: usize, colors: &[u8]) -> Result<Surface> {
    ensure(row_length > 0, || "Row length must be positive".to_string())?;
    ensure(colors.len() >= num_quads * BYTES_PER_QUAD, || {
        format!(
            "{} color bytes cannot cover {num_quads} quads",
            colors.len()
        )
    })?;
    let num_rows = num_quads.div_ceil(row_length);
    let quad = VERIFY_QUAD_SIZE as usize;
    let mut dst = Surface::new((row_length * quad) as u32, (num_rows * quad) as u32)?;
    dst.clear(CLEAR_COLOR);

    for quad_ndx in 0..num_quads {
        let x0 = (quad_ndx % row_length) * quad;
        let y0 = (quad_ndx / row_length) * quad;
        // Corners in vertex order: (0,0), (0,1), (1,0), (1,1).
        let c = [0, 1, 2, 3].map(|i| fetch_vertex_color(colors, quad_ndx * 4 + i));

        for y in 0..quad {
            for x in 0..quad {
                let fx = (x as f32 + 0.5) / quad as f32;
                let fy = (y as f32 + 0.5) / quad as f32;
                let (t0, t1, t2, tx, ty) = if fx + fy <= 1.0 {
                    (c[0], c[2], c[1], fx, fy)
                } else {
                    (c[3], c[1], c[2], 1.0 - fx, 1.0 - fy)
                };
                let color = t0 + (t1 - t0) * tx + (t2 - t0) * ty;
                dst.set_pixel_color((x0 + x) as u32, (y0 + y) as u32, &color);
            }
        }
    }
    Ok(dst)
}

fn verify_as_vertex_array(
    ctx: &mut dyn RenderContext,
    buffer: BufferHandle,
    reference: &[u8],
    offset: usize,
    num_bytes: usize,
) -> Result<VerifyReport> {
    let (vw, vh) = ctx.viewport_size();
    let max_quads_x = MAX_QUADS_PER_AXIS.min(vw / VERIFY_QUAD_SIZE) as usize;
    let max_quads_y = MAX_QUADS_PER_AXIS.min(vh / VERIFY_QUAD_SIZE) as usize;
    ensure(max_quads_x > 0 && max_quads_y > 0, || {
        format!("Viewport {vw}x{vh} cannot fit a verification quad")
    })?;
    let max_quads_per_batch = max_quads_x * max_quads_y;

    let positions = compute_positions(max_quads_x, max_quads_y);
    let indices = compute_indices(max_quads_x, max_quads_y)?;
    let viewport = (
        max_quads_x as u32 * VERIFY_QUAD_SIZE,
        max_quads_y as u32 * VERIFY_QUAD_SIZE,
    );

    with_buffers::<2, _>(ctx, |ctx, [position_buf, index_buf]| {
        ctx.buffer_data(position_buf, bytemuck::cast_slice(&positions))?;
        ctx.buffer_data(index_buf, bytemuck::cast_slice(&indices))?;

        with_viewport(ctx, viewport, |ctx| {
            let mut num_verified = 0;
            while num_verified < num_bytes {
                let num_remaining = num_bytes - num_verified;
                let is_leftover = num_remaining < BYTES_PER_QUAD;
                let num_to_verify = if is_leftover {
                    BYTES_PER_QUAD
                } else {
                    (max_quads_per_batch * BYTES_PER_QUAD).min(num_remaining - num_remaining % BYTES_PER_QUAD)
                };
                let cur_offset = if is_leftover {
                    num_bytes - BYTES_PER_QUAD
                } else {
                    num_verified
                };
                let num_quads = num_to_verify / BYTES_PER_QUAD;
                let num_cols = max_quads_x.min(num_quads);
                let num_rows = num_quads.div_ceil(max_quads_x);
                let description = batch_description(offset + cur_offset, num_to_verify);
                log::debug!("VertexArrayVerifier: {}", description);

                ctx.clear(CLEAR_COLOR);
                ctx.draw_triangles(&TriangleDraw {
                    positions: position_buf,
                    colors: VertexColors {
                        buffer,
                        offset: offset + cur_offset,
                    },
                    indices: index_buf,
                    index_count: num_quads * 6,
                })?;

                let expected = render_quad_grid_reference(num_quads, num_cols, &reference[offset + cur_offset..])?;
                let rendered = ctx.read_pixels(
                    0,
                    0,
                    num_cols as u32 * VERIFY_QUAD_SIZE,
                    num_rows as u32 * VERIFY_QUAD_SIZE,
                )?;
                let report = pixel_threshold_compare("RenderResult", &description, &expected, &rendered, Rgba([3, 3, 3, 3]))?;
                if !report.passed {
                    return Ok(VerifyReport::image_failure(report));
                }

                num_verified += if is_leftover { num_remaining } else { num_to_verify };
            }
            Ok(VerifyReport::pass())
        })
    })
}

// ============================================================================
// Index array
// ============================================================================

fn index_verifier_vertices() -> Vec<ColorVertex> {
    let mut rng = StdRng::seed_from_u64(INDEX_COLOR_SEED);
    let last = (INDEX_GRID_SIZE - 1) as f32;
    let mut vertices = Vec::with_capacity(INDEX_GRID_SIZE * INDEX_GRID_SIZE);
    for y in 0..INDEX_GRID_SIZE {
        for x in 0..INDEX_GRID_SIZE {
            let position = [x as f32 / last * 2.0 - 1.0, y as f32 / last * 2.0 - 1.0];
            let color = [
                rng.gen_range(0.1..0.5),
                rng.gen_range(0.1..0.5),
                rng.gen_range(0.1..0.5),
                1.0,
            ];
            vertices.push(ColorVertex { position, color });
        }
    }
    vertices
}

fn verify_as_index_array(
    ctx: &mut dyn RenderContext,
    buffer: BufferHandle,
    reference: &[u8],
    offset: usize,
    num_bytes: usize,
) -> Result<VerifyReport> {
    const MIN_BYTES_PER_BATCH: usize = 2;
    let max_bytes_per_batch = MAX_LINES_PER_INDEX_ARRAY_DRAW + 1;

    let (vw, vh) = ctx.viewport_size();
    let viewport = (
        INDEX_ARRAY_DRAW_VIEWPORT_WIDTH.min(vw),
        INDEX_ARRAY_DRAW_VIEWPORT_HEIGHT.min(vh),
    );
    let vertices = index_verifier_vertices();
    let window: Vec<Vec2> = vertices
        .iter()
        .map(|v| raster::to_window(&Vec2::new(v.position[0], v.position[1]), viewport.0, viewport.1))
        .collect();

    with_buffers::<1, _>(ctx, |ctx, [vertex_buf]| {
        ctx.buffer_data(vertex_buf, bytemuck::cast_slice(&vertices))?;

        with_viewport(ctx, viewport, |ctx| {
            let mut num_verified = 0;
            while num_verified < num_bytes {
                let num_remaining = num_bytes - num_verified;
                let is_leftover = num_remaining < MIN_BYTES_PER_BATCH;
                let num_to_verify = if is_leftover {
                    MIN_BYTES_PER_BATCH
                } else {
                    max_bytes_per_batch.min(num_remaining)
                };
                let cur_offset = if is_leftover {
                    num_bytes - MIN_BYTES_PER_BATCH
                } else {
                    num_verified
                };
                let description = batch_description(offset + cur_offset, num_to_verify);
                log::debug!("IndexArrayVerifier: {}", description);

                ctx.clear(CLEAR_COLOR);
                ctx.draw_line_strip(&LineStripDraw {
                    vertices: vertex_buf,
                    indices: LineIndices {
                        buffer,
                        offset: offset + cur_offset,
                        count: num_to_verify,
                    },
                    blend: BlendMode::Additive,
                })?;
                let rendered = ctx.read_pixels(0, 0, viewport.0, viewport.1)?;

                let mut expected = Surface::new(viewport.0, viewport.1)?;
                expected.clear(CLEAR_COLOR);
                let batch = &reference[offset + cur_offset..offset + cur_offset + num_to_verify];
                let mut points = Vec::with_capacity(batch.len());
                let mut colors = Vec::with_capacity(batch.len());
                for &index in batch {
                    let index = index as usize;
                    ensure(index < vertices.len(), || {
                        format!("Index {index} outside the {} vertex grid", vertices.len())
                    })?;
                    points.push(window[index]);
                    colors.push(Vec4::from(vertices[index].color));
                }
                raster::draw_line_strip(&mut expected, viewport, &points, &colors, BlendMode::Additive);

                let report = int_threshold_position_deviation_compare(
                    "RenderResult",
                    &description,
                    &expected,
                    &rendered,
                    UVec4::zeros(),
                    IVec3::new(1, 1, 0),
                    true,
                )?;
                if !report.passed {
                    return Ok(VerifyReport::image_failure(report));
                }

                num_verified += if is_leftover { num_remaining } else { num_to_verify };
            }
            Ok(VerifyReport::pass())
        })
    })
}

// ============================================================================
// Read map
// ============================================================================

fn verify_read_map(
    ctx: &mut dyn RenderContext,
    buffer: BufferHandle,
    reference: &[u8],
    offset: usize,
    num_bytes: usize,
) -> Result<VerifyReport> {
    let mapped = ctx.map_buffer_range(buffer, offset, num_bytes)?;
    let compare = compare_byte_arrays(mapped, &reference[offset..offset + num_bytes]);
    if !compare.passed {
        log::warn!("{}", compare.text);
    }
    Ok(VerifyReport {
        passed: compare.passed,
        message: compare.text,
        image: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::SoftwareContext;
    use crate::buffer::fill_with_random_bytes;
    use crate::error::ErrorKind;

    fn upload(ctx: &mut SoftwareContext, data: &[u8]) -> BufferHandle {
        let buf = ctx.create_buffer().unwrap();
        ctx.buffer_data(buf, data).unwrap();
        buf
    }

    #[test]
    fn indices_cover_two_triangles_per_quad() {
        let indices = compute_indices(2, 1).unwrap();
        assert_eq!(indices, vec![2, 0, 1, 2, 1, 3, 6, 4, 5, 6, 5, 7]);
        assert!(compute_indices(128, 128).is_ok());
        assert!(compute_indices(129, 128).is_err());
    }

    #[test]
    fn positions_span_the_viewport() {
        let positions = compute_positions(2, 2);
        assert_eq!(positions.len(), 16);
        assert_eq!(positions[0].position, [-1.0, -1.0]);
        assert_eq!(positions[15].position, [1.0, 1.0]);
        assert_eq!(positions[2].position, [0.0, -1.0]);
    }

    #[test]
    fn quad_grid_reference_layout() {
        // Three uniformly colored quads in rows of two.
        let mut colors = Vec::new();
        for value in [10u8, 20, 30] {
            colors.extend(std::iter::repeat(value).take(BYTES_PER_QUAD));
        }
        let image = render_quad_grid_reference(3, 2, &colors).unwrap();
        assert_eq!((image.width(), image.height()), (16, 16));
        assert_eq!(image.pixel(3, 3), Rgba([10, 10, 10, 255]));
        assert_eq!(image.pixel(12, 3), Rgba([20, 20, 20, 255]));
        assert_eq!(image.pixel(3, 12), Rgba([30, 30, 30, 255]));
        assert_eq!(image.pixel(12, 12), CLEAR_COLOR);
    }

    #[test]
    fn every_verify_type_accepts_matching_contents() {
        let mut data = vec![0u8; 300];
        fill_with_random_bytes(&mut data, 7);
        for verify_type in VerifyType::ALL {
            let mut ctx = SoftwareContext::new(64, 64).unwrap();
            let buf = upload(&mut ctx, &data);
            let report = BufferVerifier::new(verify_type)
                .verify(&mut ctx, buf, &data, 5, 250)
                .unwrap();
            assert!(report.passed, "{}: {}", verify_type.description(), report.message);
            // Helper buffers are released and the viewport restored.
            assert_eq!(ctx.num_buffers(), 1);
            assert_eq!(ctx.viewport_size(), (64, 64));
        }
    }

    #[test]
    fn vertex_array_detects_corruption() {
        let data = vec![200u8; 48];
        // One quad per batch.
        let mut ctx = SoftwareContext::new(8, 8).unwrap();
        let buf = upload(&mut ctx, &data);
        ctx.buffer_sub_data(buf, 13, &[0, 0, 0]).unwrap();
        let report = BufferVerifier::new(VerifyType::AsVertexArray)
            .verify(&mut ctx, buf, &data, 0, 48)
            .unwrap();
        assert!(!report.passed);
        assert!(report.message.starts_with("Bytes 12 to 23"), "{}", report.message);
        assert!(report.image.is_some());
    }

    #[test]
    fn read_map_reports_byte_spans() {
        let data = vec![1u8; 16];
        let mut ctx = SoftwareContext::new(4, 4).unwrap();
        let buf = upload(&mut ctx, &data);
        ctx.buffer_sub_data(buf, 9, &[5]).unwrap();
        let report = BufferVerifier::new(VerifyType::BufferReadMap)
            .verify(&mut ctx, buf, &data, 0, 16)
            .unwrap();
        assert!(!report.passed);
        assert!(report.message.contains("1 byte difference at offset 9"));
        assert_eq!(report.into_result().unwrap_err().kind(), ErrorKind::ComparisonFailure);
    }

    #[test]
    fn preconditions() {
        let data = vec![0u8; 32];
        let mut ctx = SoftwareContext::new(16, 16).unwrap();
        let buf = upload(&mut ctx, &data);
        let vertex = BufferVerifier::new(VerifyType::AsVertexArray);
        let err = vertex.verify(&mut ctx, buf, &data, 0, 11).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PreconditionViolation);
        let err = vertex.verify(&mut ctx, buf, &data, 24, 12).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PreconditionViolation);

        let mut tiny = SoftwareContext::new(4, 4).unwrap();
        let buf = upload(&mut tiny, &data);
        assert!(vertex.verify(&mut tiny, buf, &data, 0, 12).is_err());
    }
}

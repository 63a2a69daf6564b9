//! Test case lifecycle and the cases built on the reference core.
//!
//! A [`TestCase`] is initialized once, iterated until it returns
//! [`IterateResult::Stop`] and always deinitialized. [`run_test_case`]
//! drives that lifecycle against an explicit [`RenderContext`].

use deqp_core::math::Vec3;
use deqp_core::surface::Surface;
use deqp_core::texture::{CubeFace, Texture2D, Texture2DArray, Texture3D, TextureCube};
use image::Rgba;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::backend::{BufferHandle, RenderContext};
use crate::buffer::{
    fill_with_random_bytes, BufferCase, BufferVerifier, BufferWriter, ReferenceBuffer,
    VerifyType, WriteType,
};
use crate::compare::compare_images;
use crate::error::{ensure, Error, ErrorKind, Result};
use crate::interpolate::{
    compute_quad_tex_coord_2d, compute_quad_tex_coord_2d_array, compute_quad_tex_coord_3d,
    compute_quad_tex_coord_cube,
};
use crate::params::{ReferenceParams, TextureType};
use crate::render::{render_reference, SurfaceAccess, TextureBinding};

/// Whether a case wants another iteration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IterateResult {
    Continue,
    Stop,
}

/// Final verdict of a case
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TestStatus {
    Pass,
    Fail(String),
}

/// Trait for test cases
pub trait TestCase {
    /// Get the case name
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// Allocate resources
    fn init(&mut self, ctx: &mut dyn RenderContext) -> Result<()>;

    /// Run one step
    fn iterate(&mut self, ctx: &mut dyn RenderContext) -> Result<IterateResult>;

    /// Release resources. Called even when init or iterate failed.
    fn deinit(&mut self, ctx: &mut dyn RenderContext);
}

/// Run `case` to completion.
///
/// Comparison failures become [`TestStatus::Fail`]; precondition and
/// resource errors are returned.
pub fn run_test_case(case: &mut dyn TestCase, ctx: &mut dyn RenderContext) -> Result<TestStatus> {
    log::info!("Running {}: {}", case.name(), case.description());
    let result = run_iterations(case, ctx);
    case.deinit(ctx);

    match result {
        Ok(()) => {
            log::info!("{}: Pass", case.name());
            Ok(TestStatus::Pass)
        }
        Err(err) if err.kind() == ErrorKind::ComparisonFailure => {
            log::warn!("{}: Fail ({})", case.name(), err.message());
            Ok(TestStatus::Fail(err.message().to_string()))
        }
        Err(err) => Err(err),
    }
}

fn run_iterations(case: &mut dyn TestCase, ctx: &mut dyn RenderContext) -> Result<()> {
    case.init(ctx)?;
    while case.iterate(ctx)? == IterateResult::Continue {}
    Ok(())
}

// ============================================================================
// Buffer write case
// ============================================================================

/// Uploads random data, overwrites random sub-ranges through one write
/// pathway and verifies each write through one verify pathway.
#[derive(Debug)]
pub struct BufferWriteCase {
    name: String,
    description: String,
    writer: BufferWriter,
    verifier: BufferVerifier,
    size: usize,
    seed: u64,
    num_writes: usize,
    buffers: BufferCase,
    buffer: Option<BufferHandle>,
    reference: ReferenceBuffer,
    rng: StdRng,
    iteration: usize,
}

impl BufferWriteCase {
    pub fn new(
        name: impl Into<String>,
        write_type: WriteType,
        verify_type: VerifyType,
        size: usize,
        seed: u64,
    ) -> Self {
        Self {
            name: name.into(),
            description: format!(
                "Write with {}, verify by {}",
                write_type.description(),
                verify_type.description()
            ),
            writer: BufferWriter::new(write_type),
            verifier: BufferVerifier::new(verify_type),
            size,
            seed,
            num_writes: 4,
            buffers: BufferCase::new(),
            buffer: None,
            reference: ReferenceBuffer::new(),
            rng: StdRng::seed_from_u64(seed),
            iteration: 0,
        }
    }

    /// Number of sub-range writes after the base upload.
    pub fn with_num_writes(mut self, num_writes: usize) -> Self {
        self.num_writes = num_writes;
        self
    }

    pub fn reference(&self) -> &ReferenceBuffer {
        &self.reference
    }

    fn alignment(&self) -> usize {
        self.writer.alignment().max(self.verifier.alignment())
    }

    /// Smallest range both pathways accept.
    fn min_range(&self) -> usize {
        let min = self.writer.min_size().max(self.verifier.min_size());
        min.next_multiple_of(self.alignment())
    }

    fn verify(&self, ctx: &mut dyn RenderContext, buffer: BufferHandle, offset: usize, len: usize) -> Result<()> {
        self.buffers.check_error(ctx)?;
        self.verifier
            .verify(ctx, buffer, self.reference.as_slice(), offset, len)?
            .into_result()?;
        Ok(())
    }

    fn write_random_range(&mut self, ctx: &mut dyn RenderContext, buffer: BufferHandle) -> Result<()> {
        let align = self.alignment();
        let usable = self.size - self.size % align;
        let min = self.min_range();
        let len = self.rng.gen_range(min..=usable) / align * align;
        let offset = self.rng.gen_range(0..=usable - len) / align * align;

        let mut bytes = vec![0u8; len];
        self.rng.fill(&mut bytes[..]);
        log::debug!("{}: writing {} bytes at offset {}", self.name, len, offset);

        self.reference.set_sub_data(offset, &bytes)?;
        self.writer.write(ctx, buffer, offset, &bytes)?;
        self.verify(ctx, buffer, offset, len)
    }
}

impl TestCase for BufferWriteCase {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn init(&mut self, ctx: &mut dyn RenderContext) -> Result<()> {
        let usable = self.size - self.size % self.alignment();
        ensure(usable >= self.min_range(), || {
            format!(
                "Buffer of {} bytes is smaller than the minimum range of {} bytes",
                self.size,
                self.min_range()
            )
        })?;

        let mut data = vec![0u8; self.size];
        fill_with_random_bytes(&mut data, self.seed);
        self.reference.set_data(&data);

        let buffer = self.buffers.gen_buffer(ctx)?;
        ctx.buffer_data(buffer, &vec![0u8; self.size])?;
        self.buffers.check_error(ctx)?;
        self.buffer = Some(buffer);
        self.rng = StdRng::seed_from_u64(self.seed);
        self.iteration = 0;
        Ok(())
    }

    fn iterate(&mut self, ctx: &mut dyn RenderContext) -> Result<IterateResult> {
        let buffer = self
            .buffer
            .ok_or_else(|| Error::PreconditionViolation("Case iterated before init".to_string()))?;

        if self.iteration == 0 {
            BufferWriter::new(WriteType::BufferSubData).write(ctx, buffer, 0, self.reference.as_slice())?;
            let size = self.size;
            self.verify(ctx, buffer, 0, size)?;
        } else {
            self.write_random_range(ctx, buffer)?;
        }

        self.iteration += 1;
        Ok(if self.iteration > self.num_writes {
            IterateResult::Stop
        } else {
            IterateResult::Continue
        })
    }

    fn deinit(&mut self, ctx: &mut dyn RenderContext) {
        self.buffers.deinit(ctx);
        self.buffer = None;
    }
}

// ============================================================================
// Texture render case
// ============================================================================

/// Texture rendered by a [`TextureRenderCase`], with the slice it shows.
#[derive(Debug, Clone)]
pub enum TextureCaseKind {
    Texture2D(Texture2D),
    Cube { texture: TextureCube, face: CubeFace },
    Texture2DArray { texture: Texture2DArray, layer: u32 },
    /// Slice at depth coordinate `r`.
    Texture3D { texture: Texture3D, r: f32 },
}

impl TextureCaseKind {
    pub fn texture_type(&self) -> TextureType {
        match self {
            TextureCaseKind::Texture2D(_) => TextureType::Texture2D,
            TextureCaseKind::Cube { .. } => TextureType::Cube,
            TextureCaseKind::Texture2DArray { .. } => TextureType::Texture2DArray,
            TextureCaseKind::Texture3D { .. } => TextureType::Texture3D,
        }
    }

    pub fn binding(&self) -> TextureBinding<'_> {
        match self {
            TextureCaseKind::Texture2D(texture) => TextureBinding::Texture2D(texture.view()),
            TextureCaseKind::Cube { texture, .. } => TextureBinding::Cube(texture.view()),
            TextureCaseKind::Texture2DArray { texture, .. } => TextureBinding::Texture2DArray(texture.view()),
            TextureCaseKind::Texture3D { texture, .. } => TextureBinding::Texture3D(texture.view()),
        }
    }

    /// Coordinates covering the whole texture, face, layer or slice.
    pub fn full_quad_tex_coord(&self) -> Vec<f32> {
        match self {
            TextureCaseKind::Texture2D(_) => compute_quad_tex_coord_2d([0.0, 0.0], [1.0, 1.0]).to_vec(),
            TextureCaseKind::Cube { face, .. } => compute_quad_tex_coord_cube(*face).to_vec(),
            TextureCaseKind::Texture2DArray { layer, .. } => {
                compute_quad_tex_coord_2d_array(*layer, [0.0, 0.0], [1.0, 1.0]).to_vec()
            }
            TextureCaseKind::Texture3D { r, .. } => {
                compute_quad_tex_coord_3d(&Vec3::new(0.0, 0.0, *r), &Vec3::new(1.0, 1.0, *r), [0, 1, 2]).to_vec()
            }
        }
    }
}

/// Draws a textured quad through the context and compares it with the
/// reference rendering of the same quad.
#[derive(Debug)]
pub struct TextureRenderCase {
    name: String,
    description: String,
    kind: TextureCaseKind,
    params: ReferenceParams,
    tex_coord: Vec<f32>,
    threshold: Rgba<u8>,
}

impl TextureRenderCase {
    /// `params.base.texture_type` is set from `kind`.
    pub fn new(name: impl Into<String>, kind: TextureCaseKind, mut params: ReferenceParams) -> Self {
        params.base.texture_type = kind.texture_type();
        let tex_coord = kind.full_quad_tex_coord();
        let name = name.into();
        Self {
            description: format!("{:?} texture render", kind.texture_type()),
            name,
            kind,
            params,
            tex_coord,
            threshold: Rgba([1, 1, 1, 1]),
        }
    }

    pub fn with_tex_coord(mut self, tex_coord: Vec<f32>) -> Self {
        self.tex_coord = tex_coord;
        self
    }

    pub fn with_threshold(mut self, threshold: Rgba<u8>) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn kind(&self) -> &TextureCaseKind {
        &self.kind
    }
}

impl TestCase for TextureRenderCase {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn init(&mut self, _ctx: &mut dyn RenderContext) -> Result<()> {
        let binding = self.kind.binding();
        ensure(self.tex_coord.len() == binding.num_tex_coords(), || {
            format!(
                "Expected {} texture coordinates, got {}",
                binding.num_tex_coords(),
                self.tex_coord.len()
            )
        })
    }

    fn iterate(&mut self, ctx: &mut dyn RenderContext) -> Result<IterateResult> {
        let (width, height) = ctx.viewport_size();
        let binding = self.kind.binding();

        ctx.clear(Rgba([0, 0, 0, 255]));
        ctx.draw_textured_quad(&binding, &self.tex_coord, &self.params)?;
        let rendered = ctx.read_pixels(0, 0, width, height)?;

        let mut reference = Surface::new(width, height)?;
        render_reference(&mut SurfaceAccess::full(&mut reference), &binding, &self.tex_coord, &self.params)?;

        compare_images(&reference, &rendered, self.threshold)?.into_result()?;
        Ok(IterateResult::Stop)
    }

    fn deinit(&mut self, _ctx: &mut dyn RenderContext) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::SoftwareContext;
    use deqp_core::math::Vec4;
    use deqp_core::texture::TextureFormat;

    struct FailingCase {
        deinit_called: bool,
        error: Error,
    }

    impl TestCase for FailingCase {
        fn name(&self) -> &str {
            "failing"
        }

        fn description(&self) -> &str {
            "always fails"
        }

        fn init(&mut self, _ctx: &mut dyn RenderContext) -> Result<()> {
            Ok(())
        }

        fn iterate(&mut self, _ctx: &mut dyn RenderContext) -> Result<IterateResult> {
            Err(self.error.clone())
        }

        fn deinit(&mut self, _ctx: &mut dyn RenderContext) {
            self.deinit_called = true;
        }
    }

    #[test]
    fn comparison_failure_becomes_fail_status() {
        let mut ctx = SoftwareContext::new(4, 4).unwrap();
        let mut case = FailingCase {
            deinit_called: false,
            error: Error::ComparisonFailure("mismatch".to_string()),
        };
        let status = run_test_case(&mut case, &mut ctx).unwrap();
        assert_eq!(status, TestStatus::Fail("mismatch".to_string()));
        assert!(case.deinit_called);
    }

    #[test]
    fn other_errors_propagate_after_deinit() {
        let mut ctx = SoftwareContext::new(4, 4).unwrap();
        let mut case = FailingCase {
            deinit_called: false,
            error: Error::ResourceError("lost".to_string()),
        };
        let err = run_test_case(&mut case, &mut ctx).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ResourceError);
        assert!(case.deinit_called);
    }

    #[test]
    fn buffer_write_case_passes_and_frees_buffers() {
        let mut ctx = SoftwareContext::new(32, 32).unwrap();
        let mut case = BufferWriteCase::new("sub_data_map", WriteType::BufferSubData, VerifyType::BufferReadMap, 256, 3);
        assert_eq!(run_test_case(&mut case, &mut ctx).unwrap(), TestStatus::Pass);
        assert_eq!(ctx.num_buffers(), 0);
    }

    #[test]
    fn undersized_buffer_is_a_precondition_violation() {
        let mut ctx = SoftwareContext::new(32, 32).unwrap();
        let mut case = BufferWriteCase::new("tiny", WriteType::TransformFeedback, VerifyType::AsVertexArray, 10, 1);
        let err = run_test_case(&mut case, &mut ctx).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PreconditionViolation);
    }

    #[test]
    fn texture_render_case_matches_reference() {
        let mut texture = Texture2D::new(TextureFormat::RGBA8, 4, 4).unwrap();
        texture
            .level_mut(0)
            .unwrap()
            .clear(&Vec4::new(0.25, 0.5, 0.75, 1.0));
        let mut case = TextureRenderCase::new(
            "solid_2d",
            TextureCaseKind::Texture2D(texture),
            ReferenceParams::new(TextureType::Texture2D),
        );
        let mut ctx = SoftwareContext::new(8, 8).unwrap();
        assert_eq!(run_test_case(&mut case, &mut ctx).unwrap(), TestStatus::Pass);
    }

    #[test]
    fn kinds_provide_matching_coordinates() {
        let cube = TextureCube::new(TextureFormat::RGBA8, 2).unwrap();
        let kind = TextureCaseKind::Cube {
            texture: cube,
            face: CubeFace::PositiveZ,
        };
        assert_eq!(kind.texture_type(), TextureType::Cube);
        assert_eq!(kind.full_quad_tex_coord().len(), kind.binding().num_tex_coords());
    }
}

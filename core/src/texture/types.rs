//! Mipmapped texture containers and borrowed level views.

use crate::error::{CoreError, CoreResult};
use crate::math::{Vec3, Vec4};
use crate::sampler::Sampler;

use super::cube::{cube_face_coords, CubeFace};
use super::format::TextureFormat;
use super::level::TextureLevel;
use super::sampling::{
    sample_level_array_2d, sample_level_array_2d_compare, sample_level_array_3d,
};

/// Number of levels in a full mip pyramid for the largest dimension.
pub fn compute_mip_pyramid_levels(width: u32, height: u32, depth: u32) -> usize {
    let max_dim = width.max(height).max(depth).max(1);
    max_dim.ilog2() as usize + 1
}

/// Size of a dimension at mip level `level`.
pub fn mip_level_size(base: u32, level: usize) -> u32 {
    base.checked_shr(level as u32).unwrap_or(0).max(1)
}

fn level_out_of_range(level: usize, count: usize) -> CoreError {
    CoreError::LevelOutOfRange { level, count }
}

/// Clamp `[base, max]` into a non-empty range of `count` levels.
fn clamp_level_range(base: usize, max: usize, count: usize) -> (usize, usize) {
    let last = count.saturating_sub(1);
    let base = base.min(last);
    let max = max.clamp(base, last);
    (base, max)
}

/// Layer index for a 2D array coordinate.
fn select_layer(r: f32, num_layers: u32) -> i32 {
    (r.round() as i32).clamp(0, num_layers as i32 - 1)
}

// ============================================================================
// 2D
// ============================================================================

/// 2D texture with a full mip pyramid.
#[derive(Debug, Clone, PartialEq)]
pub struct Texture2D {
    format: TextureFormat,
    width: u32,
    height: u32,
    levels: Vec<TextureLevel>,
}

impl Texture2D {
    pub fn new(format: TextureFormat, width: u32, height: u32) -> CoreResult<Self> {
        TextureLevel::validate(format, width, height, 1)?;
        let levels = (0..compute_mip_pyramid_levels(width, height, 1))
            .map(|l| TextureLevel::zeroed(format, mip_level_size(width, l), mip_level_size(height, l), 1))
            .collect();
        Ok(Self {
            format,
            width,
            height,
            levels,
        })
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

    pub fn num_levels(&self) -> usize {
        self.levels.len()
    }

    pub fn level(&self, level: usize) -> CoreResult<&TextureLevel> {
        let count = self.levels.len();
        self.levels.get(level).ok_or_else(|| level_out_of_range(level, count))
    }

    pub fn level_mut(&mut self, level: usize) -> CoreResult<&mut TextureLevel> {
        let count = self.levels.len();
        self.levels
            .get_mut(level)
            .ok_or_else(|| level_out_of_range(level, count))
    }

    pub fn view(&self) -> Texture2DView<'_> {
        Texture2DView {
            levels: &self.levels,
        }
    }
}

/// Borrowed view of a contiguous range of 2D levels.
#[derive(Debug, Clone, Copy)]
pub struct Texture2DView<'a> {
    levels: &'a [TextureLevel],
}

impl<'a> Texture2DView<'a> {
    pub fn new(levels: &'a [TextureLevel]) -> Self {
        Self { levels }
    }

    pub fn num_levels(&self) -> usize {
        self.levels.len()
    }

    pub fn levels(&self) -> &'a [TextureLevel] {
        self.levels
    }

    pub fn width(&self) -> u32 {
        self.levels.first().map_or(0, TextureLevel::width)
    }

    pub fn height(&self) -> u32 {
        self.levels.first().map_or(0, TextureLevel::height)
    }

    pub fn format(&self) -> Option<TextureFormat> {
        self.levels.first().map(TextureLevel::format)
    }

    /// Levels `[base, max]`, clamped into range.
    pub fn sub_view(&self, base_level: usize, max_level: usize) -> Texture2DView<'a> {
        if self.levels.is_empty() {
            return *self;
        }
        let (base, max) = clamp_level_range(base_level, max_level, self.levels.len());
        Texture2DView {
            levels: &self.levels[base..=max],
        }
    }

    /// Filtered lookup at normalized `(s, t)` with the final LOD.
    pub fn sample(&self, sampler: &Sampler, s: f32, t: f32, lod: f32) -> Vec4 {
        sample_level_array_2d(self.levels, sampler, s, t, 0, lod)
    }

    /// Fraction of the filter footprint passing the depth comparison
    /// against `reference`.
    pub fn sample_compare(&self, sampler: &Sampler, reference: f32, s: f32, t: f32, lod: f32) -> f32 {
        sample_level_array_2d_compare(self.levels, sampler, reference, s, t, 0, lod)
    }
}

// ============================================================================
// Cube
// ============================================================================

/// Cube map with six square faces, each with a full mip pyramid.
#[derive(Debug, Clone, PartialEq)]
pub struct TextureCube {
    format: TextureFormat,
    size: u32,
    faces: [Vec<TextureLevel>; 6],
}

impl TextureCube {
    pub fn new(format: TextureFormat, size: u32) -> CoreResult<Self> {
        TextureLevel::validate(format, size, size, 1)?;
        let num_levels = compute_mip_pyramid_levels(size, size, 1);
        let faces = std::array::from_fn(|_| {
            (0..num_levels)
                .map(|l| {
                    let s = mip_level_size(size, l);
                    TextureLevel::zeroed(format, s, s, 1)
                })
                .collect()
        });
        Ok(Self {
            format,
            size,
            faces,
        })
    }

    pub fn format(&self) -> TextureFormat {
        self.format
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn num_levels(&self) -> usize {
        self.faces[0].len()
    }

    pub fn face_level(&self, face: CubeFace, level: usize) -> CoreResult<&TextureLevel> {
        let levels = &self.faces[face.index()];
        levels
            .get(level)
            .ok_or_else(|| level_out_of_range(level, levels.len()))
    }

    pub fn face_level_mut(&mut self, face: CubeFace, level: usize) -> CoreResult<&mut TextureLevel> {
        let levels = &mut self.faces[face.index()];
        let count = levels.len();
        levels
            .get_mut(level)
            .ok_or_else(|| level_out_of_range(level, count))
    }

    pub fn view(&self) -> TextureCubeView<'_> {
        TextureCubeView {
            faces: std::array::from_fn(|i| self.faces[i].as_slice()),
        }
    }
}

/// Borrowed view of a range of levels on all six faces.
#[derive(Debug, Clone, Copy)]
pub struct TextureCubeView<'a> {
    faces: [&'a [TextureLevel]; 6],
}

impl<'a> TextureCubeView<'a> {
    pub fn num_levels(&self) -> usize {
        self.faces[0].len()
    }

    /// Edge length of the base level.
    pub fn size(&self) -> u32 {
        self.faces[0].first().map_or(0, TextureLevel::width)
    }

    pub fn format(&self) -> Option<TextureFormat> {
        self.faces[0].first().map(TextureLevel::format)
    }

    pub fn face_levels(&self, face: CubeFace) -> &'a [TextureLevel] {
        self.faces[face.index()]
    }

    /// Levels `base_level..=max_level` of every face, clamped to the chain.
    pub fn sub_view(&self, base_level: usize, max_level: usize) -> TextureCubeView<'a> {
        if self.faces[0].is_empty() {
            return *self;
        }
        let (base, max) = clamp_level_range(base_level, max_level, self.num_levels());
        TextureCubeView {
            faces: self.faces.map(|levels| &levels[base..=max]),
        }
    }

    /// Sample along direction `coord`. Filtering does not cross face edges.
    pub fn sample(&self, sampler: &Sampler, coord: &Vec3, lod: f32) -> Vec4 {
        let coords = cube_face_coords(coord);
        sample_level_array_2d(
            self.face_levels(coords.face),
            sampler,
            coords.st.x,
            coords.st.y,
            0,
            lod,
        )
    }

    pub fn sample_compare(&self, sampler: &Sampler, reference: f32, coord: &Vec3, lod: f32) -> f32 {
        let coords = cube_face_coords(coord);
        sample_level_array_2d_compare(
            self.face_levels(coords.face),
            sampler,
            reference,
            coords.st.x,
            coords.st.y,
            0,
            lod,
        )
    }
}

// ============================================================================
// 2D array
// ============================================================================

/// Array of 2D layers sharing one mip pyramid (layer count is not reduced).
#[derive(Debug, Clone, PartialEq)]
pub struct Texture2DArray {
    format: TextureFormat,
    width: u32,
    height: u32,
    num_layers: u32,
    levels: Vec<TextureLevel>,
}

impl Texture2DArray {
    pub fn new(format: TextureFormat, width: u32, height: u32, num_layers: u32) -> CoreResult<Self> {
        TextureLevel::validate(format, width, height, num_layers)?;
        let levels = (0..compute_mip_pyramid_levels(width, height, 1))
            .map(|l| {
                TextureLevel::zeroed(
                    format,
                    mip_level_size(width, l),
                    mip_level_size(height, l),
                    num_layers,
                )
            })
            .collect();
        Ok(Self {
            format,
            width,
            height,
            num_layers,
            levels,
        })
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

    pub fn num_layers(&self) -> u32 {
        self.num_layers
    }

    pub fn num_levels(&self) -> usize {
        self.levels.len()
    }

    pub fn level(&self, level: usize) -> CoreResult<&TextureLevel> {
        let count = self.levels.len();
        self.levels.get(level).ok_or_else(|| level_out_of_range(level, count))
    }

    pub fn level_mut(&mut self, level: usize) -> CoreResult<&mut TextureLevel> {
        let count = self.levels.len();
        self.levels
            .get_mut(level)
            .ok_or_else(|| level_out_of_range(level, count))
    }

    pub fn view(&self) -> Texture2DArrayView<'_> {
        Texture2DArrayView {
            levels: &self.levels,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Texture2DArrayView<'a> {
    levels: &'a [TextureLevel],
}

impl<'a> Texture2DArrayView<'a> {
    pub fn num_levels(&self) -> usize {
        self.levels.len()
    }

    pub fn levels(&self) -> &'a [TextureLevel] {
        self.levels
    }

    pub fn width(&self) -> u32 {
        self.levels.first().map_or(0, TextureLevel::width)
    }

    pub fn height(&self) -> u32 {
        self.levels.first().map_or(0, TextureLevel::height)
    }

    pub fn num_layers(&self) -> u32 {
        self.levels.first().map_or(0, TextureLevel::depth)
    }

    pub fn format(&self) -> Option<TextureFormat> {
        self.levels.first().map(TextureLevel::format)
    }

    pub fn sub_view(&self, base_level: usize, max_level: usize) -> Texture2DArrayView<'a> {
        if self.levels.is_empty() {
            return *self;
        }
        let (base, max) = clamp_level_range(base_level, max_level, self.levels.len());
        Texture2DArrayView {
            levels: &self.levels[base..=max],
        }
    }

    /// Sample layer `round(r)` (clamped).
    pub fn sample(&self, sampler: &Sampler, s: f32, t: f32, r: f32, lod: f32) -> Vec4 {
        let layer = select_layer(r, self.num_layers());
        sample_level_array_2d(self.levels, sampler, s, t, layer, lod)
    }

    pub fn sample_compare(
        &self,
        sampler: &Sampler,
        reference: f32,
        s: f32,
        t: f32,
        r: f32,
        lod: f32,
    ) -> f32 {
        let layer = select_layer(r, self.num_layers());
        sample_level_array_2d_compare(self.levels, sampler, reference, s, t, layer, lod)
    }
}

// ============================================================================
// 3D
// ============================================================================

/// 3D texture with a full mip pyramid over all three dimensions.
#[derive(Debug, Clone, PartialEq)]
pub struct Texture3D {
    format: TextureFormat,
    width: u32,
    height: u32,
    depth: u32,
    levels: Vec<TextureLevel>,
}

impl Texture3D {
    pub fn new(format: TextureFormat, width: u32, height: u32, depth: u32) -> CoreResult<Self> {
        TextureLevel::validate(format, width, height, depth)?;
        let levels = (0..compute_mip_pyramid_levels(width, height, depth))
            .map(|l| {
                TextureLevel::zeroed(
                    format,
                    mip_level_size(width, l),
                    mip_level_size(height, l),
                    mip_level_size(depth, l),
                )
            })
            .collect();
        Ok(Self {
            format,
            width,
            height,
            depth,
            levels,
        })
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

    pub fn num_levels(&self) -> usize {
        self.levels.len()
    }

    pub fn level(&self, level: usize) -> CoreResult<&TextureLevel> {
        let count = self.levels.len();
        self.levels.get(level).ok_or_else(|| level_out_of_range(level, count))
    }

    pub fn level_mut(&mut self, level: usize) -> CoreResult<&mut TextureLevel> {
        let count = self.levels.len();
        self.levels
            .get_mut(level)
            .ok_or_else(|| level_out_of_range(level, count))
    }

    pub fn view(&self) -> Texture3DView<'_> {
        Texture3DView {
            levels: &self.levels,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Texture3DView<'a> {
    levels: &'a [TextureLevel],
}

impl<'a> Texture3DView<'a> {
    pub fn num_levels(&self) -> usize {
        self.levels.len()
    }

    pub fn levels(&self) -> &'a [TextureLevel] {
        self.levels
    }

    pub fn width(&self) -> u32 {
        self.levels.first().map_or(0, TextureLevel::width)
    }

    pub fn height(&self) -> u32 {
        self.levels.first().map_or(0, TextureLevel::height)
    }

    pub fn depth(&self) -> u32 {
        self.levels.first().map_or(0, TextureLevel::depth)
    }

    pub fn format(&self) -> Option<TextureFormat> {
        self.levels.first().map(TextureLevel::format)
    }

    pub fn sub_view(&self, base_level: usize, max_level: usize) -> Texture3DView<'a> {
        if self.levels.is_empty() {
            return *self;
        }
        let (base, max) = clamp_level_range(base_level, max_level, self.levels.len());
        Texture3DView {
            levels: &self.levels[base..=max],
        }
    }

    pub fn sample(&self, sampler: &Sampler, s: f32, t: f32, r: f32, lod: f32) -> Vec4 {
        sample_level_array_3d(self.levels, sampler, s, t, r, lod)
    }
}

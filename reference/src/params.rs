//! Parameters shared by the reference renderer and the context's textured
//! quad draw.

use bitflags::bitflags;
use deqp_core::math::Vec4;
use deqp_core::sampler::Sampler;
use deqp_core::texture::{ChannelOrder, ChannelType, TextureFormat};

use crate::lod::LodMode;

/// Texture target being rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextureType {
    #[default]
    Texture2D,
    Cube,
    Texture2DArray,
    Texture3D,
}

/// How texel values reach the shader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SamplerType {
    #[default]
    Float,
    Int,
    Uint,
    /// Depth comparison; the result is broadcast as `[r, 0, 0, 1]`.
    Shadow,
    FetchFloat,
    FetchInt,
    FetchUint,
}

impl SamplerType {
    /// Whether texels are fetched without filtering.
    pub fn is_fetch(self) -> bool {
        matches!(
            self,
            SamplerType::FetchFloat | SamplerType::FetchInt | SamplerType::FetchUint
        )
    }
}

/// Sampler type matching a texture format.
pub fn get_sampler_type(format: TextureFormat) -> SamplerType {
    match format.channel_type {
        ChannelType::SignedInt8 | ChannelType::SignedInt16 | ChannelType::SignedInt32 => {
            SamplerType::Int
        }
        ChannelType::UnsignedInt8
        | ChannelType::UnsignedInt32
        | ChannelType::UnsignedInt1010102Rev => SamplerType::Uint,
        // Depth and stencil formats sample as float depth.
        ChannelType::UnsignedInt16 | ChannelType::UnsignedInt248 => {
            if matches!(format.order, ChannelOrder::D | ChannelOrder::DS) {
                SamplerType::Float
            } else {
                SamplerType::Uint
            }
        }
        _ => SamplerType::Float,
    }
}

bitflags! {
    /// Render option flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct RenderFlags: u32 {
        /// Texture coordinates are divided by the per-corner `w`.
        const PROJECTED = 1 << 0;
        /// `bias` is added to the computed LOD.
        const USE_BIAS = 1 << 1;
    }
}

/// Parameters of a textured quad draw.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderParams {
    pub texture_type: TextureType,
    pub flags: RenderFlags,
    /// Per-corner clip `w`, in quad corner order.
    pub w: Vec4,
    /// LOD bias, applied when [`RenderFlags::USE_BIAS`] is set.
    pub bias: f32,
    /// Depth reference for shadow samplers.
    pub reference: f32,
    pub color_scale: Vec4,
    pub color_bias: Vec4,
    pub sampler_type: SamplerType,
}

impl RenderParams {
    pub fn new(texture_type: TextureType) -> Self {
        Self {
            texture_type,
            ..Default::default()
        }
    }

    /// Whether the per-corner `w` is applied.
    pub fn is_projected(&self) -> bool {
        self.flags.contains(RenderFlags::PROJECTED)
    }

    /// Bias to add to the LOD, or 0 when biasing is disabled.
    pub fn lod_bias(&self) -> f32 {
        if self.flags.contains(RenderFlags::USE_BIAS) {
            self.bias
        } else {
            0.0
        }
    }
}

impl Default for RenderParams {
    fn default() -> Self {
        Self {
            texture_type: TextureType::Texture2D,
            flags: RenderFlags::empty(),
            w: Vec4::repeat(1.0),
            bias: 0.0,
            reference: 0.0,
            color_scale: Vec4::repeat(1.0),
            color_bias: Vec4::zeros(),
            sampler_type: SamplerType::Float,
        }
    }
}

/// Render parameters plus everything the reference path needs to
/// reproduce the draw: sampler state, LOD estimation and level range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReferenceParams {
    pub base: RenderParams,
    pub sampler: Sampler,
    pub lod_mode: LodMode,
    pub min_lod: f32,
    pub max_lod: f32,
    pub base_level: usize,
    pub max_level: usize,
}

impl ReferenceParams {
    pub fn new(texture_type: TextureType) -> Self {
        Self {
            base: RenderParams::new(texture_type),
            ..Default::default()
        }
    }

    pub fn with_sampler(mut self, sampler: Sampler) -> Self {
        self.sampler = sampler;
        self
    }

    /// How `rho` is estimated from the coordinate derivatives.
    pub fn with_lod_mode(mut self, mode: LodMode) -> Self {
        self.lod_mode = mode;
        self
    }

    /// Enable LOD bias.
    pub fn with_bias(mut self, bias: f32) -> Self {
        self.base.flags |= RenderFlags::USE_BIAS;
        self.base.bias = bias;
        self
    }

    /// Enable projection with per-corner `w`.
    pub fn with_projection(mut self, w: Vec4) -> Self {
        self.base.flags |= RenderFlags::PROJECTED;
        self.base.w = w;
        self
    }

    /// Clamp range applied to the biased LOD. See [`Self::final_lod`].
    pub fn with_lod_range(mut self, min_lod: f32, max_lod: f32) -> Self {
        self.min_lod = min_lod;
        self.max_lod = max_lod;
        self
    }

    /// Restrict sampling to levels `base_level..=max_level`. Both ends are
    /// clamped to the texture's mip chain.
    pub fn with_level_range(mut self, base_level: usize, max_level: usize) -> Self {
        self.base_level = base_level;
        self.max_level = max_level;
        self
    }

    /// Output color is `sample * scale + bias`.
    pub fn with_color_scale_bias(mut self, scale: Vec4, bias: Vec4) -> Self {
        self.base.color_scale = scale;
        self.base.color_bias = bias;
        self
    }

    pub fn with_sampler_type(mut self, sampler_type: SamplerType) -> Self {
        self.base.sampler_type = sampler_type;
        self
    }

    /// Depth reference for shadow sampling.
    pub fn with_ref(mut self, reference: f32) -> Self {
        self.base.reference = reference;
        self
    }

    /// Apply bias and the `[min_lod, max_lod]` clamp. `max_lod` wins when
    /// the range is inverted.
    pub fn final_lod(&self, lod: f32) -> f32 {
        (lod + self.base.lod_bias()).max(self.min_lod).min(self.max_lod)
    }
}

impl Default for ReferenceParams {
    fn default() -> Self {
        Self {
            base: RenderParams::default(),
            sampler: Sampler::default(),
            lod_mode: LodMode::Exact,
            min_lod: -1000.0,
            max_lod: 1000.0,
            base_level: 0,
            max_level: 1000,
        }
    }
}

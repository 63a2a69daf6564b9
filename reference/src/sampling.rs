//! Per-pixel texture lookup for the reference renderer.
//!
//! Dispatches on [`SamplerType`]: shadow samplers go through depth
//! comparison, fetch samplers read a single texel without filtering, and
//! everything else samples the view with the sampler's filters.

use deqp_core::math::{Vec3, Vec4};
use deqp_core::texture::{
    cube_face_coords, Texture2DArrayView, Texture2DView, Texture3DView, TextureCubeView,
    TextureLevel,
};

use crate::params::{ReferenceParams, RenderParams, SamplerType};

/// Integer level used by texel fetches.
fn fetch_level(lod: f32, num_levels: usize) -> usize {
    let max_level = num_levels.saturating_sub(1) as i32;
    (lod.floor() as i32).clamp(0, max_level) as usize
}

/// Texel containing normalized coordinate `c`, clamped to the level.
fn fetch_coord(c: f32, size: u32) -> u32 {
    let texel = (c * size as f32).floor() as i64;
    texel.clamp(0, size as i64 - 1) as u32
}

fn fetch_2d(level: &TextureLevel, s: f32, t: f32, z: u32) -> Vec4 {
    level.pixel(
        fetch_coord(s, level.width()),
        fetch_coord(t, level.height()),
        z.min(level.depth() - 1),
    )
}

fn shadow(value: f32) -> Vec4 {
    Vec4::new(value, 0.0, 0.0, 1.0)
}

/// `c * color_scale + color_bias`.
pub fn apply_scale_bias(color: &Vec4, params: &RenderParams) -> Vec4 {
    color.component_mul(&params.color_scale) + params.color_bias
}

/// Sample a 2D view at `(s, t)` with the final LOD already applied.
pub fn exec_sample_2d(view: &Texture2DView<'_>, params: &ReferenceParams, s: f32, t: f32, lod: f32) -> Vec4 {
    match params.base.sampler_type {
        SamplerType::Shadow => shadow(view.sample_compare(&params.sampler, params.base.reference, s, t, lod)),
        ty if ty.is_fetch() => match view.levels().get(fetch_level(lod, view.num_levels())) {
            Some(level) => fetch_2d(level, s, t, 0),
            None => Vec4::zeros(),
        },
        _ => view.sample(&params.sampler, s, t, lod),
    }
}

/// Sample a cube view along direction `coord`. Fetch samplers address the
/// selected face directly.
pub fn exec_sample_cube(view: &TextureCubeView<'_>, params: &ReferenceParams, coord: &Vec3, lod: f32) -> Vec4 {
    match params.base.sampler_type {
        SamplerType::Shadow => shadow(view.sample_compare(&params.sampler, params.base.reference, coord, lod)),
        ty if ty.is_fetch() => {
            let face = cube_face_coords(coord);
            let levels = view.face_levels(face.face);
            match levels.get(fetch_level(lod, levels.len())) {
                Some(level) => fetch_2d(level, face.st.x, face.st.y, 0),
                None => Vec4::zeros(),
            }
        }
        _ => view.sample(&params.sampler, coord, lod),
    }
}

/// `r` is the layer coordinate, rounded and clamped to the layer range.
pub fn exec_sample_2d_array(
    view: &Texture2DArrayView<'_>,
    params: &ReferenceParams,
    s: f32,
    t: f32,
    r: f32,
    lod: f32,
) -> Vec4 {
    match params.base.sampler_type {
        SamplerType::Shadow => shadow(view.sample_compare(&params.sampler, params.base.reference, s, t, r, lod)),
        ty if ty.is_fetch() => {
            let layer = (r.round().max(0.0) as u32).min(view.num_layers().saturating_sub(1));
            match view.levels().get(fetch_level(lod, view.num_levels())) {
                Some(level) => fetch_2d(level, s, t, layer),
                None => Vec4::zeros(),
            }
        }
        _ => view.sample(&params.sampler, s, t, r, lod),
    }
}

/// Depth comparison is not defined for 3D textures; shadow samplers read
/// the filtered color.
pub fn exec_sample_3d(
    view: &Texture3DView<'_>,
    params: &ReferenceParams,
    s: f32,
    t: f32,
    r: f32,
    lod: f32,
) -> Vec4 {
    if params.base.sampler_type.is_fetch() {
        return match view.levels().get(fetch_level(lod, view.num_levels())) {
            Some(level) => level.pixel(
                fetch_coord(s, level.width()),
                fetch_coord(t, level.height()),
                fetch_coord(r, level.depth()),
            ),
            None => Vec4::zeros(),
        };
    }
    view.sample(&params.sampler, s, t, r, lod)
}

#[cfg(test)]
mod tests {
    use super::*;
    use deqp_core::sampler::{CompareFunction, FilterMode, Sampler};
    use deqp_core::texture::{Texture2D, Texture2DArray, Texture3D, TextureFormat};

    fn mipmapped_texture() -> Texture2D {
        let mut tex = Texture2D::new(TextureFormat::RGBA32F, 4, 4).unwrap();
        for level in 0..tex.num_levels() {
            let value = level as f32;
            tex.level_mut(level)
                .unwrap()
                .fill_with(|x, y, _| Vec4::new(value, x as f32, y as f32, 1.0));
        }
        tex
    }

    #[test]
    fn scale_bias_is_componentwise() {
        let params = ReferenceParams::default()
            .with_color_scale_bias(Vec4::new(2.0, 1.0, 0.5, 1.0), Vec4::new(0.0, 0.25, 0.0, 0.0));
        let c = apply_scale_bias(&Vec4::new(0.25, 0.5, 1.0, 1.0), &params.base);
        assert_eq!(c, Vec4::new(0.5, 0.75, 0.5, 1.0));
    }

    #[test]
    fn fetch_reads_integer_level_without_filtering() {
        let tex = mipmapped_texture();
        let params = ReferenceParams::default()
            .with_sampler(Sampler::linear())
            .with_sampler_type(SamplerType::FetchFloat);
        let c = exec_sample_2d(&tex.view(), &params, 0.6, 0.9, 1.7);
        assert_eq!(c, Vec4::new(1.0, 1.0, 1.0, 1.0));
        // Levels past the end clamp to the last one.
        let c = exec_sample_2d(&tex.view(), &params, 0.6, 0.9, 9.0);
        assert_eq!(c.x, 2.0);
    }

    #[test]
    fn mipmap_nearest_sampling_uses_selected_level() {
        let tex = mipmapped_texture();
        let sampler = Sampler::default().with_filters(FilterMode::NearestMipmapNearest, FilterMode::Nearest);
        let params = ReferenceParams::default().with_sampler(sampler);
        assert_eq!(exec_sample_2d(&tex.view(), &params, 0.5, 0.5, 1.0).x, 1.0);
        assert_eq!(exec_sample_2d(&tex.view(), &params, 0.5, 0.5, 1.6).x, 2.0);
    }

    #[test]
    fn shadow_broadcasts_compare_result() {
        let mut tex = Texture2D::new(TextureFormat::DEPTH32F, 2, 2).unwrap();
        tex.level_mut(0).unwrap().clear(&Vec4::new(0.5, 0.0, 0.0, 1.0));
        let sampler = Sampler::nearest().with_compare(CompareFunction::Less);
        let params = ReferenceParams::default()
            .with_sampler(sampler)
            .with_sampler_type(SamplerType::Shadow)
            .with_ref(0.25);
        assert_eq!(exec_sample_2d(&tex.view(), &params, 0.5, 0.5, 0.0), Vec4::new(1.0, 0.0, 0.0, 1.0));
        let params = params.with_ref(0.75);
        assert_eq!(exec_sample_2d(&tex.view(), &params, 0.5, 0.5, 0.0), Vec4::new(0.0, 0.0, 0.0, 1.0));
    }

    #[test]
    fn array_fetch_selects_layer() {
        let mut tex = Texture2DArray::new(TextureFormat::RGBA32F, 2, 2, 3).unwrap();
        tex.level_mut(0)
            .unwrap()
            .fill_with(|_, _, z| Vec4::new(z as f32, 0.0, 0.0, 1.0));
        let params = ReferenceParams::default().with_sampler_type(SamplerType::FetchFloat);
        assert_eq!(exec_sample_2d_array(&tex.view(), &params, 0.1, 0.1, 1.2, 0.0).x, 1.0);
        assert_eq!(exec_sample_2d_array(&tex.view(), &params, 0.1, 0.1, 7.0, 0.0).x, 2.0);
    }

    #[test]
    fn fetch_3d_addresses_all_axes() {
        let mut tex = Texture3D::new(TextureFormat::RGBA32F, 2, 2, 2).unwrap();
        tex.level_mut(0)
            .unwrap()
            .fill_with(|x, y, z| Vec4::new(x as f32, y as f32, z as f32, 1.0));
        let params = ReferenceParams::default().with_sampler_type(SamplerType::FetchFloat);
        let c = exec_sample_3d(&tex.view(), &params, 0.9, 0.1, 0.6, 0.0);
        assert_eq!(c, Vec4::new(1.0, 0.0, 1.0, 1.0));
    }
}

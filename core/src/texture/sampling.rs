//! Texel lookup, in-level filtering and mip level selection.
//!
//! Coordinates arriving here are already face-local (for cube maps) and
//! layer-resolved (for 2D arrays). All functions are pure.

use crate::math::{frac, lerp, srgb_to_linear, Vec4};
use crate::sampler::{FilterMode, Sampler, WrapMode};

use super::level::TextureLevel;

fn lookup(level: &TextureLevel, x: i32, y: i32, z: i32) -> Vec4 {
    let color = level.pixel(x as u32, y as u32, z as u32);
    if level.format().is_srgb() {
        srgb_to_linear(color)
    } else {
        color
    }
}

fn in_bounds(level: &TextureLevel, x: i32, y: i32, z: i32) -> bool {
    (0..level.width() as i32).contains(&x)
        && (0..level.height() as i32).contains(&y)
        && (0..level.depth() as i32).contains(&z)
}

/// Texel at wrapped coordinates, or the border color outside the level.
fn lookup_border(level: &TextureLevel, sampler: &Sampler, x: i32, y: i32, z: i32) -> Vec4 {
    if in_bounds(level, x, y, z) {
        lookup(level, x, y, z)
    } else {
        sampler.border_color
    }
}

/// Wrapped index of the texel containing `u`.
fn nearest_texel(mode: WrapMode, u: f32, size: u32) -> i32 {
    let size = size as i32;
    mode.wrap(mode.reduce(u, size).floor() as i32, size)
}

/// Wrapped indices of the two texels straddling `u` and the weight of the
/// second one.
fn linear_texels(mode: WrapMode, u: f32, size: u32) -> ([i32; 2], f32) {
    let size = size as i32;
    let u = mode.reduce(u, size) - 0.5;
    let i0 = u.floor() as i32;
    ([mode.wrap(i0, size), mode.wrap(i0 + 1, size)], frac(u))
}

fn sample_nearest_2d(level: &TextureLevel, sampler: &Sampler, u: f32, v: f32, z: i32) -> Vec4 {
    let x = nearest_texel(sampler.wrap_s, u, level.width());
    let y = nearest_texel(sampler.wrap_t, v, level.height());
    lookup_border(level, sampler, x, y, z)
}

fn sample_linear_2d(level: &TextureLevel, sampler: &Sampler, u: f32, v: f32, z: i32) -> Vec4 {
    let ([i0, i1], a) = linear_texels(sampler.wrap_s, u, level.width());
    let ([j0, j1], b) = linear_texels(sampler.wrap_t, v, level.height());

    let p00 = lookup_border(level, sampler, i0, j0, z);
    let p10 = lookup_border(level, sampler, i1, j0, z);
    let p01 = lookup_border(level, sampler, i0, j1, z);
    let p11 = lookup_border(level, sampler, i1, j1, z);

    p00 * ((1.0 - a) * (1.0 - b)) + p10 * (a * (1.0 - b)) + p01 * ((1.0 - a) * b) + p11 * (a * b)
}

fn sample_nearest_3d(level: &TextureLevel, sampler: &Sampler, u: f32, v: f32, w: f32) -> Vec4 {
    let x = nearest_texel(sampler.wrap_s, u, level.width());
    let y = nearest_texel(sampler.wrap_t, v, level.height());
    let z = nearest_texel(sampler.wrap_r, w, level.depth());
    lookup_border(level, sampler, x, y, z)
}

fn sample_linear_3d(level: &TextureLevel, sampler: &Sampler, u: f32, v: f32, w: f32) -> Vec4 {
    let (i, a) = linear_texels(sampler.wrap_s, u, level.width());
    let (j, b) = linear_texels(sampler.wrap_t, v, level.height());
    let (k, c) = linear_texels(sampler.wrap_r, w, level.depth());
    let weight = |t: f32, hi: usize| if hi == 1 { t } else { 1.0 - t };

    let mut color = Vec4::zeros();
    for (kz, &z) in k.iter().enumerate() {
        for (jy, &y) in j.iter().enumerate() {
            for (ix, &x) in i.iter().enumerate() {
                let factor = weight(a, ix) * weight(b, jy) * weight(c, kz);
                color += lookup_border(level, sampler, x, y, z) * factor;
            }
        }
    }
    color
}

/// Sample one slice of a level with a non-mipmap filter.
///
/// `filter` must be `Nearest` or `Linear`; mipmap filters are reduced to
/// their in-level part.
pub fn sample_2d(
    level: &TextureLevel,
    sampler: &Sampler,
    filter: FilterMode,
    s: f32,
    t: f32,
    depth: i32,
) -> Vec4 {
    let u = sampler.unnormalize(s, level.width());
    let v = sampler.unnormalize(t, level.height());
    match filter.level_filter() {
        FilterMode::Linear => sample_linear_2d(level, sampler, u, v, depth),
        _ => sample_nearest_2d(level, sampler, u, v, depth),
    }
}

/// Sample a 3D level with a non-mipmap filter.
pub fn sample_3d(
    level: &TextureLevel,
    sampler: &Sampler,
    filter: FilterMode,
    s: f32,
    t: f32,
    r: f32,
) -> Vec4 {
    let u = sampler.unnormalize(s, level.width());
    let v = sampler.unnormalize(t, level.height());
    let w = sampler.unnormalize(r, level.depth());
    match filter.level_filter() {
        FilterMode::Linear => sample_linear_3d(level, sampler, u, v, w),
        _ => sample_nearest_3d(level, sampler, u, v, w),
    }
}

/// Level used by `*_MIPMAP_NEAREST` filters.
pub fn mipmap_nearest_level(lod: f32, num_levels: usize) -> usize {
    let max_level = num_levels.saturating_sub(1) as i32;
    ((lod + 0.5).ceil() as i32).saturating_sub(1).clamp(0, max_level) as usize
}

/// Levels and blend factor used by `*_MIPMAP_LINEAR` filters.
pub fn mipmap_linear_levels(lod: f32, num_levels: usize) -> (usize, usize, f32) {
    let max_level = num_levels.saturating_sub(1);
    let level0 = (lod.floor() as i32).clamp(0, max_level as i32) as usize;
    let level1 = (level0 + 1).min(max_level);
    (level0, level1, frac(lod))
}

/// Shared mip selection. `sample_level` samples a single level with an
/// in-level filter and is called once or twice.
fn sample_levels<T>(
    num_levels: usize,
    sampler: &Sampler,
    lod: f32,
    mut sample_level: impl FnMut(usize, FilterMode) -> T,
    blend: impl Fn(T, T, f32) -> T,
) -> T {
    let filter = sampler.filter_for_lod(lod);
    match filter {
        FilterMode::Nearest | FilterMode::Linear => sample_level(0, filter),
        FilterMode::NearestMipmapNearest | FilterMode::LinearMipmapNearest => {
            sample_level(mipmap_nearest_level(lod, num_levels), filter.level_filter())
        }
        FilterMode::NearestMipmapLinear | FilterMode::LinearMipmapLinear => {
            let (level0, level1, f) = mipmap_linear_levels(lod, num_levels);
            let t0 = sample_level(level0, filter.level_filter());
            let t1 = sample_level(level1, filter.level_filter());
            blend(t0, t1, f)
        }
    }
}

/// Sample a 2D mip chain at `depth` (array layer or 0).
pub fn sample_level_array_2d(
    levels: &[TextureLevel],
    sampler: &Sampler,
    s: f32,
    t: f32,
    depth: i32,
    lod: f32,
) -> Vec4 {
    sample_levels(
        levels.len(),
        sampler,
        lod,
        |level, filter| sample_2d(&levels[level], sampler, filter, s, t, depth),
        |t0, t1, f| t0 * (1.0 - f) + t1 * f,
    )
}

/// Sample a 3D mip chain.
pub fn sample_level_array_3d(
    levels: &[TextureLevel],
    sampler: &Sampler,
    s: f32,
    t: f32,
    r: f32,
    lod: f32,
) -> Vec4 {
    sample_levels(
        levels.len(),
        sampler,
        lod,
        |level, filter| sample_3d(&levels[level], sampler, filter, s, t, r),
        |t0, t1, f| t0 * (1.0 - f) + t1 * f,
    )
}

fn exec_compare(color: &Vec4, sampler: &Sampler, reference: f32, fixed_point: bool) -> f32 {
    let texel = color[sampler.compare_channel.min(3)];
    let (texel, reference) = if fixed_point {
        (texel.clamp(0.0, 1.0), reference.clamp(0.0, 1.0))
    } else {
        (texel, reference)
    };
    let compare = sampler
        .compare
        .unwrap_or(crate::sampler::CompareFunction::LessEqual);
    if compare.evaluate(reference, texel) {
        1.0
    } else {
        0.0
    }
}

/// Depth comparison within a single level. Bilinear filtering blends the
/// per-texel 0/1 results.
pub fn sample_2d_compare(
    level: &TextureLevel,
    sampler: &Sampler,
    filter: FilterMode,
    reference: f32,
    s: f32,
    t: f32,
    depth: i32,
) -> f32 {
    let fixed_point = level.format().is_fixed_point_depth();
    let u = sampler.unnormalize(s, level.width());
    let v = sampler.unnormalize(t, level.height());

    if filter.level_filter() != FilterMode::Linear {
        let texel = sample_nearest_2d(level, sampler, u, v, depth);
        return exec_compare(&texel, sampler, reference, fixed_point);
    }

    let ([i0, i1], a) = linear_texels(sampler.wrap_s, u, level.width());
    let ([j0, j1], b) = linear_texels(sampler.wrap_t, v, level.height());

    let cmp = |x: i32, y: i32| {
        exec_compare(
            &lookup_border(level, sampler, x, y, depth),
            sampler,
            reference,
            fixed_point,
        )
    };

    cmp(i0, j0) * (1.0 - a) * (1.0 - b)
        + cmp(i1, j0) * a * (1.0 - b)
        + cmp(i0, j1) * (1.0 - a) * b
        + cmp(i1, j1) * a * b
}

/// Depth comparison over a 2D mip chain.
pub fn sample_level_array_2d_compare(
    levels: &[TextureLevel],
    sampler: &Sampler,
    reference: f32,
    s: f32,
    t: f32,
    depth: i32,
    lod: f32,
) -> f32 {
    sample_levels(
        levels.len(),
        sampler,
        lod,
        |level, filter| sample_2d_compare(&levels[level], sampler, filter, reference, s, t, depth),
        lerp,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampler::CompareFunction;
    use crate::texture::TextureFormat;

    fn gradient_level() -> TextureLevel {
        let mut level = TextureLevel::new(TextureFormat::RGBA32F, 4, 4, 1).unwrap();
        level.fill_with(|x, y, _| Vec4::new(x as f32, y as f32, 0.0, 1.0));
        level
    }

    #[test]
    fn nearest_picks_containing_texel() {
        let level = gradient_level();
        let sampler = Sampler::nearest();
        let c = sample_2d(&level, &sampler, FilterMode::Nearest, 0.6, 0.3, 0);
        assert_eq!(c, Vec4::new(2.0, 1.0, 0.0, 1.0));
    }

    #[test]
    fn linear_interpolates_between_centers() {
        let level = gradient_level();
        let sampler = Sampler::linear();
        // u = 2.0 lies halfway between texel centers 1.5 and 2.5.
        let c = sample_2d(&level, &sampler, FilterMode::Linear, 0.5, 0.5, 0);
        assert!((c.x - 1.5).abs() < 1e-6);
        assert!((c.y - 1.5).abs() < 1e-6);
    }

    #[test]
    fn clamp_to_border_returns_border_color() {
        let level = gradient_level();
        let border = Vec4::new(0.25, 0.5, 0.75, 1.0);
        let sampler = Sampler::nearest()
            .with_wrap(WrapMode::ClampToBorder)
            .with_border_color(border);
        assert_eq!(
            sample_2d(&level, &sampler, FilterMode::Nearest, -0.1, 0.5, 0),
            border
        );
        assert_eq!(
            sample_2d(&level, &sampler, FilterMode::Nearest, 0.5, 1.2, 0),
            border
        );
    }

    #[test]
    fn repeat_wraps_coordinates() {
        let level = gradient_level();
        let sampler = Sampler::nearest().with_wrap(WrapMode::Repeat);
        let c = sample_2d(&level, &sampler, FilterMode::Nearest, 1.1, -0.1, 0);
        assert_eq!(c, Vec4::new(0.0, 3.0, 0.0, 1.0));
    }

    #[test]
    fn huge_repeat_coordinates_wrap_like_small_ones() {
        let level = gradient_level();
        let sampler = Sampler::linear().with_wrap(WrapMode::Repeat);
        // 1048576.625 * 4 = 4194306.5, one whole number of periods past 2.5.
        for filter in [FilterMode::Nearest, FilterMode::Linear] {
            let far = sample_2d(&level, &sampler, filter, 1_048_576.625, 0.625, 0);
            let near = sample_2d(&level, &sampler, filter, 0.625, 0.625, 0);
            assert_eq!(far, near, "{filter:?}");
        }

        for s in [1.0e9, -1.0e9, f32::MAX, f32::MIN] {
            let c = sample_2d(&level, &sampler, FilterMode::Linear, s, s, 0);
            assert!((0.0..=3.0).contains(&c.x), "{s}: {c:?}");
            let c = sample_3d(&level, &sampler, FilterMode::Linear, s, s, s);
            assert!((0.0..=3.0).contains(&c.y), "{s}: {c:?}");
        }
    }

    #[test]
    fn huge_clamped_coordinates_hit_the_edge() {
        let level = gradient_level();
        let sampler = Sampler::linear();
        assert_eq!(
            sample_2d(&level, &sampler, FilterMode::Linear, 1.0e9, -1.0e9, 0),
            Vec4::new(3.0, 0.0, 0.0, 1.0)
        );
        let mut depth = TextureLevel::new(TextureFormat::DEPTH32F, 4, 4, 1).unwrap();
        depth.clear(&Vec4::new(0.5, 0.0, 0.0, 0.0));
        assert_eq!(
            sample_2d_compare(&depth, &sampler, FilterMode::Linear, 0.25, 1.0e9, 1.0e9, 0),
            1.0
        );
    }

    #[test]
    fn mirrored_repeat_reflects_every_other_period() {
        let level = gradient_level();
        let sampler = Sampler::nearest().with_wrap(WrapMode::MirroredRepeat);
        // u = 4.4 lands in the mirrored copy: texel 3.
        let c = sample_2d(&level, &sampler, FilterMode::Nearest, 1.1, 2.1, 0);
        assert_eq!(c, Vec4::new(3.0, 0.0, 0.0, 1.0));
    }

    #[test]
    fn mip_level_selection() {
        assert_eq!(mipmap_nearest_level(0.0, 4), 0);
        assert_eq!(mipmap_nearest_level(0.5, 4), 0);
        assert_eq!(mipmap_nearest_level(0.51, 4), 1);
        assert_eq!(mipmap_nearest_level(10.0, 4), 3);
        assert_eq!(mipmap_nearest_level(-3.0, 4), 0);

        let (l0, l1, f) = mipmap_linear_levels(1.25, 4);
        assert_eq!((l0, l1), (1, 2));
        assert!((f - 0.25).abs() < 1e-6);
        assert_eq!(mipmap_linear_levels(7.5, 4).0, 3);
        assert_eq!(mipmap_linear_levels(7.5, 4).1, 3);
    }

    #[test]
    fn mipmap_linear_blends_levels() {
        let mut l0 = TextureLevel::new(TextureFormat::RGBA32F, 2, 2, 1).unwrap();
        let mut l1 = TextureLevel::new(TextureFormat::RGBA32F, 1, 1, 1).unwrap();
        l0.clear(&Vec4::new(0.0, 0.0, 0.0, 1.0));
        l1.clear(&Vec4::new(1.0, 1.0, 1.0, 1.0));
        let levels = [l0, l1];
        let sampler = Sampler::nearest()
            .with_filters(FilterMode::NearestMipmapLinear, FilterMode::Nearest);
        let c = sample_level_array_2d(&levels, &sampler, 0.5, 0.5, 0, 0.25);
        assert!((c.x - 0.25).abs() < 1e-6);
        // Magnified: base level only.
        let c = sample_level_array_2d(&levels, &sampler, 0.5, 0.5, 0, 0.0);
        assert_eq!(c.x, 0.0);
    }

    #[test]
    fn depth_compare_defaults_to_less_equal() {
        let mut level = TextureLevel::new(TextureFormat::DEPTH32F, 1, 1, 1).unwrap();
        level.clear(&Vec4::new(0.5, 0.0, 0.0, 0.0));
        let sampler = Sampler::nearest();
        assert_eq!(
            sample_2d_compare(&level, &sampler, FilterMode::Nearest, 0.4, 0.5, 0.5, 0),
            1.0
        );
        assert_eq!(
            sample_2d_compare(&level, &sampler, FilterMode::Nearest, 0.6, 0.5, 0.5, 0),
            0.0
        );
        let greater = sampler.with_compare(CompareFunction::Greater);
        assert_eq!(
            sample_2d_compare(&level, &greater, FilterMode::Nearest, 0.6, 0.5, 0.5, 0),
            1.0
        );
    }

    #[test]
    fn srgb_texels_are_linearized() {
        let mut level = TextureLevel::new(TextureFormat::SRGBA8, 1, 1, 1).unwrap();
        level.set_pixel(&Vec4::new(1.0, 0.0, 0.5, 0.5), 0, 0, 0);
        let c = sample_2d(&level, &Sampler::nearest(), FilterMode::Nearest, 0.5, 0.5, 0);
        assert!((c.x - 1.0).abs() < 1e-6);
        assert!((c.z - 0.2158).abs() < 1e-3);
        assert!((c.w - 128.0 / 255.0).abs() < 1e-6);
    }
}

//! Reference rendering of a textured screen-aligned quad.
//!
//! Every pixel of the destination is covered by exactly one of the quad's
//! two triangles. The renderers compute texture coordinates and an
//! analytic LOD for each pixel, sample through [`crate::sampling`], apply
//! the color scale and bias, and write the quantized result.

use deqp_core::math::{Vec3, Vec4};
use deqp_core::surface::Surface;
use deqp_core::texture::{Texture2DArrayView, Texture2DView, Texture3DView, TextureCubeView};

use crate::error::{ensure, Error, Result};
use crate::interpolate::{
    projected_tri_interpolate, select_triangle, split_quad, tri_derivate_x, tri_derivate_y,
    triangle_interpolate_vec,
};
use crate::lod::{
    compute_cube_lod_from_derivates, compute_non_projected_tri_lod,
    compute_non_projected_tri_lod_3d, compute_projected_tri_lod, compute_projected_tri_lod_3d,
    TriangleFrame,
};
use crate::params::ReferenceParams;
use crate::sampling::{
    apply_scale_bias, exec_sample_2d, exec_sample_2d_array, exec_sample_3d, exec_sample_cube,
};

/// Writable sub-rectangle of a [`Surface`].
#[derive(Debug)]
pub struct SurfaceAccess<'a> {
    surface: &'a mut Surface,
    x: u32,
    y: u32,
    width: u32,
    height: u32,
}

impl<'a> SurfaceAccess<'a> {
    /// Access to the `width` x `height` rectangle at `(x, y)`.
    pub fn new(surface: &'a mut Surface, x: u32, y: u32, width: u32, height: u32) -> Result<Self> {
        ensure(width > 0 && height > 0, || {
            format!("empty surface access {width}x{height}")
        })?;
        ensure(
            x as u64 + width as u64 <= surface.width() as u64
                && y as u64 + height as u64 <= surface.height() as u64,
            || {
                format!(
                    "surface access {width}x{height} at ({x}, {y}) exceeds {}x{}",
                    surface.width(),
                    surface.height()
                )
            },
        )?;
        Ok(Self {
            surface,
            x,
            y,
            width,
            height,
        })
    }

    /// Access to the whole surface.
    pub fn full(surface: &'a mut Surface) -> Self {
        let (width, height) = (surface.width(), surface.height());
        Self {
            surface,
            x: 0,
            y: 0,
            width,
            height,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Write `color` quantized to 8 bits at `(x, y)` relative to the
    /// rectangle origin.
    pub fn set_pixel(&mut self, color: &Vec4, x: u32, y: u32) {
        debug_assert!(x < self.width && y < self.height);
        self.surface.set_pixel_color(self.x + x, self.y + y, color);
    }
}

/// Texture view to render, by target.
#[derive(Debug, Clone, Copy)]
pub enum TextureBinding<'a> {
    Texture2D(Texture2DView<'a>),
    Cube(TextureCubeView<'a>),
    Texture2DArray(Texture2DArrayView<'a>),
    Texture3D(Texture3DView<'a>),
}

impl TextureBinding<'_> {
    /// Number of texture coordinates a quad of this target takes.
    pub fn num_tex_coords(&self) -> usize {
        match self {
            TextureBinding::Texture2D(_) => 8,
            _ => 12,
        }
    }
}

/// Render `binding` over the whole of `dst`.
pub fn render_reference(
    dst: &mut SurfaceAccess<'_>,
    binding: &TextureBinding<'_>,
    tex_coord: &[f32],
    params: &ReferenceParams,
) -> Result<()> {
    log::debug!(
        "Reference render {:?} into {}x{}",
        params.base.texture_type,
        dst.width(),
        dst.height()
    );
    match binding {
        TextureBinding::Texture2D(view) => sample_texture_2d(dst, view, tex_coord, params),
        TextureBinding::Cube(view) => sample_texture_cube(dst, view, tex_coord, params),
        TextureBinding::Texture2DArray(view) => sample_texture_2d_array(dst, view, tex_coord, params),
        TextureBinding::Texture3D(view) => sample_texture_3d(dst, view, tex_coord, params),
    }
}

fn check_coord_count(tex_coord: &[f32], expected: usize) -> Result<()> {
    ensure(tex_coord.len() == expected, || {
        format!(
            "expected {expected} texture coordinates, got {}",
            tex_coord.len()
        )
    })
}

fn check_levels(num_levels: usize) -> Result<()> {
    if num_levels == 0 {
        return Err(Error::PreconditionViolation("texture has no levels".to_string()));
    }
    Ok(())
}

fn check_w(w: &Vec4) -> Result<()> {
    ensure(w.iter().all(|c| c.is_finite() && *c != 0.0), || {
        format!("projection w must be finite and non-zero, got {:?}", w.as_slice())
    })
}

/// Component `c` of each of the four corners in a packed coordinate array.
fn corner_component(tex_coord: &[f32], stride: usize, c: usize) -> Vec4 {
    Vec4::new(
        tex_coord[c],
        tex_coord[stride + c],
        tex_coord[2 * stride + c],
        tex_coord[3 * stride + c],
    )
}

/// Pixel in the local frame of the triangle that covers it.
struct PixelLocation {
    tri: usize,
    /// Local normalized position.
    nx: f32,
    ny: f32,
    frame: TriangleFrame,
}

fn locate(x: u32, y: u32, width: f32, height: f32) -> PixelLocation {
    let wx = x as f32 + 0.5;
    let wy = y as f32 + 0.5;
    let (tri, nx, ny) = select_triangle(wx / width, wy / height);
    let (wx, wy) = if tri == 1 {
        (width - wx, height - wy)
    } else {
        (wx, wy)
    };
    PixelLocation {
        tri,
        nx,
        ny,
        frame: TriangleFrame {
            wx,
            wy,
            width,
            height,
        },
    }
}

/// Render a 2D texture. `tex_coord` holds `(s, t)` for each quad corner.
pub fn sample_texture_2d(
    dst: &mut SurfaceAccess<'_>,
    view: &Texture2DView<'_>,
    tex_coord: &[f32],
    params: &ReferenceParams,
) -> Result<()> {
    check_coord_count(tex_coord, 8)?;
    let view = view.sub_view(params.base_level, params.max_level);
    check_levels(view.num_levels())?;

    let (dst_w, dst_h) = (dst.width(), dst.height());
    let (src_w, src_h) = (view.width(), view.height());
    let sq = corner_component(tex_coord, 2, 0);
    let tq = corner_component(tex_coord, 2, 1);
    let tri_s = split_quad(&sq);
    let tri_t = split_quad(&tq);

    if params.base.is_projected() {
        check_w(&params.base.w)?;
        let tri_u = split_quad(&(sq * src_w as f32));
        let tri_v = split_quad(&(tq * src_h as f32));
        let tri_w = split_quad(&params.base.w);

        for y in 0..dst_h {
            for x in 0..dst_w {
                let p = locate(x, y, dst_w as f32, dst_h as f32);
                let w = &tri_w[p.tri];
                let s = projected_tri_interpolate(&tri_s[p.tri], w, p.nx, p.ny);
                let t = projected_tri_interpolate(&tri_t[p.tri], w, p.nx, p.ny);
                let lod = compute_projected_tri_lod(params.lod_mode, &tri_u[p.tri], &tri_v[p.tri], w, &p.frame);
                let color = exec_sample_2d(&view, params, s, t, params.final_lod(lod));
                dst.set_pixel(&apply_scale_bias(&color, &params.base), x, y);
            }
        }
    } else {
        let tri_lod: [f32; 2] = std::array::from_fn(|tri| {
            params.final_lod(compute_non_projected_tri_lod(
                params.lod_mode,
                (dst_w, dst_h),
                (src_w, src_h),
                &tri_s[tri],
                &tri_t[tri],
            ))
        });

        for y in 0..dst_h {
            for x in 0..dst_w {
                let p = locate(x, y, dst_w as f32, dst_h as f32);
                let s = triangle_interpolate_vec(&tri_s[p.tri], p.nx, p.ny);
                let t = triangle_interpolate_vec(&tri_t[p.tri], p.nx, p.ny);
                let color = exec_sample_2d(&view, params, s, t, tri_lod[p.tri]);
                dst.set_pixel(&apply_scale_bias(&color, &params.base), x, y);
            }
        }
    }
    Ok(())
}

/// Render a cube map. `tex_coord` holds a direction for each quad corner.
///
/// Directions are interpolated affinely; derivatives use the per-corner
/// `w` so projected quads still get a perspective-correct footprint.
pub fn sample_texture_cube(
    dst: &mut SurfaceAccess<'_>,
    view: &TextureCubeView<'_>,
    tex_coord: &[f32],
    params: &ReferenceParams,
) -> Result<()> {
    check_coord_count(tex_coord, 12)?;
    check_w(&params.base.w)?;
    let view = view.sub_view(params.base_level, params.max_level);
    check_levels(view.num_levels())?;

    let (dst_w, dst_h) = (dst.width(), dst.height());
    let face_size = view.size();
    let tri_s = split_quad(&corner_component(tex_coord, 3, 0));
    let tri_t = split_quad(&corner_component(tex_coord, 3, 1));
    let tri_r = split_quad(&corner_component(tex_coord, 3, 2));
    let tri_w = split_quad(&params.base.w);

    for y in 0..dst_h {
        for x in 0..dst_w {
            let p = locate(x, y, dst_w as f32, dst_h as f32);
            let (s, t, r) = (&tri_s[p.tri], &tri_t[p.tri], &tri_r[p.tri]);
            let w = &tri_w[p.tri];
            let f = &p.frame;

            let coord = Vec3::new(
                triangle_interpolate_vec(s, p.nx, p.ny),
                triangle_interpolate_vec(t, p.nx, p.ny),
                triangle_interpolate_vec(r, p.nx, p.ny),
            );
            let coord_dx = Vec3::new(
                tri_derivate_x(s, w, f.wx, f.width, p.ny),
                tri_derivate_x(t, w, f.wx, f.width, p.ny),
                tri_derivate_x(r, w, f.wx, f.width, p.ny),
            );
            let coord_dy = Vec3::new(
                tri_derivate_y(s, w, f.wy, f.height, p.nx),
                tri_derivate_y(t, w, f.wy, f.height, p.nx),
                tri_derivate_y(r, w, f.wy, f.height, p.nx),
            );
            let lod = compute_cube_lod_from_derivates(params.lod_mode, &coord, &coord_dx, &coord_dy, face_size);
            let color = exec_sample_cube(&view, params, &coord, params.final_lod(lod));
            dst.set_pixel(&apply_scale_bias(&color, &params.base), x, y);
        }
    }
    Ok(())
}

/// Render a 2D array texture. `tex_coord` holds `(s, t, layer)` per corner.
/// Projection is not supported.
pub fn sample_texture_2d_array(
    dst: &mut SurfaceAccess<'_>,
    view: &Texture2DArrayView<'_>,
    tex_coord: &[f32],
    params: &ReferenceParams,
) -> Result<()> {
    check_coord_count(tex_coord, 12)?;
    ensure(!params.base.is_projected(), || {
        "projected rendering of 2D array textures is not supported".to_string()
    })?;
    let view = view.sub_view(params.base_level, params.max_level);
    check_levels(view.num_levels())?;

    let (dst_w, dst_h) = (dst.width(), dst.height());
    let tri_s = split_quad(&corner_component(tex_coord, 3, 0));
    let tri_t = split_quad(&corner_component(tex_coord, 3, 1));
    let tri_r = split_quad(&corner_component(tex_coord, 3, 2));
    let tri_lod: [f32; 2] = std::array::from_fn(|tri| {
        params.final_lod(compute_non_projected_tri_lod(
            params.lod_mode,
            (dst_w, dst_h),
            (view.width(), view.height()),
            &tri_s[tri],
            &tri_t[tri],
        ))
    });

    for y in 0..dst_h {
        for x in 0..dst_w {
            let p = locate(x, y, dst_w as f32, dst_h as f32);
            let s = triangle_interpolate_vec(&tri_s[p.tri], p.nx, p.ny);
            let t = triangle_interpolate_vec(&tri_t[p.tri], p.nx, p.ny);
            let r = triangle_interpolate_vec(&tri_r[p.tri], p.nx, p.ny);
            let color = exec_sample_2d_array(&view, params, s, t, r, tri_lod[p.tri]);
            dst.set_pixel(&apply_scale_bias(&color, &params.base), x, y);
        }
    }
    Ok(())
}

/// Render a 3D texture. `tex_coord` holds `(s, t, r)` per corner.
pub fn sample_texture_3d(
    dst: &mut SurfaceAccess<'_>,
    view: &Texture3DView<'_>,
    tex_coord: &[f32],
    params: &ReferenceParams,
) -> Result<()> {
    check_coord_count(tex_coord, 12)?;
    let view = view.sub_view(params.base_level, params.max_level);
    check_levels(view.num_levels())?;

    let (dst_w, dst_h) = (dst.width(), dst.height());
    let (src_w, src_h, src_d) = (view.width(), view.height(), view.depth());
    let sq = corner_component(tex_coord, 3, 0);
    let tq = corner_component(tex_coord, 3, 1);
    let rq = corner_component(tex_coord, 3, 2);
    let tri_s = split_quad(&sq);
    let tri_t = split_quad(&tq);
    let tri_r = split_quad(&rq);

    if params.base.is_projected() {
        check_w(&params.base.w)?;
        let tri_u = split_quad(&(sq * src_w as f32));
        let tri_v = split_quad(&(tq * src_h as f32));
        let tri_q = split_quad(&(rq * src_d as f32));
        let tri_w = split_quad(&params.base.w);

        for y in 0..dst_h {
            for x in 0..dst_w {
                let p = locate(x, y, dst_w as f32, dst_h as f32);
                let w = &tri_w[p.tri];
                let s = projected_tri_interpolate(&tri_s[p.tri], w, p.nx, p.ny);
                let t = projected_tri_interpolate(&tri_t[p.tri], w, p.nx, p.ny);
                let r = projected_tri_interpolate(&tri_r[p.tri], w, p.nx, p.ny);
                let lod = compute_projected_tri_lod_3d(
                    params.lod_mode,
                    &tri_u[p.tri],
                    &tri_v[p.tri],
                    &tri_q[p.tri],
                    w,
                    &p.frame,
                );
                let color = exec_sample_3d(&view, params, s, t, r, params.final_lod(lod));
                dst.set_pixel(&apply_scale_bias(&color, &params.base), x, y);
            }
        }
    } else {
        let tri_lod: [f32; 2] = std::array::from_fn(|tri| {
            params.final_lod(compute_non_projected_tri_lod_3d(
                params.lod_mode,
                (dst_w, dst_h),
                (src_w, src_h, src_d),
                &tri_s[tri],
                &tri_t[tri],
                &tri_r[tri],
            ))
        });

        for y in 0..dst_h {
            for x in 0..dst_w {
                let p = locate(x, y, dst_w as f32, dst_h as f32);
                let s = triangle_interpolate_vec(&tri_s[p.tri], p.nx, p.ny);
                let t = triangle_interpolate_vec(&tri_t[p.tri], p.nx, p.ny);
                let r = triangle_interpolate_vec(&tri_r[p.tri], p.nx, p.ny);
                let color = exec_sample_3d(&view, params, s, t, r, tri_lod[p.tri]);
                dst.set_pixel(&apply_scale_bias(&color, &params.base), x, y);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::interpolate::{compute_quad_tex_coord_2d, compute_quad_tex_coord_cube};
    use crate::params::TextureType;
    use deqp_core::sampler::Sampler;
    use deqp_core::texture::{CubeFace, Texture2D, TextureCube, TextureFormat};
    use image::Rgba;

    fn gradient_texture(size: u32) -> Texture2D {
        let mut tex = Texture2D::new(TextureFormat::RGBA8, size, size).unwrap();
        let scale = 1.0 / size as f32;
        tex.level_mut(0)
            .unwrap()
            .fill_with(|x, y, _| Vec4::new(x as f32 * scale, y as f32 * scale, 0.5, 1.0));
        tex
    }

    #[test]
    fn every_pixel_is_written_once() {
        let tex = gradient_texture(8);
        let mut surface = Surface::new(13, 7).unwrap();
        surface.clear(Rgba([1, 2, 3, 0]));
        let params = ReferenceParams::new(TextureType::Texture2D);
        let coords = compute_quad_tex_coord_2d([0.0, 0.0], [1.0, 1.0]);
        sample_texture_2d(&mut SurfaceAccess::full(&mut surface), &tex.view(), &coords, &params).unwrap();
        for y in 0..7 {
            for x in 0..13 {
                assert_eq!(surface.pixel(x, y)[3], 255, "pixel ({x}, {y}) not written");
            }
        }
    }

    #[test]
    fn sub_rectangle_leaves_outside_untouched() {
        let tex = gradient_texture(4);
        let mut surface = Surface::new(8, 8).unwrap();
        let params = ReferenceParams::default();
        let coords = compute_quad_tex_coord_2d([0.0, 0.0], [1.0, 1.0]);
        let mut access = SurfaceAccess::new(&mut surface, 2, 2, 4, 4).unwrap();
        sample_texture_2d(&mut access, &tex.view(), &coords, &params).unwrap();
        assert_eq!(surface.pixel(0, 0), Rgba([0, 0, 0, 0]));
        assert_eq!(surface.pixel(7, 7), Rgba([0, 0, 0, 0]));
        assert_eq!(surface.pixel(2, 2)[3], 255);
        assert!(SurfaceAccess::new(&mut surface, 6, 0, 4, 4).is_err());
    }

    #[test]
    fn wrong_coordinate_count_is_rejected() {
        let tex = gradient_texture(4);
        let mut surface = Surface::new(4, 4).unwrap();
        let err = sample_texture_2d(
            &mut SurfaceAccess::full(&mut surface),
            &tex.view(),
            &[0.0; 6],
            &ReferenceParams::default(),
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PreconditionViolation);
    }

    #[test]
    fn zero_w_is_rejected_when_projected() {
        let tex = gradient_texture(4);
        let mut surface = Surface::new(4, 4).unwrap();
        let params = ReferenceParams::default().with_projection(Vec4::new(1.0, 0.0, 1.0, 1.0));
        let coords = compute_quad_tex_coord_2d([0.0, 0.0], [1.0, 1.0]);
        let err = sample_texture_2d(&mut SurfaceAccess::full(&mut surface), &tex.view(), &coords, &params)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PreconditionViolation);
    }

    #[test]
    fn color_scale_and_bias_are_applied() {
        let mut tex = Texture2D::new(TextureFormat::RGBA8, 2, 2).unwrap();
        tex.level_mut(0).unwrap().clear(&Vec4::new(1.0, 1.0, 1.0, 1.0));
        let mut surface = Surface::new(2, 2).unwrap();
        let params = ReferenceParams::default()
            .with_color_scale_bias(Vec4::new(0.5, 0.0, 1.0, 1.0), Vec4::new(0.0, 0.2, -1.0, 0.0));
        let coords = compute_quad_tex_coord_2d([0.0, 0.0], [1.0, 1.0]);
        sample_texture_2d(&mut SurfaceAccess::full(&mut surface), &tex.view(), &coords, &params).unwrap();
        assert_eq!(surface.pixel(0, 0), Rgba([128, 51, 0, 255]));
    }

    #[test]
    fn cube_face_renders_face_color() {
        let mut cube = TextureCube::new(TextureFormat::RGBA8, 8).unwrap();
        for face in CubeFace::ALL {
            let v = (face.index() as f32 + 1.0) / 8.0;
            for level in 0..cube.num_levels() {
                cube.face_level_mut(face, level)
                    .unwrap()
                    .clear(&Vec4::new(v, 0.0, 0.0, 1.0));
            }
        }
        let params = ReferenceParams::new(TextureType::Cube).with_sampler(Sampler::linear());
        for face in CubeFace::ALL {
            let mut surface = Surface::new(16, 16).unwrap();
            let coords = compute_quad_tex_coord_cube(face);
            sample_texture_cube(&mut SurfaceAccess::full(&mut surface), &cube.view(), &coords, &params).unwrap();
            let expected = ((face.index() as f32 + 1.0) / 8.0 * 255.0).round() as u8;
            assert_eq!(surface.pixel(8, 8)[0], expected, "{face:?}");
        }
    }
}

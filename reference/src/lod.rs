//! Level-of-detail estimation from texture coordinate derivatives.
//!
//! All estimators return `log2(rho)` without rounding or clamping; the
//! caller adds bias and clamps to `[min_lod, max_lod]`.

use deqp_core::math::Vec3;
use deqp_core::texture::{select_cube_face, CubeFace};

use crate::interpolate::{tri_derivate_x, tri_derivate_y};

/// How `rho` is derived from the partial derivatives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LodMode {
    /// Length of the larger derivative vector.
    #[default]
    Exact,
    /// Largest absolute per-axis derivative. Lower bound of `Exact`.
    MinBound,
    /// Sum of the largest absolute per-axis derivatives. Upper bound of `Exact`.
    MaxBound,
}

/// LOD for a 2D footprint.
pub fn compute_lod_from_derivates(mode: LodMode, dudx: f32, dvdx: f32, dudy: f32, dvdy: f32) -> f32 {
    let rho = match mode {
        LodMode::Exact => (dudx * dudx + dvdx * dvdx)
            .sqrt()
            .max((dudy * dudy + dvdy * dvdy).sqrt()),
        LodMode::MinBound | LodMode::MaxBound => {
            let mu = dudx.abs().max(dudy.abs());
            let mv = dvdx.abs().max(dvdy.abs());
            if mode == LodMode::MinBound {
                mu.max(mv)
            } else {
                mu + mv
            }
        }
    };
    rho.log2()
}

/// LOD for a 3D footprint.
pub fn compute_lod_from_derivates_3d(
    mode: LodMode,
    dudx: f32,
    dvdx: f32,
    dwdx: f32,
    dudy: f32,
    dvdy: f32,
    dwdy: f32,
) -> f32 {
    let rho = match mode {
        LodMode::Exact => (dudx * dudx + dvdx * dvdx + dwdx * dwdx)
            .sqrt()
            .max((dudy * dudy + dvdy * dvdy + dwdy * dwdy).sqrt()),
        LodMode::MinBound | LodMode::MaxBound => {
            let mu = dudx.abs().max(dudy.abs());
            let mv = dvdx.abs().max(dvdy.abs());
            let mw = dwdx.abs().max(dwdy.abs());
            if mode == LodMode::MinBound {
                mu.max(mv).max(mw)
            } else {
                mu + mv + mw
            }
        }
    };
    rho.log2()
}

/// LOD of an affinely mapped triangle.
///
/// `sq` and `tq` hold the normalized coordinates of the triangle's
/// vertices in quad corner order (origin, +y, +x).
pub fn compute_non_projected_tri_lod(
    mode: LodMode,
    dst_size: (u32, u32),
    src_size: (u32, u32),
    sq: &Vec3,
    tq: &Vec3,
) -> f32 {
    let dux = (sq.z - sq.x) * src_size.0 as f32;
    let duy = (sq.y - sq.x) * src_size.0 as f32;
    let dvx = (tq.z - tq.x) * src_size.1 as f32;
    let dvy = (tq.y - tq.x) * src_size.1 as f32;
    let dx = dst_size.0 as f32;
    let dy = dst_size.1 as f32;
    compute_lod_from_derivates(mode, dux / dx, dvx / dx, duy / dy, dvy / dy)
}

/// [`compute_non_projected_tri_lod`] with a third texture axis. `src_size`
/// is `(width, height, depth)` and `rq` the r coordinate of the triangle.
pub fn compute_non_projected_tri_lod_3d(
    mode: LodMode,
    dst_size: (u32, u32),
    src_size: (u32, u32, u32),
    sq: &Vec3,
    tq: &Vec3,
    rq: &Vec3,
) -> f32 {
    let dux = (sq.z - sq.x) * src_size.0 as f32;
    let duy = (sq.y - sq.x) * src_size.0 as f32;
    let dvx = (tq.z - tq.x) * src_size.1 as f32;
    let dvy = (tq.y - tq.x) * src_size.1 as f32;
    let dwx = (rq.z - rq.x) * src_size.2 as f32;
    let dwy = (rq.y - rq.x) * src_size.2 as f32;
    let dx = dst_size.0 as f32;
    let dy = dst_size.1 as f32;
    compute_lod_from_derivates_3d(mode, dux / dx, dvx / dx, dwx / dx, duy / dy, dvy / dy, dwy / dy)
}

/// Window position and destination size of a pixel, in the local frame of
/// the triangle that covers it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriangleFrame {
    pub wx: f32,
    pub wy: f32,
    pub width: f32,
    pub height: f32,
}

/// LOD under perspective projection. `u` and `v` are in texel units.
pub fn compute_projected_tri_lod(mode: LodMode, u: &Vec3, v: &Vec3, w: &Vec3, frame: &TriangleFrame) -> f32 {
    let nx = frame.wx / frame.width;
    let ny = frame.wy / frame.height;
    let dudx = tri_derivate_x(u, w, frame.wx, frame.width, ny);
    let dvdx = tri_derivate_x(v, w, frame.wx, frame.width, ny);
    let dudy = tri_derivate_y(u, w, frame.wy, frame.height, nx);
    let dvdy = tri_derivate_y(v, w, frame.wy, frame.height, nx);
    compute_lod_from_derivates(mode, dudx, dvdx, dudy, dvdy)
}

/// [`compute_projected_tri_lod`] for 3D textures. `r` is in texel units
/// along the depth axis.
pub fn compute_projected_tri_lod_3d(
    mode: LodMode,
    u: &Vec3,
    v: &Vec3,
    r: &Vec3,
    w: &Vec3,
    frame: &TriangleFrame,
) -> f32 {
    let nx = frame.wx / frame.width;
    let ny = frame.wy / frame.height;
    let dudx = tri_derivate_x(u, w, frame.wx, frame.width, ny);
    let dvdx = tri_derivate_x(v, w, frame.wx, frame.width, ny);
    let dwdx = tri_derivate_x(r, w, frame.wx, frame.width, ny);
    let dudy = tri_derivate_y(u, w, frame.wy, frame.height, nx);
    let dvdy = tri_derivate_y(v, w, frame.wy, frame.height, nx);
    let dwdy = tri_derivate_y(r, w, frame.wy, frame.height, nx);
    compute_lod_from_derivates_3d(mode, dudx, dvdx, dwdx, dudy, dvdy, dwdy)
}

/// LOD of a cube map lookup.
///
/// The direction and its screen-space derivatives are projected onto the
/// selected face before deferring to the 2D estimator. Derivative signs do
/// not affect the result.
pub fn compute_cube_lod_from_derivates(
    mode: LodMode,
    coord: &Vec3,
    coord_dx: &Vec3,
    coord_dy: &Vec3,
    face_size: u32,
) -> f32 {
    let (ma_ndx, s_ndx, t_ndx) = match select_cube_face(coord) {
        CubeFace::NegativeX | CubeFace::PositiveX => (0, 2, 1),
        CubeFace::NegativeY | CubeFace::PositiveY => (1, 0, 2),
        CubeFace::NegativeZ | CubeFace::PositiveZ => (2, 0, 1),
    };

    let sc = coord[s_ndx];
    let tc = coord[t_ndx];
    let ma = coord[ma_ndx].abs();
    let scdx = coord_dx[s_ndx];
    let tcdx = coord_dx[t_ndx];
    let madx = coord_dx[ma_ndx].abs();
    let scdy = coord_dy[s_ndx];
    let tcdy = coord_dy[t_ndx];
    let mady = coord_dy[ma_ndx].abs();

    let scale = face_size as f32 * 0.5 / (ma * ma);
    let dudx = scale * (scdx * ma - sc * madx);
    let dvdx = scale * (tcdx * ma - tc * madx);
    let dudy = scale * (scdy * ma - sc * mady);
    let dvdy = scale * (tcdy * ma - tc * mady);

    compute_lod_from_derivates(mode, dudx, dvdx, dudy, dvdy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn exact_lod_of_scaled_footprint() {
        // 256x256 texture over a 64x64 quad: four texels per pixel.
        let lod = compute_non_projected_tri_lod(
            LodMode::Exact,
            (64, 64),
            (256, 256),
            &Vec3::new(0.0, 0.0, 1.0),
            &Vec3::new(0.0, 1.0, 0.0),
        );
        assert!((lod - 2.0).abs() < 1e-6);
    }

    #[test]
    fn one_to_one_mapping_is_lod_zero() {
        for mode in [LodMode::Exact, LodMode::MinBound] {
            assert_eq!(compute_lod_from_derivates(mode, 1.0, 0.0, 0.0, 1.0), 0.0);
        }
        assert_eq!(
            compute_lod_from_derivates(LodMode::MaxBound, 1.0, 0.0, 0.0, 1.0),
            1.0
        );
    }

    #[test]
    fn bounds_bracket_exact() {
        let mut rng = StdRng::seed_from_u64(0x1234);
        for _ in 0..1000 {
            let d: [f32; 4] = std::array::from_fn(|_| rng.gen_range(-8.0..8.0));
            let min = compute_lod_from_derivates(LodMode::MinBound, d[0], d[1], d[2], d[3]);
            let exact = compute_lod_from_derivates(LodMode::Exact, d[0], d[1], d[2], d[3]);
            let max = compute_lod_from_derivates(LodMode::MaxBound, d[0], d[1], d[2], d[3]);
            assert!(min <= exact + 1e-5, "{min} > {exact} for {d:?}");
            assert!(exact <= max + 1e-5, "{exact} > {max} for {d:?}");
        }
    }

    #[test]
    fn lod_is_monotonic_in_scale() {
        let mut previous = f32::NEG_INFINITY;
        for k in 1..32 {
            let scale = k as f32 * 0.25;
            let lod = compute_lod_from_derivates(LodMode::Exact, scale, 0.1 * scale, 0.0, scale);
            assert!(lod > previous);
            previous = lod;
        }
    }

    #[test]
    fn zero_derivatives_give_negative_infinity() {
        assert_eq!(
            compute_lod_from_derivates(LodMode::Exact, 0.0, 0.0, 0.0, 0.0),
            f32::NEG_INFINITY
        );
    }

    #[test]
    fn projected_lod_with_unit_w_matches_affine() {
        let u = Vec3::new(0.0, 0.0, 128.0);
        let v = Vec3::new(0.0, 128.0, 0.0);
        let w = Vec3::new(1.0, 1.0, 1.0);
        let frame = TriangleFrame {
            wx: 10.5,
            wy: 3.5,
            width: 32.0,
            height: 32.0,
        };
        let projected = compute_projected_tri_lod(LodMode::Exact, &u, &v, &w, &frame);
        let affine = compute_non_projected_tri_lod(
            LodMode::Exact,
            (32, 32),
            (128, 128),
            &Vec3::new(0.0, 0.0, 1.0),
            &Vec3::new(0.0, 1.0, 0.0),
        );
        assert!((projected - affine).abs() < 1e-5);
        assert!((projected - 2.0).abs() < 1e-5);
    }

    #[test]
    fn cube_lod_at_face_center() {
        // Moving across the +Z face from -1 to 1 over 32 pixels with a
        // 64-texel face: two texels per pixel.
        let lod = compute_cube_lod_from_derivates(
            LodMode::Exact,
            &Vec3::new(0.0, 0.0, 1.0),
            &Vec3::new(2.0 / 32.0, 0.0, 0.0),
            &Vec3::new(0.0, 2.0 / 32.0, 0.0),
            64,
        );
        assert!((lod - 1.0).abs() < 1e-5);
    }

    #[test]
    fn lod_3d_reduces_to_2d() {
        let a = compute_lod_from_derivates_3d(LodMode::Exact, 3.0, 4.0, 0.0, 1.0, 0.0, 0.0);
        let b = compute_lod_from_derivates(LodMode::Exact, 3.0, 4.0, 1.0, 0.0);
        assert!((a - b).abs() < 1e-6);
        let max = compute_lod_from_derivates_3d(LodMode::MaxBound, 1.0, 1.0, 2.0, 0.0, 0.0, 0.0);
        assert!((max - 2.0).abs() < 1e-6);
    }
}
